// Line-oriented front end.
//
// Stands in for the widget toolkit the core deliberately does not depend on:
// reads commands from stdin, renders `UiUpdate` snapshots as plain text on
// stdout. Keeps only enough local state to resolve context-dependent
// commands (`select`, `vote`, `results` with no argument refer to the most
// recently opened poll).

use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::mpsc;
use tracing::debug;

use crate::model::PollDraft;
use crate::protocol::{DetailView, ListView, ResultsView, UiUpdate, UserCommand};
use crate::results::ResultSource;

// ---------------------------------------------------------------------------
// Command parsing
// ---------------------------------------------------------------------------

/// Parse one input line into a command. `current_poll` is the poll the shell
/// last navigated to, used by argument-less `select`/`vote`/`results`.
pub fn parse_command(line: &str, current_poll: Option<u64>) -> Result<UserCommand, String> {
    let mut words = line.split_whitespace();
    let Some(verb) = words.next() else {
        return Err("empty command".to_string());
    };

    match verb {
        "list" | "ls" => Ok(UserCommand::ShowList),
        "open" => {
            let id = parse_id(words.next(), "open <poll-id>")?;
            Ok(UserCommand::OpenPoll(id))
        }
        "results" => match words.next() {
            Some(arg) => Ok(UserCommand::OpenResults(parse_id(
                Some(arg),
                "results [poll-id]",
            )?)),
            None => current_poll
                .map(UserCommand::OpenResults)
                .ok_or_else(|| "no poll open; use `results <poll-id>`".to_string()),
        },
        "select" => {
            let poll_id = current_poll.ok_or("no poll open; use `open <poll-id>` first")?;
            let option_id = parse_id(words.next(), "select <option-id>")?;
            Ok(UserCommand::SelectOption { poll_id, option_id })
        }
        "vote" => {
            let poll_id = current_poll.ok_or("no poll open; use `open <poll-id>` first")?;
            Ok(UserCommand::SubmitVote(poll_id))
        }
        "new" => parse_new(line),
        "refresh" | "r" => Ok(UserCommand::Refresh),
        "fg" => Ok(UserCommand::Foreground),
        "quit" | "q" => Ok(UserCommand::Quit),
        other => Err(format!("unknown command `{other}` (try `help`)")),
    }
}

/// `new <question> | <option> | <option> [| ...]`
fn parse_new(line: &str) -> Result<UserCommand, String> {
    let rest = line.trim_start().strip_prefix("new").unwrap_or(line).trim();
    if rest.is_empty() {
        return Err("usage: new <question> | <option> | <option>".to_string());
    }
    let mut parts = rest.split('|').map(str::trim);
    let question = parts.next().unwrap_or_default().to_string();
    let options: Vec<String> = parts.map(str::to_string).collect();
    // Draft validation happens in the orchestrator, before any network call.
    Ok(UserCommand::CreatePoll(PollDraft { question, options }))
}

fn parse_id(word: Option<&str>, usage: &str) -> Result<u64, String> {
    word.ok_or_else(|| format!("usage: {usage}"))?
        .parse()
        .map_err(|_| format!("usage: {usage}"))
}

const HELP: &str = "\
commands:
  list                 show all polls
  open <poll-id>       open a poll for voting
  select <option-id>   choose an option in the open poll
  vote                 submit the chosen option
  results [poll-id]    show results for a poll
  new <q> | <a> | <b>  create a poll (2-6 options)
  refresh              reload the current screen
  fg                   simulate return-to-foreground
  quit                 exit";

// ---------------------------------------------------------------------------
// Rendering
// ---------------------------------------------------------------------------

pub fn render_list(view: &ListView) -> String {
    let mut out = String::from("== Polls ==\n");
    if let Some(error) = &view.error {
        out.push_str(&format!("! {} (showing last known data)\n", error.message));
    }
    if view.polls.is_empty() {
        out.push_str("(no polls)\n");
    }
    for poll in &view.polls {
        out.push_str(&format!("  [{}] {}\n", poll.id, poll.question));
    }
    if view.loading {
        out.push_str("(refreshing...)\n");
    }
    out
}

pub fn render_detail(view: &DetailView) -> String {
    let mut out = String::new();
    match &view.poll {
        Some(poll) => {
            out.push_str(&format!("== {} ==\n", poll.question));
            for option in &poll.options {
                let marker = if view.selection == Some(option.id) {
                    '*'
                } else {
                    ' '
                };
                out.push_str(&format!(" {marker}[{}] {}\n", option.id, option.value));
            }
            if view.vote_in_flight {
                out.push_str("(vote in flight)\n");
            }
        }
        None => match &view.error {
            Some(error) => out.push_str(&format!("! failed to load poll: {}\n", error.message)),
            None => out.push_str("(loading poll...)\n"),
        },
    }
    out
}

pub fn render_results(view: &ResultsView) -> String {
    let mut out = String::new();
    let Some(poll) = &view.poll else {
        return match &view.error {
            Some(error) => format!("! failed to load poll: {}\n", error.message),
            None => "(loading results...)\n".to_string(),
        };
    };
    out.push_str(&format!("== Results: {} ==\n", poll.question));
    match &view.results {
        Some(set) => {
            if view.source == ResultSource::Placeholder {
                out.push_str("! results unavailable, showing placeholder\n");
            }
            for row in &set.results {
                out.push_str(&format!("  {:<20} {}\n", row.option_value, row.count));
            }
            out.push_str(&format!("  total votes: {}\n", set.total_votes));
        }
        None => out.push_str("(loading results...)\n"),
    }
    out
}

fn render_update(update: &UiUpdate) -> String {
    match update {
        UiUpdate::List(view) => render_list(view),
        UiUpdate::Detail(view) => render_detail(view),
        UiUpdate::Results(view) => render_results(view),
        UiUpdate::VoteAccepted { poll_id } => {
            format!("vote cast successfully for poll {poll_id}\n")
        }
        UiUpdate::VoteFailed { poll_id, message } => {
            format!("vote on poll {poll_id} failed: {message}\n")
        }
        UiUpdate::PollCreated(poll) => {
            format!("poll created: [{}] {}\n", poll.id, poll.question)
        }
        UiUpdate::CreateFailed { message } => format!("could not create poll: {message}\n"),
    }
}

// ---------------------------------------------------------------------------
// Shell loop
// ---------------------------------------------------------------------------

/// Run the interactive loop: stdin lines become `UserCommand`s, `UiUpdate`s
/// become stdout text. Returns when the user quits or stdin closes.
pub async fn run(
    mut ui_rx: mpsc::Receiver<UiUpdate>,
    cmd_tx: mpsc::Sender<UserCommand>,
) -> anyhow::Result<()> {
    let stdin = BufReader::new(tokio::io::stdin());
    let mut lines = stdin.lines();
    let mut current_poll: Option<u64> = None;

    println!("pollboard — type `help` for commands");

    loop {
        tokio::select! {
            update = ui_rx.recv() => {
                match update {
                    Some(update) => print!("{}", render_update(&update)),
                    None => {
                        debug!("ui channel closed, shell exiting");
                        break;
                    }
                }
            }

            line = lines.next_line() => {
                let Some(line) = line? else {
                    // stdin closed.
                    let _ = cmd_tx.send(UserCommand::Quit).await;
                    break;
                };
                let trimmed = line.trim();
                if trimmed.is_empty() {
                    continue;
                }
                if trimmed == "help" {
                    println!("{HELP}");
                    continue;
                }
                match parse_command(trimmed, current_poll) {
                    Ok(cmd) => {
                        match &cmd {
                            UserCommand::OpenPoll(id) | UserCommand::OpenResults(id) => {
                                current_poll = Some(*id);
                            }
                            UserCommand::ShowList => current_poll = None,
                            _ => {}
                        }
                        let is_quit = matches!(cmd, UserCommand::Quit);
                        if cmd_tx.send(cmd).await.is_err() || is_quit {
                            break;
                        }
                    }
                    Err(message) => println!("{message}"),
                }
            }
        }
    }

    Ok(())
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

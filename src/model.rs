// Poll data model and client-side draft validation.

use serde::{Deserialize, Serialize};
use thiserror::Error;

// ---------------------------------------------------------------------------
// Limits
// ---------------------------------------------------------------------------

/// Maximum length of a poll question, matching the backend's column width.
pub const MAX_QUESTION_LEN: usize = 140;

/// Maximum length of a single option value.
pub const MAX_OPTION_LEN: usize = 40;

/// Minimum number of non-blank options a poll must have.
pub const MIN_OPTIONS: usize = 2;

/// Maximum number of options a poll may have.
pub const MAX_OPTIONS: usize = 6;

// ---------------------------------------------------------------------------
// Core entities
// ---------------------------------------------------------------------------

/// A poll as returned by the backend. Read-only on the client except
/// indirectly through vote submission.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Poll {
    pub id: u64,
    pub question: String,
    #[serde(default)]
    pub options: Vec<PollOption>,
}

/// One selectable answer belonging to a poll.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PollOption {
    pub id: u64,
    pub value: String,
}

impl Poll {
    /// Whether `option_id` belongs to this poll's current option set.
    pub fn has_option(&self, option_id: u64) -> bool {
        self.options.iter().any(|o| o.id == option_id)
    }
}

/// Aggregated vote counts for a poll, either backend-sourced or synthesized
/// locally (see the `results` module).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResultSet {
    pub total_votes: u64,
    pub results: Vec<OptionCount>,
}

/// Per-option slice of a `ResultSet`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OptionCount {
    pub option_id: u64,
    pub option_value: String,
    pub count: u64,
}

impl ResultSet {
    /// Check the structural invariant against a poll: the total equals the
    /// sum of per-option counts, and `results` covers exactly the poll's
    /// option set in the same order.
    pub fn is_consistent_with(&self, poll: &Poll) -> bool {
        if self.results.len() != poll.options.len() {
            return false;
        }
        if self
            .results
            .iter()
            .zip(&poll.options)
            .any(|(r, o)| r.option_id != o.id)
        {
            return false;
        }
        self.total_votes == self.results.iter().map(|r| r.count).sum::<u64>()
    }
}

// ---------------------------------------------------------------------------
// Poll creation
// ---------------------------------------------------------------------------

/// User input for creating a new poll, before validation. Options may contain
/// blank entries (empty form rows); validation trims and drops them.
#[derive(Debug, Clone, Default)]
pub struct PollDraft {
    pub question: String,
    pub options: Vec<String>,
}

/// Validated request body for `POST /polls`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewPollRequest {
    pub question: String,
    pub options: Vec<NewOption>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewOption {
    pub value: String,
}

/// Why a `PollDraft` was rejected before reaching the network.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("poll question cannot be empty")]
    EmptyQuestion,

    #[error("poll question exceeds {MAX_QUESTION_LEN} characters")]
    QuestionTooLong,

    #[error("a poll must have at least {MIN_OPTIONS} valid options")]
    TooFewOptions,

    #[error("a poll can have at most {MAX_OPTIONS} options")]
    TooManyOptions,

    #[error("option `{0}` exceeds {MAX_OPTION_LEN} characters")]
    OptionTooLong(String),
}

impl PollDraft {
    /// Validate the draft and build the request body sent to the backend.
    ///
    /// Blank option rows are dropped and surviving values are trimmed, so a
    /// form with two filled rows and four empty ones is a valid two-option
    /// poll. All checks run before any network call.
    pub fn validate(&self) -> Result<NewPollRequest, ValidationError> {
        let question = self.question.trim();
        if question.is_empty() {
            return Err(ValidationError::EmptyQuestion);
        }
        if question.chars().count() > MAX_QUESTION_LEN {
            return Err(ValidationError::QuestionTooLong);
        }

        let values: Vec<&str> = self
            .options
            .iter()
            .map(|o| o.trim())
            .filter(|o| !o.is_empty())
            .collect();

        if values.len() < MIN_OPTIONS {
            return Err(ValidationError::TooFewOptions);
        }
        if values.len() > MAX_OPTIONS {
            return Err(ValidationError::TooManyOptions);
        }
        if let Some(long) = values.iter().find(|v| v.chars().count() > MAX_OPTION_LEN) {
            return Err(ValidationError::OptionTooLong((*long).to_string()));
        }

        Ok(NewPollRequest {
            question: question.to_string(),
            options: values
                .into_iter()
                .map(|v| NewOption {
                    value: v.to_string(),
                })
                .collect(),
        })
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    fn poll_with_options(ids: &[u64]) -> Poll {
        Poll {
            id: 1,
            question: "Pick one".into(),
            options: ids
                .iter()
                .map(|&id| PollOption {
                    id,
                    value: format!("opt-{id}"),
                })
                .collect(),
        }
    }

    fn result_set(counts: &[(u64, u64)]) -> ResultSet {
        ResultSet {
            total_votes: counts.iter().map(|&(_, c)| c).sum(),
            results: counts
                .iter()
                .map(|&(id, count)| OptionCount {
                    option_id: id,
                    option_value: format!("opt-{id}"),
                    count,
                })
                .collect(),
        }
    }

    // -- ResultSet invariant --

    #[test]
    fn consistent_result_set_passes() {
        let poll = poll_with_options(&[10, 11]);
        let set = result_set(&[(10, 3), (11, 5)]);
        assert!(set.is_consistent_with(&poll));
    }

    #[test]
    fn wrong_total_fails_invariant() {
        let poll = poll_with_options(&[10, 11]);
        let mut set = result_set(&[(10, 3), (11, 5)]);
        set.total_votes = 9;
        assert!(!set.is_consistent_with(&poll));
    }

    #[test]
    fn missing_option_fails_invariant() {
        let poll = poll_with_options(&[10, 11, 12]);
        let set = result_set(&[(10, 3), (11, 5)]);
        assert!(!set.is_consistent_with(&poll));
    }

    #[test]
    fn reordered_options_fail_invariant() {
        let poll = poll_with_options(&[10, 11]);
        let set = result_set(&[(11, 5), (10, 3)]);
        assert!(!set.is_consistent_with(&poll));
    }

    #[test]
    fn extra_option_fails_invariant() {
        let poll = poll_with_options(&[10]);
        let set = result_set(&[(10, 3), (99, 0)]);
        assert!(!set.is_consistent_with(&poll));
    }

    // -- Draft validation --

    fn draft(question: &str, options: &[&str]) -> PollDraft {
        PollDraft {
            question: question.into(),
            options: options.iter().map(|s| s.to_string()).collect(),
        }
    }

    #[test]
    fn valid_draft_builds_request() {
        let request = draft("Q", &["A", "B"]).validate().unwrap();
        assert_eq!(request.question, "Q");
        assert_eq!(request.options.len(), 2);
        assert_eq!(request.options[0].value, "A");
    }

    #[test]
    fn empty_question_rejected() {
        assert_eq!(
            draft("", &["A", "B"]).validate(),
            Err(ValidationError::EmptyQuestion)
        );
    }

    #[test]
    fn whitespace_question_rejected() {
        assert_eq!(
            draft("   ", &["A", "B"]).validate(),
            Err(ValidationError::EmptyQuestion)
        );
    }

    #[test]
    fn overlong_question_rejected() {
        let question = "q".repeat(MAX_QUESTION_LEN + 1);
        assert_eq!(
            draft(&question, &["A", "B"]).validate(),
            Err(ValidationError::QuestionTooLong)
        );
    }

    #[test]
    fn single_option_rejected() {
        assert_eq!(
            draft("Q", &["X"]).validate(),
            Err(ValidationError::TooFewOptions)
        );
    }

    #[test]
    fn blank_options_do_not_count() {
        // Two form rows filled, two blank: valid.
        let request = draft("Q", &["A", "", "B", "  "]).validate().unwrap();
        assert_eq!(request.options.len(), 2);

        // One filled, rest blank: rejected.
        assert_eq!(
            draft("Q", &["A", "", ""]).validate(),
            Err(ValidationError::TooFewOptions)
        );
    }

    #[test]
    fn too_many_options_rejected() {
        let options = ["A", "B", "C", "D", "E", "F", "G"];
        assert_eq!(
            draft("Q", &options).validate(),
            Err(ValidationError::TooManyOptions)
        );
    }

    #[test]
    fn overlong_option_rejected() {
        let long = "x".repeat(MAX_OPTION_LEN + 1);
        assert!(matches!(
            draft("Q", &["A", &long]).validate(),
            Err(ValidationError::OptionTooLong(_))
        ));
    }

    #[test]
    fn values_are_trimmed() {
        let request = draft("  Q  ", &[" A ", "B "]).validate().unwrap();
        assert_eq!(request.question, "Q");
        assert_eq!(request.options[0].value, "A");
        assert_eq!(request.options[1].value, "B");
    }

    // -- Wire format --

    #[test]
    fn result_set_uses_camel_case_keys() {
        let json = r#"{
            "totalVotes": 8,
            "results": [
                { "optionId": 10, "optionValue": "A", "count": 3 },
                { "optionId": 11, "optionValue": "B", "count": 5 }
            ]
        }"#;
        let set: ResultSet = serde_json::from_str(json).unwrap();
        assert_eq!(set.total_votes, 8);
        assert_eq!(set.results[1].option_value, "B");
    }

    #[test]
    fn poll_without_options_field_parses_empty() {
        let poll: Poll = serde_json::from_str(r#"{ "id": 3, "question": "Q" }"#).unwrap();
        assert!(poll.options.is_empty());
    }
}

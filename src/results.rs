// Result aggregation fallback.
//
// The results view must always have a renderable ResultSet. When the backend
// supplies one that matches the poll's option set it is used as-is; when the
// results endpoint is missing, failing, or returns a malformed set, a
// placeholder is synthesized from the poll's options. The placeholder is
// never presented as real data: the source flag travels with the set so the
// UI can label it.

use rand::Rng;
use tracing::warn;

use crate::model::{OptionCount, Poll, ResultSet};

// ---------------------------------------------------------------------------
// Source flag
// ---------------------------------------------------------------------------

/// Where a ResultSet came from. `Placeholder` sets must be visibly labeled
/// "results unavailable, showing placeholder" by the rendering layer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResultSource {
    /// Authoritative counts from the backend.
    Backend,
    /// Locally synthesized shape; the counts carry no information.
    Placeholder,
}

/// How placeholder counts are filled in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PlaceholderMode {
    /// Every option gets a count of zero.
    #[default]
    Zero,
    /// Randomized counts for demos. Only selectable through an explicit
    /// config flag; the set is still flagged as a placeholder.
    DemoRandom,
}

// ---------------------------------------------------------------------------
// Resolution
// ---------------------------------------------------------------------------

/// Pick the ResultSet to render for `poll`.
///
/// A backend set is returned unchanged only when it satisfies the structural
/// invariant (total equals the sum of counts, options covered exactly and in
/// order). Anything else falls back to a synthesized placeholder that always
/// satisfies the invariant.
pub fn resolve(
    poll: &Poll,
    backend: Option<ResultSet>,
    mode: PlaceholderMode,
) -> (ResultSet, ResultSource) {
    match backend {
        Some(set) if set.is_consistent_with(poll) => (set, ResultSource::Backend),
        Some(_) => {
            warn!(
                poll_id = poll.id,
                "backend result set inconsistent with poll options, synthesizing placeholder"
            );
            (placeholder(poll, mode), ResultSource::Placeholder)
        }
        None => (placeholder(poll, mode), ResultSource::Placeholder),
    }
}

/// Synthesize a ResultSet covering exactly the poll's option set, in order,
/// with `total_votes` derived as the sum of the per-option counts.
pub fn placeholder(poll: &Poll, mode: PlaceholderMode) -> ResultSet {
    let mut rng = rand::rng();
    let results: Vec<OptionCount> = poll
        .options
        .iter()
        .map(|option| OptionCount {
            option_id: option.id,
            option_value: option.value.clone(),
            count: match mode {
                PlaceholderMode::Zero => 0,
                PlaceholderMode::DemoRandom => rng.random_range(0..50),
            },
        })
        .collect();
    let total_votes = results.iter().map(|r| r.count).sum();
    ResultSet {
        total_votes,
        results,
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

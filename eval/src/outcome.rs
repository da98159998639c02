use engine::looping::{EpisodeOutcome, LoopStop};
use serde::{Deserialize, Serialize};

use crate::judge::Judgment;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum Outcome {
    Success,
    Fail,
    /// Checks failed and the episode hit its cycle cap.
    Stuck,
    Error,
}

/// `None` means the episode itself errored before finishing.
pub fn classify_outcome(episode: Option<&EpisodeOutcome>, judgment: &Judgment) -> Outcome {
    match episode {
        None => Outcome::Error,
        Some(_) if judgment.all_passed() => Outcome::Success,
        Some(episode) => match episode.stop {
            LoopStop::MaxCyclesExceeded { .. } => Outcome::Stuck,
            LoopStop::Idle => Outcome::Fail,
        },
    }
}

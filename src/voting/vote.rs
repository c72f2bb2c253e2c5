use serde::Serialize;

use super::id::{Id, WeakId};
use super::question::Choice;

/// A user's current selection on a question. At most one exists per
/// (user, question) pair.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct Vote {
    pub id: WeakId,
    pub user_id: Id,
    pub question_id: WeakId,
    pub choice_id: WeakId,
}

/// Counter changes required to record a ballot.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum VoteChange {
    /// First ballot by this user on the question.
    Cast { choice_id: WeakId },
    /// The user's existing vote is repointed from one choice to another.
    /// `from` and `to` may be equal, in which case counters are unchanged.
    Moved { from: WeakId, to: WeakId },
}

impl VoteChange {
    pub fn plan(prior_choice: Option<WeakId>, selected: WeakId) -> VoteChange {
        match prior_choice {
            Some(from) => VoteChange::Moved { from, to: selected },
            None => VoteChange::Cast { choice_id: selected },
        }
    }

    /// Choice whose counter goes up.
    pub fn selected(&self) -> WeakId {
        match *self {
            VoteChange::Cast { choice_id } => choice_id,
            VoteChange::Moved { to, .. } => to,
        }
    }

    /// Choice whose counter goes down, if any.
    pub fn released(&self) -> Option<WeakId> {
        match *self {
            VoteChange::Cast { .. } => None,
            VoteChange::Moved { from, .. } => Some(from),
        }
    }

    pub fn apply(&self, choices: &mut [Choice]) {
        if let Some(from) = self.released() {
            if let Some(choice) = choices.iter_mut().find(|c| c.id == from) {
                choice.votes -= 1;
            }
        }
        let to = self.selected();
        if let Some(choice) = choices.iter_mut().find(|c| c.id == to) {
            choice.votes += 1;
        }
    }
}

mod ballot;
mod id;
mod question;
pub mod tally;
mod user;
mod vote;

pub use ballot::{Ballot, UnvalidatedBallot};
pub use id::{Id, WeakId};
pub use question::{
    latest_published, Choice, CreateQuestion, Question, UnvalidatedCreateQuestion, LATEST_QUESTION_COUNT,
};
pub use tally::{vote_count, Tally};
pub use user::User;
pub use vote::{Vote, VoteChange};

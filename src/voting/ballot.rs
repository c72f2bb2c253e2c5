use std::fmt::{self, Display, Formatter};

use serde::Deserialize;

use super::id::WeakId;
use super::question::{Choice, Question};
use crate::error;

/// A validated selection of one choice on one question.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Ballot {
    pub question_id: WeakId,
    pub choice_id: WeakId,
}

impl Display for Ballot {
    fn fmt(&self, f: &mut Formatter) -> fmt::Result {
        write!(f, "(question {}: choice {})", self.question_id, self.choice_id)
    }
}


/// Ballot as submitted by the voting form.
#[derive(Clone, Debug, Default, Deserialize)]
pub struct UnvalidatedBallot {
    pub choice: Option<String>,
}

impl TryFrom<(UnvalidatedBallot, &Question, &[Choice])> for Ballot {
    type Error = error::ValidationError;
    fn try_from(value: (UnvalidatedBallot, &Question, &[Choice])) -> Result<Self, Self::Error> {
        let (UnvalidatedBallot { choice }, question, choices) = value;

        let raw = match choice {
            Some(raw) if !raw.trim().is_empty() => raw,
            _ => return Err(error::ballot_missing_choice(question.id)),
        };
        let choice_id: WeakId = raw.parse()
            .map_err(|_| error::ballot_unreadable_choice(question.id, &raw))?;

        if !choices.iter().any(|c| c.id == choice_id && c.question_id == question.id) {
            return Err(error::ballot_invalid_selection(question.id, choice_id));
        }

        Ok(Ballot { question_id: question.id, choice_id })
    }
}

#[cfg(test)]
mod tests {
    use chrono::Utc;
    use super::*;

    fn fixture() -> (Question, Vec<Choice>) {
        let question = Question {
            id: WeakId(1),
            question_text: String::from("How old are you?"),
            pub_date: Utc::now(),
        };
        let choices = vec![
            Choice { id: WeakId(10), question_id: WeakId(1), choice_text: String::from("Young"), votes: 0 },
            Choice { id: WeakId(11), question_id: WeakId(1), choice_text: String::from("Old"), votes: 0 },
        ];
        (question, choices)
    }

    fn submit(choice: Option<&str>) -> Result<Ballot, error::ValidationError> {
        let (question, choices) = fixture();
        let ballot = UnvalidatedBallot { choice: choice.map(String::from) };
        Ballot::try_from((ballot, &question, choices.as_slice()))
    }

    #[test]
    fn valid_selection() {
        let ballot = submit(Some("11")).unwrap();
        assert_eq!(ballot, Ballot { question_id: WeakId(1), choice_id: WeakId(11) });
    }

    #[test]
    fn missing_choice() {
        assert!(submit(None).unwrap_err().to_string().contains("has no choice"));
        assert!(submit(Some("")).unwrap_err().to_string().contains("has no choice"));
    }

    #[test]
    fn unreadable_choice() {
        assert!(submit(Some("eleven")).unwrap_err().to_string().contains("unreadable"));
    }

    #[test]
    fn choice_from_other_question() {
        assert!(submit(Some("99")).unwrap_err().to_string().contains("another question"));
    }
}

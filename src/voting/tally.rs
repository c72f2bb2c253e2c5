use serde::Serialize;

use super::question::{Choice, Question};

/// Sum of the vote counters across a question's choices.
pub fn vote_count(choices: &[Choice]) -> i64 {
    choices.iter().map(|c| c.votes as i64).sum()
}

#[derive(Serialize, Debug, PartialEq)]
pub struct Tally {
    pub question: Question,
    pub choices: Vec<Choice>,
    pub total_votes: i64,
}

impl Tally {
    pub fn new(question: Question, choices: Vec<Choice>) -> Tally {
        let mut choices: Vec<Choice> = choices.into_iter()
            .filter(|c| c.question_id == question.id)
            .collect();
        // sort by id so results render in creation order
        choices.sort_by_key(|c| c.id);
        let total_votes = vote_count(&choices);

        Tally { question, choices, total_votes }
    }
}

#[cfg(test)]
mod tests {
    use chrono::Utc;
    use super::*;
    use crate::voting::WeakId;

    fn question() -> Question {
        Question { id: WeakId(1), question_text: String::from("Tabs or spaces?"), pub_date: Utc::now() }
    }

    fn choice(id: i32, question_id: i32, votes: i32) -> Choice {
        Choice { id: WeakId(id), question_id: WeakId(question_id), choice_text: format!("Choice {id}"), votes }
    }

    #[test]
    fn empty_question_has_no_votes() {
        let tally = Tally::new(question(), vec![]);
        assert_eq!(tally.total_votes, 0);
        assert!(tally.choices.is_empty());
    }

    #[test]
    fn total_is_sum_of_counters() {
        let tally = Tally::new(question(), vec![choice(3, 1, 4), choice(2, 1, 1), choice(5, 1, 0)]);
        assert_eq!(tally.total_votes, 5);
        let ids: Vec<i32> = tally.choices.iter().map(|c| c.id.0).collect();
        assert_eq!(ids, vec![2, 3, 5]);
    }

    #[test]
    fn foreign_choices_are_ignored() {
        let tally = Tally::new(question(), vec![choice(1, 1, 2), choice(2, 7, 9)]);
        assert_eq!(tally.total_votes, 2);
        assert_eq!(tally.choices.len(), 1);
    }
}

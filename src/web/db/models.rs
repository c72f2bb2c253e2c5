use chrono::NaiveDateTime;
use diesel::prelude::*;
use uuid::Uuid;

use crate::voting;
use super::schema;

#[derive(Identifiable, Queryable, Selectable)]
#[diesel(table_name = schema::questions)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct Question {
    pub id: i32,
    pub question_text: String,
    pub pub_date: NaiveDateTime,
}

impl From<Question> for voting::Question {
    fn from(Question { id, question_text, pub_date }: Question) -> Self {
        voting::Question {
            id: voting::WeakId(id),
            question_text,
            pub_date: pub_date.and_utc(),
        }
    }
}

#[derive(Insertable)]
#[diesel(table_name = schema::questions)]
pub struct NewQuestion<'a> {
    pub question_text: &'a str,
    pub pub_date: NaiveDateTime,
}

#[derive(Associations, Identifiable, Queryable, Selectable)]
#[diesel(table_name = schema::choices)]
#[diesel(check_for_backend(diesel::pg::Pg))]
#[diesel(belongs_to(Question))]
pub struct Choice {
    pub id: i32,
    pub question_id: i32,
    pub choice_text: String,
    pub votes: i32,
}

impl From<Choice> for voting::Choice {
    fn from(Choice { id, question_id, choice_text, votes }: Choice) -> Self {
        voting::Choice {
            id: voting::WeakId(id),
            question_id: voting::WeakId(question_id),
            choice_text,
            votes,
        }
    }
}

#[derive(Insertable)]
#[diesel(table_name = schema::choices)]
pub struct NewChoice<'a> {
    pub question_id: i32,
    pub choice_text: &'a str,
}

#[derive(Queryable, Selectable, Identifiable, Insertable)]
#[diesel(table_name = schema::users)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct User {
    pub id: Uuid,
    pub display_name: String,
}

impl From<User> for voting::User {
    fn from(User { id, display_name }: User) -> Self {
        voting::User {
            id: voting::Id(id),
            display_name,
        }
    }
}

#[derive(Associations, Identifiable, Queryable, Selectable)]
#[diesel(table_name = schema::votes)]
#[diesel(check_for_backend(diesel::pg::Pg))]
#[diesel(belongs_to(User, foreign_key = user_id))]
#[diesel(belongs_to(Question, foreign_key = question_id))]
pub struct Vote {
    pub id: i32,
    pub user_id: Uuid,
    pub question_id: i32,
    pub choice_id: i32,
}

impl From<Vote> for voting::Vote {
    fn from(Vote { id, user_id, question_id, choice_id }: Vote) -> Self {
        voting::Vote {
            id: voting::WeakId(id),
            user_id: voting::Id(user_id),
            question_id: voting::WeakId(question_id),
            choice_id: voting::WeakId(choice_id),
        }
    }
}

#[derive(Insertable)]
#[diesel(table_name = schema::votes)]
pub struct NewVote {
    pub user_id: Uuid,
    pub question_id: i32,
    pub choice_id: i32,
}

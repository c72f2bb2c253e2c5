pub mod models;
pub mod schema;

use chrono::{DateTime, Utc};
use diesel::dsl::sum;
use diesel::prelude::*;
use diesel::r2d2::{ConnectionManager, Pool, PoolError, PooledConnection};
use tracing::{debug, info};

use crate::error::{self, StoreError};
use crate::store::PollStore;
use crate::voting::{self, Ballot, CreateQuestion, Id, VoteChange, WeakId};
use schema::{choices, questions, users, votes};

pub type PgPool = Pool<ConnectionManager<PgConnection>>;
type PgPooled = PooledConnection<ConnectionManager<PgConnection>>;

pub fn create_pool(database_url: &str, max_size: u32) -> Result<PgPool, PoolError> {
    let manager = ConnectionManager::<PgConnection>::new(database_url);
    let pool = Pool::builder().max_size(max_size).build(manager)?;
    info!(max_size, "Database pool ready");
    Ok(pool)
}

/// Escapes `LIKE` wildcards so `text` matches literally.
fn like_pattern(text: &str) -> String {
    let mut pattern = String::with_capacity(text.len() + 2);
    pattern.push('%');
    for c in text.chars() {
        if matches!(c, '\\' | '%' | '_') {
            pattern.push('\\');
        }
        pattern.push(c);
    }
    pattern.push('%');
    pattern
}

pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    pub fn new(pool: PgPool) -> Self {
        PgStore { pool }
    }

    fn connection(&self) -> Result<PgPooled, StoreError> {
        Ok(self.pool.get()?)
    }
}

/// Shifts a choice's counter by `delta`, scoped to its question.
fn adjust_votes(conn: &mut PgConnection, question_id: i32, choice_id: i32, delta: i32) -> Result<(), StoreError> {
    let updated = diesel::update(
        choices::table
            .filter(choices::id.eq(choice_id))
            .filter(choices::question_id.eq(question_id)),
    )
    .set(choices::votes.eq(choices::votes + delta))
    .execute(conn)?;

    if updated == 0 {
        return Err(error::missing("choice", choice_id));
    }
    Ok(())
}

impl PollStore for PgStore {
    fn latest_questions(&self, now: DateTime<Utc>, limit: usize) -> Result<Vec<voting::Question>, StoreError> {
        let mut conn = self.connection()?;
        let conn: &mut PgConnection = &mut conn;
        let rows = questions::table
            .filter(questions::pub_date.le(now.naive_utc()))
            .order((questions::pub_date.desc(), questions::id.desc()))
            .limit(limit as i64)
            .select(models::Question::as_select())
            .load(conn)?;
        Ok(rows.into_iter().map(Into::into).collect())
    }

    fn published_question(&self, id: WeakId, now: DateTime<Utc>) -> Result<Option<voting::Question>, StoreError> {
        let mut conn = self.connection()?;
        let conn: &mut PgConnection = &mut conn;
        let row = questions::table
            .filter(questions::id.eq(id.0))
            .filter(questions::pub_date.le(now.naive_utc()))
            .select(models::Question::as_select())
            .first(conn)
            .optional()?;
        Ok(row.map(Into::into))
    }

    fn choices(&self, question_id: WeakId) -> Result<Vec<voting::Choice>, StoreError> {
        let mut conn = self.connection()?;
        let conn: &mut PgConnection = &mut conn;
        let rows = choices::table
            .filter(choices::question_id.eq(question_id.0))
            .order(choices::id.asc())
            .select(models::Choice::as_select())
            .load(conn)?;
        Ok(rows.into_iter().map(Into::into).collect())
    }

    fn prior_vote(&self, user_id: &Id, question_id: WeakId) -> Result<Option<voting::Vote>, StoreError> {
        let mut conn = self.connection()?;
        let conn: &mut PgConnection = &mut conn;
        let row = votes::table
            .filter(votes::user_id.eq(user_id.0))
            .filter(votes::question_id.eq(question_id.0))
            .select(models::Vote::as_select())
            .first(conn)
            .optional()?;
        Ok(row.map(Into::into))
    }

    fn cast_vote(&self, user_id: &Id, ballot: &Ballot) -> Result<VoteChange, StoreError> {
        let mut conn = self.connection()?;
        let conn: &mut PgConnection = &mut conn;
        let question_id = ballot.question_id.0;
        let choice_id = ballot.choice_id.0;

        conn.transaction::<_, StoreError, _>(|conn| {
            // ballots on the same question queue behind this row lock
            questions::table
                .filter(questions::id.eq(question_id))
                .select(questions::id)
                .for_update()
                .first::<i32>(conn)
                .optional()?
                .ok_or_else(|| error::missing("question", question_id))?;

            let prior_choice = votes::table
                .filter(votes::user_id.eq(user_id.0))
                .filter(votes::question_id.eq(question_id))
                .select(votes::choice_id)
                .first::<i32>(conn)
                .optional()?;

            let change = VoteChange::plan(prior_choice.map(WeakId), ballot.choice_id);
            match change {
                VoteChange::Moved { from, to } => {
                    adjust_votes(conn, question_id, from.0, -1)?;
                    diesel::update(
                        votes::table
                            .filter(votes::user_id.eq(user_id.0))
                            .filter(votes::question_id.eq(question_id)),
                    )
                    .set(votes::choice_id.eq(to.0))
                    .execute(conn)?;
                },
                VoteChange::Cast { choice_id } => {
                    diesel::insert_into(votes::table)
                        .values(&models::NewVote { user_id: user_id.0, question_id, choice_id: choice_id.0 })
                        .execute(conn)?;
                },
            }
            adjust_votes(conn, question_id, choice_id, 1)?;

            debug!(user = %user_id, %ballot, ?change, "Recorded ballot");
            Ok(change)
        })
    }

    fn vote_count(&self, question_id: WeakId) -> Result<Option<i64>, StoreError> {
        let mut conn = self.connection()?;
        let conn: &mut PgConnection = &mut conn;
        let exists = questions::table
            .filter(questions::id.eq(question_id.0))
            .select(questions::id)
            .first::<i32>(conn)
            .optional()?;
        if exists.is_none() {
            return Ok(None);
        }

        let total: Option<i64> = choices::table
            .filter(choices::question_id.eq(question_id.0))
            .select(sum(choices::votes))
            .first(conn)?;
        Ok(Some(total.unwrap_or(0)))
    }

    fn search_questions(&self, text: &str) -> Result<Vec<voting::Question>, StoreError> {
        let mut conn = self.connection()?;
        let conn: &mut PgConnection = &mut conn;
        let rows = questions::table
            .filter(questions::question_text.like(like_pattern(text)).escape('\\'))
            .order(questions::id.asc())
            .select(models::Question::as_select())
            .load(conn)?;
        Ok(rows.into_iter().map(Into::into).collect())
    }

    fn user(&self, id: &Id) -> Result<Option<voting::User>, StoreError> {
        let mut conn = self.connection()?;
        let conn: &mut PgConnection = &mut conn;
        let row = users::table
            .filter(users::id.eq(id.0))
            .select(models::User::as_select())
            .first(conn)
            .optional()?;
        Ok(row.map(Into::into))
    }

    fn add_user(&self, display_name: &str) -> Result<voting::User, StoreError> {
        let mut conn = self.connection()?;
        let conn: &mut PgConnection = &mut conn;
        let row = diesel::insert_into(users::table)
            .values(&models::User { id: Id::new().0, display_name: display_name.to_string() })
            .returning(models::User::as_returning())
            .get_result(conn)?;
        Ok(row.into())
    }

    fn add_question(&self, settings: CreateQuestion) -> Result<(voting::Question, Vec<voting::Choice>), StoreError> {
        let mut conn = self.connection()?;
        let conn: &mut PgConnection = &mut conn;
        let CreateQuestion { question_text, pub_date, choices: choice_texts } = settings;

        conn.transaction::<_, StoreError, _>(|conn| {
            let question = diesel::insert_into(questions::table)
                .values(&models::NewQuestion { question_text: &question_text, pub_date: pub_date.naive_utc() })
                .returning(models::Question::as_returning())
                .get_result(conn)?;

            let new_choices: Vec<models::NewChoice> = choice_texts.iter()
                .map(|text| models::NewChoice { question_id: question.id, choice_text: text })
                .collect();
            let created = if new_choices.is_empty() {
                vec![]
            } else {
                diesel::insert_into(choices::table)
                    .values(&new_choices)
                    .returning(models::Choice::as_returning())
                    .get_results(conn)?
            };

            info!(question = question.id, choices = created.len(), "Created question");
            Ok((question.into(), created.into_iter().map(Into::into).collect()))
        })
    }
}

#[cfg(test)]
mod tests {
    use std::env;
    use std::thread;

    use chrono::Duration;
    use diesel::connection::SimpleConnection;
    use diesel::r2d2::{CustomizeConnection, Error as R2d2Error, TestCustomizer};

    use super::*;

    const CONCURRENCY_SCHEMA: &str = "polls_concurrency";

    fn test_database_url() -> Option<String> {
        match env::var("POLLS_TEST_DATABASE_URL") {
            Ok(url) => Some(url),
            Err(_) => {
                eprintln!("POLLS_TEST_DATABASE_URL not set, skipping");
                None
            },
        }
    }

    /// Pins every pooled connection to a private schema so committed test
    /// data stays out of the tables other tests rebuild.
    #[derive(Debug)]
    struct SearchPath(&'static str);

    impl CustomizeConnection<PgConnection, R2d2Error> for SearchPath {
        fn on_acquire(&self, conn: &mut PgConnection) -> Result<(), R2d2Error> {
            conn.batch_execute(&format!("SET search_path TO {}", self.0))
                .map_err(R2d2Error::QueryError)
        }
    }

    #[test]
    fn like_pattern_escapes_wildcards() {
        assert_eq!(like_pattern("old"), "%old%");
        assert_eq!(like_pattern("100%_sure\\"), "%100\\%\\_sure\\\\%");
    }

    /// Store on a single connection whose work is rolled back when dropped.
    /// Runs only when `POLLS_TEST_DATABASE_URL` is set.
    fn test_store() -> Option<PgStore> {
        let url = test_database_url()?;
        let pool = Pool::builder()
            .max_size(1)
            .connection_customizer(Box::new(TestCustomizer))
            .build(ConnectionManager::<PgConnection>::new(url))
            .expect("test pool");

        let mut conn = pool.get().expect("test connection");
        conn.batch_execute(include_str!("../../migrations/2024-09-01-000000_create_polls/down.sql"))
            .expect("drop tables");
        conn.batch_execute(include_str!("../../migrations/2024-09-01-000000_create_polls/up.sql"))
            .expect("create tables");
        drop(conn);

        Some(PgStore::new(pool))
    }

    fn create_question(store: &PgStore, text: &str, days: i64, choices: &[&str]) -> (voting::Question, Vec<voting::Choice>) {
        let settings = CreateQuestion::new(text, Utc::now() + Duration::days(days), choices).unwrap();
        store.add_question(settings).unwrap()
    }

    fn counts(store: &PgStore, question_id: WeakId) -> Vec<i32> {
        store.choices(question_id).unwrap().iter().map(|c| c.votes).collect()
    }

    #[test]
    fn listing_hides_future_questions() {
        let Some(store) = test_store() else { return };
        for day in 1..=6 {
            create_question(&store, &format!("Past {day}"), -day, &[]);
        }
        let (future, _) = create_question(&store, "Future", 1, &[]);

        let latest = store.latest_questions(Utc::now(), 5).unwrap();
        let texts: Vec<&str> = latest.iter().map(|q| q.question_text.as_str()).collect();
        assert_eq!(texts, vec!["Past 1", "Past 2", "Past 3", "Past 4", "Past 5"]);
        assert_eq!(store.published_question(future.id, Utc::now()).unwrap(), None);
    }

    #[test]
    fn repeat_vote_repoints_and_moves_count() {
        let Some(store) = test_store() else { return };
        let user = store.add_user("alice").unwrap();
        let (question, choices) = create_question(&store, "Cats or dogs?", 0, &["Cats", "Dogs"]);

        let first = Ballot { question_id: question.id, choice_id: choices[0].id };
        store.cast_vote(&user.id, &first).unwrap();
        assert_eq!(counts(&store, question.id), vec![1, 0]);

        let second = Ballot { question_id: question.id, choice_id: choices[1].id };
        let change = store.cast_vote(&user.id, &second).unwrap();
        assert_eq!(change, VoteChange::Moved { from: choices[0].id, to: choices[1].id });
        assert_eq!(counts(&store, question.id), vec![0, 1]);
        assert_eq!(store.vote_count(question.id).unwrap(), Some(1));
        assert_eq!(store.prior_vote(&user.id, question.id).unwrap().unwrap().choice_id, choices[1].id);
    }

    #[test]
    fn foreign_choice_rolls_back() {
        let Some(store) = test_store() else { return };
        let user = store.add_user("bob").unwrap();
        let (question, _) = create_question(&store, "First?", 0, &["A"]);
        let (_, other) = create_question(&store, "Second?", 0, &["B"]);

        let ballot = Ballot { question_id: question.id, choice_id: other[0].id };
        assert!(store.cast_vote(&user.id, &ballot).is_err());
        assert_eq!(store.prior_vote(&user.id, question.id).unwrap(), None);
        assert_eq!(store.vote_count(question.id).unwrap(), Some(0));
    }

    #[test]
    fn search_treats_wildcards_literally() {
        let Some(store) = test_store() else { return };
        create_question(&store, "Is 100% enough?", 0, &[]);
        create_question(&store, "Is 1000 enough?", 0, &[]);

        let found = store.search_questions("100%").unwrap();
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].question_text, "Is 100% enough?");
        assert_eq!(store.search_questions("enough").unwrap().len(), 2);
        assert!(store.search_questions("ENOUGH").unwrap().is_empty());
    }

    #[test]
    fn vote_count_of_unknown_question() {
        let Some(store) = test_store() else { return };
        assert_eq!(store.vote_count(WeakId(i32::MAX)).unwrap(), None);
    }

    #[test]
    fn concurrent_ballots_lose_no_counts() {
        let Some(url) = test_database_url() else { return };
        let mut setup = PgConnection::establish(&url).expect("setup connection");
        setup.batch_execute(&format!(
            "DROP SCHEMA IF EXISTS {CONCURRENCY_SCHEMA} CASCADE; CREATE SCHEMA {CONCURRENCY_SCHEMA}; SET search_path TO {CONCURRENCY_SCHEMA};"
        )).expect("create schema");
        setup.batch_execute(include_str!("../../migrations/2024-09-01-000000_create_polls/up.sql"))
            .expect("create tables");

        let pool = Pool::builder()
            .max_size(8)
            .connection_customizer(Box::new(SearchPath(CONCURRENCY_SCHEMA)))
            .build(ConnectionManager::<PgConnection>::new(url))
            .expect("test pool");
        let store = PgStore::new(pool);
        let (question, choices) = create_question(&store, "Cats or dogs?", 0, &["Cats", "Dogs"]);
        let voters: i32 = 32;

        thread::scope(|scope| {
            for i in 0..voters {
                let (store, question, choices) = (&store, &question, &choices);
                scope.spawn(move || {
                    let user = store.add_user(&format!("voter {i}")).unwrap();
                    for choice in choices {
                        let ballot = Ballot { question_id: question.id, choice_id: choice.id };
                        store.cast_vote(&user.id, &ballot).unwrap();
                    }
                });
            }
        });

        assert_eq!(counts(&store, question.id), vec![0, voters]);
        assert_eq!(store.vote_count(question.id).unwrap(), Some(voters as i64));

        setup.batch_execute(&format!("DROP SCHEMA {CONCURRENCY_SCHEMA} CASCADE"))
            .expect("drop schema");
    }
}

//! Storage backends for questions and choices.
//!
//! Handlers only ever see a [`Polls`] handle from managed state, so the same
//! routes run against MongoDB in production and against memory in tests or
//! when no database is configured.

use std::sync::Arc;

use chrono::{DateTime, Utc};

use crate::error::Result;
use crate::model::{
    common::{ChoiceId, QuestionId},
    db::{Choice, NewChoice, NewQuestion, Question},
};

mod memory;
mod mongo;

pub use memory::MemoryStore;
pub use mongo::MongoStore;

/// Shared handle on whichever store the server was built with.
pub type Polls = Arc<dyn PollStore>;

/// Queries and updates over questions and their choices.
#[rocket::async_trait]
pub trait PollStore: Send + Sync {
    /// Short name of the backend, for logging.
    fn backend(&self) -> &'static str;

    /// Up to `limit` questions published at or before `now`, newest first.
    /// Questions published at the same instant come out in descending ID order.
    async fn latest_questions(&self, now: DateTime<Utc>, limit: usize) -> Result<Vec<Question>>;

    /// The question with this ID, unless it is unknown or not yet published at `now`.
    async fn published_question(
        &self,
        id: QuestionId,
        now: DateTime<Utc>,
    ) -> Result<Option<Question>>;

    /// The question with this ID regardless of its publication date.
    async fn question(&self, id: QuestionId) -> Result<Option<Question>>;

    /// Every choice of a question, in ascending ID order.
    async fn choices(&self, question_id: QuestionId) -> Result<Vec<Choice>>;

    /// Add one vote to `choice_id`, but only if it belongs to `question_id`.
    /// Returns whether a vote was recorded.
    async fn record_vote(&self, question_id: QuestionId, choice_id: ChoiceId) -> Result<bool>;

    /// Store a new question under a freshly allocated ID.
    async fn create_question(&self, question: NewQuestion) -> Result<Question>;

    /// Store a new choice under a freshly allocated ID.
    /// Fails with `NotFound` if the owning question does not exist.
    async fn add_choice(&self, choice: NewChoice) -> Result<Choice>;

    /// Delete a question together with all of its choices.
    /// Returns whether the question existed.
    async fn delete_question(&self, id: QuestionId) -> Result<bool>;
}

#[cfg(test)]
mod tests {
    use chrono::Duration;
    use rocket::tokio;

    use super::*;
    use crate::error::Error;

    async fn question_in_days(polls: &Polls, text: &str, days: i64) -> Question {
        polls
            .create_question(NewQuestion::example_in_days(text, days))
            .await
            .unwrap()
    }

    #[backend_test]
    async fn ids_are_allocated_from_one(polls: Polls) {
        let first = polls.create_question(NewQuestion::example()).await.unwrap();
        let second = polls.create_question(NewQuestion::example()).await.unwrap();
        assert_eq!(first.id, 1);
        assert_eq!(second.id, 2);

        let choice = polls.add_choice(NewChoice::new(second.id, "Yes")).await.unwrap();
        assert_eq!(choice.id, 1);
        assert_eq!(choice.votes, 0);
        assert_eq!(choice.question_id, second.id);
    }

    #[backend_test]
    async fn latest_questions_are_published_newest_first(polls: Polls) {
        let old = question_in_days(&polls, "Old", -10).await;
        let future = question_in_days(&polls, "Future", 3).await;
        let recent = question_in_days(&polls, "Recent", -1).await;

        let latest = polls.latest_questions(Utc::now(), 5).await.unwrap();
        let ids = latest.iter().map(|q| q.id).collect::<Vec<_>>();
        assert_eq!(ids, vec![recent.id, old.id]);
        assert!(!ids.contains(&future.id));
    }

    #[backend_test]
    async fn latest_questions_respects_limit(polls: Polls) {
        for days in 1..=7 {
            question_in_days(&polls, &format!("{days} days ago"), -days).await;
        }

        let latest = polls.latest_questions(Utc::now(), 5).await.unwrap();
        assert_eq!(latest.len(), 5);
        assert!(latest
            .windows(2)
            .all(|pair| pair[0].pub_date >= pair[1].pub_date));
        assert_eq!(latest[0].text, "1 days ago");
        assert_eq!(latest[4].text, "5 days ago");
    }

    #[backend_test]
    async fn latest_questions_break_ties_by_newest_id(polls: Polls) {
        let pub_date = Utc::now() - Duration::hours(3);
        let a = polls
            .create_question(NewQuestion::new("A", pub_date))
            .await
            .unwrap();
        let b = polls
            .create_question(NewQuestion::new("B", pub_date))
            .await
            .unwrap();
        assert_eq!(a.pub_date, b.pub_date);

        let latest = polls.latest_questions(Utc::now(), 5).await.unwrap();
        let ids = latest.iter().map(|q| q.id).collect::<Vec<_>>();
        assert_eq!(ids, vec![b.id, a.id]);
    }

    #[backend_test]
    async fn published_question_hides_the_future(polls: Polls) {
        let past = question_in_days(&polls, "Past", -1).await;
        let future = question_in_days(&polls, "Future", 1).await;
        let now = Utc::now();

        assert_eq!(polls.published_question(past.id, now).await.unwrap(), Some(past));
        assert_eq!(polls.published_question(future.id, now).await.unwrap(), None);
        assert_eq!(polls.published_question(999, now).await.unwrap(), None);

        // Unfiltered lookup still finds it.
        assert_eq!(polls.question(future.id).await.unwrap(), Some(future.clone()));
        // And it shows up once its time has come.
        let later = now + Duration::days(2);
        assert_eq!(
            polls.published_question(future.id, later).await.unwrap(),
            Some(future)
        );
    }

    #[backend_test]
    async fn votes_only_land_on_the_owning_question(polls: Polls) {
        let first = question_in_days(&polls, "First", -1).await;
        let second = question_in_days(&polls, "Second", -1).await;
        let a = polls.add_choice(NewChoice::new(first.id, "A")).await.unwrap();
        let b = polls.add_choice(NewChoice::new(first.id, "B")).await.unwrap();
        let other = polls.add_choice(NewChoice::new(second.id, "C")).await.unwrap();

        assert!(polls.record_vote(first.id, a.id).await.unwrap());
        assert!(polls.record_vote(first.id, a.id).await.unwrap());
        assert!(!polls.record_vote(first.id, other.id).await.unwrap());
        assert!(!polls.record_vote(first.id, 999).await.unwrap());

        let choices = polls.choices(first.id).await.unwrap();
        let tallies = choices.iter().map(|c| (c.id, c.votes)).collect::<Vec<_>>();
        assert_eq!(tallies, vec![(a.id, 2), (b.id, 0)]);
        let others = polls.choices(second.id).await.unwrap();
        assert_eq!(others[0].votes, 0);
    }

    #[backend_test]
    async fn choices_need_an_existing_question(polls: Polls) {
        let result = polls.add_choice(NewChoice::new(42, "Orphan")).await;
        assert!(matches!(result, Err(Error::NotFound(_))));
    }

    #[backend_test]
    async fn deleting_a_question_deletes_its_choices(polls: Polls) {
        let doomed = question_in_days(&polls, "Doomed", -1).await;
        let survivor = question_in_days(&polls, "Survivor", -1).await;
        polls.add_choice(NewChoice::new(doomed.id, "A")).await.unwrap();
        polls.add_choice(NewChoice::new(doomed.id, "B")).await.unwrap();
        polls.add_choice(NewChoice::new(survivor.id, "C")).await.unwrap();

        assert!(polls.delete_question(doomed.id).await.unwrap());
        assert!(!polls.delete_question(doomed.id).await.unwrap());

        assert_eq!(polls.question(doomed.id).await.unwrap(), None);
        assert!(polls.choices(doomed.id).await.unwrap().is_empty());
        assert_eq!(polls.choices(survivor.id).await.unwrap().len(), 1);
    }

    #[rocket::async_test]
    async fn concurrent_votes_are_all_counted_in_memory() {
        let polls: Polls = Arc::new(MemoryStore::new());
        let question = question_in_days(&polls, "Busy", -1).await;
        let choice = polls
            .add_choice(NewChoice::new(question.id, "Popular"))
            .await
            .unwrap();

        let (question_id, choice_id) = (question.id, choice.id);
        let handles = (0..50)
            .map(|_| {
                let polls = polls.clone();
                tokio::spawn(async move { polls.record_vote(question_id, choice_id).await })
            })
            .collect::<Vec<_>>();
        for handle in handles {
            assert!(handle.await.unwrap().unwrap());
        }

        assert_eq!(polls.choices(question.id).await.unwrap()[0].votes, 50);
    }
}

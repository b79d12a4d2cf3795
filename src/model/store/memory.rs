use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use rocket::tokio::sync::RwLock;

use crate::error::{Error, Result};
use crate::model::{
    common::{ChoiceId, QuestionId},
    db::{Choice, NewChoice, NewQuestion, Question},
};

use super::PollStore;

/// A store that lives and dies with the process.
#[derive(Debug, Default)]
pub struct MemoryStore {
    state: RwLock<MemoryState>,
}

#[derive(Debug, Default)]
struct MemoryState {
    questions: BTreeMap<QuestionId, Question>,
    choices: BTreeMap<ChoiceId, Choice>,
    last_question_id: QuestionId,
    last_choice_id: ChoiceId,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[rocket::async_trait]
impl PollStore for MemoryStore {
    fn backend(&self) -> &'static str {
        "memory"
    }

    async fn latest_questions(&self, now: DateTime<Utc>, limit: usize) -> Result<Vec<Question>> {
        let state = self.state.read().await;
        let mut published = state
            .questions
            .values()
            .filter(|question| question.is_published(now))
            .cloned()
            .collect::<Vec<_>>();
        published.sort_by(|a, b| b.pub_date.cmp(&a.pub_date).then(b.id.cmp(&a.id)));
        published.truncate(limit);
        Ok(published)
    }

    async fn published_question(
        &self,
        id: QuestionId,
        now: DateTime<Utc>,
    ) -> Result<Option<Question>> {
        let state = self.state.read().await;
        Ok(state
            .questions
            .get(&id)
            .filter(|question| question.is_published(now))
            .cloned())
    }

    async fn question(&self, id: QuestionId) -> Result<Option<Question>> {
        Ok(self.state.read().await.questions.get(&id).cloned())
    }

    async fn choices(&self, question_id: QuestionId) -> Result<Vec<Choice>> {
        let state = self.state.read().await;
        // `BTreeMap` iteration is already in ID order.
        Ok(state
            .choices
            .values()
            .filter(|choice| choice.question_id == question_id)
            .cloned()
            .collect())
    }

    async fn record_vote(&self, question_id: QuestionId, choice_id: ChoiceId) -> Result<bool> {
        let mut state = self.state.write().await;
        match state.choices.get_mut(&choice_id) {
            Some(choice) if choice.question_id == question_id => {
                choice.votes += 1;
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    async fn create_question(&self, question: NewQuestion) -> Result<Question> {
        let mut state = self.state.write().await;
        state.last_question_id += 1;
        let question = Question::from_new(state.last_question_id, question);
        state.questions.insert(question.id, question.clone());
        Ok(question)
    }

    async fn add_choice(&self, choice: NewChoice) -> Result<Choice> {
        let mut state = self.state.write().await;
        if !state.questions.contains_key(&choice.question_id) {
            return Err(Error::not_found(format!(
                "Question with ID '{}'",
                choice.question_id
            )));
        }
        state.last_choice_id += 1;
        let choice = Choice::from_new(state.last_choice_id, choice);
        state.choices.insert(choice.id, choice.clone());
        Ok(choice)
    }

    async fn delete_question(&self, id: QuestionId) -> Result<bool> {
        let mut state = self.state.write().await;
        if state.questions.remove(&id).is_none() {
            return Ok(false);
        }
        state.choices.retain(|_, choice| choice.question_id != id);
        Ok(true)
    }
}

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

use crate::model::{
    common::{ChoiceId, QuestionId},
    db::{Choice, Question},
};

/// One entry in the list of latest questions.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QuestionSummary {
    /// Question unique ID.
    pub id: QuestionId,
    /// Question text.
    pub text: String,
    /// Publication time.
    pub pub_date: DateTime<Utc>,
    /// Whether this was published within the configured recency window.
    pub published_recently: bool,
}

impl QuestionSummary {
    pub fn new(question: Question, now: DateTime<Utc>, recent_window: Duration) -> Self {
        let published_recently = question.was_published_recently(now, recent_window);
        Self {
            id: question.id,
            text: question.question.text,
            pub_date: question.question.pub_date,
            published_recently,
        }
    }
}

/// A choice as offered on the voting page.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChoiceDescription {
    pub id: ChoiceId,
    pub text: String,
}

impl From<Choice> for ChoiceDescription {
    fn from(choice: Choice) -> Self {
        Self {
            id: choice.id,
            text: choice.choice.text,
        }
    }
}

/// The voting page for a single question.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QuestionDetail {
    pub id: QuestionId,
    pub text: String,
    pub pub_date: DateTime<Utc>,
    /// Choices in ascending ID order.
    pub choices: Vec<ChoiceDescription>,
    /// Set when this page is shown again after a rejected vote.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error_message: Option<String>,
}

impl QuestionDetail {
    pub fn new(question: Question, choices: Vec<Choice>) -> Self {
        Self {
            id: question.id,
            text: question.question.text,
            pub_date: question.question.pub_date,
            choices: choices.into_iter().map(Into::into).collect(),
            error_message: None,
        }
    }

    /// Attach a user-visible error to the page.
    pub fn with_error(mut self, message: impl Into<String>) -> Self {
        self.error_message = Some(message.into());
        self
    }
}

/// A choice with its current vote count.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChoiceTally {
    pub id: ChoiceId,
    pub text: String,
    pub votes: u32,
}

impl From<Choice> for ChoiceTally {
    fn from(choice: Choice) -> Self {
        Self {
            id: choice.id,
            text: choice.choice.text,
            votes: choice.choice.votes,
        }
    }
}

/// The results page for a single question.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QuestionResults {
    pub id: QuestionId,
    pub text: String,
    pub pub_date: DateTime<Utc>,
    /// Tallies in ascending choice ID order.
    pub choices: Vec<ChoiceTally>,
}

impl QuestionResults {
    pub fn new(question: Question, choices: Vec<Choice>) -> Self {
        Self {
            id: question.id,
            text: question.question.text,
            pub_date: question.question.pub_date,
            choices: choices.into_iter().map(Into::into).collect(),
        }
    }
}

#[cfg(test)]
impl QuestionResults {
    /// Look up the tally for a choice by its text.
    pub fn votes_for(&self, text: &str) -> Option<u32> {
        self.choices
            .iter()
            .find(|choice| choice.text == text)
            .map(|choice| choice.votes)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use crate::model::db::{NewChoice, NewQuestion};

    #[test]
    fn detail_hides_tallies() {
        let question = Question::from_new(1, NewQuestion::example());
        let mut choice = Choice::from_new(3, NewChoice::new(1, "Not much"));
        choice.votes = 12;

        let detail = QuestionDetail::new(question, vec![choice]);
        let json = rocket::serde::json::serde_json::to_value(&detail).unwrap();
        assert!(json["choices"][0].get("votes").is_none());
        assert!(json.get("error_message").is_none());

        let json =
            rocket::serde::json::serde_json::to_value(detail.with_error("oops")).unwrap();
        assert_eq!(json["error_message"], "oops");
    }

    #[test]
    fn summary_flags_recent_questions() {
        let now = Utc::now();
        let fresh = Question::from_new(1, NewQuestion::new("Fresh", now - Duration::hours(2)));
        let stale = Question::from_new(2, NewQuestion::new("Stale", now - Duration::days(3)));

        assert!(QuestionSummary::new(fresh, now, Duration::days(1)).published_recently);
        assert!(!QuestionSummary::new(stale, now, Duration::days(1)).published_recently);
    }
}

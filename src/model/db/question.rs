use std::ops::{Deref, DerefMut};

use chrono::{DateTime, Duration, Utc};
use mongodb::bson::serde_helpers::chrono_datetime_as_bson_datetime;
use serde::{Deserialize, Serialize};

use crate::model::common::QuestionId;

/// Core question data.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QuestionCore {
    /// The prompt shown to voters.
    pub text: String,
    /// When the question becomes visible. May lie in the future.
    #[serde(with = "chrono_datetime_as_bson_datetime")]
    pub pub_date: DateTime<Utc>,
}

impl QuestionCore {
    pub fn new(text: impl Into<String>, pub_date: DateTime<Utc>) -> Self {
        Self {
            text: text.into(),
            pub_date,
        }
    }

    /// Has this question been published as of `now`?
    pub fn is_published(&self, now: DateTime<Utc>) -> bool {
        self.pub_date <= now
    }

    /// Was this question published within `window` before `now`?
    /// Questions dated in the future never count as recent.
    pub fn was_published_recently(&self, now: DateTime<Utc>, window: Duration) -> bool {
        // A window reaching past the earliest representable time covers everything.
        let recent = now
            .checked_sub_signed(window)
            .map_or(true, |start| start <= self.pub_date);
        recent && self.is_published(now)
    }
}

/// A question without an ID.
pub type NewQuestion = QuestionCore;

/// A question from the database, with its unique ID.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Question {
    #[serde(rename = "_id")]
    pub id: QuestionId,
    #[serde(flatten)]
    pub question: QuestionCore,
}

impl Question {
    /// Attach an allocated ID to a new question.
    pub fn from_new(id: QuestionId, question: NewQuestion) -> Self {
        Self { id, question }
    }
}

impl Deref for Question {
    type Target = QuestionCore;

    fn deref(&self) -> &Self::Target {
        &self.question
    }
}

impl DerefMut for Question {
    fn deref_mut(&mut self) -> &mut Self::Target {
        &mut self.question
    }
}


#[cfg(test)]
mod tests {
    use super::*;

    fn window() -> Duration {
        Duration::days(1)
    }

    #[test]
    fn future_question_is_not_recent() {
        let now = Utc::now();
        let question = NewQuestion::new("Future", now + Duration::days(30));
        assert!(!question.was_published_recently(now, window()));
        assert!(!question.is_published(now));
    }

    #[test]
    fn old_question_is_not_recent() {
        let now = Utc::now();
        let question = NewQuestion::new("Old", now - Duration::days(1) - Duration::seconds(1));
        assert!(!question.was_published_recently(now, window()));
        assert!(question.is_published(now));
    }

    #[test]
    fn question_inside_window_is_recent() {
        let now = Utc::now();
        let question = NewQuestion::new(
            "Recent",
            now - Duration::hours(23) - Duration::minutes(59) - Duration::seconds(59),
        );
        assert!(question.was_published_recently(now, window()));
    }

    #[test]
    fn question_published_exactly_now_is_visible() {
        let now = Utc::now();
        let question = NewQuestion::new("Now", now);
        assert!(question.is_published(now));
        assert!(question.was_published_recently(now, window()));
    }

    #[test]
    fn huge_window_covers_every_past_question() {
        let now = Utc::now();
        let window = Duration::hours(u32::MAX.into());
        let ancient = NewQuestion::new("Ancient", now - Duration::days(365 * 1000));
        assert!(ancient.was_published_recently(now, window));
        let future = NewQuestion::new("Future", now + Duration::days(1));
        assert!(!future.was_published_recently(now, window));
    }

    #[test]
    fn db_round_trip_keeps_pub_date() {
        // BSON datetimes only carry milliseconds.
        let pub_date = DateTime::<Utc>::from_timestamp_millis(1_650_000_000_123).unwrap();
        let question = Question::from_new(4, NewQuestion::new("Round trip", pub_date));
        let doc = mongodb::bson::to_document(&question).unwrap();
        assert!(doc.get_datetime("pub_date").is_ok());
        let back: Question = mongodb::bson::from_document(doc).unwrap();
        assert_eq!(back, question);
    }
}

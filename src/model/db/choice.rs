use std::ops::{Deref, DerefMut};

use serde::{Deserialize, Serialize};

use crate::model::common::{ChoiceId, QuestionId};

/// Core choice data.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChoiceCore {
    /// The question this choice answers. Deleting that question deletes this choice.
    pub question_id: QuestionId,
    pub text: String,
    /// Vote tally. Only ever incremented.
    pub votes: u32,
}

impl ChoiceCore {
    /// A fresh choice with no votes.
    pub fn new(question_id: QuestionId, text: impl Into<String>) -> Self {
        Self {
            question_id,
            text: text.into(),
            votes: 0,
        }
    }
}

/// A choice without an ID.
pub type NewChoice = ChoiceCore;

/// A choice from the database, with its unique ID.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Choice {
    #[serde(rename = "_id")]
    pub id: ChoiceId,
    #[serde(flatten)]
    pub choice: ChoiceCore,
}

impl Choice {
    /// Attach an allocated ID to a new choice.
    pub fn from_new(id: ChoiceId, choice: NewChoice) -> Self {
        Self { id, choice }
    }
}

impl Deref for Choice {
    type Target = ChoiceCore;

    fn deref(&self) -> &Self::Target {
        &self.choice
    }
}

impl DerefMut for Choice {
    fn deref_mut(&mut self) -> &mut Self::Target {
        &mut self.choice
    }
}

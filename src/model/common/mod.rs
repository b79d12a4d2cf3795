//! Types shared between the DB and API representations.

/// Our question IDs are integers.
pub type QuestionId = u32;
/// Our choice IDs are integers.
pub type ChoiceId = u32;

/// The most questions the index will ever list.
pub const LATEST_QUESTIONS_LIMIT: usize = 5;

/// Shown when a vote names no choice, or a choice from another question.
pub const NO_CHOICE_SELECTED: &str = "You didn't select a choice.";

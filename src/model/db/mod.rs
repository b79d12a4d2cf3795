//! DB-compatible (e.g. de/serialisable) types.
//!
//! The types in this module are serialised in an DB-friendly way, e.g.:
//!
//! - Datetimes are serialised in MongoDB's own format.

mod choice;
pub use choice::{Choice, ChoiceCore, NewChoice};

mod question;
pub use question::{NewQuestion, Question, QuestionCore};

//! API-compatible types.
//!
//! The types in this module are serialised in an API-friendly way, e.g.:
//!
//! - Datetimes are serialised as RFC 3339 strings.
//! - Vote tallies only appear on results, never on the voting page.

mod question;
mod vote;

pub use question::{ChoiceDescription, ChoiceTally, QuestionDetail, QuestionResults, QuestionSummary};
pub use vote::VoteForm;

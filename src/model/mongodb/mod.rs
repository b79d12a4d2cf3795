mod collection;
mod counter;

pub use collection::{ensure_indexes_exist, Coll, MongoCollection};
pub use counter::{Counter, CHOICE_ID_COUNTER, QUESTION_ID_COUNTER};

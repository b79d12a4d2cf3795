use rocket::FromForm;

use crate::model::common::ChoiceId;

/// A submitted vote.
///
/// Each `choice` value that fails to parse becomes `None` rather than
/// failing the form, so the handler can show the voting page again.
#[derive(Debug, Clone, PartialEq, Eq, FromForm)]
pub struct VoteForm {
    choice: Vec<Option<ChoiceId>>,
}

impl VoteForm {
    /// The chosen choice. When the field is repeated, the last value wins.
    pub fn choice(&self) -> Option<ChoiceId> {
        self.choice.last().copied().flatten()
    }
}

#[cfg(test)]
mod tests {
    use rocket::form::Form;

    use super::*;

    #[test]
    fn last_choice_wins() {
        let form = Form::<VoteForm>::parse("choice=3&choice=7").unwrap();
        assert_eq!(form.choice(), Some(7));

        let form = Form::<VoteForm>::parse("choice=3&choice=oops").unwrap();
        assert_eq!(form.choice(), None);
    }

    #[test]
    fn missing_choice_is_none() {
        assert_eq!(Form::<VoteForm>::parse("").unwrap().choice(), None);
        assert_eq!(Form::<VoteForm>::parse("choice=").unwrap().choice(), None);
        assert_eq!(Form::<VoteForm>::parse("other=1").unwrap().choice(), None);
    }
}

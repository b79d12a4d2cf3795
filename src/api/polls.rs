use chrono::Utc;
use log::info;
use rocket::{form::Form, response::Redirect, serde::json::Json, Route, State};

use crate::error::{Error, Result};
use crate::logging::RequestId;
use crate::model::{
    api::{QuestionDetail, QuestionResults, QuestionSummary, VoteForm},
    common::{ChoiceId, QuestionId, LATEST_QUESTIONS_LIMIT, NO_CHOICE_SELECTED},
    db::Question,
    store::{PollStore, Polls},
};
use crate::Config;

pub fn routes() -> Vec<Route> {
    routes![index, detail, results, vote]
}

#[get("/polls")]
async fn index(polls: &State<Polls>, config: &State<Config>) -> Result<Json<Vec<QuestionSummary>>> {
    let now = Utc::now();
    let latest = polls
        .latest_questions(now, LATEST_QUESTIONS_LIMIT)
        .await?
        .into_iter()
        .map(|question| QuestionSummary::new(question, now, config.recent_window()))
        .collect();
    Ok(Json(latest))
}

#[get("/polls/<question_id>")]
async fn detail(question_id: QuestionId, polls: &State<Polls>) -> Result<Json<QuestionDetail>> {
    let question = polls
        .published_question(question_id, Utc::now())
        .await?
        .ok_or_else(|| Error::not_found(format!("Published question with ID '{}'", question_id)))?;
    let choices = polls.choices(question_id).await?;
    Ok(Json(QuestionDetail::new(question, choices)))
}

/// Unlike the detail page, results are shown whether or not the question is published yet.
#[get("/polls/<question_id>/results")]
async fn results(question_id: QuestionId, polls: &State<Polls>) -> Result<Json<QuestionResults>> {
    let question = question_by_id(question_id, polls.inner()).await?;
    let choices = polls.choices(question_id).await?;
    Ok(Json(QuestionResults::new(question, choices)))
}

/// What the client sees after submitting a vote.
#[derive(Debug, Responder)]
enum VoteResponse {
    /// The vote counted; go and look at the results.
    Recorded(Redirect),
    /// The vote was rejected; here is the voting page again, with an error.
    Rejected(Json<QuestionDetail>),
}

#[post("/polls/<question_id>/vote", data = "<form>")]
async fn vote(
    question_id: QuestionId,
    form: Option<Form<VoteForm>>,
    polls: &State<Polls>,
    request_id: &RequestId,
) -> Result<VoteResponse> {
    let question = question_by_id(question_id, polls.inner()).await?;

    // A body that isn't a form at all is treated like a form without a choice.
    let choice = form.and_then(|form| form.choice());
    match record_vote(&question, choice, polls.inner().as_ref()).await {
        Ok(()) => Ok(VoteResponse::Recorded(Redirect::found(uri!(results(
            question_id
        ))))),
        Err(Error::InvalidVote(reason)) => {
            info!("req{request_id} rejected vote on question {question_id}: {reason}");
            let choices = polls.choices(question_id).await?;
            let page = QuestionDetail::new(question, choices).with_error(NO_CHOICE_SELECTED);
            Ok(VoteResponse::Rejected(Json(page)))
        }
        Err(err) => Err(err),
    }
}

/// Look a question up by ID alone, failing with `NotFound`.
async fn question_by_id(question_id: QuestionId, polls: &Polls) -> Result<Question> {
    polls
        .question(question_id)
        .await?
        .ok_or_else(|| Error::not_found(format!("Question with ID '{}'", question_id)))
}

/// Add one vote for `choice` on `question`.
///
/// Fails with `InvalidVote`, changing nothing, if no choice was given or the
/// choice belongs to some other question.
async fn record_vote(
    question: &Question,
    choice: Option<ChoiceId>,
    polls: &dyn PollStore,
) -> Result<()> {
    let choice_id = choice.ok_or_else(|| Error::invalid_vote("no choice submitted"))?;
    if !polls.record_vote(question.id, choice_id).await? {
        return Err(Error::invalid_vote(format!(
            "choice '{}' does not belong to question '{}'",
            choice_id, question.id
        )));
    }
    info!("Recorded vote for choice {choice_id} on question {}", question.id);
    Ok(())
}

use chrono::{DateTime, Utc};
use log::debug;
use mongodb::{
    bson::{doc, DateTime as BsonDateTime},
    options::FindOptions,
    Client, Database,
};
use rocket::futures::TryStreamExt;

use crate::error::{Error, Result};
use crate::model::{
    common::{ChoiceId, QuestionId},
    db::{Choice, NewChoice, NewQuestion, Question},
    mongodb::{ensure_indexes_exist, Coll, Counter, CHOICE_ID_COUNTER, QUESTION_ID_COUNTER},
};

use super::PollStore;

/// A store backed by the `questions`, `choices` and `counters` collections.
pub struct MongoStore {
    client: Client,
    db: Database,
    questions: Coll<Question>,
    choices: Coll<Choice>,
    counters: Coll<Counter>,
}

impl MongoStore {
    /// Connect to the deployment at `uri` and make sure `db_name` is ready for use.
    pub async fn connect(uri: &str, db_name: &str) -> Result<Self> {
        let client = Client::with_uri_str(uri).await?;
        let db = client.database(db_name);
        ensure_indexes_exist(&db).await?;
        Ok(Self::from_db(client, db))
    }

    pub fn from_db(client: Client, db: Database) -> Self {
        Self {
            questions: Coll::from_db(&db),
            choices: Coll::from_db(&db),
            counters: Coll::from_db(&db),
            client,
            db,
        }
    }

    /// The database this store reads and writes.
    pub fn database(&self) -> &Database {
        &self.db
    }
}

#[rocket::async_trait]
impl PollStore for MongoStore {
    fn backend(&self) -> &'static str {
        "mongodb"
    }

    async fn latest_questions(&self, now: DateTime<Utc>, limit: usize) -> Result<Vec<Question>> {
        let filter = doc! {
            "pub_date": { "$lte": now },
        };
        let options = FindOptions::builder()
            .sort(doc! {"pub_date": -1, "_id": -1})
            .limit(i64::try_from(limit).unwrap_or(i64::MAX))
            .build();
        let latest = self
            .questions
            .find(filter, options)
            .await?
            .try_collect::<Vec<_>>()
            .await?;
        Ok(latest)
    }

    async fn published_question(
        &self,
        id: QuestionId,
        now: DateTime<Utc>,
    ) -> Result<Option<Question>> {
        let filter = doc! {
            "_id": id,
            "pub_date": { "$lte": now },
        };
        Ok(self.questions.find_one(filter, None).await?)
    }

    async fn question(&self, id: QuestionId) -> Result<Option<Question>> {
        Ok(self.questions.find_one(doc! {"_id": id}, None).await?)
    }

    async fn choices(&self, question_id: QuestionId) -> Result<Vec<Choice>> {
        let options = FindOptions::builder().sort(doc! {"_id": 1}).build();
        let choices = self
            .choices
            .find(doc! {"question_id": question_id}, options)
            .await?
            .try_collect::<Vec<_>>()
            .await?;
        Ok(choices)
    }

    async fn record_vote(&self, question_id: QuestionId, choice_id: ChoiceId) -> Result<bool> {
        // Matching on the owner as well rejects choices from other questions.
        let filter = doc! {
            "_id": choice_id,
            "question_id": question_id,
        };
        let update = doc! {
            "$inc": { "votes": 1 },
        };
        let result = self.choices.update_one(filter, update, None).await?;
        Ok(result.matched_count == 1)
    }

    async fn create_question(&self, mut question: NewQuestion) -> Result<Question> {
        // Round to what the database can hold, so the caller sees what a read would.
        question.pub_date = BsonDateTime::from_chrono(question.pub_date).to_chrono();
        let id = Counter::next(&self.counters, QUESTION_ID_COUNTER).await?;
        let question = Question::from_new(id, question);
        self.questions.insert_one(&question, None).await?;
        debug!("Created question {id}");
        Ok(question)
    }

    async fn add_choice(&self, choice: NewChoice) -> Result<Choice> {
        if self.question(choice.question_id).await?.is_none() {
            return Err(Error::not_found(format!(
                "Question with ID '{}'",
                choice.question_id
            )));
        }
        let id = Counter::next(&self.counters, CHOICE_ID_COUNTER).await?;
        let choice = Choice::from_new(id, choice);
        self.choices.insert_one(&choice, None).await?;
        debug!("Created choice {id} for question {}", choice.question_id);
        Ok(choice)
    }

    async fn delete_question(&self, id: QuestionId) -> Result<bool> {
        let mut session = self.client.start_session(None).await?;
        session.start_transaction(None).await?;

        let choices = self
            .choices
            .delete_many_with_session(doc! {"question_id": id}, None, &mut session)
            .await?;
        let questions = self
            .questions
            .delete_one_with_session(doc! {"_id": id}, None, &mut session)
            .await?;

        session.commit_transaction().await?;
        debug!(
            "Deleted question {id} and {} choice(s)",
            choices.deleted_count
        );
        Ok(questions.deleted_count == 1)
    }
}

//! [`QuizStore`] on MongoDB collections.

use std::{collections::HashSet, sync::Arc};

use futures::{TryStreamExt, future::BoxFuture};
use mongodb::{
    Client, Collection, Database, IndexModel,
    bson::{Document, doc},
    error::{Error as MongoError, ErrorKind, WriteFailure},
    options::IndexOptions,
};
use serde::{Serialize, de::DeserializeOwned};
use tokio::sync::RwLock;
use tracing::{debug, info};
use uuid::Uuid;

use super::{
    config::MongoConfig,
    connection::establish_connection,
    error::{MongoDaoError, MongoResult},
    models::{
        ANSWER_COLLECTION, AnswerDocument, QUESTION_COLLECTION, QuestionDocument,
        ROUND_COLLECTION, ROUND_QUESTION_COLLECTION, RoundDocument, RoundQuestionDocument,
        SESSION_COLLECTION, SessionDocument, THEME_COLLECTION, THEME_ROUND_COLLECTION,
        ThemeDocument, ThemeRoundDocument, bson_id,
    },
};
use crate::dao::{
    models::{
        AnswerEntity, AnswerStatus, ChatId, QuestionEntity, RoundEntity, RoundQuestionEntity,
        RoundQuestionStatus, RoundStatus, SessionEntity, SessionStatus, ThemeEntity,
        ThemeRoundEntity,
    },
    quiz_store::QuizStore,
    storage::StorageResult,
};

const DUPLICATE_KEY_CODE: i32 = 11000;
const ACTIVE: &str = "active";
const SAMPLE_ATTEMPTS: usize = 3;

/// MongoDB-backed [`QuizStore`] implementation.
///
/// "One active row per owner" rules are partial unique indexes filtered on `status: "active"`,
/// so concurrent inserts from several server instances still resolve to a single winner.
#[derive(Clone)]
pub struct MongoQuizStore {
    inner: Arc<MongoInner>,
}

struct MongoInner {
    state: RwLock<MongoState>,
    config: MongoConfig,
}

struct MongoState {
    // Kept so the connection pool lives as long as the database handle.
    #[allow(dead_code)]
    client: Client,
    database: Database,
}

impl MongoInner {
    async fn ping(&self) -> MongoResult<()> {
        let database = {
            let guard = self.state.read().await;
            guard.database.clone()
        };

        database
            .run_command(doc! { "ping": 1 })
            .await
            .map_err(|source| MongoDaoError::HealthPing { source })?;
        Ok(())
    }

    async fn reconnect(&self) -> MongoResult<()> {
        let (client, database) =
            establish_connection(&self.config.options, &self.config.database_name).await?;
        let mut guard = self.state.write().await;
        guard.client = client;
        guard.database = database;
        Ok(())
    }
}

/// Aggregation drawing `size` random documents, with `$sample` first when nothing is filtered.
fn sample_pipeline(filter: Document, size: usize) -> Vec<Document> {
    let mut pipeline = Vec::with_capacity(2);
    if !filter.is_empty() {
        pipeline.push(doc! { "$match": filter });
    }
    pipeline.push(doc! { "$sample": { "size": size as i64 } });
    pipeline
}

fn push_distinct(
    themes: &mut Vec<ThemeEntity>,
    seen: &mut HashSet<Uuid>,
    drawn: impl IntoIterator<Item = ThemeEntity>,
) {
    themes.extend(drawn.into_iter().filter(|theme| seen.insert(theme.id)));
}

fn is_duplicate_key(err: &MongoError) -> bool {
    matches!(
        err.kind.as_ref(),
        ErrorKind::Write(WriteFailure::WriteError(write)) if write.code == DUPLICATE_KEY_CODE
    )
}

impl MongoQuizStore {
    /// Establish a connection to MongoDB and ensure indexes are present.
    pub async fn connect(config: MongoConfig) -> MongoResult<Self> {
        let (client, database) =
            establish_connection(&config.options, &config.database_name).await?;
        info!(database = %config.database_name, "connected to MongoDB");

        let inner = Arc::new(MongoInner {
            state: RwLock::new(MongoState { client, database }),
            config,
        });

        let store = Self { inner };
        store.ensure_indexes().await?;
        Ok(store)
    }

    async fn ensure_indexes(&self) -> MongoResult<()> {
        let database = self.database().await;

        let active_unique = [
            (SESSION_COLLECTION, "chat_id", "session_active_chat_idx"),
            (ROUND_COLLECTION, "session_id", "round_active_session_idx"),
            (
                ROUND_QUESTION_COLLECTION,
                "round_id",
                "round_question_active_round_idx",
            ),
        ];
        for (collection, key, name) in active_unique {
            let mut keys = Document::new();
            keys.insert(key, 1);
            let index = IndexModel::builder()
                .keys(keys)
                .options(
                    IndexOptions::builder()
                        .name(Some(name.to_owned()))
                        .unique(Some(true))
                        .partial_filter_expression(Some(doc! { "status": ACTIVE }))
                        .build(),
                )
                .build();
            database
                .collection::<Document>(collection)
                .create_index(index)
                .await
                .map_err(|source| MongoDaoError::EnsureIndex {
                    collection,
                    index: name,
                    source,
                })?;
        }

        let lookups = [
            (THEME_ROUND_COLLECTION, doc! { "round_id": 1, "position": 1 }, "theme_round_idx"),
            (QUESTION_COLLECTION, doc! { "theme_id": 1, "score": 1 }, "question_cell_idx"),
            (ANSWER_COLLECTION, doc! { "rq_id": 1, "created_at": 1 }, "answer_rq_idx"),
        ];
        for (collection, keys, name) in lookups {
            let index = IndexModel::builder()
                .keys(keys)
                .options(IndexOptions::builder().name(Some(name.to_owned())).build())
                .build();
            database
                .collection::<Document>(collection)
                .create_index(index)
                .await
                .map_err(|source| MongoDaoError::EnsureIndex {
                    collection,
                    index: name,
                    source,
                })?;
        }

        Ok(())
    }

    async fn database(&self) -> Database {
        let guard = self.inner.state.read().await;
        guard.database.clone()
    }

    async fn collection<T: Send + Sync>(&self, name: &str) -> Collection<T> {
        let guard = self.inner.state.read().await;
        guard.database.collection::<T>(name)
    }

    async fn insert<T>(&self, name: &'static str, id: Uuid, document: T) -> MongoResult<()>
    where
        T: Serialize + Send + Sync,
    {
        self.collection::<T>(name)
            .await
            .insert_one(document)
            .await
            .map_err(|source| MongoDaoError::Insert {
                collection: name,
                id,
                source,
            })?;
        Ok(())
    }

    /// Insert an "active" row, translating a unique-index hit into [`MongoDaoError::DuplicateActive`].
    async fn insert_active<T>(
        &self,
        name: &'static str,
        id: Uuid,
        owner: String,
        document: T,
    ) -> MongoResult<()>
    where
        T: Serialize + Send + Sync,
    {
        match self.collection::<T>(name).await.insert_one(document).await {
            Ok(_) => Ok(()),
            Err(err) if is_duplicate_key(&err) => Err(MongoDaoError::DuplicateActive {
                collection: name,
                owner,
            }),
            Err(source) => Err(MongoDaoError::Insert {
                collection: name,
                id,
                source,
            }),
        }
    }

    async fn find_one<T>(&self, name: &'static str, filter: Document) -> MongoResult<Option<T>>
    where
        T: DeserializeOwned + Send + Sync,
    {
        self.collection::<T>(name)
            .await
            .find_one(filter)
            .await
            .map_err(|source| MongoDaoError::Query {
                collection: name,
                source,
            })
    }

    async fn find_all<T>(
        &self,
        name: &'static str,
        filter: Document,
        sort: Option<Document>,
    ) -> MongoResult<Vec<T>>
    where
        T: DeserializeOwned + Unpin + Send + Sync,
    {
        let collection = self.collection::<T>(name).await;
        let mut action = collection.find(filter);
        if let Some(sort) = sort {
            action = action.sort(sort);
        }

        action
            .await
            .map_err(|source| MongoDaoError::Query {
                collection: name,
                source,
            })?
            .try_collect()
            .await
            .map_err(|source| MongoDaoError::Query {
                collection: name,
                source,
            })
    }

    /// Draw up to `size` documents matching `filter` through `$sample`.
    /// `$sample` draw of up to `size` documents matching `filter`.
    ///
    /// An empty filter puts `$sample` first so the server can use its random cursor. That
    /// cursor may repeat documents on large collections, so callers needing distinct rows
    /// dedupe the result.
    async fn sample<T>(&self, name: &'static str, filter: Document, size: usize) -> MongoResult<Vec<T>>
    where
        T: DeserializeOwned + Unpin + Send + Sync,
    {
        self.collection::<Document>(name)
            .await
            .aggregate(sample_pipeline(filter, size))
            .with_type::<T>()
            .await
            .map_err(|source| MongoDaoError::Query {
                collection: name,
                source,
            })?
            .try_collect()
            .await
            .map_err(|source| MongoDaoError::Query {
                collection: name,
                source,
            })
    }

    /// Up to `limit` distinct themes, re-sampling when the random cursor hands back duplicates.
    async fn random_themes(&self, limit: usize) -> MongoResult<Vec<ThemeEntity>> {
        let mut seen = HashSet::new();
        let mut themes = Vec::with_capacity(limit);
        if limit == 0 {
            return Ok(themes);
        }

        for _ in 0..SAMPLE_ATTEMPTS {
            let missing = limit - themes.len();
            let drawn: Vec<ThemeDocument> = self.sample(THEME_COLLECTION, doc! {}, missing).await?;
            let exhausted = drawn.len() < missing;
            push_distinct(&mut themes, &mut seen, drawn.into_iter().map(ThemeEntity::from));
            if exhausted || themes.len() == limit {
                break;
            }
            debug!(wanted = limit, got = themes.len(), "theme sample returned duplicates");
        }

        Ok(themes)
    }

    async fn compare_and_set_status(
        &self,
        name: &'static str,
        id: Uuid,
        expected: &'static str,
        next: &'static str,
    ) -> MongoResult<bool> {
        let result = self
            .collection::<Document>(name)
            .await
            .update_one(
                doc! { "_id": bson_id(id), "status": expected },
                doc! { "$set": { "status": next } },
            )
            .await
            .map_err(|source| MongoDaoError::Update {
                collection: name,
                id,
                source,
            })?;
        Ok(result.matched_count == 1)
    }

    async fn questions_by_ids(&self, ids: Vec<mongodb::bson::Uuid>) -> MongoResult<Vec<QuestionEntity>> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }
        let documents: Vec<QuestionDocument> = self
            .find_all(QUESTION_COLLECTION, doc! { "_id": { "$in": ids } }, None)
            .await?;
        Ok(documents.into_iter().map(Into::into).collect())
    }

    async fn themes_for_round(&self, round_id: Uuid) -> MongoResult<Vec<ThemeEntity>> {
        let links: Vec<ThemeRoundDocument> = self
            .find_all(
                THEME_ROUND_COLLECTION,
                doc! { "round_id": bson_id(round_id) },
                Some(doc! { "position": 1 }),
            )
            .await?;
        if links.is_empty() {
            return Ok(Vec::new());
        }

        let ids: Vec<_> = links.iter().map(|link| bson_id(link.theme_id())).collect();
        let themes: Vec<ThemeEntity> = self
            .find_all::<ThemeDocument>(THEME_COLLECTION, doc! { "_id": { "$in": ids } }, None)
            .await?
            .into_iter()
            .map(Into::into)
            .collect();

        // Order the themes according to the stored link positions.
        Ok(links
            .iter()
            .filter_map(|link| themes.iter().find(|t| t.id == link.theme_id()).cloned())
            .collect())
    }

    async fn answered_questions(&self, round_id: Uuid) -> MongoResult<Vec<QuestionEntity>> {
        let bindings: Vec<RoundQuestionDocument> = self
            .find_all(
                ROUND_QUESTION_COLLECTION,
                doc! {
                    "round_id": bson_id(round_id),
                    "status": RoundQuestionStatus::Answered.as_str(),
                },
                None,
            )
            .await?;
        let ids = bindings.iter().map(|rq| rq.question_id()).collect();
        self.questions_by_ids(ids).await
    }
}

impl QuizStore for MongoQuizStore {
    fn insert_session(&self, session: SessionEntity) -> BoxFuture<'static, StorageResult<()>> {
        let store = self.clone();
        Box::pin(async move {
            let (id, owner) = (session.id, format!("chat {}", session.chat_id));
            store
                .insert_active(SESSION_COLLECTION, id, owner, SessionDocument::from(session))
                .await
                .map_err(Into::into)
        })
    }

    fn find_active_session(
        &self,
        chat_id: ChatId,
    ) -> BoxFuture<'static, StorageResult<Option<SessionEntity>>> {
        let store = self.clone();
        Box::pin(async move {
            let document: Option<SessionDocument> = store
                .find_one(
                    SESSION_COLLECTION,
                    doc! { "chat_id": chat_id, "status": SessionStatus::Active.as_str() },
                )
                .await?;
            Ok(document.map(Into::into))
        })
    }

    fn update_session_status(
        &self,
        id: Uuid,
        expected: SessionStatus,
        next: SessionStatus,
    ) -> BoxFuture<'static, StorageResult<bool>> {
        let store = self.clone();
        Box::pin(async move {
            store
                .compare_and_set_status(SESSION_COLLECTION, id, expected.as_str(), next.as_str())
                .await
                .map_err(Into::into)
        })
    }

    fn insert_round(&self, round: RoundEntity) -> BoxFuture<'static, StorageResult<()>> {
        let store = self.clone();
        Box::pin(async move {
            let (id, owner) = (round.id, format!("session {}", round.session_id));
            store
                .insert_active(ROUND_COLLECTION, id, owner, RoundDocument::from(round))
                .await
                .map_err(Into::into)
        })
    }

    fn find_round(&self, id: Uuid) -> BoxFuture<'static, StorageResult<Option<RoundEntity>>> {
        let store = self.clone();
        Box::pin(async move {
            let document: Option<RoundDocument> = store
                .find_one(ROUND_COLLECTION, doc! { "_id": bson_id(id) })
                .await?;
            Ok(document.map(Into::into))
        })
    }

    fn find_active_round(
        &self,
        session_id: Uuid,
    ) -> BoxFuture<'static, StorageResult<Option<RoundEntity>>> {
        let store = self.clone();
        Box::pin(async move {
            let document: Option<RoundDocument> = store
                .find_one(
                    ROUND_COLLECTION,
                    doc! {
                        "session_id": bson_id(session_id),
                        "status": RoundStatus::Active.as_str(),
                    },
                )
                .await?;
            Ok(document.map(Into::into))
        })
    }

    fn find_latest_round(
        &self,
        session_id: Uuid,
    ) -> BoxFuture<'static, StorageResult<Option<RoundEntity>>> {
        let store = self.clone();
        Box::pin(async move {
            let document = store
                .collection::<RoundDocument>(ROUND_COLLECTION)
                .await
                .find_one(doc! { "session_id": bson_id(session_id) })
                .sort(doc! { "number": -1 })
                .await
                .map_err(|source| MongoDaoError::Query {
                    collection: ROUND_COLLECTION,
                    source,
                })?;
            Ok(document.map(Into::into))
        })
    }

    fn update_round_status(
        &self,
        id: Uuid,
        expected: RoundStatus,
        next: RoundStatus,
    ) -> BoxFuture<'static, StorageResult<bool>> {
        let store = self.clone();
        Box::pin(async move {
            store
                .compare_and_set_status(ROUND_COLLECTION, id, expected.as_str(), next.as_str())
                .await
                .map_err(Into::into)
        })
    }

    fn insert_theme(&self, theme: ThemeEntity) -> BoxFuture<'static, StorageResult<()>> {
        let store = self.clone();
        Box::pin(async move {
            store
                .insert(THEME_COLLECTION, theme.id, ThemeDocument::from(theme))
                .await
                .map_err(Into::into)
        })
    }

    fn list_themes(&self) -> BoxFuture<'static, StorageResult<Vec<ThemeEntity>>> {
        let store = self.clone();
        Box::pin(async move {
            let documents: Vec<ThemeDocument> = store
                .find_all(THEME_COLLECTION, doc! {}, Some(doc! { "title": 1 }))
                .await?;
            Ok(documents.into_iter().map(Into::into).collect())
        })
    }

    fn random_themes(&self, limit: usize) -> BoxFuture<'static, StorageResult<Vec<ThemeEntity>>> {
        let store = self.clone();
        Box::pin(async move { store.random_themes(limit).await.map_err(Into::into) })
    }

    fn insert_theme_rounds(
        &self,
        links: Vec<ThemeRoundEntity>,
    ) -> BoxFuture<'static, StorageResult<()>> {
        let store = self.clone();
        Box::pin(async move {
            let Some(round_id) = links.first().map(|link| link.round_id) else {
                return Ok(());
            };
            let documents: Vec<ThemeRoundDocument> = links
                .into_iter()
                .enumerate()
                .map(|(position, link)| ThemeRoundDocument::new(link, position as u32))
                .collect();

            store
                .collection::<ThemeRoundDocument>(THEME_ROUND_COLLECTION)
                .await
                .insert_many(documents)
                .await
                .map_err(|source| MongoDaoError::Insert {
                    collection: THEME_ROUND_COLLECTION,
                    id: round_id,
                    source,
                })?;
            Ok(())
        })
    }

    fn themes_for_round(
        &self,
        round_id: Uuid,
    ) -> BoxFuture<'static, StorageResult<Vec<ThemeEntity>>> {
        let store = self.clone();
        Box::pin(async move { store.themes_for_round(round_id).await.map_err(Into::into) })
    }

    fn insert_question(&self, question: QuestionEntity) -> BoxFuture<'static, StorageResult<()>> {
        let store = self.clone();
        Box::pin(async move {
            store
                .insert(QUESTION_COLLECTION, question.id, QuestionDocument::from(question))
                .await
                .map_err(Into::into)
        })
    }

    fn find_question(&self, id: Uuid) -> BoxFuture<'static, StorageResult<Option<QuestionEntity>>> {
        let store = self.clone();
        Box::pin(async move {
            let document: Option<QuestionDocument> = store
                .find_one(QUESTION_COLLECTION, doc! { "_id": bson_id(id) })
                .await?;
            Ok(document.map(Into::into))
        })
    }

    fn random_question(
        &self,
        theme_id: Uuid,
        score: u8,
    ) -> BoxFuture<'static, StorageResult<Option<QuestionEntity>>> {
        let store = self.clone();
        Box::pin(async move {
            let mut documents: Vec<QuestionDocument> = store
                .sample(
                    QUESTION_COLLECTION,
                    doc! { "theme_id": bson_id(theme_id), "score": i32::from(score) },
                    1,
                )
                .await?;
            Ok(documents.pop().map(Into::into))
        })
    }

    fn answered_questions(
        &self,
        round_id: Uuid,
    ) -> BoxFuture<'static, StorageResult<Vec<QuestionEntity>>> {
        let store = self.clone();
        Box::pin(async move { store.answered_questions(round_id).await.map_err(Into::into) })
    }

    fn insert_round_question(
        &self,
        round_question: RoundQuestionEntity,
    ) -> BoxFuture<'static, StorageResult<()>> {
        let store = self.clone();
        Box::pin(async move {
            let (id, owner) = (round_question.id, format!("round {}", round_question.round_id));
            store
                .insert_active(
                    ROUND_QUESTION_COLLECTION,
                    id,
                    owner,
                    RoundQuestionDocument::from(round_question),
                )
                .await
                .map_err(Into::into)
        })
    }

    fn find_round_question(
        &self,
        id: Uuid,
    ) -> BoxFuture<'static, StorageResult<Option<RoundQuestionEntity>>> {
        let store = self.clone();
        Box::pin(async move {
            let document: Option<RoundQuestionDocument> = store
                .find_one(ROUND_QUESTION_COLLECTION, doc! { "_id": bson_id(id) })
                .await?;
            Ok(document.map(Into::into))
        })
    }

    fn find_active_round_question(
        &self,
        round_id: Uuid,
    ) -> BoxFuture<'static, StorageResult<Option<RoundQuestionEntity>>> {
        let store = self.clone();
        Box::pin(async move {
            let document: Option<RoundQuestionDocument> = store
                .find_one(
                    ROUND_QUESTION_COLLECTION,
                    doc! {
                        "round_id": bson_id(round_id),
                        "status": RoundQuestionStatus::Active.as_str(),
                    },
                )
                .await?;
            Ok(document.map(Into::into))
        })
    }

    fn update_round_question_status(
        &self,
        id: Uuid,
        expected: RoundQuestionStatus,
        next: RoundQuestionStatus,
    ) -> BoxFuture<'static, StorageResult<bool>> {
        let store = self.clone();
        Box::pin(async move {
            store
                .compare_and_set_status(
                    ROUND_QUESTION_COLLECTION,
                    id,
                    expected.as_str(),
                    next.as_str(),
                )
                .await
                .map_err(Into::into)
        })
    }

    fn record_answer(&self, answer: AnswerEntity) -> BoxFuture<'static, StorageResult<bool>> {
        let store = self.clone();
        Box::pin(async move {
            let rq_id = answer.rq_id;
            let open = match answer.status {
                AnswerStatus::Correct => {
                    store
                        .compare_and_set_status(
                            ROUND_QUESTION_COLLECTION,
                            rq_id,
                            RoundQuestionStatus::Active.as_str(),
                            RoundQuestionStatus::Answered.as_str(),
                        )
                        .await?
                }
                AnswerStatus::Incorrect => store
                    .find_one::<Document>(
                        ROUND_QUESTION_COLLECTION,
                        doc! {
                            "_id": bson_id(rq_id),
                            "status": RoundQuestionStatus::Active.as_str(),
                        },
                    )
                    .await?
                    .is_some(),
            };
            if !open {
                return Ok(false);
            }

            store
                .insert(ANSWER_COLLECTION, answer.id, AnswerDocument::from(answer))
                .await?;
            Ok(true)
        })
    }

    fn answers_for(&self, rq_id: Uuid) -> BoxFuture<'static, StorageResult<Vec<AnswerEntity>>> {
        let store = self.clone();
        Box::pin(async move {
            let documents: Vec<AnswerDocument> = store
                .find_all(
                    ANSWER_COLLECTION,
                    doc! { "rq_id": bson_id(rq_id) },
                    Some(doc! { "created_at": 1 }),
                )
                .await?;
            Ok(documents.into_iter().map(Into::into).collect())
        })
    }

    fn health_check(&self) -> BoxFuture<'static, StorageResult<()>> {
        let store = self.clone();
        Box::pin(async move { store.inner.ping().await.map_err(Into::into) })
    }

    fn try_reconnect(&self) -> BoxFuture<'static, StorageResult<()>> {
        let store = self.clone();
        Box::pin(async move { store.inner.reconnect().await.map_err(Into::into) })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn theme(title: &str) -> ThemeEntity {
        ThemeEntity {
            id: Uuid::new_v4(),
            title: title.into(),
        }
    }

    #[test]
    fn unfiltered_sample_starts_with_the_sample_stage() {
        let pipeline = sample_pipeline(doc! {}, 3);
        assert_eq!(pipeline, vec![doc! { "$sample": { "size": 3_i64 } }]);
    }

    #[test]
    fn filtered_sample_matches_first() {
        let pipeline = sample_pipeline(doc! { "score": 2 }, 1);
        assert_eq!(pipeline.len(), 2);
        assert_eq!(pipeline[0], doc! { "$match": { "score": 2 } });
        assert_eq!(pipeline[1], doc! { "$sample": { "size": 1_i64 } });
    }

    #[test]
    fn repeated_themes_are_dropped() {
        let (science, history) = (theme("Science"), theme("History"));
        let mut themes = Vec::new();
        let mut seen = HashSet::new();

        push_distinct(&mut themes, &mut seen, [science.clone(), science.clone()]);
        push_distinct(&mut themes, &mut seen, [history.clone(), science.clone()]);

        assert_eq!(themes, vec![science, history]);
    }
}

//! BSON document shapes for each collection and their conversions to entities.

use mongodb::bson::{DateTime, Uuid as BsonUuid};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::dao::models::{
    AnswerEntity, AnswerStatus, ChatId, QuestionEntity, RoundEntity, RoundQuestionEntity,
    RoundQuestionStatus, RoundStatus, SessionEntity, SessionStatus, ThemeEntity, ThemeRoundEntity,
    UserId,
};

pub const SESSION_COLLECTION: &str = "sessions";
pub const ROUND_COLLECTION: &str = "rounds";
pub const THEME_COLLECTION: &str = "themes";
pub const THEME_ROUND_COLLECTION: &str = "theme_rounds";
pub const QUESTION_COLLECTION: &str = "questions";
pub const ROUND_QUESTION_COLLECTION: &str = "round_questions";
pub const ANSWER_COLLECTION: &str = "answers";

pub fn bson_id(id: Uuid) -> BsonUuid {
    BsonUuid::from_bytes(id.into_bytes())
}

fn entity_id(id: BsonUuid) -> Uuid {
    Uuid::from_bytes(id.bytes())
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionDocument {
    #[serde(rename = "_id")]
    id: BsonUuid,
    chat_id: ChatId,
    status: SessionStatus,
    created_at: DateTime,
}

impl From<SessionEntity> for SessionDocument {
    fn from(value: SessionEntity) -> Self {
        Self {
            id: bson_id(value.id),
            chat_id: value.chat_id,
            status: value.status,
            created_at: DateTime::from_system_time(value.created_at),
        }
    }
}

impl From<SessionDocument> for SessionEntity {
    fn from(value: SessionDocument) -> Self {
        Self {
            id: entity_id(value.id),
            chat_id: value.chat_id,
            status: value.status,
            created_at: value.created_at.to_system_time(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RoundDocument {
    #[serde(rename = "_id")]
    id: BsonUuid,
    session_id: BsonUuid,
    number: u32,
    status: RoundStatus,
    created_at: DateTime,
}

impl From<RoundEntity> for RoundDocument {
    fn from(value: RoundEntity) -> Self {
        Self {
            id: bson_id(value.id),
            session_id: bson_id(value.session_id),
            number: value.number,
            status: value.status,
            created_at: DateTime::from_system_time(value.created_at),
        }
    }
}

impl From<RoundDocument> for RoundEntity {
    fn from(value: RoundDocument) -> Self {
        Self {
            id: entity_id(value.id),
            session_id: entity_id(value.session_id),
            number: value.number,
            status: value.status,
            created_at: value.created_at.to_system_time(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ThemeDocument {
    #[serde(rename = "_id")]
    id: BsonUuid,
    title: String,
}

impl From<ThemeEntity> for ThemeDocument {
    fn from(value: ThemeEntity) -> Self {
        Self {
            id: bson_id(value.id),
            title: value.title,
        }
    }
}

impl From<ThemeDocument> for ThemeEntity {
    fn from(value: ThemeDocument) -> Self {
        Self {
            id: entity_id(value.id),
            title: value.title,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ThemeRoundDocument {
    #[serde(rename = "_id")]
    id: BsonUuid,
    round_id: BsonUuid,
    theme_id: BsonUuid,
    /// Position inside the round, keeps the grid columns stable.
    position: u32,
}

impl ThemeRoundDocument {
    pub fn new(link: ThemeRoundEntity, position: u32) -> Self {
        Self {
            id: bson_id(link.id),
            round_id: bson_id(link.round_id),
            theme_id: bson_id(link.theme_id),
            position,
        }
    }

    pub fn theme_id(&self) -> Uuid {
        entity_id(self.theme_id)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QuestionDocument {
    #[serde(rename = "_id")]
    id: BsonUuid,
    theme_id: BsonUuid,
    score: u8,
    text: String,
    correct_answer: String,
}

impl From<QuestionEntity> for QuestionDocument {
    fn from(value: QuestionEntity) -> Self {
        Self {
            id: bson_id(value.id),
            theme_id: bson_id(value.theme_id),
            score: value.score,
            text: value.text,
            correct_answer: value.correct_answer,
        }
    }
}

impl From<QuestionDocument> for QuestionEntity {
    fn from(value: QuestionDocument) -> Self {
        Self {
            id: entity_id(value.id),
            theme_id: entity_id(value.theme_id),
            score: value.score,
            text: value.text,
            correct_answer: value.correct_answer,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RoundQuestionDocument {
    #[serde(rename = "_id")]
    id: BsonUuid,
    round_id: BsonUuid,
    question_id: BsonUuid,
    status: RoundQuestionStatus,
}

impl RoundQuestionDocument {
    pub fn question_id(&self) -> BsonUuid {
        self.question_id
    }
}

impl From<RoundQuestionEntity> for RoundQuestionDocument {
    fn from(value: RoundQuestionEntity) -> Self {
        Self {
            id: bson_id(value.id),
            round_id: bson_id(value.round_id),
            question_id: bson_id(value.question_id),
            status: value.status,
        }
    }
}

impl From<RoundQuestionDocument> for RoundQuestionEntity {
    fn from(value: RoundQuestionDocument) -> Self {
        Self {
            id: entity_id(value.id),
            round_id: entity_id(value.round_id),
            question_id: entity_id(value.question_id),
            status: value.status,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnswerDocument {
    #[serde(rename = "_id")]
    id: BsonUuid,
    rq_id: BsonUuid,
    user_id: UserId,
    status: AnswerStatus,
    created_at: DateTime,
}

impl From<AnswerEntity> for AnswerDocument {
    fn from(value: AnswerEntity) -> Self {
        Self {
            id: bson_id(value.id),
            rq_id: bson_id(value.rq_id),
            user_id: value.user_id,
            status: value.status,
            created_at: DateTime::from_system_time(value.created_at),
        }
    }
}

impl From<AnswerDocument> for AnswerEntity {
    fn from(value: AnswerDocument) -> Self {
        Self {
            id: entity_id(value.id),
            rq_id: entity_id(value.rq_id),
            user_id: value.user_id,
            status: value.status,
            created_at: value.created_at.to_system_time(),
        }
    }
}

//! Global theme/question catalog management and seeding.

use std::collections::HashMap;

use tracing::info;
use uuid::Uuid;

use crate::{
    config::{CatalogTheme, GameRules},
    dao::{
        models::{QuestionEntity, ThemeEntity},
        quiz_store::QuizStore,
    },
    error::ServiceError,
};

/// Rows written by [`seed_catalog`].
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct SeedReport {
    /// Themes inserted.
    pub themes: usize,
    /// Questions inserted.
    pub questions: usize,
}

/// Every catalog theme, ordered by title.
pub async fn list_themes(store: &dyn QuizStore) -> Result<Vec<ThemeEntity>, ServiceError> {
    let mut themes = store.list_themes().await?;
    themes.sort_by(|a, b| a.title.cmp(&b.title));
    Ok(themes)
}

/// Add a theme with a trimmed, non-empty title.
pub async fn add_theme(store: &dyn QuizStore, title: &str) -> Result<ThemeEntity, ServiceError> {
    let title = title.trim();
    if title.is_empty() {
        return Err(ServiceError::InvalidInput("theme title is empty".into()));
    }
    if store
        .list_themes()
        .await?
        .iter()
        .any(|theme| theme.title.eq_ignore_ascii_case(title))
    {
        return Err(ServiceError::Conflict(format!("theme `{title}` already exists")));
    }

    let theme = ThemeEntity {
        id: Uuid::new_v4(),
        title: title.to_owned(),
    };
    store.insert_theme(theme.clone()).await?;
    info!(theme_id = %theme.id, title = %theme.title, "theme added");
    Ok(theme)
}

/// Add a question to an existing theme; `score` must be a cell of the configured grid.
pub async fn add_question(
    store: &dyn QuizStore,
    rules: &GameRules,
    theme_id: Uuid,
    score: u8,
    text: &str,
    answer: &str,
) -> Result<QuestionEntity, ServiceError> {
    if !rules.accepts_score(score) {
        return Err(ServiceError::InvalidInput(format!(
            "score {score} is outside {}..={}",
            rules.min_score, rules.max_score
        )));
    }
    let (text, answer) = (text.trim(), answer.trim());
    if text.is_empty() || answer.is_empty() {
        return Err(ServiceError::InvalidInput(
            "question text and answer are required".into(),
        ));
    }
    if !store
        .list_themes()
        .await?
        .iter()
        .any(|theme| theme.id == theme_id)
    {
        return Err(ServiceError::NotFound(format!("theme `{theme_id}`")));
    }

    let question = QuestionEntity {
        id: Uuid::new_v4(),
        theme_id,
        score,
        text: text.to_owned(),
        correct_answer: answer.to_owned(),
    };
    store.insert_question(question.clone()).await?;
    Ok(question)
}

/// Insert the themes of `catalog` whose title is not stored yet, with their questions.
///
/// Questions with a score outside the grid are skipped. Running twice writes nothing the
/// second time.
pub async fn seed_catalog(
    store: &dyn QuizStore,
    rules: &GameRules,
    catalog: &[CatalogTheme],
) -> Result<SeedReport, ServiceError> {
    let existing: HashMap<String, Uuid> = store
        .list_themes()
        .await?
        .into_iter()
        .map(|theme| (theme.title.to_lowercase(), theme.id))
        .collect();

    let mut report = SeedReport::default();
    for entry in catalog {
        let title = entry.title.trim();
        if title.is_empty() || existing.contains_key(&title.to_lowercase()) {
            continue;
        }

        let theme = ThemeEntity {
            id: Uuid::new_v4(),
            title: title.to_owned(),
        };
        store.insert_theme(theme.clone()).await?;
        report.themes += 1;

        for question in entry
            .questions
            .iter()
            .filter(|question| rules.accepts_score(question.score))
        {
            store
                .insert_question(QuestionEntity {
                    id: Uuid::new_v4(),
                    theme_id: theme.id,
                    score: question.score,
                    text: question.text.clone(),
                    correct_answer: question.answer.clone(),
                })
                .await?;
            report.questions += 1;
        }
    }

    if report.themes > 0 {
        info!(
            themes = report.themes,
            questions = report.questions,
            "seeded question catalog"
        );
    }
    Ok(report)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{config::CatalogQuestion, dao::quiz_store::InMemoryQuizStore};

    fn catalog() -> Vec<CatalogTheme> {
        vec![CatalogTheme {
            title: "Music".into(),
            questions: vec![
                CatalogQuestion {
                    score: 1,
                    text: "Instrument with 88 keys?".into(),
                    answer: "Piano".into(),
                },
                CatalogQuestion {
                    score: 42,
                    text: "Out of grid".into(),
                    answer: "skip".into(),
                },
            ],
        }]
    }

    #[tokio::test]
    async fn seeding_is_idempotent_per_title() {
        let store = InMemoryQuizStore::new();
        let rules = GameRules::default();

        let first = seed_catalog(&store, &rules, &catalog()).await.unwrap();
        assert_eq!(first, SeedReport { themes: 1, questions: 1 });

        let second = seed_catalog(&store, &rules, &catalog()).await.unwrap();
        assert_eq!(second, SeedReport::default());
        assert_eq!(list_themes(&store).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn duplicate_theme_title_is_a_conflict() {
        let store = InMemoryQuizStore::new();
        add_theme(&store, "Music").await.unwrap();
        let err = add_theme(&store, "  music ").await.unwrap_err();
        assert!(matches!(err, ServiceError::Conflict(_)));
        assert!(matches!(
            add_theme(&store, "   ").await,
            Err(ServiceError::InvalidInput(_))
        ));
    }

    #[tokio::test]
    async fn question_requires_known_theme_and_valid_score() {
        let store = InMemoryQuizStore::new();
        let rules = GameRules::default();
        let theme = add_theme(&store, "Music").await.unwrap();

        let question = add_question(&store, &rules, theme.id, 4, "Q?", "A")
            .await
            .unwrap();
        assert_eq!(store.find_question(question.id).await.unwrap(), Some(question));

        assert!(matches!(
            add_question(&store, &rules, theme.id, 0, "Q?", "A").await,
            Err(ServiceError::InvalidInput(_))
        ));
        assert!(matches!(
            add_question(&store, &rules, Uuid::new_v4(), 2, "Q?", "A").await,
            Err(ServiceError::NotFound(_))
        ));
    }
}

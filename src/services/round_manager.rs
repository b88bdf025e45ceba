//! Round lifecycle: closing the previous round, numbering, and random theme assignment.

use tracing::{info, warn};
use uuid::Uuid;

use crate::{
    config::GameRules,
    dao::{
        models::{RoundEntity, RoundStatus, SessionEntity, ThemeEntity, ThemeRoundEntity},
        quiz_store::QuizStore,
    },
    error::ServiceError,
};

/// A freshly opened round with the themes drawn for its grid.
#[derive(Debug, Clone)]
pub struct StartedRound {
    /// The stored round, already active.
    pub round: RoundEntity,
    /// Themes of the grid, in column order.
    pub themes: Vec<ThemeEntity>,
}

/// Close the active round of `session` (if any) and open the next one with fresh themes.
///
/// Themes are drawn and linked before anything visible changes, so an exhausted catalog
/// leaves the session untouched. Inserting the round is the last write.
pub async fn start_round(
    store: &dyn QuizStore,
    rules: &GameRules,
    session: &SessionEntity,
) -> Result<StartedRound, ServiceError> {
    let themes = draw_themes(store, rules).await?;

    let previous = store.find_active_round(session.id).await?;
    let number = previous.as_ref().map_or(1, |previous| previous.number + 1);
    let round = RoundEntity::new_active(session.id, number);
    link_themes(store, round.id, &themes).await?;

    if let Some(previous) = &previous {
        let closed = store
            .update_round_status(previous.id, RoundStatus::Active, RoundStatus::Finished)
            .await?;
        if !closed {
            return Err(ServiceError::Conflict(format!(
                "round `{}` is no longer active",
                previous.id
            )));
        }
    }

    if let Err(err) = store.insert_round(round.clone()).await {
        if let Some(previous) = &previous {
            reopen(store, previous).await;
        }
        return Err(err.into());
    }

    info!(
        session_id = %session.id,
        round_id = %round.id,
        number,
        themes = themes.len(),
        "round started"
    );

    Ok(StartedRound { round, themes })
}

/// Draw `themes_count` random themes from the catalog and assign them to `round_id`.
pub async fn assign_random_themes(
    store: &dyn QuizStore,
    rules: &GameRules,
    round_id: Uuid,
) -> Result<Vec<ThemeEntity>, ServiceError> {
    let themes = draw_themes(store, rules).await?;
    link_themes(store, round_id, &themes).await?;
    Ok(themes)
}

/// Themes assigned to `round_id`, in assignment order.
pub async fn get_themes(
    store: &dyn QuizStore,
    round_id: Uuid,
) -> Result<Vec<ThemeEntity>, ServiceError> {
    Ok(store.themes_for_round(round_id).await?)
}

async fn draw_themes(
    store: &dyn QuizStore,
    rules: &GameRules,
) -> Result<Vec<ThemeEntity>, ServiceError> {
    let required = rules.themes_count;
    let themes = store.random_themes(required).await?;
    if themes.len() < required {
        return Err(ServiceError::CatalogExhausted {
            catalog: "themes",
            required,
            available: themes.len(),
        });
    }
    Ok(themes)
}

async fn link_themes(
    store: &dyn QuizStore,
    round_id: Uuid,
    themes: &[ThemeEntity],
) -> Result<(), ServiceError> {
    let links = themes
        .iter()
        .map(|theme| ThemeRoundEntity::new(round_id, theme.id))
        .collect();
    store.insert_theme_rounds(links).await?;
    Ok(())
}

/// Undo the close of `previous` after the replacement round could not be stored.
async fn reopen(store: &dyn QuizStore, previous: &RoundEntity) {
    match store
        .update_round_status(previous.id, RoundStatus::Finished, RoundStatus::Active)
        .await
    {
        Ok(true) => {}
        Ok(false) => warn!(round_id = %previous.id, "previous round changed before it could be reopened"),
        Err(err) => warn!(round_id = %previous.id, error = %err, "failed to reopen previous round"),
    }
}

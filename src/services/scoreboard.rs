//! Theme × score grid of a round.

use tracing::debug;
use uuid::Uuid;

use crate::{
    config::GameRules,
    dao::{
        models::{QuestionEntity, ThemeEntity},
        quiz_store::QuizStore,
    },
    error::ServiceError,
    state::game::{ScoreTable, ThemeColumn},
};

/// Build the grid of `round_id` from its assigned themes and answered questions.
pub async fn build_table(
    store: &dyn QuizStore,
    rules: &GameRules,
    round_id: Uuid,
) -> Result<ScoreTable, ServiceError> {
    let themes = store.themes_for_round(round_id).await?;
    let answered = store.answered_questions(round_id).await?;
    debug!(
        %round_id,
        themes = themes.len(),
        answered = answered.len(),
        "building score table"
    );
    Ok(project(rules, themes, &answered))
}

/// Lay out every grid cell as unanswered, then flag the cells of `answered` questions.
///
/// Questions outside the assigned themes or the score range are ignored.
pub fn project(
    rules: &GameRules,
    themes: Vec<ThemeEntity>,
    answered: &[QuestionEntity],
) -> ScoreTable {
    let mut table: ScoreTable = themes
        .into_iter()
        .map(|theme| {
            let column = ThemeColumn {
                id: theme.id,
                title: theme.title,
                answers: rules.scores().map(|score| (score, false)).collect(),
            };
            (theme.id, column)
        })
        .collect();

    for question in answered {
        if let Some(cell) = table
            .get_mut(&question.theme_id)
            .and_then(|column| column.answers.get_mut(&question.score))
        {
            *cell = true;
        }
    }

    table
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

    fn question(theme_id: Uuid, score: u8) -> QuestionEntity {
        QuestionEntity {
            id: Uuid::new_v4(),
            theme_id,
            score,
            text: "q".into(),
            correct_answer: "a".into(),
        }
    }

    #[test]
    fn only_answered_cell_is_flagged() {
        let science = theme("Science");
        let history = theme("History");
        let rules = GameRules::default();

        let table = project(
            &rules,
            vec![science.clone(), history.clone()],
            &[question(science.id, 3)],
        );

        assert_eq!(table.len(), 2);
        let flagged: Vec<(Uuid, u8)> = table
            .values()
            .flat_map(|column| {
                column
                    .answers
                    .iter()
                    .filter(|(_, answered)| **answered)
                    .map(move |(score, _)| (column.id, *score))
            })
            .collect();
        assert_eq!(flagged, vec![(science.id, 3)]);

        let cells: usize = table.values().map(|column| column.answers.len()).sum();
        assert_eq!(cells, 10);
        assert_eq!(table[&history.id].title, "History");
    }

    #[test]
    fn keeps_assignment_order_and_tolerates_empty_rounds() {
        let themes = vec![theme("B"), theme("A"), theme("C")];
        let table = project(&GameRules::default(), themes.clone(), &[]);

        let titles: Vec<&str> = table.values().map(|c| c.title.as_str()).collect();
        assert_eq!(titles, ["B", "A", "C"]);
        assert!(table.values().all(|c| c.answers.values().all(|v| !v)));

        assert!(project(&GameRules::default(), Vec::new(), &[]).is_empty());
    }

    #[test]
    fn foreign_questions_are_ignored() {
        let science = theme("Science");
        let table = project(
            &GameRules::default(),
            vec![science.clone()],
            &[question(Uuid::new_v4(), 2), question(science.id, 9)],
        );
        assert!(table[&science.id].answers.values().all(|v| !v));
        assert_eq!(table[&science.id].answers.len(), 5);
    }
}

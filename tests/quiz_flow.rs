use std::{sync::Arc, time::Duration};

use futures::future::BoxFuture;
use uuid::Uuid;

use chat_quiz_back::{
    config::{AppConfig, CatalogQuestion, CatalogTheme, GameRules},
    dao::{
        models::{
            AnswerEntity, AnswerStatus, ChatId, QuestionEntity, RoundEntity, RoundQuestionEntity,
            RoundQuestionStatus, RoundStatus, SessionEntity, SessionStatus, ThemeEntity,
            ThemeRoundEntity,
        },
        quiz_store::{InMemoryQuizStore, QuizStore},
        storage::StorageResult,
    },
    dto::game::{PickQuestionRequest, SubmitAnswerRequest},
    error::ServiceError,
    services::{
        answer_evaluator, catalog_service, game_service, question_selector, round_manager,
        scoreboard, session_service, state_resolver,
    },
    state::{AppState, SharedState, game::GameState},
};

/// Two themes, each question's answer is "<title> <score>".
fn catalog() -> Vec<CatalogTheme> {
    ["Science", "History"]
        .into_iter()
        .map(|title| CatalogTheme {
            title: title.to_owned(),
            questions: (1..=5)
                .map(|score| CatalogQuestion {
                    score,
                    text: format!("{title} question for {score}"),
                    answer: format!("{title} {score}"),
                })
                .collect(),
        })
        .collect()
}

fn rules() -> GameRules {
    GameRules {
        themes_count: 2,
        ..GameRules::default()
    }
}

async fn seeded_store() -> Arc<InMemoryQuizStore> {
    let store = Arc::new(InMemoryQuizStore::new());
    catalog_service::seed_catalog(store.as_ref(), &rules(), &catalog())
        .await
        .unwrap();
    store
}

async fn seeded_state() -> SharedState {
    let config = AppConfig::new(rules(), catalog(), Duration::from_secs(2));
    let store = seeded_store().await;
    AppState::with_store(config, store).await
}

#[tokio::test]
async fn answered_cell_shows_in_the_table() {
    let store = seeded_store().await;
    let rules = rules();

    let (_, started) = session_service::start_game(store.as_ref(), &rules, 1)
        .await
        .unwrap();
    let science = started
        .themes
        .iter()
        .find(|t| t.title == "Science")
        .cloned()
        .unwrap();

    let opened = question_selector::pick_question(store.as_ref(), &rules, &started.round, science.id, 3)
        .await
        .unwrap();
    assert_eq!(
        state_resolver::get_state(store.as_ref(), 1).await.unwrap(),
        GameState::WaitAnswer
    );

    let answer = answer_evaluator::submit_answer(
        store.as_ref(),
        opened.round_question.id,
        11,
        "  SCIENCE   3 ",
    )
    .await
    .unwrap();
    assert_eq!(answer.status, AnswerStatus::Correct);
    assert_eq!(
        state_resolver::get_state(store.as_ref(), 1).await.unwrap(),
        GameState::WaitQuestion
    );

    let table = scoreboard::build_table(store.as_ref(), &rules, started.round.id)
        .await
        .unwrap();
    let flagged: Vec<_> = table
        .values()
        .flat_map(|column| {
            column
                .answers
                .iter()
                .filter(|(_, answered)| **answered)
                .map(move |(score, _)| (column.title.clone(), *score))
        })
        .collect();
    assert_eq!(flagged, vec![("Science".to_owned(), 3)]);

    let again = scoreboard::build_table(store.as_ref(), &rules, started.round.id)
        .await
        .unwrap();
    assert_eq!(table, again);
}

#[tokio::test]
async fn concurrent_correct_answers_close_the_question_once() {
    let store = seeded_store().await;
    let rules = rules();

    let (_, started) = session_service::start_game(store.as_ref(), &rules, 2)
        .await
        .unwrap();
    let theme = started.themes[0].clone();
    let opened = question_selector::pick_question(store.as_ref(), &rules, &started.round, theme.id, 1)
        .await
        .unwrap();
    let correct = opened.question.correct_answer.clone();
    let rq_id = opened.round_question.id;

    let (first, second) = tokio::join!(
        answer_evaluator::submit_answer(store.as_ref(), rq_id, 1, &correct),
        answer_evaluator::submit_answer(store.as_ref(), rq_id, 2, &correct),
    );

    let outcomes = [first, second];
    let winners = outcomes.iter().filter(|r| r.is_ok()).count();
    let conflicts = outcomes
        .iter()
        .filter(|r| matches!(r, Err(ServiceError::Conflict(_))))
        .count();
    assert_eq!((winners, conflicts), (1, 1));

    let answers = store.answers_for(rq_id).await.unwrap();
    assert_eq!(answers.len(), 1);
    assert_eq!(answers[0].status, AnswerStatus::Correct);

    let stored = store.find_round_question(rq_id).await.unwrap().unwrap();
    assert_eq!(stored.status, RoundQuestionStatus::Answered);
}

#[tokio::test]
async fn concurrent_picks_through_the_gate_open_one_question() {
    let state = seeded_state().await;
    let started = game_service::start_game(&state, 3).await.unwrap();
    let theme_id = started.round.themes[0].id;

    let (a, b) = tokio::join!(
        game_service::pick_question(&state, 3, PickQuestionRequest { theme_id, score: 2 }),
        game_service::pick_question(&state, 3, PickQuestionRequest { theme_id, score: 4 }),
    );
    assert_eq!([&a, &b].iter().filter(|r| r.is_ok()).count(), 1);
    assert!(matches!(a.as_ref().err().or(b.as_ref().err()), Some(ServiceError::Conflict(_))));
}

#[tokio::test]
async fn rounds_advance_and_keep_sessions_per_chat() {
    let state = seeded_state().await;

    let first = game_service::start_game(&state, 10).await.unwrap();
    let other_chat = game_service::start_game(&state, 11).await.unwrap();
    assert_eq!(first.round.number, 1);
    assert_eq!(other_chat.round.number, 1);
    assert_ne!(first.session.id, other_chat.session.id);

    assert!(matches!(
        game_service::start_game(&state, 10).await,
        Err(ServiceError::Conflict(_))
    ));

    let second = game_service::start_round(&state, 10).await.unwrap();
    let third = game_service::start_round(&state, 10).await.unwrap();
    assert_eq!((second.number, third.number), (2, 3));

    let table = game_service::table(&state, 10).await.unwrap();
    assert_eq!(table.round_number, 3);
    assert_eq!(table.themes.len(), 2);

    // Chat 11 is still on its first round.
    assert_eq!(game_service::table(&state, 11).await.unwrap().round_number, 1);
}

#[tokio::test]
async fn wrong_answers_accumulate_until_someone_is_right() {
    let state = seeded_state().await;
    let started = game_service::start_game(&state, 20).await.unwrap();
    let theme = &started.round.themes[0];

    game_service::pick_question(
        &state,
        20,
        PickQuestionRequest {
            theme_id: theme.id,
            score: 5,
        },
    )
    .await
    .unwrap();

    let winning = format!("{} 5", theme.title.to_uppercase());
    for (user_id, text) in [(1, "nope"), (2, "still nope"), (1, winning.as_str())] {
        game_service::submit_answer(
            &state,
            20,
            SubmitAnswerRequest {
                user_id,
                text: text.to_owned(),
            },
        )
        .await
        .unwrap();
    }

    let view = game_service::get_state(&state, 20).await.unwrap();
    assert_eq!(view.state, GameState::WaitQuestion);

    let table = game_service::table(&state, 20).await.unwrap();
    let column = table.themes.iter().find(|c| c.id == theme.id).unwrap();
    assert_eq!(column.answers.get(&5), Some(&true));
}

#[tokio::test]
async fn catalog_too_small_for_rules_is_reported() {
    let store = seeded_store().await;
    let greedy = GameRules {
        themes_count: 3,
        ..GameRules::default()
    };
    let err = session_service::start_game(store.as_ref(), &greedy, 30)
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        ServiceError::CatalogExhausted {
            required: 3,
            available: 2,
            ..
        }
    ));

    let session = session_service::create_session(store.as_ref(), 31).await.unwrap();
    let err = round_manager::start_round(store.as_ref(), &greedy, &session)
        .await
        .unwrap_err();
    assert!(matches!(err, ServiceError::CatalogExhausted { .. }));
    assert_eq!(
        state_resolver::get_state(store.as_ref(), 31).await.unwrap(),
        GameState::Error
    );
}

/// In-memory store whose round inserts stall for `delay` once `slow` is set.
struct StallingRoundStore {
    inner: InMemoryQuizStore,
    delay: Duration,
    slow: std::sync::atomic::AtomicBool,
}

impl StallingRoundStore {
    fn stall_round_inserts(&self) {
        self.slow.store(true, std::sync::atomic::Ordering::SeqCst);
    }
}

impl QuizStore for StallingRoundStore {
    fn insert_session(&self, session: SessionEntity) -> BoxFuture<'static, StorageResult<()>> {
        self.inner.insert_session(session)
    }
    fn find_active_session(
        &self,
        chat_id: ChatId,
    ) -> BoxFuture<'static, StorageResult<Option<SessionEntity>>> {
        self.inner.find_active_session(chat_id)
    }
    fn update_session_status(
        &self,
        id: Uuid,
        expected: SessionStatus,
        next: SessionStatus,
    ) -> BoxFuture<'static, StorageResult<bool>> {
        self.inner.update_session_status(id, expected, next)
    }
    fn insert_round(&self, round: RoundEntity) -> BoxFuture<'static, StorageResult<()>> {
        let insert = self.inner.insert_round(round);
        if !self.slow.load(std::sync::atomic::Ordering::SeqCst) {
            return insert;
        }
        let delay = self.delay;
        Box::pin(async move {
            tokio::time::sleep(delay).await;
            insert.await
        })
    }
    fn find_round(&self, id: Uuid) -> BoxFuture<'static, StorageResult<Option<RoundEntity>>> {
        self.inner.find_round(id)
    }
    fn find_active_round(
        &self,
        session_id: Uuid,
    ) -> BoxFuture<'static, StorageResult<Option<RoundEntity>>> {
        self.inner.find_active_round(session_id)
    }
    fn find_latest_round(
        &self,
        session_id: Uuid,
    ) -> BoxFuture<'static, StorageResult<Option<RoundEntity>>> {
        self.inner.find_latest_round(session_id)
    }
    fn update_round_status(
        &self,
        id: Uuid,
        expected: RoundStatus,
        next: RoundStatus,
    ) -> BoxFuture<'static, StorageResult<bool>> {
        self.inner.update_round_status(id, expected, next)
    }
    fn insert_theme(&self, theme: ThemeEntity) -> BoxFuture<'static, StorageResult<()>> {
        self.inner.insert_theme(theme)
    }
    fn list_themes(&self) -> BoxFuture<'static, StorageResult<Vec<ThemeEntity>>> {
        self.inner.list_themes()
    }
    fn random_themes(&self, limit: usize) -> BoxFuture<'static, StorageResult<Vec<ThemeEntity>>> {
        self.inner.random_themes(limit)
    }
    fn insert_theme_rounds(
        &self,
        links: Vec<ThemeRoundEntity>,
    ) -> BoxFuture<'static, StorageResult<()>> {
        self.inner.insert_theme_rounds(links)
    }
    fn themes_for_round(
        &self,
        round_id: Uuid,
    ) -> BoxFuture<'static, StorageResult<Vec<ThemeEntity>>> {
        self.inner.themes_for_round(round_id)
    }
    fn insert_question(&self, question: QuestionEntity) -> BoxFuture<'static, StorageResult<()>> {
        self.inner.insert_question(question)
    }
    fn find_question(&self, id: Uuid) -> BoxFuture<'static, StorageResult<Option<QuestionEntity>>> {
        self.inner.find_question(id)
    }
    fn random_question(
        &self,
        theme_id: Uuid,
        score: u8,
    ) -> BoxFuture<'static, StorageResult<Option<QuestionEntity>>> {
        self.inner.random_question(theme_id, score)
    }
    fn answered_questions(
        &self,
        round_id: Uuid,
    ) -> BoxFuture<'static, StorageResult<Vec<QuestionEntity>>> {
        self.inner.answered_questions(round_id)
    }
    fn insert_round_question(
        &self,
        round_question: RoundQuestionEntity,
    ) -> BoxFuture<'static, StorageResult<()>> {
        self.inner.insert_round_question(round_question)
    }
    fn find_round_question(
        &self,
        id: Uuid,
    ) -> BoxFuture<'static, StorageResult<Option<RoundQuestionEntity>>> {
        self.inner.find_round_question(id)
    }
    fn find_active_round_question(
        &self,
        round_id: Uuid,
    ) -> BoxFuture<'static, StorageResult<Option<RoundQuestionEntity>>> {
        self.inner.find_active_round_question(round_id)
    }
    fn update_round_question_status(
        &self,
        id: Uuid,
        expected: RoundQuestionStatus,
        next: RoundQuestionStatus,
    ) -> BoxFuture<'static, StorageResult<bool>> {
        self.inner.update_round_question_status(id, expected, next)
    }
    fn record_answer(&self, answer: AnswerEntity) -> BoxFuture<'static, StorageResult<bool>> {
        self.inner.record_answer(answer)
    }
    fn answers_for(&self, rq_id: Uuid) -> BoxFuture<'static, StorageResult<Vec<AnswerEntity>>> {
        self.inner.answers_for(rq_id)
    }
    fn health_check(&self) -> BoxFuture<'static, StorageResult<()>> {
        self.inner.health_check()
    }
    fn try_reconnect(&self) -> BoxFuture<'static, StorageResult<()>> {
        self.inner.try_reconnect()
    }
}

async fn stalling_state() -> (SharedState, Arc<StallingRoundStore>) {
    let inner = InMemoryQuizStore::new();
    catalog_service::seed_catalog(&inner, &rules(), &catalog())
        .await
        .unwrap();
    let store = Arc::new(StallingRoundStore {
        inner,
        delay: Duration::from_millis(200),
        slow: std::sync::atomic::AtomicBool::new(false),
    });
    let config = AppConfig::new(rules(), catalog(), Duration::from_millis(50));
    let state = AppState::with_store(config, store.clone()).await;
    (state, store)
}

#[tokio::test]
async fn timed_out_game_start_leaves_no_half_started_game() {
    let (state, store) = stalling_state().await;
    store.stall_round_inserts();

    assert!(matches!(
        game_service::start_game(&state, 40).await,
        Err(ServiceError::Timeout)
    ));
    assert_eq!(
        game_service::get_state(&state, 40).await.unwrap().state,
        GameState::NotActive
    );

    // The chat can start over once the store is fast again.
    store.slow.store(false, std::sync::atomic::Ordering::SeqCst);
    let started = game_service::start_game(&state, 40).await.unwrap();
    assert_eq!(started.round.number, 1);
}

#[tokio::test]
async fn timed_out_round_start_keeps_the_current_round() {
    let (state, store) = stalling_state().await;
    let started = game_service::start_game(&state, 41).await.unwrap();
    store.stall_round_inserts();

    assert!(matches!(
        game_service::start_round(&state, 41).await,
        Err(ServiceError::Timeout)
    ));

    let view = game_service::get_state(&state, 41).await.unwrap();
    assert_eq!(view.state, GameState::WaitQuestion);
    let table = game_service::table(&state, 41).await.unwrap();
    assert_eq!(table.round_id, started.round.id);
    assert_eq!(table.themes.len(), 2);
}

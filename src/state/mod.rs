//! Process-wide application state shared by every handler.

/// Game state vocabulary and score table types.
pub mod game;

use std::{future::Future, sync::Arc};

use dashmap::DashMap;
use tokio::sync::{Mutex, RwLock, watch};
use tokio::time::timeout;
use tracing::warn;

use crate::{
    config::{AppConfig, GameRules},
    dao::{models::ChatId, quiz_store::QuizStore},
    error::ServiceError,
};

/// Handle to [`AppState`] passed to handlers and services.
pub type SharedState = Arc<AppState>;

/// Central application state holding the storage handle and per-chat mutation gates.
pub struct AppState {
    quiz_store: RwLock<Option<Arc<dyn QuizStore>>>,
    config: AppConfig,
    degraded: watch::Sender<bool>,
    chat_gates: DashMap<ChatId, Arc<Mutex<()>>>,
}

impl AppState {
    /// Construct a new [`AppState`] wrapped in an [`Arc`] so it can be cloned cheaply.
    ///
    /// The application starts in degraded mode until a storage backend is installed.
    pub fn new(config: AppConfig) -> SharedState {
        let (degraded_tx, _rx) = watch::channel(true);
        Arc::new(Self {
            quiz_store: RwLock::new(None),
            config,
            degraded: degraded_tx,
            chat_gates: DashMap::new(),
        })
    }

    /// Shorthand for a state with `store` already installed.
    pub async fn with_store(config: AppConfig, store: Arc<dyn QuizStore>) -> SharedState {
        let state = Self::new(config);
        state.set_quiz_store(store).await;
        state
    }

    /// Loaded application configuration.
    pub fn config(&self) -> &AppConfig {
        &self.config
    }

    /// Game rules from the configuration.
    pub fn rules(&self) -> GameRules {
        self.config.rules()
    }

    /// Obtain a handle to the current quiz store, if one is installed.
    pub async fn quiz_store(&self) -> Option<Arc<dyn QuizStore>> {
        let guard = self.quiz_store.read().await;
        guard.as_ref().cloned()
    }

    /// Return the quiz store or [`ServiceError::Degraded`] while storage is unavailable.
    pub async fn require_quiz_store(&self) -> Result<Arc<dyn QuizStore>, ServiceError> {
        if self.is_degraded() {
            return Err(ServiceError::Degraded);
        }
        self.quiz_store().await.ok_or(ServiceError::Degraded)
    }

    /// Install a new quiz store implementation and leave degraded mode.
    pub async fn set_quiz_store(&self, store: Arc<dyn QuizStore>) {
        {
            let mut guard = self.quiz_store.write().await;
            *guard = Some(store);
        }
        self.update_degraded(false);
    }

    /// Current degraded flag.
    pub fn is_degraded(&self) -> bool {
        *self.degraded.borrow()
    }

    /// Subscribe to degraded mode updates.
    pub fn degraded_watcher(&self) -> watch::Receiver<bool> {
        self.degraded.subscribe()
    }

    /// Update and broadcast the degraded flag when the value changes.
    pub fn update_degraded(&self, value: bool) {
        self.degraded.send_if_modified(|current| {
            if *current == value {
                return false;
            }
            *current = value;
            true
        });
    }

    /// Run `work` while holding the mutation gate of `chat_id`, bounded by the operation timeout.
    ///
    /// Mutations of different chats never wait on each other.
    pub async fn run_exclusive<F, Fut, T>(&self, chat_id: ChatId, work: F) -> Result<T, ServiceError>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T, ServiceError>>,
    {
        self.run_exclusive_or_abort(chat_id, work, || async {}).await
    }

    /// Like [`run_exclusive`](Self::run_exclusive), but runs `abort` under the same gate when
    /// `work` times out.
    ///
    /// `work` is dropped at whatever await point it reached, so `abort` must bring the chat back
    /// to a consistent state from any of them.
    pub async fn run_exclusive_or_abort<F, Fut, T, A, AFut>(
        &self,
        chat_id: ChatId,
        work: F,
        abort: A,
    ) -> Result<T, ServiceError>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T, ServiceError>>,
        A: FnOnce() -> AFut,
        AFut: Future<Output = ()>,
    {
        let outcome = {
            let gate = self.chat_gates.entry(chat_id).or_default().clone();
            let _guard = gate.lock().await;

            let limit = self.config.operation_timeout();
            match timeout(limit, work()).await {
                Ok(result) => result,
                Err(_) => {
                    warn!(chat_id, timeout_ms = limit.as_millis() as u64, "chat operation timed out");
                    abort().await;
                    Err(ServiceError::Timeout)
                }
            }
        };

        // Only the map holds the gate once every waiter is gone.
        self.chat_gates
            .remove_if(&chat_id, |_, gate| Arc::strong_count(gate) == 1);
        outcome
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;
    use crate::dao::quiz_store::InMemoryQuizStore;

    fn config_with_timeout(ms: u64) -> AppConfig {
        AppConfig::new(GameRules::default(), Vec::new(), Duration::from_millis(ms))
    }

    #[tokio::test]
    async fn starts_degraded_until_store_installed() {
        let state = AppState::new(AppConfig::default());
        assert!(state.is_degraded());
        assert!(matches!(
            state.require_quiz_store().await,
            Err(ServiceError::Degraded)
        ));

        state.set_quiz_store(Arc::new(InMemoryQuizStore::new())).await;
        assert!(!state.is_degraded());
        assert!(state.require_quiz_store().await.is_ok());
    }

    #[tokio::test]
    async fn degraded_watcher_sees_changes_only() {
        let state = AppState::new(AppConfig::default());
        let mut watcher = state.degraded_watcher();

        state.update_degraded(true);
        assert!(!watcher.has_changed().unwrap());

        state.update_degraded(false);
        assert!(watcher.has_changed().unwrap());
        assert!(!*watcher.borrow_and_update());
    }

    #[tokio::test]
    async fn run_exclusive_times_out_slow_work() {
        let state = AppState::new(config_with_timeout(20));
        let result: Result<(), ServiceError> = state
            .run_exclusive(7, || async {
                tokio::time::sleep(Duration::from_millis(200)).await;
                Ok(())
            })
            .await;
        assert!(matches!(result, Err(ServiceError::Timeout)));
    }

    #[tokio::test]
    async fn abort_runs_under_the_gate_after_a_timeout() {
        let state = AppState::new(config_with_timeout(20));
        let aborted = Arc::new(Mutex::new(false));

        let result: Result<(), ServiceError> = state
            .run_exclusive_or_abort(
                7,
                || async {
                    tokio::time::sleep(Duration::from_millis(200)).await;
                    Ok(())
                },
                || {
                    let aborted = aborted.clone();
                    async move { *aborted.lock().await = true }
                },
            )
            .await;

        assert!(matches!(result, Err(ServiceError::Timeout)));
        assert!(*aborted.lock().await);
    }

    #[tokio::test]
    async fn abort_is_skipped_when_work_finishes() {
        let state = AppState::new(config_with_timeout(1_000));
        let aborted = Arc::new(Mutex::new(false));

        let result = state
            .run_exclusive_or_abort(
                7,
                || async { Ok::<_, ServiceError>(5) },
                || {
                    let aborted = aborted.clone();
                    async move { *aborted.lock().await = true }
                },
            )
            .await;

        assert_eq!(result.unwrap(), 5);
        assert!(!*aborted.lock().await);
    }

    #[tokio::test]
    async fn gates_are_released_after_use() {
        let state = AppState::new(config_with_timeout(20));

        state
            .run_exclusive(1, || async { Ok::<_, ServiceError>(()) })
            .await
            .unwrap();
        let _ = state
            .run_exclusive(2, || async {
                tokio::time::sleep(Duration::from_millis(200)).await;
                Ok::<_, ServiceError>(())
            })
            .await;
        let _ = state
            .run_exclusive(3, || async {
                Err::<(), _>(ServiceError::InvalidInput("bad".into()))
            })
            .await;

        assert!(state.chat_gates.is_empty());
    }

    #[tokio::test]
    async fn gate_survives_while_another_caller_waits() {
        let state = AppState::new(config_with_timeout(1_000));
        let (entered_tx, entered_rx) = tokio::sync::oneshot::channel();
        let (release_tx, release_rx) = tokio::sync::oneshot::channel::<()>();

        let holder = tokio::spawn({
            let state = state.clone();
            async move {
                state
                    .run_exclusive(9, || async move {
                        let _ = entered_tx.send(());
                        let _ = release_rx.await;
                        Ok::<_, ServiceError>(())
                    })
                    .await
            }
        });
        entered_rx.await.unwrap();

        let waiter = tokio::spawn({
            let state = state.clone();
            async move {
                state
                    .run_exclusive(9, || async { Ok::<_, ServiceError>(()) })
                    .await
            }
        });
        // Let the waiter clone the gate and park on it.
        tokio::time::sleep(Duration::from_millis(20)).await;
        assert_eq!(state.chat_gates.len(), 1);

        release_tx.send(()).unwrap();
        holder.await.unwrap().unwrap();
        waiter.await.unwrap().unwrap();
        assert!(state.chat_gates.is_empty());
    }

    #[tokio::test]
    async fn run_exclusive_serializes_one_chat() {
        let state = AppState::new(config_with_timeout(1_000));
        let counter = Arc::new(Mutex::new(Vec::new()));

        let task = |label: &'static str| {
            let counter = counter.clone();
            let state = state.clone();
            async move {
                state
                    .run_exclusive(1, || async {
                        counter.lock().await.push(format!("{label}-start"));
                        tokio::time::sleep(Duration::from_millis(10)).await;
                        counter.lock().await.push(format!("{label}-end"));
                        Ok::<_, ServiceError>(())
                    })
                    .await
            }
        };

        let (a, b) = tokio::join!(task("a"), task("b"));
        assert!(a.is_ok() && b.is_ok());

        let events = counter.lock().await.clone();
        assert_eq!(events.len(), 4);
        // Each run finishes before the other starts.
        assert!(events[0].ends_with("-start") && events[1].ends_with("-end"));
        assert_eq!(events[0][..1], events[1][..1]);
    }
}

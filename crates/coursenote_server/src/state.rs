//! Shared request state.

use crate::errors::ApiError;
use coursenote_core::{
    AnnotationService, AnnotationServiceError, Clock, Notifier, SqliteAnnotationRepository,
    SubjectMatch, SystemClock,
};
use log::error;
use rusqlite::Connection;
use std::sync::{Arc, Mutex};

pub type SharedNotifier = Arc<dyn Notifier + Send + Sync>;
pub type SharedClock = Arc<dyn Clock + Send + Sync>;
pub type RequestService<'conn> =
    AnnotationService<SqliteAnnotationRepository<'conn>, SharedNotifier, SharedClock>;

/// State cloned into every handler.
#[derive(Clone)]
pub struct AppState {
    conn: Arc<Mutex<Connection>>,
    notifier: SharedNotifier,
    clock: SharedClock,
    subject_match: SubjectMatch,
}

impl AppState {
    /// Wraps a migrated connection; uses the system clock and exact subject
    /// matching.
    pub fn new(conn: Connection, notifier: SharedNotifier) -> Self {
        Self {
            conn: Arc::new(Mutex::new(conn)),
            notifier,
            clock: Arc::new(SystemClock),
            subject_match: SubjectMatch::Exact,
        }
    }

    pub fn with_clock(mut self, clock: SharedClock) -> Self {
        self.clock = clock;
        self
    }

    pub fn with_subject_match(mut self, subject_match: SubjectMatch) -> Self {
        self.subject_match = subject_match;
        self
    }

    /// Runs `f` against a per-request service on the blocking pool.
    pub(crate) async fn with_service<T>(
        &self,
        f: impl FnOnce(&RequestService<'_>) -> Result<T, AnnotationServiceError> + Send + 'static,
    ) -> Result<T, ApiError>
    where
        T: Send + 'static,
    {
        let state = self.clone();
        tokio::task::spawn_blocking(move || {
            let conn = state.conn.lock().map_err(|_| {
                error!("event=db_lock module=http status=error error_code=lock_poisoned");
                ApiError::internal("database connection is unavailable")
            })?;
            let repo = SqliteAnnotationRepository::try_new(&conn)
                .map_err(|err| ApiError::from(AnnotationServiceError::Repo(err)))?;
            let service = AnnotationService::new(repo, state.notifier.clone(), state.clock.clone())
                .with_subject_match(state.subject_match);
            f(&service).map_err(ApiError::from)
        })
        .await
        .map_err(|err| {
            error!("event=blocking_join module=http status=error error={err}");
            ApiError::internal("request worker failed")
        })?
    }
}

//! Core domain logic for CourseNote annotations.
//! This crate is the single source of truth for scheduling and retrieval
//! invariants.

pub mod db;
pub mod logging;
pub mod model;
pub mod notify;
pub mod repo;
pub mod service;
pub mod time;

pub use logging::{default_log_dir, default_log_level, init_logging, logging_status};
pub use model::annotation::{
    Annotation, AnnotationId, AnnotationKind, AnnotationValidationError, OwnerId, Recurrence,
};
pub use notify::{
    LogNotifier, NoopNotifier, Notifier, NotifyError, RecordedCall, RecordingNotifier,
    ReminderPayload,
};
pub use repo::annotation_repo::{
    AnnotationQuery, AnnotationRepository, RepoError, RepoResult, SqliteAnnotationRepository,
    SubjectMatch,
};
pub use service::annotation_service::{
    AnnotationFilter, AnnotationInput, AnnotationService, AnnotationServiceError, ReminderSchedule,
    SaveOutcome, SchedulingFailure, SchedulingWarning,
};
pub use time::{Clock, FixedClock, SystemClock, TimeError};

/// Minimal health-check probe.
pub fn ping() -> &'static str {
    "pong"
}

/// Returns the core crate version.
pub fn core_version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}

#[cfg(test)]
mod tests {
    use super::{core_version, ping};

    #[test]
    fn ping_returns_pong() {
        assert_eq!(ping(), "pong");
    }

    #[test]
    fn version_is_not_empty() {
        assert!(!core_version().is_empty());
    }
}

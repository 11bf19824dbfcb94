//! Annotation store use-case service.
//!
//! # Responsibility
//! - Turn raw form input into canonical annotations through `time`.
//! - Drive the notifier for reminders before committing the record.
//! - Own the filter/ordering contract of `list`.
//!
//! # Invariants
//! - Validation and time normalization fail before any side effect.
//! - Reminder scheduling is best-effort: a failed or impossible schedule is
//!   reported as a `SchedulingWarning`, never as a failed save.
//! - At most one notifier call per create/update; no retries.
//! - Edits and deletes never cancel previously scheduled reminders; the
//!   notifier has no cancel-by-reference.

use crate::model::annotation::{
    subject_key, Annotation, AnnotationId, AnnotationKind, AnnotationValidationError, OwnerId,
    Recurrence,
};
use crate::notify::{Notifier, NotifyError, ReminderPayload};
use crate::repo::annotation_repo::{
    AnnotationQuery, AnnotationRepository, RepoError, SubjectMatch,
};
use crate::time::{
    calendar_day_bounds, canonical_from_local, seconds_until_instant, seconds_until_next_daily,
    to_epoch_ms, Clock, TimeError,
};
use chrono::NaiveDate;
use log::{info, warn};
use std::error::Error;
use std::fmt::{Display, Formatter};

/// Service error for annotation use-cases.
#[derive(Debug)]
pub enum AnnotationServiceError {
    /// Missing or malformed text/recurrence field.
    InvalidAnnotation(AnnotationValidationError),
    /// Malformed `localDate` / `localTime`.
    InvalidTime(TimeError),
    /// Target annotation does not exist.
    NotFound(AnnotationId),
    /// Persistence-layer failure.
    Repo(RepoError),
    /// Internal consistency mismatch between write and read-back.
    InconsistentState(&'static str),
}

impl AnnotationServiceError {
    /// Whether the failure was caused by caller input.
    pub fn is_validation(&self) -> bool {
        matches!(self, Self::InvalidAnnotation(_) | Self::InvalidTime(_))
    }
}

impl Display for AnnotationServiceError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::InvalidAnnotation(err) => write!(f, "{err}"),
            Self::InvalidTime(err) => write!(f, "{err}"),
            Self::NotFound(id) => write!(f, "annotation not found: {id}"),
            Self::Repo(err) => write!(f, "{err}"),
            Self::InconsistentState(details) => {
                write!(f, "inconsistent annotation state: {details}")
            }
        }
    }
}

impl Error for AnnotationServiceError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::InvalidAnnotation(err) => Some(err),
            Self::InvalidTime(err) => Some(err),
            Self::Repo(err) => Some(err),
            _ => None,
        }
    }
}

impl From<RepoError> for AnnotationServiceError {
    fn from(value: RepoError) -> Self {
        match value {
            RepoError::NotFound(id) => Self::NotFound(id),
            RepoError::Validation(err) => Self::InvalidAnnotation(err),
            other => Self::Repo(other),
        }
    }
}

impl From<AnnotationValidationError> for AnnotationServiceError {
    fn from(value: AnnotationValidationError) -> Self {
        Self::InvalidAnnotation(value)
    }
}

impl From<TimeError> for AnnotationServiceError {
    fn from(value: TimeError) -> Self {
        Self::InvalidTime(value)
    }
}

/// Raw create/update input as submitted by the form layer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AnnotationInput {
    pub owner_id: OwnerId,
    pub subject_name: String,
    pub body: String,
    /// `YYYY-MM-DD`.
    pub local_date: String,
    /// `HH:MM`.
    pub local_time: String,
    pub kind: AnnotationKind,
    pub recurrence: Recurrence,
}

/// Listing filter. Every field is optional and all set fields are ANDed.
///
/// Callers are expected to always set `owner_id`; the store does not
/// enforce it.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AnnotationFilter {
    pub owner_id: Option<OwnerId>,
    pub subject_name: Option<String>,
    /// Matches records whose canonical instant falls on this UTC day.
    pub calendar_day: Option<NaiveDate>,
    pub kind: Option<AnnotationKind>,
}

/// Reminder request handed to the notifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReminderSchedule {
    Once { delay_seconds: u64 },
    Daily {
        hour: u32,
        minute: u32,
        /// Delay until the first fire; informational only.
        first_fire_in_seconds: u64,
    },
}

/// Non-fatal reminder scheduling failure reported alongside a save.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SchedulingWarning {
    pub annotation_id: AnnotationId,
    pub reason: SchedulingFailure,
}

/// Why a reminder was not scheduled.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SchedulingFailure {
    /// Delay could not be computed (e.g. the one-time target is in the past).
    Time(TimeError),
    /// The notifier refused or failed the request.
    Notifier(NotifyError),
}

impl Display for SchedulingWarning {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        let reason: &dyn Display = match &self.reason {
            SchedulingFailure::Time(err) => err,
            SchedulingFailure::Notifier(err) => err,
        };
        write!(
            f,
            "reminder for annotation {} was not scheduled: {reason}",
            self.annotation_id
        )
    }
}

/// Result of a successful create/update.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SaveOutcome {
    pub annotation: Annotation,
    /// Request accepted by the notifier, if any.
    pub scheduled: Option<ReminderSchedule>,
    pub warning: Option<SchedulingWarning>,
}

/// Annotation store facade over a repository, a notifier and a clock.
pub struct AnnotationService<R, N, C>
where
    R: AnnotationRepository,
    N: Notifier,
    C: Clock,
{
    repo: R,
    notifier: N,
    clock: C,
    subject_match: SubjectMatch,
}

impl<R, N, C> AnnotationService<R, N, C>
where
    R: AnnotationRepository,
    N: Notifier,
    C: Clock,
{
    /// Creates a service with exact subject matching.
    pub fn new(repo: R, notifier: N, clock: C) -> Self {
        Self {
            repo,
            notifier,
            clock,
            subject_match: SubjectMatch::Exact,
        }
    }

    /// Switches the subject filter mode used by `list`.
    pub fn with_subject_match(mut self, subject_match: SubjectMatch) -> Self {
        self.subject_match = subject_match;
        self
    }

    /// Creates one annotation and schedules its reminder if requested.
    ///
    /// # Contract
    /// - Validation happens before the notifier is called.
    /// - For reminders, exactly one notifier call precedes the insert.
    /// - Scheduling failures surface as `SaveOutcome::warning`.
    pub fn create(&self, input: AnnotationInput) -> Result<SaveOutcome, AnnotationServiceError> {
        let annotation = build_annotation(None, &input)?;
        let (scheduled, warning) = self.schedule_reminder(&annotation);

        let id = self.repo.insert_annotation(&annotation)?;
        let stored = self
            .repo
            .get_annotation(id)?
            .ok_or(AnnotationServiceError::InconsistentState(
                "created annotation not found in read-back",
            ))?;

        info!(
            "event=annotation_create module=service status=ok annotation_id={} owner_id={} kind={} scheduled={} warning={}",
            stored.id,
            stored.owner_id,
            stored.kind,
            scheduled.is_some(),
            warning.is_some()
        );
        Ok(SaveOutcome {
            annotation: stored,
            scheduled,
            warning,
        })
    }

    /// Replaces every field of an existing annotation.
    ///
    /// Unknown ids fail with `NotFound` before the notifier is touched.
    pub fn update(
        &self,
        id: AnnotationId,
        input: AnnotationInput,
    ) -> Result<SaveOutcome, AnnotationServiceError> {
        let annotation = build_annotation(Some(id), &input)?;
        if self.repo.get_annotation(id)?.is_none() {
            return Err(AnnotationServiceError::NotFound(id));
        }

        let (scheduled, warning) = self.schedule_reminder(&annotation);
        self.repo.replace_annotation(&annotation)?;
        let stored = self
            .repo
            .get_annotation(id)?
            .ok_or(AnnotationServiceError::InconsistentState(
                "updated annotation not found in read-back",
            ))?;

        info!(
            "event=annotation_update module=service status=ok annotation_id={} owner_id={} kind={} scheduled={} warning={}",
            stored.id,
            stored.owner_id,
            stored.kind,
            scheduled.is_some(),
            warning.is_some()
        );
        Ok(SaveOutcome {
            annotation: stored,
            scheduled,
            warning,
        })
    }

    /// Deletes one annotation. Already scheduled reminders keep firing.
    pub fn delete(&self, id: AnnotationId) -> Result<(), AnnotationServiceError> {
        self.repo.delete_annotation(id)?;
        info!("event=annotation_delete module=service status=ok annotation_id={id}");
        Ok(())
    }

    /// Gets one annotation by id.
    pub fn get(&self, id: AnnotationId) -> Result<Annotation, AnnotationServiceError> {
        self.repo
            .get_annotation(id)?
            .ok_or(AnnotationServiceError::NotFound(id))
    }

    /// Lists annotations matching `filter`, ascending by canonical instant.
    ///
    /// Blank `subject_name` values are ignored rather than matching nothing.
    pub fn list(
        &self,
        filter: &AnnotationFilter,
    ) -> Result<Vec<Annotation>, AnnotationServiceError> {
        let timestamp_range_ms = match filter.calendar_day {
            Some(day) => {
                let (start, end) = calendar_day_bounds(day)?;
                Some((to_epoch_ms(start), to_epoch_ms(end)))
            }
            None => None,
        };
        let query = AnnotationQuery {
            owner_id: filter.owner_id,
            subject_key: filter
                .subject_name
                .as_deref()
                .map(subject_key)
                .filter(|key| !key.is_empty()),
            subject_match: self.subject_match,
            timestamp_range_ms,
            kind: filter.kind,
        };
        Ok(self.repo.list_annotations(&query)?)
    }

    fn schedule_reminder(
        &self,
        annotation: &Annotation,
    ) -> (Option<ReminderSchedule>, Option<SchedulingWarning>) {
        if annotation.kind != AnnotationKind::Reminder {
            return (None, None);
        }

        let now = self.clock.now();
        let payload = ReminderPayload::for_annotation(annotation);
        let attempt = match annotation.recurrence {
            Recurrence::DailyAt { hour, minute } => seconds_until_next_daily(hour, minute, now)
                .map_err(SchedulingFailure::Time)
                .and_then(|first_fire_in_seconds| {
                    self.notifier
                        .schedule_daily(hour, minute, &payload)
                        .map_err(SchedulingFailure::Notifier)?;
                    Ok(ReminderSchedule::Daily {
                        hour,
                        minute,
                        first_fire_in_seconds,
                    })
                }),
            Recurrence::None => seconds_until_instant(annotation.canonical_timestamp, now)
                .map_err(SchedulingFailure::Time)
                .and_then(|delay_seconds| {
                    self.notifier
                        .schedule_once(delay_seconds, &payload)
                        .map_err(SchedulingFailure::Notifier)?;
                    Ok(ReminderSchedule::Once { delay_seconds })
                }),
        };

        match attempt {
            Ok(schedule) => {
                info!(
                    "event=reminder_schedule module=service status=ok annotation_id={} schedule={:?}",
                    annotation.id, schedule
                );
                (Some(schedule), None)
            }
            Err(reason) => {
                let warning = SchedulingWarning {
                    annotation_id: annotation.id,
                    reason,
                };
                warn!(
                    "event=reminder_schedule module=service status=warning annotation_id={} reason={}",
                    annotation.id, warning
                );
                (None, Some(warning))
            }
        }
    }
}

fn build_annotation(
    id: Option<AnnotationId>,
    input: &AnnotationInput,
) -> Result<Annotation, AnnotationServiceError> {
    if input.subject_name.trim().is_empty() {
        return Err(AnnotationValidationError::EmptySubjectName.into());
    }
    if input.body.trim().is_empty() {
        return Err(AnnotationValidationError::EmptyBody.into());
    }
    let canonical_timestamp = canonical_from_local(&input.local_date, &input.local_time)?;
    let annotation = match id {
        Some(id) => Annotation::with_id(
            id,
            input.owner_id,
            &input.subject_name,
            &input.body,
            canonical_timestamp,
            input.kind,
            input.recurrence,
        ),
        None => Annotation::new(
            input.owner_id,
            &input.subject_name,
            &input.body,
            canonical_timestamp,
            input.kind,
            input.recurrence,
        ),
    };
    annotation.validate()?;
    Ok(annotation)
}

//! Reminder notifier contract.
//!
//! # Responsibility
//! - Define the two scheduling primitives the OS-level notifier exposes.
//! - Provide in-process implementations for servers and tests.
//!
//! # Invariants
//! - Notifiers receive a plain delay in seconds or an hour/minute pair, never
//!   a date object subject to reinterpretation.
//! - Calls are fire-and-forget: no handle is returned, nothing can be
//!   cancelled later.

use crate::model::annotation::{Annotation, AnnotationId, OwnerId};
use log::info;
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::sync::{Arc, Mutex};

/// Content shown when a reminder fires.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReminderPayload {
    pub annotation_id: AnnotationId,
    pub owner_id: OwnerId,
    /// Subject name, used as the notification title.
    pub title: String,
    pub body: String,
}

impl ReminderPayload {
    pub fn for_annotation(annotation: &Annotation) -> Self {
        Self {
            annotation_id: annotation.id,
            owner_id: annotation.owner_id,
            title: annotation.subject_name.clone(),
            body: annotation.body.clone(),
        }
    }
}

/// Notifier-side failure.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NotifyError {
    /// The delivery backend could not be reached.
    Unavailable(String),
    /// The backend refused the request (e.g. permission denied).
    Rejected(String),
}

impl Display for NotifyError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Unavailable(details) => write!(f, "notifier unavailable: {details}"),
            Self::Rejected(details) => write!(f, "notifier rejected request: {details}"),
        }
    }
}

impl Error for NotifyError {}

/// External notification primitive.
pub trait Notifier {
    /// Fires once after `delay_seconds`.
    fn schedule_once(&self, delay_seconds: u64, payload: &ReminderPayload)
        -> Result<(), NotifyError>;
    /// Fires every day at `hour:minute` UTC wall-clock.
    fn schedule_daily(
        &self,
        hour: u32,
        minute: u32,
        payload: &ReminderPayload,
    ) -> Result<(), NotifyError>;
}

impl<N: Notifier + ?Sized> Notifier for &N {
    fn schedule_once(
        &self,
        delay_seconds: u64,
        payload: &ReminderPayload,
    ) -> Result<(), NotifyError> {
        (**self).schedule_once(delay_seconds, payload)
    }

    fn schedule_daily(
        &self,
        hour: u32,
        minute: u32,
        payload: &ReminderPayload,
    ) -> Result<(), NotifyError> {
        (**self).schedule_daily(hour, minute, payload)
    }
}

impl<N: Notifier + ?Sized> Notifier for Arc<N> {
    fn schedule_once(
        &self,
        delay_seconds: u64,
        payload: &ReminderPayload,
    ) -> Result<(), NotifyError> {
        (**self).schedule_once(delay_seconds, payload)
    }

    fn schedule_daily(
        &self,
        hour: u32,
        minute: u32,
        payload: &ReminderPayload,
    ) -> Result<(), NotifyError> {
        (**self).schedule_daily(hour, minute, payload)
    }
}

/// Records every request as a log event. Used when no device notifier is
/// attached to the server process.
#[derive(Debug, Clone, Copy, Default)]
pub struct LogNotifier;

impl Notifier for LogNotifier {
    fn schedule_once(
        &self,
        delay_seconds: u64,
        payload: &ReminderPayload,
    ) -> Result<(), NotifyError> {
        info!(
            "event=reminder_dispatch module=notify mode=once annotation_id={} owner_id={} delay_s={}",
            payload.annotation_id, payload.owner_id, delay_seconds
        );
        Ok(())
    }

    fn schedule_daily(
        &self,
        hour: u32,
        minute: u32,
        payload: &ReminderPayload,
    ) -> Result<(), NotifyError> {
        info!(
            "event=reminder_dispatch module=notify mode=daily annotation_id={} owner_id={} at={:02}:{:02}",
            payload.annotation_id, payload.owner_id, hour, minute
        );
        Ok(())
    }
}

/// Accepts and discards every request.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopNotifier;

impl Notifier for NoopNotifier {
    fn schedule_once(&self, _: u64, _: &ReminderPayload) -> Result<(), NotifyError> {
        Ok(())
    }

    fn schedule_daily(&self, _: u32, _: u32, _: &ReminderPayload) -> Result<(), NotifyError> {
        Ok(())
    }
}

/// One request observed by [`RecordingNotifier`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RecordedCall {
    Once {
        delay_seconds: u64,
        payload: ReminderPayload,
    },
    Daily {
        hour: u32,
        minute: u32,
        payload: ReminderPayload,
    },
}

/// Keeps every request in memory; optionally fails each one.
#[derive(Debug, Default)]
pub struct RecordingNotifier {
    calls: Mutex<Vec<RecordedCall>>,
    failure: Option<NotifyError>,
}

impl RecordingNotifier {
    pub fn new() -> Self {
        Self::default()
    }

    /// Records requests, then answers each with `error`.
    pub fn failing(error: NotifyError) -> Self {
        Self {
            calls: Mutex::new(Vec::new()),
            failure: Some(error),
        }
    }

    /// Snapshot of observed requests in call order.
    pub fn calls(&self) -> Vec<RecordedCall> {
        match self.calls.lock() {
            Ok(calls) => calls.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }

    fn record(&self, call: RecordedCall) -> Result<(), NotifyError> {
        match self.calls.lock() {
            Ok(mut calls) => calls.push(call),
            Err(poisoned) => poisoned.into_inner().push(call),
        }
        match &self.failure {
            Some(error) => Err(error.clone()),
            None => Ok(()),
        }
    }
}

impl Notifier for RecordingNotifier {
    fn schedule_once(
        &self,
        delay_seconds: u64,
        payload: &ReminderPayload,
    ) -> Result<(), NotifyError> {
        self.record(RecordedCall::Once {
            delay_seconds,
            payload: payload.clone(),
        })
    }

    fn schedule_daily(
        &self,
        hour: u32,
        minute: u32,
        payload: &ReminderPayload,
    ) -> Result<(), NotifyError> {
        self.record(RecordedCall::Daily {
            hour,
            minute,
            payload: payload.clone(),
        })
    }
}

//! Wire shapes for the annotation endpoints.

use crate::errors::ApiError;
use coursenote_core::time::parse_calendar_date;
use coursenote_core::{
    Annotation, AnnotationFilter, AnnotationInput, AnnotationKind, OwnerId, Recurrence,
    SaveOutcome,
};
use serde::{Deserialize, Serialize};

/// POST/PUT body.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnnotationBody {
    pub owner_id: OwnerId,
    pub subject_name: String,
    pub body: String,
    pub local_date: String,
    pub local_time: String,
    /// Missing kind means a plain note.
    #[serde(default)]
    pub kind: Option<AnnotationKind>,
    #[serde(default)]
    pub recurrence: Option<Recurrence>,
}

impl From<AnnotationBody> for AnnotationInput {
    fn from(value: AnnotationBody) -> Self {
        Self {
            owner_id: value.owner_id,
            subject_name: value.subject_name,
            body: value.body,
            local_date: value.local_date,
            local_time: value.local_time,
            kind: value.kind.unwrap_or_default(),
            recurrence: value.recurrence.unwrap_or_default(),
        }
    }
}

/// GET `/annotations` query string. Values stay raw so errors can name the
/// offending parameter.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListParams {
    pub owner_id: Option<String>,
    pub calendar_day: Option<String>,
    pub subject_name: Option<String>,
    pub kind: Option<String>,
}

impl ListParams {
    /// Validates parameters; `ownerId` is mandatory at the HTTP boundary.
    pub fn into_filter(self) -> Result<AnnotationFilter, ApiError> {
        let owner_id = match self.owner_id.as_deref().map(str::trim) {
            None | Some("") => return Err(ApiError::bad_request("ownerId is required")),
            Some(raw) => raw
                .parse::<OwnerId>()
                .map_err(|_| ApiError::bad_request(format!("invalid ownerId: `{raw}`")))?,
        };

        let calendar_day = match self.calendar_day.as_deref().map(str::trim) {
            None | Some("") => None,
            Some(raw) => Some(
                parse_calendar_date("calendarDay", raw)
                    .map_err(|err| ApiError::bad_request(err.to_string()))?,
            ),
        };

        let kind = match self.kind.as_deref().map(str::trim) {
            None | Some("") => None,
            Some(raw) => Some(AnnotationKind::parse(raw).ok_or_else(|| {
                ApiError::bad_request(format!(
                    "invalid kind: `{raw}`; expected note|reminder"
                ))
            })?),
        };

        Ok(AnnotationFilter {
            owner_id: Some(owner_id),
            subject_name: self.subject_name,
            calendar_day,
            kind,
        })
    }
}

/// Create/update response: the record plus an optional scheduling warning.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SavedAnnotation {
    #[serde(flatten)]
    pub annotation: Annotation,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub scheduling_warning: Option<String>,
}

impl From<SaveOutcome> for SavedAnnotation {
    fn from(value: SaveOutcome) -> Self {
        Self {
            annotation: value.annotation,
            scheduling_warning: value.warning.map(|warning| warning.to_string()),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct MessageResponse {
    pub message: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub version: &'static str,
}

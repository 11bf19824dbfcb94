//! Annotation repository contracts and SQLite implementation.
//!
//! # Responsibility
//! - Provide CRUD and filtered listing over the `annotations` table.
//! - Keep SQL details inside the core persistence boundary.
//!
//! # Invariants
//! - Write paths call `Annotation::validate()` before SQL mutations.
//! - Read paths reject invalid persisted state instead of masking it.
//! - List order is `canonical_ts ASC, id ASC`.

use crate::db::DbError;
use crate::model::annotation::{
    Annotation, AnnotationId, AnnotationKind, AnnotationValidationError, OwnerId, Recurrence,
};
use crate::time::{from_epoch_ms, to_epoch_ms};
use rusqlite::types::Value;
use rusqlite::{params, params_from_iter, Connection, Row};
use std::error::Error;
use std::fmt::{Display, Formatter};
use uuid::Uuid;

const ANNOTATION_SELECT_SQL: &str = "SELECT
    id,
    owner_id,
    subject_name,
    body,
    canonical_ts,
    kind,
    recurrence_hour,
    recurrence_minute
FROM annotations";

const REQUIRED_COLUMNS: &[&str] = &[
    "id",
    "owner_id",
    "subject_name",
    "subject_key",
    "body",
    "canonical_ts",
    "kind",
    "recurrence_hour",
    "recurrence_minute",
];

pub type RepoResult<T> = Result<T, RepoError>;

/// Repository error for annotation persistence and query operations.
#[derive(Debug)]
pub enum RepoError {
    Validation(AnnotationValidationError),
    Db(DbError),
    NotFound(AnnotationId),
    InvalidData(String),
    MissingRequiredTable(&'static str),
    MissingRequiredColumn {
        table: &'static str,
        column: &'static str,
    },
}

impl Display for RepoError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Validation(err) => write!(f, "{err}"),
            Self::Db(err) => write!(f, "{err}"),
            Self::NotFound(id) => write!(f, "annotation not found: {id}"),
            Self::InvalidData(message) => {
                write!(f, "invalid persisted annotation data: {message}")
            }
            Self::MissingRequiredTable(table) => write!(f, "missing required table `{table}`"),
            Self::MissingRequiredColumn { table, column } => {
                write!(f, "missing required column `{table}.{column}`")
            }
        }
    }
}

impl Error for RepoError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Validation(err) => Some(err),
            Self::Db(err) => Some(err),
            _ => None,
        }
    }
}

impl From<AnnotationValidationError> for RepoError {
    fn from(value: AnnotationValidationError) -> Self {
        Self::Validation(value)
    }
}

impl From<DbError> for RepoError {
    fn from(value: DbError) -> Self {
        Self::Db(value)
    }
}

impl From<rusqlite::Error> for RepoError {
    fn from(value: rusqlite::Error) -> Self {
        Self::Db(DbError::Sqlite(value))
    }
}

/// How `subject_key` is compared against a stored subject.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum SubjectMatch {
    /// Case-insensitive equality.
    #[default]
    Exact,
    /// Case-insensitive containment.
    Substring,
}

/// Storage-level listing query. All set fields are ANDed.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AnnotationQuery {
    pub owner_id: Option<OwnerId>,
    /// Already lowercased subject key.
    pub subject_key: Option<String>,
    pub subject_match: SubjectMatch,
    /// Half-open `[start_ms, end_ms)` range on `canonical_ts`.
    pub timestamp_range_ms: Option<(i64, i64)>,
    pub kind: Option<AnnotationKind>,
}

/// Repository interface for annotation storage.
pub trait AnnotationRepository {
    fn insert_annotation(&self, annotation: &Annotation) -> RepoResult<AnnotationId>;
    /// Replaces every field of an existing row.
    fn replace_annotation(&self, annotation: &Annotation) -> RepoResult<()>;
    fn get_annotation(&self, id: AnnotationId) -> RepoResult<Option<Annotation>>;
    fn list_annotations(&self, query: &AnnotationQuery) -> RepoResult<Vec<Annotation>>;
    fn delete_annotation(&self, id: AnnotationId) -> RepoResult<()>;
}

/// SQLite-backed annotation repository.
pub struct SqliteAnnotationRepository<'conn> {
    conn: &'conn Connection,
}

impl<'conn> SqliteAnnotationRepository<'conn> {
    /// Constructs a repository from a migrated connection.
    ///
    /// # Errors
    /// - `MissingRequiredTable` / `MissingRequiredColumn` when the connection
    ///   was not prepared by `db::open_db*`.
    pub fn try_new(conn: &'conn Connection) -> RepoResult<Self> {
        ensure_connection_ready(conn)?;
        Ok(Self { conn })
    }
}

impl AnnotationRepository for SqliteAnnotationRepository<'_> {
    fn insert_annotation(&self, annotation: &Annotation) -> RepoResult<AnnotationId> {
        annotation.validate()?;
        let (hour, minute) = recurrence_to_db(annotation.recurrence);

        self.conn.execute(
            "INSERT INTO annotations (
                id,
                owner_id,
                subject_name,
                subject_key,
                body,
                canonical_ts,
                kind,
                recurrence_hour,
                recurrence_minute
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9);",
            params![
                annotation.id.to_string(),
                annotation.owner_id,
                annotation.subject_name.as_str(),
                annotation.subject_key(),
                annotation.body.as_str(),
                to_epoch_ms(annotation.canonical_timestamp),
                annotation.kind.as_str(),
                hour,
                minute,
            ],
        )?;

        Ok(annotation.id)
    }

    fn replace_annotation(&self, annotation: &Annotation) -> RepoResult<()> {
        annotation.validate()?;
        let (hour, minute) = recurrence_to_db(annotation.recurrence);

        let changed = self.conn.execute(
            "UPDATE annotations
             SET
                owner_id = ?1,
                subject_name = ?2,
                subject_key = ?3,
                body = ?4,
                canonical_ts = ?5,
                kind = ?6,
                recurrence_hour = ?7,
                recurrence_minute = ?8,
                updated_at = (strftime('%s', 'now') * 1000)
             WHERE id = ?9;",
            params![
                annotation.owner_id,
                annotation.subject_name.as_str(),
                annotation.subject_key(),
                annotation.body.as_str(),
                to_epoch_ms(annotation.canonical_timestamp),
                annotation.kind.as_str(),
                hour,
                minute,
                annotation.id.to_string(),
            ],
        )?;

        if changed == 0 {
            return Err(RepoError::NotFound(annotation.id));
        }

        Ok(())
    }

    fn get_annotation(&self, id: AnnotationId) -> RepoResult<Option<Annotation>> {
        let mut stmt = self
            .conn
            .prepare(&format!("{ANNOTATION_SELECT_SQL} WHERE id = ?1;"))?;

        let mut rows = stmt.query([id.to_string()])?;
        if let Some(row) = rows.next()? {
            return Ok(Some(parse_annotation_row(row)?));
        }

        Ok(None)
    }

    fn list_annotations(&self, query: &AnnotationQuery) -> RepoResult<Vec<Annotation>> {
        let mut sql = format!("{ANNOTATION_SELECT_SQL} WHERE 1 = 1");
        let mut bind_values: Vec<Value> = Vec::new();

        if let Some(owner_id) = query.owner_id {
            sql.push_str(" AND owner_id = ?");
            bind_values.push(Value::Integer(owner_id));
        }

        if let Some(subject_key) = query.subject_key.as_ref() {
            match query.subject_match {
                SubjectMatch::Exact => sql.push_str(" AND subject_key = ?"),
                SubjectMatch::Substring => sql.push_str(" AND instr(subject_key, ?) > 0"),
            }
            bind_values.push(Value::Text(subject_key.clone()));
        }

        if let Some((start_ms, end_ms)) = query.timestamp_range_ms {
            sql.push_str(" AND canonical_ts >= ? AND canonical_ts < ?");
            bind_values.push(Value::Integer(start_ms));
            bind_values.push(Value::Integer(end_ms));
        }

        if let Some(kind) = query.kind {
            sql.push_str(" AND kind = ?");
            bind_values.push(Value::Text(kind.as_str().to_string()));
        }

        sql.push_str(" ORDER BY canonical_ts ASC, id ASC");

        let mut stmt = self.conn.prepare(&sql)?;
        let mut rows = stmt.query(params_from_iter(bind_values))?;
        let mut annotations = Vec::new();

        while let Some(row) = rows.next()? {
            annotations.push(parse_annotation_row(row)?);
        }

        Ok(annotations)
    }

    fn delete_annotation(&self, id: AnnotationId) -> RepoResult<()> {
        let changed = self
            .conn
            .execute("DELETE FROM annotations WHERE id = ?1;", [id.to_string()])?;

        if changed == 0 {
            return Err(RepoError::NotFound(id));
        }

        Ok(())
    }
}

fn parse_annotation_row(row: &Row<'_>) -> RepoResult<Annotation> {
    let id_text: String = row.get("id")?;
    let id = Uuid::parse_str(&id_text).map_err(|_| {
        RepoError::InvalidData(format!("invalid uuid value `{id_text}` in annotations.id"))
    })?;

    let kind_text: String = row.get("kind")?;
    let kind = AnnotationKind::parse(&kind_text).ok_or_else(|| {
        RepoError::InvalidData(format!(
            "invalid kind `{kind_text}` in annotations.kind for {id}"
        ))
    })?;

    let canonical_ms: i64 = row.get("canonical_ts")?;
    let canonical_timestamp = from_epoch_ms(canonical_ms).ok_or_else(|| {
        RepoError::InvalidData(format!(
            "out-of-range canonical_ts `{canonical_ms}` for {id}"
        ))
    })?;

    let recurrence = match (
        row.get::<_, Option<u32>>("recurrence_hour")?,
        row.get::<_, Option<u32>>("recurrence_minute")?,
    ) {
        (None, None) => Recurrence::None,
        (Some(hour), Some(minute)) => Recurrence::DailyAt { hour, minute },
        (hour, minute) => {
            return Err(RepoError::InvalidData(format!(
                "half-set recurrence hour={hour:?} minute={minute:?} for {id}"
            )));
        }
    };

    let annotation = Annotation {
        id,
        owner_id: row.get("owner_id")?,
        subject_name: row.get("subject_name")?,
        body: row.get("body")?,
        canonical_timestamp,
        kind,
        recurrence,
    };
    annotation.validate()?;
    Ok(annotation)
}

fn recurrence_to_db(recurrence: Recurrence) -> (Option<u32>, Option<u32>) {
    match recurrence.daily_time() {
        Some((hour, minute)) => (Some(hour), Some(minute)),
        None => (None, None),
    }
}

fn ensure_connection_ready(conn: &Connection) -> RepoResult<()> {
    let exists: i64 = conn.query_row(
        "SELECT EXISTS(
            SELECT 1
            FROM sqlite_master
            WHERE type = 'table' AND name = 'annotations'
        );",
        [],
        |row| row.get(0),
    )?;
    if exists != 1 {
        return Err(RepoError::MissingRequiredTable("annotations"));
    }

    let mut stmt = conn.prepare("PRAGMA table_info(annotations);")?;
    let mut rows = stmt.query([])?;
    let mut present = Vec::new();
    while let Some(row) = rows.next()? {
        present.push(row.get::<_, String>(1)?);
    }

    for &column in REQUIRED_COLUMNS {
        if !present.iter().any(|name| name.as_str() == column) {
            return Err(RepoError::MissingRequiredColumn {
                table: "annotations",
                column,
            });
        }
    }

    Ok(())
}

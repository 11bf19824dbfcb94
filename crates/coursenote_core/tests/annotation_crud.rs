use chrono::{TimeZone, Utc};
use coursenote_core::db::open_db_in_memory;
use coursenote_core::{
    Annotation, AnnotationKind, AnnotationQuery, AnnotationRepository, Recurrence, RepoError,
    SqliteAnnotationRepository, SubjectMatch,
};
use rusqlite::params;
use uuid::Uuid;

fn annotation_at(owner_id: i64, subject: &str, day: u32, hour: u32) -> Annotation {
    Annotation::new(
        owner_id,
        subject,
        format!("{subject} on day {day} at {hour}"),
        Utc.with_ymd_and_hms(2025, 3, day, hour, 0, 0).unwrap(),
        AnnotationKind::Note,
        Recurrence::None,
    )
}

#[test]
fn insert_and_get_roundtrip() {
    let conn = open_db_in_memory().unwrap();
    let repo = SqliteAnnotationRepository::try_new(&conn).unwrap();

    let annotation = Annotation::new(
        7,
        "Álgebra Linear",
        "lista 3",
        Utc.with_ymd_and_hms(2025, 3, 10, 9, 0, 0).unwrap(),
        AnnotationKind::Reminder,
        Recurrence::DailyAt { hour: 8, minute: 30 },
    );
    let id = repo.insert_annotation(&annotation).unwrap();

    let loaded = repo.get_annotation(id).unwrap().unwrap();
    assert_eq!(loaded, annotation);
}

#[test]
fn insert_rejects_invalid_annotation() {
    let conn = open_db_in_memory().unwrap();
    let repo = SqliteAnnotationRepository::try_new(&conn).unwrap();

    let mut annotation = annotation_at(1, "Physics", 10, 9);
    annotation.body = "  ".to_string();
    let err = repo.insert_annotation(&annotation).unwrap_err();
    assert!(matches!(err, RepoError::Validation(_)));
}

#[test]
fn replace_overwrites_every_field() {
    let conn = open_db_in_memory().unwrap();
    let repo = SqliteAnnotationRepository::try_new(&conn).unwrap();

    let original = annotation_at(1, "Physics", 10, 9);
    repo.insert_annotation(&original).unwrap();

    let replacement = Annotation::with_id(
        original.id,
        2,
        "Chemistry",
        "moved",
        Utc.with_ymd_and_hms(2025, 4, 1, 14, 15, 0).unwrap(),
        AnnotationKind::Reminder,
        Recurrence::DailyAt { hour: 7, minute: 0 },
    );
    repo.replace_annotation(&replacement).unwrap();

    let loaded = repo.get_annotation(original.id).unwrap().unwrap();
    assert_eq!(loaded, replacement);
}

#[test]
fn replace_and_delete_unknown_id_return_not_found() {
    let conn = open_db_in_memory().unwrap();
    let repo = SqliteAnnotationRepository::try_new(&conn).unwrap();

    let ghost = annotation_at(1, "Physics", 10, 9);
    assert!(matches!(
        repo.replace_annotation(&ghost),
        Err(RepoError::NotFound(id)) if id == ghost.id
    ));
    assert!(matches!(
        repo.delete_annotation(ghost.id),
        Err(RepoError::NotFound(_))
    ));
}

#[test]
fn delete_removes_row() {
    let conn = open_db_in_memory().unwrap();
    let repo = SqliteAnnotationRepository::try_new(&conn).unwrap();

    let annotation = annotation_at(1, "Physics", 10, 9);
    repo.insert_annotation(&annotation).unwrap();
    repo.delete_annotation(annotation.id).unwrap();

    assert!(repo.get_annotation(annotation.id).unwrap().is_none());
    let remaining: i64 = conn
        .query_row("SELECT COUNT(*) FROM annotations;", [], |row| row.get(0))
        .unwrap();
    assert_eq!(remaining, 0);
}

#[test]
fn list_orders_by_canonical_timestamp_then_id() {
    let conn = open_db_in_memory().unwrap();
    let repo = SqliteAnnotationRepository::try_new(&conn).unwrap();

    let late = annotation_at(1, "Physics", 10, 15);
    let early = annotation_at(1, "Physics", 10, 8);
    let tie_a = annotation_at(1, "Physics", 10, 11);
    let tie_b = annotation_at(1, "Physics", 10, 11);
    for annotation in [&late, &early, &tie_a, &tie_b] {
        repo.insert_annotation(annotation).unwrap();
    }

    let listed = repo.list_annotations(&AnnotationQuery::default()).unwrap();
    let mut ties = vec![tie_a.id, tie_b.id];
    ties.sort_by_key(|id| id.to_string());
    let expected = vec![early.id, ties[0], ties[1], late.id];
    assert_eq!(
        listed.iter().map(|annotation| annotation.id).collect::<Vec<_>>(),
        expected
    );
}

#[test]
fn list_filters_are_anded() {
    let conn = open_db_in_memory().unwrap();
    let repo = SqliteAnnotationRepository::try_new(&conn).unwrap();

    let target = annotation_at(2, "Cálculo I", 10, 9);
    let other_owner = annotation_at(3, "Cálculo I", 10, 9);
    let other_subject = annotation_at(2, "Física", 10, 9);
    let other_day = annotation_at(2, "Cálculo I", 11, 9);
    for annotation in [&target, &other_owner, &other_subject, &other_day] {
        repo.insert_annotation(annotation).unwrap();
    }

    let start = Utc.with_ymd_and_hms(2025, 3, 10, 0, 0, 0).unwrap();
    let end = Utc.with_ymd_and_hms(2025, 3, 11, 0, 0, 0).unwrap();
    let listed = repo
        .list_annotations(&AnnotationQuery {
            owner_id: Some(2),
            subject_key: Some("cálculo i".to_string()),
            subject_match: SubjectMatch::Exact,
            timestamp_range_ms: Some((start.timestamp_millis(), end.timestamp_millis())),
            kind: Some(AnnotationKind::Note),
        })
        .unwrap();
    assert_eq!(listed, vec![target]);
}

#[test]
fn list_subject_substring_mode_matches_fragments() {
    let conn = open_db_in_memory().unwrap();
    let repo = SqliteAnnotationRepository::try_new(&conn).unwrap();

    let calc_one = annotation_at(1, "Cálculo I", 10, 9);
    let calc_two = annotation_at(1, "Cálculo II", 10, 10);
    let physics = annotation_at(1, "Física", 10, 11);
    for annotation in [&calc_one, &calc_two, &physics] {
        repo.insert_annotation(annotation).unwrap();
    }

    let exact = repo
        .list_annotations(&AnnotationQuery {
            subject_key: Some("cálculo i".to_string()),
            ..AnnotationQuery::default()
        })
        .unwrap();
    assert_eq!(exact, vec![calc_one.clone()]);

    let substring = repo
        .list_annotations(&AnnotationQuery {
            subject_key: Some("cálculo".to_string()),
            subject_match: SubjectMatch::Substring,
            ..AnnotationQuery::default()
        })
        .unwrap();
    assert_eq!(substring, vec![calc_one, calc_two]);
}

#[test]
fn get_rejects_corrupted_kind() {
    let conn = open_db_in_memory().unwrap();
    let repo = SqliteAnnotationRepository::try_new(&conn).unwrap();

    let id = Uuid::new_v4();
    conn.execute(
        "INSERT INTO annotations (id, owner_id, subject_name, subject_key, body, canonical_ts, kind)
         VALUES (?1, 1, 'Math', 'math', 'body', 0, 'note');",
        params![id.to_string()],
    )
    .unwrap();
    // CHECK constraints guard inserts; simulate legacy data by disabling them.
    conn.execute_batch("PRAGMA ignore_check_constraints = ON;")
        .unwrap();
    conn.execute(
        "UPDATE annotations SET kind = 'anotacao' WHERE id = ?1;",
        params![id.to_string()],
    )
    .unwrap();

    let err = repo.get_annotation(id).unwrap_err();
    assert!(matches!(err, RepoError::InvalidData(message) if message.contains("anotacao")));
}

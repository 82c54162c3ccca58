mod common;

use annotator_core::db::open_db_in_memory;
use annotator_core::{
    AnnotationRepository, DeleteKind, MemorySource, NewRecord, RepoError, ServiceError,
    SqliteAnnotationRepository,
};
use common::{
    acme_biluo, acme_spans, articles, broken_biluo, cols, loaded_db, service,
};
use std::collections::HashSet;

#[test]
fn load_assigns_unique_ids_and_keeps_selected_columns() {
    let conn = open_db_in_memory().unwrap();
    let report = service(&conn)
        .load_source(&articles(), &cols(&["Body", "Title"]))
        .unwrap();
    assert_eq!(report.inserted, 3);
    assert_eq!(report.columns, cols(&["Body", "Title"]));

    let records = service(&conn).list_records().unwrap();
    assert_eq!(records.len(), 3);
    assert_eq!(records[0].field("Body"), Some("Acme hires Bob"));
    assert_eq!(records[2].field("Title"), None, "empty cell is stored as null");
    assert!(records.iter().all(|record| record.field("Id").is_none()));
    assert!(records.iter().all(|record| record.is_unannotated()));

    let ids: HashSet<_> = records.iter().map(|record| record.unique_id.clone()).collect();
    assert_eq!(ids.len(), 3);
    let indexes: Vec<_> = records.iter().map(|record| record.index).collect();
    assert!(indexes.windows(2).all(|pair| pair[0] < pair[1]));
}

#[test]
fn loading_twice_doubles_row_count() {
    let conn = loaded_db();
    let repo = SqliteAnnotationRepository::new(&conn);
    assert_eq!(repo.count_records().unwrap(), 3);

    service(&conn)
        .load_source(&articles(), &cols(&["Title", "Body"]))
        .unwrap();
    assert_eq!(repo.count_records().unwrap(), 6);

    let ids: HashSet<_> = repo
        .list_records()
        .unwrap()
        .into_iter()
        .map(|record| record.unique_id)
        .collect();
    assert_eq!(ids.len(), 6, "reloaded rows get fresh identifiers");
}

#[test]
fn empty_column_subset_imports_every_column() {
    let conn = open_db_in_memory().unwrap();
    let report = service(&conn).load_source(&articles(), &[]).unwrap();
    assert_eq!(report.columns, cols(&["Id", "Title", "Body"]));

    let first = &service(&conn).list_records().unwrap()[0];
    assert_eq!(first.field("Id"), Some("1"));
}

#[test]
fn load_with_unknown_column_creates_nothing() {
    let conn = open_db_in_memory().unwrap();
    let err = service(&conn)
        .load_source(&articles(), &cols(&["Author"]))
        .unwrap_err();
    assert!(matches!(err, ServiceError::Source(_)));
    assert!(!service(&conn).is_initialized().unwrap());
}

#[test]
fn save_updates_only_the_target_record() {
    let conn = loaded_db();
    let before = service(&conn).list_records().unwrap();
    let target = &before[0].unique_id;

    service(&conn)
        .save_annotation(target, &acme_biluo(), &acme_spans())
        .unwrap();

    let after = service(&conn).list_records().unwrap();
    let saved = &after[0];
    let stored_biluo: serde_json::Value =
        serde_json::from_str(saved.biluo_annotation.as_deref().unwrap()).unwrap();
    let stored_spans: serde_json::Value =
        serde_json::from_str(saved.non_biluo_annotation.as_deref().unwrap()).unwrap();
    assert_eq!(stored_biluo, acme_biluo(), "payload is stored as sent");
    assert_eq!(stored_spans, acme_spans());
    assert_eq!(saved.fields, before[0].fields);
    assert_eq!(&after[1..], &before[1..]);
}

#[test]
fn rejected_biluo_leaves_record_untouched() {
    let conn = loaded_db();
    let target = service(&conn).list_records().unwrap()[1].unique_id.clone();
    service(&conn)
        .save_annotation(&target, &acme_biluo(), &acme_spans())
        .unwrap();
    let before = service(&conn).get_record(&target).unwrap().unwrap();

    let err = service(&conn)
        .save_annotation(&target, &broken_biluo(), &acme_spans())
        .unwrap_err();
    assert!(matches!(err, ServiceError::InvalidBiluo(_)));

    let after = service(&conn).get_record(&target).unwrap().unwrap();
    assert_eq!(after, before);
}

#[test]
fn save_for_unknown_id_is_not_found() {
    let conn = loaded_db();
    let err = service(&conn)
        .save_annotation("missing", &acme_biluo(), &acme_spans())
        .unwrap_err();
    assert!(matches!(err, ServiceError::RecordNotFound(id) if id == "missing"));
}

#[test]
fn delete_record_removes_it_from_listing() {
    let conn = loaded_db();
    let target = service(&conn).list_records().unwrap()[0].unique_id.clone();

    service(&conn)
        .delete_annotation(&target, DeleteKind::Record)
        .unwrap();

    let records = service(&conn).list_records().unwrap();
    assert_eq!(records.len(), 2);
    assert!(records.iter().all(|record| record.unique_id != target));
}

#[test]
fn clear_annotations_keeps_source_fields_and_identity() {
    let conn = loaded_db();
    let original = service(&conn).list_records().unwrap()[0].clone();
    service(&conn)
        .save_annotation(&original.unique_id, &acme_biluo(), &acme_spans())
        .unwrap();

    service(&conn)
        .delete_annotation(&original.unique_id, DeleteKind::Annotations)
        .unwrap();

    let cleared = service(&conn)
        .get_record(&original.unique_id)
        .unwrap()
        .unwrap();
    assert_eq!(cleared, original);
    assert!(cleared.is_unannotated());
}

#[test]
fn delete_for_unknown_id_is_not_found() {
    let conn = loaded_db();
    for kind in [DeleteKind::Record, DeleteKind::Annotations] {
        let err = service(&conn).delete_annotation("missing", kind).unwrap_err();
        assert!(matches!(err, ServiceError::RecordNotFound(_)));
    }
}

#[test]
fn insert_rejects_rows_with_wrong_width() {
    let conn = open_db_in_memory().unwrap();
    let repo = SqliteAnnotationRepository::new(&conn);
    repo.ensure_table(&cols(&["Title"])).unwrap();

    let err = repo
        .insert_records(
            &cols(&["Title"]),
            &[NewRecord {
                unique_id: "u-1".to_string(),
                values: vec![Some("a".to_string()), Some("b".to_string())],
            }],
        )
        .unwrap_err();
    assert!(matches!(err, RepoError::InvalidData(_)));
    assert_eq!(repo.count_records().unwrap(), 0);
}

#[test]
fn list_reads_tables_written_by_older_loaders() {
    let conn = open_db_in_memory().unwrap();
    conn.execute_batch(
        "CREATE TABLE annotation (
            \"index\" BIGINT,
            unique_id TEXT,
            \"Score\" BIGINT,
            biluo_annotation TEXT,
            non_biluo_annotation TEXT
        );
        INSERT INTO annotation VALUES (0, 'legacy-1', 7, NULL, NULL);",
    )
    .unwrap();

    service(&conn)
        .load_source(&MemorySource::new(&["Score"]).with_row(&["9"]), &[])
        .unwrap();

    let records = service(&conn).list_records().unwrap();
    assert_eq!(records.len(), 2);
    assert_eq!(records[0].index, 0);
    assert_eq!(records[0].field("Score"), Some("7"));
    assert_eq!(records[1].index, 2, "missing index falls back to rowid");
    assert_eq!(records[1].field("Score"), Some("9"));
}

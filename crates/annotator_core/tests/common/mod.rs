#![allow(dead_code)]

use annotator_core::db::open_db_in_memory;
use annotator_core::{
    AnnotationService, MemorySource, SchemaValidator, SqliteAnnotationRepository,
};
use rusqlite::Connection;
use serde_json::{json, Value};

pub static VALIDATOR: SchemaValidator = SchemaValidator;

pub fn articles() -> MemorySource {
    MemorySource::new(&["Id", "Title", "Body"])
        .with_row(&["1", "Acme", "Acme hires Bob"])
        .with_row(&["2", "Weather", "Rain in Paris"])
        .with_row(&["3", "", "New York City wins"])
}

pub fn cols(names: &[&str]) -> Vec<String> {
    names.iter().map(|name| name.to_string()).collect()
}

/// In-memory database loaded with `articles()` restricted to `Title, Body`.
pub fn loaded_db() -> Connection {
    let conn = open_db_in_memory().unwrap();
    service(&conn)
        .load_source(&articles(), &cols(&["Title", "Body"]))
        .unwrap();
    conn
}

pub fn service(conn: &Connection) -> AnnotationService<'static, SqliteAnnotationRepository<'_>> {
    AnnotationService::new(SqliteAnnotationRepository::new(conn), &VALIDATOR)
}

pub fn token(orth: &str, ner: &str) -> Value {
    json!({ "orth": orth, "ner": ner })
}

/// BILUO document for `Acme hires Bob`.
pub fn acme_biluo() -> Value {
    json!({
        "id": 17,
        "paragraphs": [{
            "raw": "Acme hires Bob",
            "sentences": [{
                "tokens": [token("Acme", "U-ORG"), token("hires", "O"), token("Bob", "U-PERSON")]
            }]
        }]
    })
}

/// Span-tuple payload for `Acme hires Bob`.
pub fn acme_spans() -> Value {
    json!(["Acme hires Bob", { "entities": [[0, 4, "ORG"], [11, 14, "PERSON"]] }])
}

/// BILUO document whose entity continues without a `B-` tag.
pub fn broken_biluo() -> Value {
    json!({
        "paragraphs": [{
            "sentences": [{ "tokens": [token("New", "O"), token("York", "L-GPE")] }]
        }]
    })
}

mod common;

use annotator_core::{BiluoValidator, SchemaValidator, ValidationError};
use common::{acme_biluo, broken_biluo, token};
use serde_json::{json, Value};

fn document(tokens: Vec<Value>) -> Value {
    json!({ "paragraphs": [{ "sentences": [{ "tokens": tokens }] }] })
}

fn invalid_path(document: &Value) -> String {
    match SchemaValidator.validate(document).unwrap_err() {
        ValidationError::Invalid { path, .. } => path,
        other => panic!("unexpected error: {other}"),
    }
}

#[test]
fn well_formed_documents_pass() {
    SchemaValidator.validate(&acme_biluo()).unwrap();
    SchemaValidator
        .validate(&document(vec![
            token("New", "B-GPE"),
            token("York", "I-GPE"),
            token("City", "L-GPE"),
            token("wins", "O"),
            token("?", "-"),
        ]))
        .unwrap();
    SchemaValidator.validate(&json!({ "paragraphs": [] })).unwrap();
}

#[test]
fn entity_may_span_sentences_of_one_paragraph() {
    let document = json!({
        "paragraphs": [{
            "sentences": [
                { "tokens": [token("New", "B-GPE")] },
                { "tokens": [token("York", "L-GPE")] }
            ]
        }]
    });
    SchemaValidator.validate(&document).unwrap();
}

#[test]
fn continuation_without_begin_is_rejected() {
    assert_eq!(invalid_path(&broken_biluo()), "paragraphs[0].sentences[0].tokens[1]");

    let path = invalid_path(&document(vec![token("York", "I-GPE"), token("City", "L-GPE")]));
    assert_eq!(path, "paragraphs[0].sentences[0].tokens[0]");

    let path = invalid_path(&document(vec![
        token("New", "B-GPE"),
        token("York", "L-GPE"),
        token("City", "L-GPE"),
    ]));
    assert_eq!(path, "paragraphs[0].sentences[0].tokens[2]");
}

#[test]
fn missing_tag_closes_the_open_entity() {
    let path = invalid_path(&document(vec![
        token("New", "B-GPE"),
        token("York", "-"),
        token("City", "L-GPE"),
    ]));
    assert_eq!(path, "paragraphs[0].sentences[0].tokens[2]");
}

#[test]
fn sequences_the_converter_tolerates_are_accepted() {
    // Restarted entity: the first `B-` is abandoned.
    SchemaValidator
        .validate(&document(vec![
            token("New", "B-GPE"),
            token("York", "B-ORG"),
            token("Times", "L-ORG"),
        ]))
        .unwrap();
    // Entity left open at paragraph end is dropped.
    SchemaValidator
        .validate(&document(vec![token("New", "B-GPE"), token("York", "I-GPE")]))
        .unwrap();
    // Outside and unit tags inside an open entity.
    SchemaValidator
        .validate(&document(vec![
            token("New", "B-GPE"),
            token("and", "O"),
            token("Acme", "U-ORG"),
            token("York", "L-GPE"),
        ]))
        .unwrap();
    // Tokens without a tag.
    SchemaValidator
        .validate(&document(vec![json!({ "orth": "Acme" }), token("hires", "O")]))
        .unwrap();
}

#[test]
fn unknown_tags_and_missing_fields_are_rejected() {
    let path = invalid_path(&document(vec![token("Acme", "ORG")]));
    assert_eq!(path, "paragraphs[0].sentences[0].tokens[0]");

    let path = invalid_path(&document(vec![json!({ "orth": "Acme", "ner": 3 })]));
    assert_eq!(path, "paragraphs[0].sentences[0].tokens[0].ner");

    let path = invalid_path(&document(vec![json!({ "ner": "O" })]));
    assert_eq!(path, "paragraphs[0].sentences[0].tokens[0].orth");

    assert_eq!(invalid_path(&json!({ "paragraphs": {} })), "document.paragraphs");
    assert_eq!(invalid_path(&json!([acme_biluo()])), "document");
}

#[test]
fn tokens_must_align_with_raw_text() {
    let document = json!({
        "paragraphs": [{
            "raw": "Acme hires Bob",
            "sentences": [{ "tokens": [token("Acme", "U-ORG"), token("fires", "O")] }]
        }]
    });
    assert_eq!(invalid_path(&document), "paragraphs[0].sentences[0].tokens[1]");
}

fn paragraph(raw: &str, orths: &[&str]) -> Value {
    let tokens: Vec<Value> = orths.iter().map(|orth| token(orth, "O")).collect();
    json!({ "paragraphs": [{ "raw": raw, "sentences": [{ "tokens": tokens }] }] })
}

#[test]
fn whitespace_tokens_align_with_raw_text() {
    for (raw, orths) in [
        ("Acme\n\nhires Bob", &["Acme", "\n\n", "hires", "Bob"][..]),
        ("Acme  hires Bob", &["Acme", " ", "hires", "Bob"][..]),
        ("Acme \n\nhires", &["Acme", "\n\n", "hires"][..]),
        ("Acme\n \n", &["Acme", "\n", "\n"][..]),
    ] {
        SchemaValidator
            .validate(&paragraph(raw, orths))
            .unwrap_or_else(|err| panic!("{raw:?} rejected: {err}"));
    }
}

#[test]
fn untokenized_whitespace_in_raw_text_is_skipped() {
    for (raw, orths) in [
        ("  Acme hires", &["Acme", "hires"][..]),
        ("Acme\thires\r\nBob", &["Acme", "hires", "Bob"][..]),
        ("Acme\n\nhires  Bob ", &["Acme", "hires", "Bob"][..]),
    ] {
        SchemaValidator
            .validate(&paragraph(raw, orths))
            .unwrap_or_else(|err| panic!("{raw:?} rejected: {err}"));
    }
}

#[test]
fn whitespace_token_absent_from_raw_text_is_rejected() {
    let path = invalid_path(&paragraph("Acme hires", &["Acme", "\n", "hires"]));
    assert_eq!(path, "paragraphs[0].sentences[0].tokens[1]");
}

#[cfg(unix)]
mod converter_round_trip {
    use super::common::{acme_biluo, cols};
    use annotator_core::{BiluoValidator, CommandConverter, ConverterValidator, ValidationError};
    use std::sync::Arc;

    fn validator(script: &str, temp: &std::path::Path) -> ConverterValidator {
        let converter = CommandConverter::from_command(&cols(&["sh", "-c", script])).unwrap();
        ConverterValidator::new(Arc::new(converter), temp)
    }

    fn leftover_files(dir: &std::path::Path) -> usize {
        std::fs::read_dir(dir).unwrap().count()
    }

    #[test]
    fn accepted_batch_cleans_up_temp_files() {
        let dir = tempfile::tempdir().unwrap();
        let temp = dir.path().join("temp");
        // Emulates the converter writing `<stem>.spacy` next to the input.
        let script = r#"grep -q '"id":0' "$0" && touch "${0%.json}.spacy""#;

        validator(script, &temp).validate(&acme_biluo()).unwrap();
        assert_eq!(leftover_files(&temp), 0);
    }

    #[test]
    fn missing_converter_output_is_not_an_error() {
        let dir = tempfile::tempdir().unwrap();
        validator("true", dir.path()).validate(&acme_biluo()).unwrap();
        assert_eq!(leftover_files(dir.path()), 0);
    }

    #[test]
    fn failed_conversion_rejects_the_document() {
        let dir = tempfile::tempdir().unwrap();
        let err = validator("exit 1", dir.path())
            .validate(&acme_biluo())
            .unwrap_err();
        assert!(matches!(err, ValidationError::Converter(_)));
        assert_eq!(leftover_files(dir.path()), 0);
    }
}

//! In-process BILUO grammar check over the spaCy JSON training shape.
//!
//! Shape: `{ paragraphs: [{ raw?, sentences: [{ tokens: [{ orth, ner? }] }] }] }`.
//!
//! Tag sequences are checked per paragraph, across sentence boundaries, with
//! the same grammar `spacy convert` applies when it turns tags into spans:
//! - `I-`/`L-` need an open entity; everything else is accepted.
//! - `B-` while an entity is open starts a new one.
//! - `-` or a missing tag closes any open entity.
//! - An entity still open at paragraph end is dropped, not rejected.

use super::{BiluoValidator, ValidationError, ValidationResult};
use once_cell::sync::Lazy;
use regex::Regex;
use serde_json::{Map, Value};

static ENTITY_TAG_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^([BILU])-(\S.*)$").expect("valid biluo tag regex"));

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Tag<'a> {
    Outside,
    Missing,
    Begin(&'a str),
    Inside(&'a str),
    Last(&'a str),
    Unit(&'a str),
}

fn parse_tag(tag: &str) -> Option<Tag<'_>> {
    match tag {
        "O" => return Some(Tag::Outside),
        "-" | "" => return Some(Tag::Missing),
        _ => {}
    }
    let captures = ENTITY_TAG_RE.captures(tag)?;
    let label = captures.get(2)?.as_str();
    match captures.get(1)?.as_str() {
        "B" => Some(Tag::Begin(label)),
        "I" => Some(Tag::Inside(label)),
        "L" => Some(Tag::Last(label)),
        "U" => Some(Tag::Unit(label)),
        _ => None,
    }
}

/// Structural validator; the default for saves.
#[derive(Debug, Clone, Copy, Default)]
pub struct SchemaValidator;

impl BiluoValidator for SchemaValidator {
    fn validate(&self, document: &Value) -> ValidationResult<()> {
        let document = as_object(document, "document")?;
        let paragraphs = array_field(document, "paragraphs", "document")?;
        for (p_idx, paragraph) in paragraphs.iter().enumerate() {
            validate_paragraph(paragraph, &format!("paragraphs[{p_idx}]"))?;
        }
        Ok(())
    }
}

fn validate_paragraph(paragraph: &Value, path: &str) -> ValidationResult<()> {
    let paragraph = as_object(paragraph, path)?;
    let raw = match paragraph.get("raw") {
        None | Some(Value::Null) => None,
        Some(Value::String(raw)) => Some(raw.as_str()),
        Some(_) => return Err(ValidationError::invalid(format!("{path}.raw"), "must be a string")),
    };

    let mut tokens = Vec::new();
    let sentences = array_field(paragraph, "sentences", path)?;
    for (s_idx, sentence) in sentences.iter().enumerate() {
        let sentence_path = format!("{path}.sentences[{s_idx}]");
        let sentence = as_object(sentence, &sentence_path)?;
        for (t_idx, token) in array_field(sentence, "tokens", &sentence_path)?.iter().enumerate() {
            let token_path = format!("{sentence_path}.tokens[{t_idx}]");
            let token = as_object(token, &token_path)?;
            let orth = string_field(token, "orth", &token_path)?;
            if orth.is_empty() {
                return Err(ValidationError::invalid(token_path, "orth cannot be empty"));
            }
            let tag = match token.get("ner") {
                None | Some(Value::Null) => Tag::Missing,
                Some(Value::String(ner)) => parse_tag(ner).ok_or_else(|| {
                    ValidationError::invalid(token_path.clone(), format!("unknown tag `{ner}`"))
                })?,
                Some(_) => {
                    return Err(ValidationError::invalid(
                        format!("{token_path}.ner"),
                        "must be a string",
                    ))
                }
            };
            tokens.push((token_path, orth, tag));
        }
    }

    if let Some(raw) = raw {
        check_alignment(raw, &tokens)?;
    }
    check_sequence(&tokens)
}

fn check_alignment(raw: &str, tokens: &[(String, &str, Tag<'_>)]) -> ValidationResult<()> {
    let mut rest = raw;
    for (path, orth, _) in tokens {
        rest = advance_past(rest, orth).ok_or_else(|| {
            ValidationError::invalid(path.clone(), format!("orth `{orth}` does not align with raw text"))
        })?;
    }
    Ok(())
}

/// Matches `orth` at the start of `rest`, or after some of its leading
/// whitespace. Whitespace tokens (`"\n\n"`, `" "`) match before any skipping.
fn advance_past<'r>(rest: &'r str, orth: &str) -> Option<&'r str> {
    let skippable = rest.len() - rest.trim_start().len();
    rest.char_indices()
        .map(|(offset, _)| offset)
        .chain(std::iter::once(rest.len()))
        .take_while(|offset| *offset <= skippable)
        .find_map(|offset| rest[offset..].strip_prefix(orth))
}

fn check_sequence(tokens: &[(String, &str, Tag<'_>)]) -> ValidationResult<()> {
    let mut open = false;
    for (path, _, tag) in tokens {
        match *tag {
            Tag::Begin(_) => open = true,
            Tag::Missing => open = false,
            Tag::Outside | Tag::Unit(_) => {}
            Tag::Inside(label) if !open => {
                return Err(ValidationError::invalid(
                    path.clone(),
                    format!("I-{label} continues an entity that was never begun"),
                ));
            }
            Tag::Inside(_) => {}
            Tag::Last(label) if !open => {
                return Err(ValidationError::invalid(
                    path.clone(),
                    format!("L-{label} closes an entity that was never begun"),
                ));
            }
            Tag::Last(_) => open = false,
        }
    }
    Ok(())
}

fn as_object<'v>(value: &'v Value, path: &str) -> ValidationResult<&'v Map<String, Value>> {
    value
        .as_object()
        .ok_or_else(|| ValidationError::invalid(path, "must be an object"))
}

fn array_field<'v>(
    object: &'v Map<String, Value>,
    key: &str,
    path: &str,
) -> ValidationResult<&'v Vec<Value>> {
    object
        .get(key)
        .and_then(Value::as_array)
        .ok_or_else(|| ValidationError::invalid(format!("{path}.{key}"), "must be an array"))
}

fn string_field<'v>(
    object: &'v Map<String, Value>,
    key: &str,
    path: &str,
) -> ValidationResult<&'v str> {
    object
        .get(key)
        .and_then(Value::as_str)
        .ok_or_else(|| ValidationError::invalid(format!("{path}.{key}"), "must be a string"))
}

//! Client payloads carried in the `json` form field.
//!
//! Key names match the annotation UI (`uniqueId`, `biluoFrmt`, ...).

use super::record::{DeleteKind, KindError, UniqueId};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::Value;
use std::error::Error;
use std::fmt::{Display, Formatter};

/// Save request: both annotation representations for one record.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct SaveAnnotationRequest {
    #[serde(rename = "uniqueId")]
    pub unique_id: UniqueId,
    /// spaCy JSON training document with BILUO token tags.
    #[serde(rename = "biluoFrmt")]
    pub biluo: Value,
    /// `(start, end, label)` span representation of the same text.
    #[serde(rename = "nonBiluoFrmt")]
    pub non_biluo: Value,
}

/// Delete request with wire-level delete type.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct DeleteAnnotationRequest {
    #[serde(rename = "uniqueId")]
    pub unique_id: UniqueId,
    #[serde(rename = "type")]
    pub delete_type: i64,
}

impl DeleteAnnotationRequest {
    pub fn kind(&self) -> Result<DeleteKind, KindError> {
        DeleteKind::try_from(self.delete_type)
    }
}

/// Malformed or incomplete client payload.
#[derive(Debug)]
pub struct PayloadError(serde_json::Error);

impl Display for PayloadError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "malformed request payload: {}", self.0)
    }
}

impl Error for PayloadError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        Some(&self.0)
    }
}

/// Parses a payload from the raw `json` form field.
pub fn parse_payload<T: DeserializeOwned>(raw: &str) -> Result<T, PayloadError> {
    serde_json::from_str(raw).map_err(PayloadError)
}

#[cfg(test)]
mod tests {
    use super::{parse_payload, DeleteAnnotationRequest, SaveAnnotationRequest};
    use crate::model::record::DeleteKind;

    #[test]
    fn save_request_uses_client_key_names() {
        let request: SaveAnnotationRequest = parse_payload(
            r#"{"uniqueId":"u-1","biluoFrmt":{"paragraphs":[]},"nonBiluoFrmt":["text",{"entities":[]}]}"#,
        )
        .unwrap();
        assert_eq!(request.unique_id, "u-1");
        assert!(request.biluo["paragraphs"].is_array());
        assert_eq!(request.non_biluo[0], "text");
    }

    #[test]
    fn missing_keys_are_reported() {
        let err = parse_payload::<SaveAnnotationRequest>(r#"{"uniqueId":"u-1"}"#).unwrap_err();
        assert!(err.to_string().contains("biluoFrmt"));
    }

    #[test]
    fn delete_request_decodes_kind() {
        let request: DeleteAnnotationRequest =
            parse_payload(r#"{"uniqueId":"u-1","type":2}"#).unwrap();
        assert_eq!(request.kind(), Ok(DeleteKind::Annotations));

        let unknown: DeleteAnnotationRequest =
            parse_payload(r#"{"uniqueId":"u-1","type":7}"#).unwrap();
        assert!(unknown.kind().is_err());
    }
}

use serde_json::Value;

use crate::classifier::ClassificationError;
use crate::types::ClassificationResult;

/// Value the model uses when it cannot tell the document type.
const UNKNOWN_TYPE: &str = "Unknown";
/// Value the model uses when no serial number is legible.
const NO_SERIAL: &str = "N/A";

/// Parse the model's reply into a classification.
///
/// The reply should be a bare JSON object with `documentType` and
/// `serialNumber` (string or number) and an optional `site`. Markdown code
/// fences and a single-element array wrapper are tolerated.
pub fn parse_reply(reply: &str) -> Result<ClassificationResult, ClassificationError> {
    let body = strip_code_fence(reply.trim());
    if body.is_empty() {
        return Err(ClassificationError::EmptyReply);
    }

    let value: Value =
        serde_json::from_str(body).map_err(|e| ClassificationError::Malformed(e.to_string()))?;

    let object = match value {
        Value::Object(map) => map,
        Value::Array(items) => match items.into_iter().next() {
            Some(Value::Object(map)) => map,
            _ => {
                return Err(ClassificationError::Malformed(
                    "expected a JSON object".to_string(),
                ))
            }
        },
        _ => {
            return Err(ClassificationError::Malformed(
                "expected a JSON object".to_string(),
            ))
        }
    };

    let document_type = object
        .get("documentType")
        .and_then(scalar_text)
        .ok_or(ClassificationError::MissingField("documentType"))?;

    let serial_number = object
        .get("serialNumber")
        .and_then(scalar_text)
        .ok_or(ClassificationError::MissingField("serialNumber"))?;

    if document_type.eq_ignore_ascii_case(UNKNOWN_TYPE)
        || serial_number.eq_ignore_ascii_case(NO_SERIAL)
    {
        return Err(ClassificationError::Unrecognized {
            document_type,
            serial_number,
        });
    }

    let site = object
        .get("site")
        .and_then(scalar_text)
        .filter(|s| !s.eq_ignore_ascii_case(NO_SERIAL));

    Ok(ClassificationResult {
        document_type,
        serial_number,
        site,
    })
}

/// Non-empty trimmed text of a string or number value.
fn scalar_text(value: &Value) -> Option<String> {
    let text = match value {
        Value::String(s) => s.trim().to_string(),
        Value::Number(n) => n.to_string(),
        _ => return None,
    };
    (!text.is_empty()).then_some(text)
}

fn strip_code_fence(text: &str) -> &str {
    let Some(rest) = text.strip_prefix("```") else {
        return text;
    };
    // Drop the info string (e.g. "json") on the opening line.
    let rest = match rest.find('\n') {
        Some(idx) => &rest[idx + 1..],
        None => rest,
    };
    rest.trim_end().trim_end_matches("```").trim()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_plain_object() {
        let result = parse_reply(
            r#"{"documentType": "Receipt Memo", "serialNumber": "58653", "site": "ATR 60"}"#,
        )
        .unwrap();
        assert_eq!(result.document_type, "Receipt Memo");
        assert_eq!(result.serial_number, "58653");
        assert_eq!(result.site.as_deref(), Some("ATR 60"));
    }

    #[test]
    fn test_numeric_serial() {
        let result = parse_reply(r#"{"documentType": "Oil Issue", "serialNumber": 1204}"#).unwrap();
        assert_eq!(result.serial_number, "1204");
        assert_eq!(result.site, None);
    }

    #[test]
    fn test_fenced_reply() {
        let reply = "```json\n{\"documentType\": \"Cement Issue\", \"serialNumber\": \"A-12\"}\n```";
        let result = parse_reply(reply).unwrap();
        assert_eq!(result.document_type, "Cement Issue");
        assert_eq!(result.serial_number, "A-12");
    }

    #[test]
    fn test_array_wrapper() {
        let reply = r#"[{"documentType": "Diesel Issue", "serialNumber": "77"}]"#;
        assert_eq!(parse_reply(reply).unwrap().document_type, "Diesel Issue");
    }

    #[test]
    fn test_empty_reply() {
        assert_eq!(parse_reply("   ").unwrap_err(), ClassificationError::EmptyReply);
        assert_eq!(parse_reply("```json\n```").unwrap_err(), ClassificationError::EmptyReply);
    }

    #[test]
    fn test_not_json() {
        assert!(matches!(
            parse_reply("This looks like a delivery challan."),
            Err(ClassificationError::Malformed(_))
        ));
        assert!(matches!(
            parse_reply("42"),
            Err(ClassificationError::Malformed(_))
        ));
    }

    #[test]
    fn test_missing_fields() {
        assert_eq!(
            parse_reply(r#"{"serialNumber": "1"}"#).unwrap_err(),
            ClassificationError::MissingField("documentType")
        );
        assert_eq!(
            parse_reply(r#"{"documentType": "Oil Issue", "serialNumber": null}"#).unwrap_err(),
            ClassificationError::MissingField("serialNumber")
        );
        assert_eq!(
            parse_reply(r#"{"documentType": "  ", "serialNumber": "1"}"#).unwrap_err(),
            ClassificationError::MissingField("documentType")
        );
    }

    #[test]
    fn test_unknown_type_rejected() {
        assert!(matches!(
            parse_reply(r#"{"documentType": "Unknown", "serialNumber": "123"}"#),
            Err(ClassificationError::Unrecognized { .. })
        ));
    }

    #[test]
    fn test_missing_serial_marker_rejected() {
        assert!(matches!(
            parse_reply(r#"{"documentType": "Goods Received Note", "serialNumber": "n/a"}"#),
            Err(ClassificationError::Unrecognized { .. })
        ));
    }
}

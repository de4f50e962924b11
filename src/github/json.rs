//! JSON parsing with serde path context for upstream payload errors.

use anyhow::Result;

/// Parse JSON, annotating failures with the serde path and location so a
/// schema drift in one field is diagnosable from the log line alone.
pub fn parse_json_with_path<T: serde::de::DeserializeOwned>(body: &str) -> Result<T> {
    let de = &mut serde_json::Deserializer::from_str(body);
    match serde_path_to_error::deserialize(de) {
        Ok(value) => Ok(value),
        Err(err) => {
            let path = err.path().to_string();
            let inner = err.into_inner();
            if path.is_empty() || path == "." {
                Err(anyhow::anyhow!("{inner}"))
            } else {
                Err(anyhow::anyhow!("at path '{path}': {inner}"))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;

    #[derive(Debug, Deserialize)]
    struct Envelope {
        items: Vec<Item>,
    }

    #[derive(Debug, Deserialize)]
    struct Item {
        #[allow(dead_code)]
        total_count: i64,
    }

    #[test]
    fn error_includes_offending_path() {
        let body = r#"{"items": [{"total_count": "not-a-number"}]}"#;
        let err = parse_json_with_path::<Envelope>(body).unwrap_err();
        let msg = err.to_string();
        assert!(msg.contains("items[0].total_count"), "got: {msg}");
    }

    #[test]
    fn valid_body_parses() {
        let body = r#"{"items": [{"total_count": 3}]}"#;
        assert!(parse_json_with_path::<Envelope>(body).is_ok());
    }
}

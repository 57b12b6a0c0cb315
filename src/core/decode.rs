//! Purpose: JSON decode boundary for fetched response bodies.
//! Exports: `JsonMap`, `decode_value`, `decode_object`, `decode_typed`.
//! Role: Single seam between raw body bytes and serde_json values.
//! Invariants: Failures are always `ErrorKind::Decode` with the serde error as source.
//! Invariants: `decode_object` accepts only a top-level JSON object.
//! Notes: URL context is attached by callers, not here.

use serde::de::DeserializeOwned;
use serde_json::{Map, Value};

use super::error::{Error, ErrorKind};

/// Top-level JSON object, keys kept in document order.
pub type JsonMap = Map<String, Value>;

pub fn decode_value(body: &[u8]) -> Result<Value, Error> {
    decode_typed(body)
}

pub fn decode_object(body: &[u8]) -> Result<JsonMap, Error> {
    match decode_value(body)? {
        Value::Object(map) => Ok(map),
        other => Err(Error::new(ErrorKind::Decode)
            .with_message(format!(
                "expected a JSON object at top level, found {}",
                value_type_name(&other)
            ))
            .with_hint("Use `fetch_value` to accept any top-level JSON value.")),
    }
}

pub fn decode_typed<T: DeserializeOwned>(body: &[u8]) -> Result<T, Error> {
    serde_json::from_slice(body).map_err(|err| {
        let message = if err.is_eof() && body.iter().all(u8::is_ascii_whitespace) {
            "response body is empty"
        } else if err.is_data() {
            "response json does not match the expected shape"
        } else {
            "response body is not valid json"
        };
        Error::new(ErrorKind::Decode)
            .with_message(message)
            .with_source(err)
    })
}

fn value_type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

#[cfg(test)]
mod tests {
    use super::{decode_object, decode_typed, decode_value};
    use crate::core::error::ErrorKind;
    use serde::Deserialize;
    use serde_json::json;

    #[test]
    fn decode_object_keeps_document_key_order() {
        let map = decode_object(br#"{"userId":1,"id":1,"title":"t","body":"b"}"#).expect("map");
        let keys: Vec<_> = map.keys().map(String::as_str).collect();
        assert_eq!(keys, ["userId", "id", "title", "body"]);
        assert_eq!(map["id"], json!(1));
    }

    #[test]
    fn decode_object_rejects_top_level_array() {
        let err = decode_object(b"[1,2,3]").expect_err("array");
        assert_eq!(err.kind(), ErrorKind::Decode);
        assert!(err.message().unwrap().contains("an array"));
    }

    #[test]
    fn decode_value_accepts_scalars_and_nesting() {
        assert_eq!(decode_value(b"42").expect("number"), json!(42));
        assert_eq!(
            decode_value(br#"{"a":[true,null,{"b":"c"}]}"#).expect("nested"),
            json!({"a": [true, null, {"b": "c"}]})
        );
    }

    #[test]
    fn invalid_json_is_a_decode_error() {
        let err = decode_value(b"<html>oops</html>").expect_err("html");
        assert_eq!(err.kind(), ErrorKind::Decode);
        assert_eq!(err.message(), Some("response body is not valid json"));
        assert!(std::error::Error::source(&err).is_some());
    }

    #[test]
    fn empty_body_is_reported_as_empty() {
        let err = decode_value(b"  \n").expect_err("empty");
        assert_eq!(err.kind(), ErrorKind::Decode);
        assert_eq!(err.message(), Some("response body is empty"));
    }

    #[test]
    fn typed_shape_mismatch_is_a_decode_error() {
        #[derive(Deserialize)]
        #[allow(dead_code)]
        struct Post {
            id: u64,
        }

        let err = decode_typed::<Post>(br#"{"id":"one"}"#)
            .err()
            .expect("mismatch");
        assert_eq!(err.kind(), ErrorKind::Decode);
        assert_eq!(
            err.message(),
            Some("response json does not match the expected shape")
        );
    }
}

//! Response envelopes: unwrapping what the backend sends and wrapping what the
//! console serves.
//!
//! The backend answers in one of two shapes, `{status_code, data}` or
//! `{code, message, data}`, and some endpoints return bare data. Lists may be
//! paginated as `{total, data}` or `{items, total}`.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

pub const SUCCESS: i64 = 200;

#[derive(Error, Debug)]
pub enum AdaptError {
    #[error("backend returned status code {0}")]
    Status(Value),

    #[error("request failed with code {code}: {message}")]
    Rejected { code: Value, message: String },
}

/// Unwraps a backend response to its `data`.
pub fn adapt(response: Value) -> Result<Value, AdaptError> {
    let mut fields = match response {
        Value::Object(fields) => fields,
        other => return Ok(other),
    };

    if let Some(status) = fields.get("status_code").cloned() {
        return match fields.remove("data") {
            Some(data) if status.as_i64() == Some(SUCCESS) => Ok(data),
            _ => Err(AdaptError::Status(status)),
        };
    }

    if let Some(code) = fields.get("code").cloned() {
        return match fields.remove("data") {
            Some(data) if code.as_i64() == Some(SUCCESS) => Ok(data),
            _ => {
                let message = fields
                    .get("message")
                    .and_then(Value::as_str)
                    .map(str::to_string)
                    .unwrap_or_else(|| format!("request failed with code {}", code));
                Err(AdaptError::Rejected { code, message })
            }
        };
    }

    Ok(Value::Object(fields))
}

/// The list stored under `key`, or `data` itself when it is already a list.
pub fn list_field(data: &Value, key: &str) -> Vec<Value> {
    match data.get(key) {
        Some(Value::Array(items)) => items.clone(),
        _ => match data {
            Value::Array(items) => items.clone(),
            _ => vec![],
        },
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct Page<T> {
    pub items: Vec<T>,
    pub total: u64,
    pub page_no: u64,
    pub page_size: u64,
}

/// Normalizes the pagination shapes the backend uses into a [`Page`].
pub fn adapt_page(data: Value, page_no: u64, page_size: u64) -> Page<Value> {
    let empty = Page {
        items: vec![],
        total: 0,
        page_no,
        page_size,
    };
    match data {
        Value::Object(fields) if fields.contains_key("total") && fields.contains_key("data") => {
            let items = match fields.get("data") {
                Some(Value::Array(items)) => items.clone(),
                _ => vec![],
            };
            Page {
                items,
                total: fields.get("total").and_then(Value::as_u64).unwrap_or(0),
                page_no,
                page_size,
            }
        }
        Value::Object(fields) if fields.contains_key("items") => {
            let items = match fields.get("items") {
                Some(Value::Array(items)) => items.clone(),
                _ => vec![],
            };
            Page {
                total: fields
                    .get("total")
                    .and_then(Value::as_u64)
                    .unwrap_or(items.len() as u64),
                page_no: fields.get("page_no").and_then(Value::as_u64).unwrap_or(page_no),
                page_size: fields
                    .get("page_size")
                    .and_then(Value::as_u64)
                    .unwrap_or(page_size),
                items,
            }
        }
        Value::Array(items) => Page {
            total: items.len() as u64,
            items,
            page_no,
            page_size,
        },
        _ => empty,
    }
}

/// The `{code, message, data}` shape the console answers with.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct Envelope<T> {
    pub code: i64,
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
}

impl<T> Envelope<T> {
    pub fn success(data: T) -> Self {
        Envelope {
            code: SUCCESS,
            message: "success".to_string(),
            data: Some(data),
        }
    }

    pub fn failure(code: i64, message: impl Into<String>) -> Self {
        Envelope {
            code,
            message: message.into(),
            data: None,
        }
    }

    pub fn is_success(&self) -> bool {
        self.code == SUCCESS
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_status_code_envelope() {
        let data = adapt(json!({"status_code": 200, "data": {"menus": []}})).unwrap();
        assert_eq!(data, json!({"menus": []}));

        let err = adapt(json!({"status_code": 401, "data": null})).unwrap_err();
        assert_eq!(err.to_string(), "backend returned status code 401");
    }

    #[test]
    fn test_code_envelope() {
        let data = adapt(json!({"code": 200, "message": "ok", "data": [1, 2]})).unwrap();
        assert_eq!(data, json!([1, 2]));

        match adapt(json!({"code": 5001, "message": "name taken"})) {
            Err(AdaptError::Rejected { code, message }) => {
                assert_eq!(code, json!(5001));
                assert_eq!(message, "name taken");
            }
            other => panic!("unexpected {:?}", other),
        }

        let err = adapt(json!({"code": 200})).unwrap_err();
        assert!(matches!(err, AdaptError::Rejected { .. }));
    }

    #[test]
    fn test_bare_data_passes_through() {
        assert_eq!(adapt(json!([1])).unwrap(), json!([1]));
        assert_eq!(adapt(json!({"id": 1})).unwrap(), json!({"id": 1}));
    }

    #[test]
    fn test_list_field() {
        assert_eq!(list_field(&json!({"menus": [1]}), "menus"), vec![json!(1)]);
        assert_eq!(list_field(&json!([2]), "menus"), vec![json!(2)]);
        assert!(list_field(&json!({"menus": null}), "menus").is_empty());
    }

    #[test]
    fn test_page_shapes() {
        let page = adapt_page(json!({"total": 12, "data": [{"id": 1}]}), 2, 10);
        assert_eq!(page.items.len(), 1);
        assert_eq!((page.total, page.page_no, page.page_size), (12, 2, 10));

        let page = adapt_page(json!({"items": [1, 2], "total": 5, "page_no": 1, "page_size": 2}), 3, 9);
        assert_eq!((page.total, page.page_no, page.page_size), (5, 1, 2));

        let page = adapt_page(json!([1, 2, 3]), 1, 20);
        assert_eq!(page.total, 3);

        let page = adapt_page(json!("nope"), 1, 20);
        assert!(page.items.is_empty());
        assert_eq!(page.total, 0);
    }

    #[test]
    fn test_envelope_serialization() {
        let ok = serde_json::to_value(Envelope::success(vec![1])).unwrap();
        assert_eq!(ok, json!({"code": 200, "message": "success", "data": [1]}));
        let failed = serde_json::to_value(Envelope::<()>::failure(404, "missing")).unwrap();
        assert_eq!(failed, json!({"code": 404, "message": "missing"}));
    }
}

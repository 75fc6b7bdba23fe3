//! Uniform result envelope for server actions.
//!
//! Every mutating endpoint answers `{"success": true, "data": ...}` or
//! `{"success": false, "error": "..."}`; absent fields are omitted.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActionResult<T = ()> {
    pub success: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
}

impl<T> ActionResult<T> {
    #[must_use]
    pub const fn ok(data: T) -> Self {
        Self {
            success: true,
            error: None,
            data: Some(data),
        }
    }

    #[must_use]
    pub const fn ok_empty() -> Self {
        Self {
            success: true,
            error: None,
            data: None,
        }
    }

    pub fn err(message: impl Into<String>) -> Self {
        Self {
            success: false,
            error: Some(message.into()),
            data: None,
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_ok_shape() {
        let value = serde_json::to_value(ActionResult::ok(json!({"id": 7}))).unwrap();
        assert_eq!(value, json!({"success": true, "data": {"id": 7}}));
    }

    #[test]
    fn test_ok_empty_shape() {
        let value = serde_json::to_value(ActionResult::<()>::ok_empty()).unwrap();
        assert_eq!(value, json!({"success": true}));
    }

    #[test]
    fn test_err_shape() {
        let value = serde_json::to_value(ActionResult::<()>::err("Purchase not found")).unwrap();
        assert_eq!(
            value,
            json!({"success": false, "error": "Purchase not found"})
        );
    }

    #[test]
    fn test_deserializes_without_optional_fields() {
        let parsed: ActionResult<u32> = serde_json::from_str(r#"{"success":true}"#).unwrap();
        assert!(parsed.success);
        assert!(parsed.data.is_none());
    }
}

//! The JSON response envelope shared by every endpoint and hub event:
//! `{status, message, data, detail?}`.

use serde::Serialize;

#[derive(Debug, Clone, Serialize)]
pub struct Reply<T: Serialize> {
    pub status: bool,
    pub message: String,
    pub data: T,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub detail: Option<serde_json::Value>,
}

pub mod reply {
    use super::Reply;
    use serde::Serialize;

    pub fn success<T: Serialize>(message: impl Into<String>, data: T) -> Reply<T> {
        Reply {
            status: true,
            message: message.into(),
            data,
            detail: None,
        }
    }

    pub fn fail(message: impl Into<String>) -> Reply<serde_json::Value> {
        Reply {
            status: false,
            message: message.into(),
            data: serde_json::Value::Null,
            detail: None,
        }
    }

    pub fn fail_with_detail(
        message: impl Into<String>,
        detail: serde_json::Value,
    ) -> Reply<serde_json::Value> {
        Reply {
            status: false,
            message: message.into(),
            data: serde_json::Value::Null,
            detail: Some(detail),
        }
    }
}

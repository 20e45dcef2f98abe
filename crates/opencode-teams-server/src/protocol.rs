//! The line-delimited JSON tool-call envelope (spec §6.1, §7).
//!
//! One line in, one line out: `{ id, tool, params }` requests a call; the
//! reply is either `{ id, result }` or `{ id, error: { kind, message } }`.
//! This module only shapes JSON — all dispatch logic lives in
//! [`crate::coordinator`].

use serde::{Deserialize, Serialize};
use serde_json::Value;

use opencode_teams_core::error::CoordError;

#[derive(Debug, Deserialize)]
pub struct Request {
    pub id: Value,
    pub tool: String,
    #[serde(default = "Value::default")]
    pub params: Value,
}

#[derive(Debug, Serialize)]
#[serde(untagged)]
pub enum Response {
    Ok { id: Value, result: Value },
    Err { id: Value, error: ErrorEnvelope },
}

#[derive(Debug, Serialize)]
pub struct ErrorEnvelope {
    pub kind: opencode_teams_core::error::ErrKind,
    pub message: String,
}

impl Response {
    pub fn ok(id: Value, result: Value) -> Self {
        Response::Ok { id, result }
    }

    pub fn from_result(id: Value, result: Result<Value, CoordError>) -> Self {
        match result {
            Ok(value) => Response::ok(id, value),
            Err(err) => Response::Err {
                id,
                error: ErrorEnvelope {
                    kind: err.kind,
                    message: err.message,
                },
            },
        }
    }

    pub fn parse_error(message: impl Into<String>) -> Self {
        Response::Err {
            id: Value::Null,
            error: ErrorEnvelope {
                kind: opencode_teams_core::error::ErrKind::InvalidArg,
                message: message.into(),
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn request_parses_minimal_line() {
        let line = r#"{"id":1,"tool":"team_create","params":{"teamName":"demo","leadName":"lead"}}"#;
        let request: Request = serde_json::from_str(line).unwrap();
        assert_eq!(request.tool, "team_create");
        assert_eq!(request.params["teamName"], "demo");
    }

    #[test]
    fn request_defaults_missing_params_to_null_object() {
        let line = r#"{"id":2,"tool":"task_list"}"#;
        let request: Request = serde_json::from_str(line).unwrap();
        assert!(request.params.is_null());
    }

    #[test]
    fn ok_response_serializes_result_field() {
        let response = Response::ok(Value::from(1), serde_json::json!({"teamName": "demo"}));
        let value = serde_json::to_value(&response).unwrap();
        assert_eq!(value["result"]["teamName"], "demo");
        assert!(value.get("error").is_none());
    }

    #[test]
    fn error_response_serializes_kind_and_message() {
        let response = Response::from_result(Value::from(3), Err(CoordError::not_found("no such team")));
        let value = serde_json::to_value(&response).unwrap();
        assert_eq!(value["error"]["kind"], "notFound");
        assert_eq!(value["error"]["message"], "no such team");
    }
}

//! JSON-RPC Protocol definitions
//!
//! Defines the line-delimited protocol spoken by exprkit-server. Each request
//! is one JSON object on one line, answered by one JSON object on one line.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::expr::{Error, EvalError, ParseError, Value};
use crate::handle::Handle;

/// Request from a client to exprkit-server
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "method", content = "params")]
pub enum Request {
    /// Parse an expression and register it under a new handle
    #[serde(rename = "prepare")]
    Prepare { expression: String },

    /// List the free identifiers of a prepared expression
    #[serde(rename = "identifiers")]
    Identifiers { handle: Handle },

    /// Evaluate a prepared expression
    #[serde(rename = "execute")]
    Execute {
        handle: Handle,
        #[serde(default)]
        bindings: HashMap<String, serde_json::Value>,
    },

    /// Prepare, evaluate and discard in one step
    #[serde(rename = "evaluate")]
    Evaluate {
        expression: String,
        #[serde(default)]
        bindings: HashMap<String, serde_json::Value>,
    },

    #[serde(rename = "release")]
    Release { handle: Handle },

    /// Shutdown the server
    #[serde(rename = "shutdown")]
    Shutdown,
}

/// Response from exprkit-server
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Response {
    Prepared {
        handle: Handle,
        identifiers: Vec<String>,
    },
    Identifiers {
        identifiers: Vec<String>,
    },
    EvalResult {
        value: String,
        value_type: String,
    },
    Released {
        released: bool,
    },
    Success {
        ok: bool,
    },
    Error {
        error: ErrorBody,
    },
}

/// Machine-readable error: `kind` is stable, `message` is for humans
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ErrorBody {
    pub kind: String,
    pub message: String,
}

impl Response {
    pub fn success() -> Self {
        Response::Success { ok: true }
    }

    pub fn error(kind: impl Into<String>, message: impl Into<String>) -> Self {
        Response::Error {
            error: ErrorBody {
                kind: kind.into(),
                message: message.into(),
            },
        }
    }

    pub fn eval_result(value: &Value) -> Self {
        Response::EvalResult {
            value: value.to_string(),
            value_type: value.type_name().to_string(),
        }
    }
}

impl From<ParseError> for Response {
    fn from(err: ParseError) -> Self {
        Response::error(err.kind(), err.to_string())
    }
}

impl From<EvalError> for Response {
    fn from(err: EvalError) -> Self {
        Response::error(err.kind(), err.to_string())
    }
}

impl From<Error> for Response {
    fn from(err: Error) -> Self {
        Response::error(err.kind(), err.to_string())
    }
}

impl From<InvalidBinding> for Response {
    fn from(err: InvalidBinding) -> Self {
        Response::error("invalid_binding", err.to_string())
    }
}

/// A JSON binding with no scalar counterpart
#[derive(Error, Debug, Clone, PartialEq)]
#[error("Binding '{name}' cannot hold a JSON {found}")]
pub struct InvalidBinding {
    pub name: String,
    pub found: &'static str,
}

/// Convert JSON bindings to values.
///
/// Scalars map directly, `null` is kept (and later treated as missing),
/// arrays convert element-wise. Objects are rejected.
pub fn bindings_from_json(
    bindings: &HashMap<String, serde_json::Value>,
) -> Result<HashMap<String, Value>, InvalidBinding> {
    bindings
        .iter()
        .map(|(name, json)| Ok((name.clone(), json_to_value(name, json)?)))
        .collect()
}

fn json_to_value(name: &str, json: &serde_json::Value) -> Result<Value, InvalidBinding> {
    use serde_json::Value as Json;

    match json {
        Json::Null => Ok(Value::Null),
        Json::Bool(b) => Ok(Value::Bool(*b)),
        Json::Number(n) => n.as_f64().map(Value::Number).ok_or_else(|| InvalidBinding {
            name: name.to_string(),
            found: "number out of range",
        }),
        Json::String(s) => Ok(Value::Str(s.clone())),
        Json::Array(items) => items
            .iter()
            .map(|item| json_to_value(name, item))
            .collect::<Result<Vec<_>, _>>()
            .map(Value::Array),
        Json::Object(_) => Err(InvalidBinding {
            name: name.to_string(),
            found: "object",
        }),
    }
}

/// JSON-RPC message wrapper
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RpcMessage<T> {
    pub jsonrpc: String,
    pub id: Option<u64>,
    #[serde(flatten)]
    pub content: T,
}

impl<T> RpcMessage<T> {
    pub fn new(id: u64, content: T) -> Self {
        Self {
            jsonrpc: "2.0".to_string(),
            id: Some(id),
            content,
        }
    }
}

//! JSON-RPC 2.0 adapter.
//!
//! There is no dispatch table here: `method` is the command name and
//! `params` are its arguments, so a request runs exactly what the same line
//! typed at the console would.
//!
//! ```text
//! {"method":"echo","params":["a","b"],"id":1}
//!     → command line `echo a b`
//!     → {"jsonrpc":"2.0","id":1,"result":"a b"}
//! ```
//!
//! Command failures travel as ordinary `result` text. Only malformed
//! requests produce an `error` object, always with `id: null`.

use core::fmt;

use log::{debug, warn};
use serde::Serialize;
use serde_json::Value;

use crate::console::executor::CommandExecutor;
use crate::console::registry::Interpreter;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RpcErrorCode {
    ParseError,
    InvalidRequest,
    SystemError,
}

impl RpcErrorCode {
    pub fn code(self) -> i32 {
        match self {
            Self::ParseError => -32700,
            Self::InvalidRequest => -32600,
            Self::SystemError => -32400,
        }
    }

    pub fn message(self) -> &'static str {
        match self {
            Self::ParseError => "Parse Error",
            Self::InvalidRequest => "Invalid Request",
            Self::SystemError => "System Error",
        }
    }
}

impl fmt::Display for RpcErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.message(), self.code())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ErrorObject {
    pub code: i32,
    pub message: &'static str,
}

/// Response envelope. Field order is the wire order.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Response {
    pub jsonrpc: &'static str,
    pub id: Value,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub result: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<ErrorObject>,
}

impl Response {
    pub fn result(id: Value, text: String) -> Self {
        Self {
            jsonrpc: "2.0",
            id,
            result: Some(text),
            error: None,
        }
    }

    pub fn error(code: RpcErrorCode) -> Self {
        Self {
            jsonrpc: "2.0",
            id: Value::Null,
            result: None,
            error: Some(ErrorObject {
                code: code.code(),
                message: code.message(),
            }),
        }
    }

    pub fn to_json(&self) -> String {
        // Serializing plain strings and integers cannot fail.
        serde_json::to_string(self).unwrap_or_default()
    }
}

/// A validated request.
#[derive(Debug, Clone, PartialEq)]
pub struct Request {
    pub command_line: String,
    /// `None` for notifications.
    pub id: Option<Value>,
}

/// Decode a request into the command line it runs.
pub fn parse_request(text: &[u8]) -> Result<Request, RpcErrorCode> {
    let root: Value = serde_json::from_slice(text).map_err(|e| {
        warn!("RPC: parse error: {}", e);
        RpcErrorCode::ParseError
    })?;
    let Value::Object(mut obj) = root else {
        return Err(RpcErrorCode::InvalidRequest);
    };
    let Some(Value::String(method)) = obj.remove("method") else {
        warn!("RPC: request without a method");
        return Err(RpcErrorCode::InvalidRequest);
    };
    if method.is_empty() {
        return Err(RpcErrorCode::InvalidRequest);
    }
    let params = match obj.remove("params") {
        None => Vec::new(),
        Some(Value::Array(params)) => params,
        Some(_) => {
            warn!("RPC: params is not an array");
            return Err(RpcErrorCode::InvalidRequest);
        }
    };
    let command_line = build_command_line(&method, &params)?;
    Ok(Request {
        command_line,
        id: obj.remove("id"),
    })
}

fn build_command_line(method: &str, params: &[Value]) -> Result<String, RpcErrorCode> {
    let rendered: Vec<String> = params.iter().map(render_param).collect();
    let total = method.len() + rendered.iter().map(|p| p.len() + 1).sum::<usize>();

    let mut line = String::new();
    line.try_reserve_exact(total)
        .map_err(|_| RpcErrorCode::SystemError)?;
    line.push_str(method);
    for p in &rendered {
        line.push(' ');
        line.push_str(p);
    }
    Ok(line)
}

/// Text form of one parameter, quoted when the tokenizer would otherwise
/// split or unescape it.
fn render_param(value: &Value) -> String {
    match value {
        Value::String(s) => quote_if_needed(s),
        Value::Number(n) => n.to_string(),
        Value::Bool(b) => b.to_string(),
        other => quote_if_needed(&other.to_string()),
    }
}

fn quote_if_needed(s: &str) -> String {
    let needs = s.is_empty()
        || s
            .chars()
            .any(|c| c.is_whitespace() || c == '"' || c == '\\');
    if !needs {
        return String::from(s);
    }
    let mut out = String::with_capacity(s.len() + 2);
    out.push('"');
    for c in s.chars() {
        if c == '"' || c == '\\' {
            out.push('\\');
        }
        out.push(c);
    }
    out.push('"');
    out
}

/// Handle one request. Returns the serialized response, or `None` for a
/// notification.
pub fn handle_rpc<I: Interpreter>(text: &[u8], executor: &CommandExecutor<I>) -> Option<String> {
    let req = match parse_request(text) {
        Ok(req) => req,
        Err(code) => return Some(Response::error(code).to_json()),
    };
    debug!("RPC: `{}`", req.command_line);
    let result = executor.execute(&req.command_line);
    let id = req.id?;
    Some(Response::result(id, result.into_text()).to_json())
}

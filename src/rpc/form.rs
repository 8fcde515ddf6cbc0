//! HTTP form transport: `POST /cmd` with `exec=<command line>`, plus the
//! `/config` JSON view of the key/value store.

use std::sync::{Mutex, PoisonError};

use log::{info, warn};

use crate::adapters::config_store::ConfigStore;
use crate::console::executor::CommandExecutor;
use crate::console::registry::Interpreter;

pub const TEXT_PLAIN: &str = "text/plain";
pub const APPLICATION_JSON: &str = "application/json";

/// Largest accepted request body (bytes).
pub const MAX_BODY_LEN: usize = 1024;

const READ_CHUNK: usize = 256;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FormReply {
    pub status: u16,
    pub content_type: &'static str,
    pub body: String,
}

impl FormReply {
    pub fn bad_request() -> Self {
        Self::text(400, "Invalid parameter")
    }

    pub fn too_large() -> Self {
        Self::text(413, "Request body too large")
    }

    fn text(status: u16, body: &str) -> Self {
        Self {
            status,
            content_type: TEXT_PLAIN,
            body: String::from(body),
        }
    }
}

/// Drain a request body through `read`. `Ok(None)` once the body grows
/// past `limit`; nothing read so far is returned in that case.
pub fn read_body<E>(
    mut read: impl FnMut(&mut [u8]) -> Result<usize, E>,
    limit: usize,
) -> Result<Option<Vec<u8>>, E> {
    let mut body = Vec::new();
    let mut chunk = [0u8; READ_CHUNK];
    loop {
        let n = read(&mut chunk)?;
        if n == 0 {
            return Ok(Some(body));
        }
        if body.len() + n > limit {
            return Ok(None);
        }
        body.extend_from_slice(&chunk[..n]);
    }
}

/// Form text of a `/cmd` request: the body, or the URI query when the body
/// is empty. `None` if the body is not UTF-8.
pub fn form_source(body: &[u8], uri: &str) -> Option<String> {
    if body.is_empty() {
        let query = uri.split_once('?').map_or("", |(_, q)| q);
        return Some(String::from(query));
    }
    core::str::from_utf8(body).ok().map(String::from)
}

/// Decode one `application/x-www-form-urlencoded` component.
pub fn url_decode(s: &str) -> Option<String> {
    let bytes = s.as_bytes();
    let mut out = Vec::with_capacity(bytes.len());
    let mut i = 0;
    while i < bytes.len() {
        match bytes[i] {
            b'+' => out.push(b' '),
            b'%' => {
                let hex = bytes.get(i + 1..i + 3)?;
                if !hex.iter().all(u8::is_ascii_hexdigit) {
                    return None;
                }
                let hex = core::str::from_utf8(hex).ok()?;
                out.push(u8::from_str_radix(hex, 16).ok()?);
                i += 2;
            }
            b => out.push(b),
        }
        i += 1;
    }
    String::from_utf8(out).ok()
}

/// Value of the first `name` field, decoded. `Err(())` on a malformed
/// escape anywhere in that field.
fn form_field(query: &str, name: &str) -> Result<Option<String>, ()> {
    for pair in query.split('&') {
        let (key, value) = pair.split_once('=').unwrap_or((pair, ""));
        if url_decode(key).as_deref() == Some(name) {
            return url_decode(value).map(Some).ok_or(());
        }
    }
    Ok(None)
}

/// Run the `exec` field of a form body and build the HTTP reply.
pub fn handle_form<I: Interpreter>(query: &str, executor: &CommandExecutor<I>) -> FormReply {
    match form_field(query, "exec") {
        Ok(Some(line)) => FormReply {
            status: 200,
            content_type: TEXT_PLAIN,
            body: executor.execute(&line).into_text(),
        },
        Ok(None) => {
            warn!("HTTP: /cmd without exec parameter");
            FormReply::bad_request()
        }
        Err(()) => {
            warn!("HTTP: /cmd with malformed escape");
            FormReply::bad_request()
        }
    }
}

/// Full `POST /cmd` handling: read at most [`MAX_BODY_LEN`] bytes, pick
/// the form source, run it.
pub fn handle_cmd_request<I: Interpreter, E>(
    read: impl FnMut(&mut [u8]) -> Result<usize, E>,
    uri: &str,
    executor: &CommandExecutor<I>,
) -> Result<FormReply, E> {
    let Some(body) = read_body(read, MAX_BODY_LEN)? else {
        warn!("HTTP: /cmd body exceeds {} bytes", MAX_BODY_LEN);
        return Ok(FormReply::too_large());
    };
    let Some(query) = form_source(&body, uri) else {
        warn!("HTTP: /cmd body is not UTF-8");
        return Ok(FormReply::bad_request());
    };
    Ok(handle_form(&query, executor))
}

/// `GET /config`: every entry as one flat JSON object.
pub fn config_reply(store: &Mutex<ConfigStore>) -> FormReply {
    let json = store.lock().unwrap_or_else(PoisonError::into_inner).dumps();
    FormReply {
        status: 200,
        content_type: APPLICATION_JSON,
        body: json,
    }
}

/// `POST /config`: apply a flat or nested JSON object. Changes stay in
/// memory until `savecfg`.
pub fn apply_config(store: &Mutex<ConfigStore>, body: &[u8]) -> FormReply {
    let Ok(json) = core::str::from_utf8(body) else {
        return FormReply::bad_request();
    };
    let applied = store
        .lock()
        .unwrap_or_else(PoisonError::into_inner)
        .loads(json);
    match applied {
        Ok(n) => {
            info!("HTTP: /config applied {} entries", n);
            FormReply::text(200, &format!("Applied {} entries", n))
        }
        Err(e) => {
            warn!("HTTP: /config rejected: {}", e);
            FormReply::bad_request()
        }
    }
}

use rusqlite::Connection;
use serde_json::Value;

use crate::config::SchoolConfig;
use crate::ipc::error::err;
use crate::ipc::types::{AppState, Request};

pub fn db_conn<'a>(state: &'a AppState, req: &Request) -> Result<&'a Connection, Value> {
    state
        .db
        .as_ref()
        .ok_or_else(|| err(&req.id, "no_workspace", "select a workspace first", None))
}

pub fn required_str(req: &Request, key: &str) -> Result<String, Value> {
    req.params
        .get(key)
        .and_then(|v| v.as_str())
        .map(|v| v.to_string())
        .ok_or_else(|| err(&req.id, "bad_params", format!("missing {}", key), None))
}

/// Like `required_str` but also rejects blank values.
pub fn required_nonempty_str(req: &Request, key: &str) -> Result<String, Value> {
    let v = required_str(req, key)?;
    let t = v.trim();
    if t.is_empty() {
        return Err(err(
            &req.id,
            "bad_params",
            format!("{} must not be empty", key),
            None,
        ));
    }
    Ok(t.to_string())
}

pub fn optional_str(req: &Request, key: &str) -> Option<String> {
    req.params
        .get(key)
        .and_then(|v| v.as_str())
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
}

pub fn required_f64(req: &Request, key: &str) -> Result<f64, Value> {
    let Some(v) = req.params.get(key).and_then(|v| v.as_f64()) else {
        return Err(err(
            &req.id,
            "bad_params",
            format!("missing or non-numeric {}", key),
            None,
        ));
    };
    if !v.is_finite() {
        return Err(err(
            &req.id,
            "bad_params",
            format!("{} must be finite", key),
            None,
        ));
    }
    Ok(v)
}

pub fn school_config(conn: &Connection, req: &Request) -> Result<SchoolConfig, Value> {
    SchoolConfig::load(conn).map_err(|e| err(&req.id, "db_query_failed", e.to_string(), None))
}

pub fn now_rfc3339() -> String {
    chrono::Utc::now().to_rfc3339()
}

use crate::ipc::error::{err, ok};
use crate::ipc::helpers::{db_conn, school_config};
use crate::ipc::types::{AppState, Request};
use serde_json::json;

fn handle_school_get(state: &mut AppState, req: &Request) -> serde_json::Value {
    let conn = match db_conn(state, req) {
        Ok(c) => c,
        Err(e) => return e,
    };
    match school_config(conn, req) {
        Ok(cfg) => ok(&req.id, json!(cfg)),
        Err(e) => e,
    }
}

fn handle_school_update(state: &mut AppState, req: &Request) -> serde_json::Value {
    let conn = match db_conn(state, req) {
        Ok(c) => c,
        Err(e) => return e,
    };
    let Some(patch) = req.params.get("patch").and_then(|v| v.as_object()) else {
        return err(&req.id, "bad_params", "patch must be an object", None);
    };
    let mut cfg = match school_config(conn, req) {
        Ok(c) => c,
        Err(e) => return e,
    };
    if let Err(msg) = cfg.apply_patch(patch) {
        return err(&req.id, "bad_params", msg, None);
    }
    if let Err(e) = cfg.save(conn) {
        return err(&req.id, "db_update_failed", e.to_string(), None);
    }
    ok(&req.id, json!(cfg))
}

pub fn try_handle(state: &mut AppState, req: &Request) -> Option<serde_json::Value> {
    match req.method.as_str() {
        "school.get" => Some(handle_school_get(state, req)),
        "school.update" => Some(handle_school_update(state, req)),
        _ => None,
    }
}

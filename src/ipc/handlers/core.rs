use crate::config::{self, SchoolConfig, SCHOOL_SETTINGS_KEY};
use crate::db;
use crate::ipc::error::{err, ok};
use crate::ipc::types::{AppState, Request};
use serde_json::json;
use std::path::{Path, PathBuf};

fn handle_health(state: &mut AppState, req: &Request) -> serde_json::Value {
    ok(
        &req.id,
        json!({
            "version": env!("CARGO_PKG_VERSION"),
            "workspacePath": state.workspace.as_ref().map(|p| p.to_string_lossy().to_string())
        }),
    )
}

fn handle_workspace_select(state: &mut AppState, req: &Request) -> serde_json::Value {
    let p = req
        .params
        .get("path")
        .and_then(|v| v.as_str())
        .map(PathBuf::from);
    let Some(path) = p else {
        return err(&req.id, "bad_params", "missing params.path", None);
    };

    match select_workspace(state, &path) {
        Ok(()) => ok(&req.id, json!({ "workspacePath": path.to_string_lossy() })),
        Err(e) => err(&req.id, "db_open_failed", format!("{e:?}"), None),
    }
}

pub fn select_workspace(state: &mut AppState, path: &Path) -> anyhow::Result<()> {
    let conn = db::open_db(path)?;

    // Best-effort: seed the school context from school.json on first open.
    // This must not prevent the workspace from opening.
    match db::settings_get_json(&conn, SCHOOL_SETTINGS_KEY) {
        Ok(None) => match config::read_school_file(path) {
            Ok(Some(cfg)) => {
                if let Err(e) = cfg.save(&conn) {
                    tracing::warn!("school.json import failed: {e:#}");
                }
            }
            Ok(None) => {}
            Err(e) => tracing::warn!("school.json ignored: {e:#}"),
        },
        Ok(Some(_)) => {}
        Err(e) => tracing::warn!("school context unreadable: {e:#}"),
    }

    let school = SchoolConfig::load(&conn).unwrap_or_default();
    tracing::info!(
        workspace = %path.to_string_lossy(),
        school = %school.school_name,
        "workspace selected"
    );

    state.workspace = Some(path.to_path_buf());
    state.db = Some(conn);
    Ok(())
}

pub fn try_handle(state: &mut AppState, req: &Request) -> Option<serde_json::Value> {
    match req.method.as_str() {
        "health" => Some(handle_health(state, req)),
        "workspace.select" => Some(handle_workspace_select(state, req)),
        _ => None,
    }
}

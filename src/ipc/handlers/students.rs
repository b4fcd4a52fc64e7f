use crate::ipc::error::{err, ok};
use crate::ipc::helpers::{
    db_conn, now_rfc3339, optional_str, required_nonempty_str, required_str,
};
use crate::ipc::types::{AppState, Request};
use rusqlite::OptionalExtension;
use serde_json::json;
use uuid::Uuid;

fn handle_students_list(state: &mut AppState, req: &Request) -> serde_json::Value {
    let conn = match db_conn(state, req) {
        Ok(c) => c,
        Err(e) => return e,
    };
    let class_id = match required_str(req, "classId") {
        Ok(v) => v,
        Err(e) => return e,
    };
    let section = optional_str(req, "section");
    let include_inactive = req
        .params
        .get("includeInactive")
        .and_then(|v| v.as_bool())
        .unwrap_or(false);

    let mut stmt = match conn.prepare(
        "SELECT id, name, roll_number, section, active
         FROM students
         WHERE class_id = ?1
           AND (?2 IS NULL OR section = ?2)
           AND (?3 = 1 OR active = 1)
         ORDER BY name, roll_number, id",
    ) {
        Ok(s) => s,
        Err(e) => return err(&req.id, "db_query_failed", e.to_string(), None),
    };
    let rows = stmt
        .query_map((&class_id, &section, include_inactive as i64), |r| {
            let id: String = r.get(0)?;
            let name: String = r.get(1)?;
            let roll_number: String = r.get(2)?;
            let section: Option<String> = r.get(3)?;
            let active: i64 = r.get(4)?;
            Ok(json!({
                "id": id,
                "name": name,
                "rollNumber": roll_number,
                "section": section,
                "active": active != 0
            }))
        })
        .and_then(|it| it.collect::<Result<Vec<_>, _>>());

    match rows {
        Ok(students) => ok(&req.id, json!({ "students": students })),
        Err(e) => err(&req.id, "db_query_failed", e.to_string(), None),
    }
}

fn handle_students_create(state: &mut AppState, req: &Request) -> serde_json::Value {
    let conn = match db_conn(state, req) {
        Ok(c) => c,
        Err(e) => return e,
    };
    let class_id = match required_str(req, "classId") {
        Ok(v) => v,
        Err(e) => return e,
    };
    let name = match required_nonempty_str(req, "name") {
        Ok(v) => v,
        Err(e) => return e,
    };
    let roll_number = match required_nonempty_str(req, "rollNumber") {
        Ok(v) => v,
        Err(e) => return e,
    };
    let section = optional_str(req, "section");

    let class_exists: Option<i64> = match conn
        .query_row("SELECT 1 FROM classes WHERE id = ?", [&class_id], |r| {
            r.get(0)
        })
        .optional()
    {
        Ok(v) => v,
        Err(e) => return err(&req.id, "db_query_failed", e.to_string(), None),
    };
    if class_exists.is_none() {
        return err(&req.id, "not_found", "class not found", None);
    }

    let student_id = Uuid::new_v4().to_string();
    if let Err(e) = conn.execute(
        "INSERT INTO students(id, class_id, name, roll_number, section, active, updated_at)
         VALUES(?, ?, ?, ?, ?, 1, ?)",
        (
            &student_id,
            &class_id,
            &name,
            &roll_number,
            &section,
            now_rfc3339(),
        ),
    ) {
        return err(
            &req.id,
            "db_insert_failed",
            e.to_string(),
            Some(json!({ "table": "students" })),
        );
    }

    ok(&req.id, json!({ "studentId": student_id }))
}

fn handle_students_update(state: &mut AppState, req: &Request) -> serde_json::Value {
    let conn = match db_conn(state, req) {
        Ok(c) => c,
        Err(e) => return e,
    };
    let student_id = match required_str(req, "studentId") {
        Ok(v) => v,
        Err(e) => return e,
    };
    let Some(patch) = req.params.get("patch").and_then(|v| v.as_object()) else {
        return err(&req.id, "bad_params", "patch must be an object", None);
    };

    let current: Option<(String, String, Option<String>, i64)> = match conn
        .query_row(
            "SELECT name, roll_number, section, active FROM students WHERE id = ?",
            [&student_id],
            |r| Ok((r.get(0)?, r.get(1)?, r.get(2)?, r.get(3)?)),
        )
        .optional()
    {
        Ok(v) => v,
        Err(e) => return err(&req.id, "db_query_failed", e.to_string(), None),
    };
    let Some((mut name, mut roll_number, mut section, mut active)) = current else {
        return err(&req.id, "not_found", "student not found", None);
    };

    for (k, v) in patch {
        match k.as_str() {
            "name" | "rollNumber" => {
                let Some(s) = v.as_str().map(str::trim).filter(|s| !s.is_empty()) else {
                    return err(
                        &req.id,
                        "bad_params",
                        format!("{} must be a non-empty string", k),
                        None,
                    );
                };
                if k == "name" {
                    name = s.to_string();
                } else {
                    roll_number = s.to_string();
                }
            }
            "section" => {
                if v.is_null() {
                    section = None;
                } else if let Some(s) = v.as_str() {
                    let t = s.trim();
                    section = if t.is_empty() { None } else { Some(t.to_string()) };
                } else {
                    return err(&req.id, "bad_params", "section must be string or null", None);
                }
            }
            "active" => {
                let Some(b) = v.as_bool() else {
                    return err(&req.id, "bad_params", "active must be a boolean", None);
                };
                active = b as i64;
            }
            _ => {
                return err(
                    &req.id,
                    "bad_params",
                    format!("unknown student field: {}", k),
                    None,
                )
            }
        }
    }

    if let Err(e) = conn.execute(
        "UPDATE students
         SET name = ?, roll_number = ?, section = ?, active = ?, updated_at = ?
         WHERE id = ?",
        (
            &name,
            &roll_number,
            &section,
            active,
            now_rfc3339(),
            &student_id,
        ),
    ) {
        return err(&req.id, "db_update_failed", e.to_string(), None);
    }

    ok(&req.id, json!({ "ok": true }))
}

pub fn try_handle(state: &mut AppState, req: &Request) -> Option<serde_json::Value> {
    match req.method.as_str() {
        "students.list" => Some(handle_students_list(state, req)),
        "students.create" => Some(handle_students_create(state, req)),
        "students.update" => Some(handle_students_update(state, req)),
        _ => None,
    }
}

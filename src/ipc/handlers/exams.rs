use crate::calc;
use crate::ipc::error::{err, ok};
use crate::ipc::helpers::{db_conn, optional_str, required_f64, required_nonempty_str, required_str};
use crate::ipc::types::{AppState, Request};
use rusqlite::OptionalExtension;
use serde_json::json;
use uuid::Uuid;

fn handle_exams_list(state: &mut AppState, req: &Request) -> serde_json::Value {
    let conn = match db_conn(state, req) {
        Ok(c) => c,
        Err(e) => return e,
    };
    let class_id = match required_str(req, "classId") {
        Ok(v) => v,
        Err(e) => return e,
    };

    let mut stmt = match conn.prepare(
        "SELECT exam_name, COUNT(*), COALESCE(SUM(total_marks), 0), MIN(exam_date)
         FROM subject_exams
         WHERE class_id = ?
         GROUP BY exam_name
         ORDER BY exam_name",
    ) {
        Ok(s) => s,
        Err(e) => return err(&req.id, "db_query_failed", e.to_string(), None),
    };
    let rows = stmt
        .query_map([&class_id], |r| {
            let exam_name: String = r.get(0)?;
            let subject_count: i64 = r.get(1)?;
            let total_max: f64 = r.get(2)?;
            let first_date: Option<String> = r.get(3)?;
            Ok(json!({
                "examName": exam_name,
                "subjectCount": subject_count,
                "totalMax": total_max,
                "firstDate": first_date
            }))
        })
        .and_then(|it| it.collect::<Result<Vec<_>, _>>());

    match rows {
        Ok(exams) => ok(&req.id, json!({ "exams": exams })),
        Err(e) => err(&req.id, "db_query_failed", e.to_string(), None),
    }
}

fn handle_subjects_list(state: &mut AppState, req: &Request) -> serde_json::Value {
    let conn = match db_conn(state, req) {
        Ok(c) => c,
        Err(e) => return e,
    };
    let class_id = match required_str(req, "classId") {
        Ok(v) => v,
        Err(e) => return e,
    };
    let exam_name = match required_nonempty_str(req, "examName") {
        Ok(v) => v,
        Err(e) => return e,
    };

    let mut stmt = match conn.prepare(
        "SELECT id, subject, total_marks, exam_date
         FROM subject_exams
         WHERE class_id = ? AND exam_name = ?
         ORDER BY subject",
    ) {
        Ok(s) => s,
        Err(e) => return err(&req.id, "db_query_failed", e.to_string(), None),
    };
    let rows = stmt
        .query_map((&class_id, &exam_name), |r| {
            let id: String = r.get(0)?;
            let subject: String = r.get(1)?;
            let total_marks: f64 = r.get(2)?;
            let exam_date: Option<String> = r.get(3)?;
            Ok(json!({
                "id": id,
                "subject": subject,
                "totalMarks": total_marks,
                "examDate": exam_date
            }))
        })
        .and_then(|it| it.collect::<Result<Vec<_>, _>>());

    match rows {
        Ok(subjects) => ok(&req.id, json!({ "subjects": subjects })),
        Err(e) => err(&req.id, "db_query_failed", e.to_string(), None),
    }
}

fn handle_subjects_upsert(state: &mut AppState, req: &Request) -> serde_json::Value {
    let conn = match db_conn(state, req) {
        Ok(c) => c,
        Err(e) => return e,
    };
    let class_id = match required_str(req, "classId") {
        Ok(v) => v,
        Err(e) => return e,
    };
    let exam_name = match required_nonempty_str(req, "examName") {
        Ok(v) => v,
        Err(e) => return e,
    };
    let subject = match required_nonempty_str(req, "subject") {
        Ok(v) => v,
        Err(e) => return e,
    };
    let total_marks = match required_f64(req, "totalMarks") {
        Ok(v) => v,
        Err(e) => return e,
    };
    if total_marks <= 0.0 {
        return err(&req.id, "bad_params", "totalMarks must be positive", None);
    }
    if total_marks > calc::MAX_TOTAL_MARKS {
        return err(
            &req.id,
            "bad_params",
            format!("totalMarks must not exceed {}", calc::MAX_TOTAL_MARKS),
            Some(json!({ "totalMarks": total_marks })),
        );
    }
    let exam_date = optional_str(req, "examDate");
    if let Some(d) = exam_date.as_deref() {
        if chrono::NaiveDate::parse_from_str(d, "%Y-%m-%d").is_err() {
            return err(
                &req.id,
                "bad_params",
                "examDate must be YYYY-MM-DD",
                Some(json!({ "examDate": d })),
            );
        }
    }

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

    let existing: Option<String> = match conn
        .query_row(
            "SELECT id FROM subject_exams WHERE class_id = ? AND exam_name = ? AND subject = ?",
            (&class_id, &exam_name, &subject),
            |r| r.get(0),
        )
        .optional()
    {
        Ok(v) => v,
        Err(e) => return err(&req.id, "db_query_failed", e.to_string(), None),
    };

    if let Some(exam_id) = existing {
        // Lowering the max below a recorded mark would let totals exceed totalMax.
        let max_recorded: Option<f64> = match conn.query_row(
            "SELECT MAX(marks_obtained) FROM mark_records WHERE exam_id = ?",
            [&exam_id],
            |r| r.get(0),
        ) {
            Ok(v) => v,
            Err(e) => return err(&req.id, "db_query_failed", e.to_string(), None),
        };
        if let Some(m) = max_recorded.filter(|m| *m > total_marks) {
            return err(
                &req.id,
                "bad_params",
                "totalMarks is below an already recorded mark",
                Some(json!({ "maxRecorded": m })),
            );
        }
        if let Err(e) = conn.execute(
            "UPDATE subject_exams SET total_marks = ?, exam_date = ? WHERE id = ?",
            (total_marks, &exam_date, &exam_id),
        ) {
            return err(&req.id, "db_update_failed", e.to_string(), None);
        }
        return ok(&req.id, json!({ "examId": exam_id, "created": false }));
    }

    let exam_id = Uuid::new_v4().to_string();
    if let Err(e) = conn.execute(
        "INSERT INTO subject_exams(id, class_id, exam_name, subject, total_marks, exam_date)
         VALUES(?, ?, ?, ?, ?, ?)",
        (
            &exam_id,
            &class_id,
            &exam_name,
            &subject,
            total_marks,
            &exam_date,
        ),
    ) {
        return err(
            &req.id,
            "db_insert_failed",
            e.to_string(),
            Some(json!({ "table": "subject_exams" })),
        );
    }

    ok(&req.id, json!({ "examId": exam_id, "created": true }))
}

fn handle_subjects_delete(state: &mut AppState, req: &Request) -> serde_json::Value {
    let conn = match db_conn(state, req) {
        Ok(c) => c,
        Err(e) => return e,
    };
    let exam_id = match required_str(req, "examId") {
        Ok(v) => v,
        Err(e) => return e,
    };

    let tx = match conn.unchecked_transaction() {
        Ok(t) => t,
        Err(e) => return err(&req.id, "db_tx_failed", e.to_string(), None),
    };
    if let Err(e) = tx.execute("DELETE FROM mark_records WHERE exam_id = ?", [&exam_id]) {
        let _ = tx.rollback();
        return err(
            &req.id,
            "db_delete_failed",
            e.to_string(),
            Some(json!({ "table": "mark_records" })),
        );
    }
    let deleted = match tx.execute("DELETE FROM subject_exams WHERE id = ?", [&exam_id]) {
        Ok(n) => n,
        Err(e) => {
            let _ = tx.rollback();
            return err(
                &req.id,
                "db_delete_failed",
                e.to_string(),
                Some(json!({ "table": "subject_exams" })),
            );
        }
    };
    if deleted == 0 {
        let _ = tx.rollback();
        return err(&req.id, "not_found", "subject exam not found", None);
    }
    if let Err(e) = tx.commit() {
        return err(&req.id, "db_commit_failed", e.to_string(), None);
    }

    ok(&req.id, json!({ "ok": true }))
}

pub fn try_handle(state: &mut AppState, req: &Request) -> Option<serde_json::Value> {
    match req.method.as_str() {
        "exams.list" => Some(handle_exams_list(state, req)),
        "exams.subjects.list" => Some(handle_subjects_list(state, req)),
        "exams.subjects.upsert" => Some(handle_subjects_upsert(state, req)),
        "exams.subjects.delete" => Some(handle_subjects_delete(state, req)),
        _ => None,
    }
}

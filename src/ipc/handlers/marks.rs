use crate::calc;
use crate::ipc::error::{err, ok};
use crate::ipc::helpers::{db_conn, now_rfc3339, optional_str, required_f64, required_str};
use crate::ipc::types::{AppState, Request};
use rusqlite::OptionalExtension;
use serde_json::json;
use uuid::Uuid;

fn handle_marks_list(state: &mut AppState, req: &Request) -> serde_json::Value {
    let conn = match db_conn(state, req) {
        Ok(c) => c,
        Err(e) => return e,
    };
    let exam_id = match required_str(req, "examId") {
        Ok(v) => v,
        Err(e) => return e,
    };

    let mut stmt = match conn.prepare(
        "SELECT mr.id, mr.student_id, s.name, mr.marks_obtained, mr.grade, mr.gpa, mr.updated_at
         FROM mark_records mr
         JOIN students s ON s.id = mr.student_id
         WHERE mr.exam_id = ?
         ORDER BY s.name, s.roll_number",
    ) {
        Ok(s) => s,
        Err(e) => return err(&req.id, "db_query_failed", e.to_string(), None),
    };
    let rows = stmt
        .query_map([&exam_id], |r| {
            let id: String = r.get(0)?;
            let student_id: String = r.get(1)?;
            let student_name: String = r.get(2)?;
            let marks_obtained: f64 = r.get(3)?;
            let grade: String = r.get(4)?;
            let gpa: Option<f64> = r.get(5)?;
            let updated_at: Option<String> = r.get(6)?;
            Ok(json!({
                "id": id,
                "studentId": student_id,
                "studentName": student_name,
                "examId": exam_id,
                "marksObtained": marks_obtained,
                "grade": grade,
                "gpa": gpa,
                "updatedAt": updated_at
            }))
        })
        .and_then(|it| it.collect::<Result<Vec<_>, _>>());

    match rows {
        Ok(marks) => ok(&req.id, json!({ "marks": marks })),
        Err(e) => err(&req.id, "db_query_failed", e.to_string(), None),
    }
}

/// Grade letter and GPA for a mark. An explicit grade wins; its GPA comes
/// from the scale when the letter is on it.
fn resolve_grade(explicit: Option<String>, marks: f64, total_marks: f64) -> (String, Option<f64>) {
    match explicit {
        Some(g) => {
            let gpa = calc::gpa_for_grade(&g);
            (g, gpa)
        }
        None => {
            let band = calc::grade_for_percent(calc::raw_percentage(marks, total_marks));
            (band.grade.to_string(), Some(band.gpa))
        }
    }
}

fn handle_marks_upsert(state: &mut AppState, req: &Request) -> serde_json::Value {
    let conn = match db_conn(state, req) {
        Ok(c) => c,
        Err(e) => return e,
    };
    let exam_id = match required_str(req, "examId") {
        Ok(v) => v,
        Err(e) => return e,
    };
    let student_id = match required_str(req, "studentId") {
        Ok(v) => v,
        Err(e) => return e,
    };
    let marks_obtained = match required_f64(req, "marksObtained") {
        Ok(v) => v,
        Err(e) => return e,
    };

    let exam: Option<(String, f64)> = match conn
        .query_row(
            "SELECT class_id, total_marks FROM subject_exams WHERE id = ?",
            [&exam_id],
            |r| Ok((r.get(0)?, r.get(1)?)),
        )
        .optional()
    {
        Ok(v) => v,
        Err(e) => return err(&req.id, "db_query_failed", e.to_string(), None),
    };
    let Some((exam_class_id, total_marks)) = exam else {
        return err(&req.id, "not_found", "subject exam not found", None);
    };

    let student_class_id: Option<String> = match conn
        .query_row(
            "SELECT class_id FROM students WHERE id = ?",
            [&student_id],
            |r| r.get(0),
        )
        .optional()
    {
        Ok(v) => v,
        Err(e) => return err(&req.id, "db_query_failed", e.to_string(), None),
    };
    let Some(student_class_id) = student_class_id else {
        return err(&req.id, "not_found", "student not found", None);
    };
    if student_class_id != exam_class_id {
        return err(
            &req.id,
            "bad_params",
            "student is not enrolled in the exam's class",
            None,
        );
    }

    if marks_obtained < 0.0 || marks_obtained > total_marks {
        return err(
            &req.id,
            "bad_params",
            "marksObtained must be between 0 and totalMarks",
            Some(json!({ "marksObtained": marks_obtained, "totalMarks": total_marks })),
        );
    }

    let (grade, gpa) = resolve_grade(optional_str(req, "grade"), marks_obtained, total_marks);

    if let Err(e) = conn.execute(
        "INSERT INTO mark_records(id, student_id, exam_id, marks_obtained, grade, gpa, updated_at)
         VALUES(?, ?, ?, ?, ?, ?, ?)
         ON CONFLICT(student_id, exam_id) DO UPDATE SET
           marks_obtained = excluded.marks_obtained,
           grade = excluded.grade,
           gpa = excluded.gpa,
           updated_at = excluded.updated_at",
        (
            Uuid::new_v4().to_string(),
            &student_id,
            &exam_id,
            marks_obtained,
            &grade,
            gpa,
            now_rfc3339(),
        ),
    ) {
        return err(
            &req.id,
            "db_insert_failed",
            e.to_string(),
            Some(json!({ "table": "mark_records" })),
        );
    }

    let mark_id: String = match conn.query_row(
        "SELECT id FROM mark_records WHERE student_id = ? AND exam_id = ?",
        (&student_id, &exam_id),
        |r| r.get(0),
    ) {
        Ok(v) => v,
        Err(e) => return err(&req.id, "db_query_failed", e.to_string(), None),
    };

    ok(
        &req.id,
        json!({ "markId": mark_id, "grade": grade, "gpa": gpa }),
    )
}

fn handle_marks_delete(state: &mut AppState, req: &Request) -> serde_json::Value {
    let conn = match db_conn(state, req) {
        Ok(c) => c,
        Err(e) => return e,
    };
    let exam_id = match required_str(req, "examId") {
        Ok(v) => v,
        Err(e) => return e,
    };
    let student_id = match required_str(req, "studentId") {
        Ok(v) => v,
        Err(e) => return e,
    };

    match conn.execute(
        "DELETE FROM mark_records WHERE exam_id = ? AND student_id = ?",
        (&exam_id, &student_id),
    ) {
        Ok(n) => ok(&req.id, json!({ "deleted": n > 0 })),
        Err(e) => err(&req.id, "db_delete_failed", e.to_string(), None),
    }
}

pub fn try_handle(state: &mut AppState, req: &Request) -> Option<serde_json::Value> {
    match req.method.as_str() {
        "marks.list" => Some(handle_marks_list(state, req)),
        "marks.upsert" => Some(handle_marks_upsert(state, req)),
        "marks.delete" => Some(handle_marks_delete(state, req)),
        _ => None,
    }
}

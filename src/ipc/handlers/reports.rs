use crate::grades;
use crate::ipc::error::{engine_err, ok};
use crate::ipc::helpers::{db_conn, optional_str, required_str, school_config};
use crate::ipc::types::{AppState, Request};
use crate::store::SqliteSource;
use crate::tabulation::{self, TabulationRequest};
use serde_json::json;

struct ExamParams {
    class_id: String,
    exam_name: String,
    section: Option<String>,
}

impl ExamParams {
    fn from_request(req: &Request) -> Self {
        let raw = |key: &str| {
            req.params
                .get(key)
                .and_then(|v| v.as_str())
                .unwrap_or_default()
                .to_string()
        };
        Self {
            class_id: raw("classId"),
            exam_name: raw("examName"),
            section: optional_str(req, "section"),
        }
    }

    fn as_request(&self) -> TabulationRequest<'_> {
        TabulationRequest::new(&self.class_id, &self.exam_name, self.section.as_deref())
    }
}

fn handle_tabulation_generate(state: &mut AppState, req: &Request) -> serde_json::Value {
    let conn = match db_conn(state, req) {
        Ok(c) => c,
        Err(e) => return e,
    };
    let school = match school_config(conn, req) {
        Ok(c) => c,
        Err(e) => return e,
    };
    let params = ExamParams::from_request(req);
    let source = SqliteSource::new(conn);

    match tabulation::generate(&source, &params.as_request(), &school) {
        Ok(Some(tab)) => ok(&req.id, json!(tab)),
        Ok(None) => ok(&req.id, serde_json::Value::Null),
        Err(e) => engine_err(&req.id, &e),
    }
}

fn handle_transcript_get(state: &mut AppState, req: &Request) -> serde_json::Value {
    let conn = match db_conn(state, req) {
        Ok(c) => c,
        Err(e) => return e,
    };
    let student_id = match required_str(req, "studentId") {
        Ok(v) => v,
        Err(e) => return e,
    };
    let school = match school_config(conn, req) {
        Ok(c) => c,
        Err(e) => return e,
    };
    let params = ExamParams::from_request(req);
    let source = SqliteSource::new(conn);

    match tabulation::transcript(&source, &params.as_request(), &student_id, &school) {
        Ok(t) => ok(&req.id, json!(t)),
        Err(e) => engine_err(&req.id, &e),
    }
}

fn handle_grades_details(state: &mut AppState, req: &Request) -> serde_json::Value {
    let conn = match db_conn(state, req) {
        Ok(c) => c,
        Err(e) => return e,
    };
    let params = ExamParams::from_request(req);
    let source = SqliteSource::new(conn);

    match grades::grade_details(&source, &params.as_request()) {
        Ok(d) => ok(&req.id, json!(d)),
        Err(e) => engine_err(&req.id, &e),
    }
}

pub fn try_handle(state: &mut AppState, req: &Request) -> Option<serde_json::Value> {
    match req.method.as_str() {
        "tabulation.generate" => Some(handle_tabulation_generate(state, req)),
        "transcript.get" => Some(handle_transcript_get(state, req)),
        "grades.details" => Some(handle_grades_details(state, req)),
        _ => None,
    }
}

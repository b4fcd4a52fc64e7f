use serde::Serialize;
use std::collections::HashMap;

use crate::calc::{self, PassStats};
use crate::error::{TabulationError, TabulationResult};
use crate::tabulation::{ResultSource, TabulationRequest};

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GradeDetail {
    pub student_id: String,
    pub student_name: String,
    pub roll_number: String,
    pub exam_id: String,
    pub subject: String,
    pub marks_obtained: f64,
    pub total_marks: f64,
    pub grade: String,
    pub gpa: Option<f64>,
    pub passed: Option<bool>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GradeDetails {
    pub class_id: String,
    pub exam_name: String,
    pub rows: Vec<GradeDetail>,
    pub stats: PassStats,
}

/// Every recorded mark for the class/exam with its GPA, ordered by student
/// name then subject. Pass counting uses the GPA rule, not the percentage rule.
pub fn grade_details<S: ResultSource + ?Sized>(
    source: &S,
    req: &TabulationRequest<'_>,
) -> TabulationResult<GradeDetails> {
    if req.class_id.is_empty() || req.exam_name.is_empty() {
        return Err(TabulationError::BadParams(
            "classId and examName must not be empty".to_string(),
        ));
    }

    let roster = source.roster(req.class_id, req.section)?;
    let subject_exams = source.subject_exams(req.class_id, req.exam_name)?;
    if subject_exams.is_empty() {
        return Ok(GradeDetails {
            class_id: req.class_id.to_string(),
            exam_name: req.exam_name.to_string(),
            rows: Vec::new(),
            stats: calc::gpa_pass_stats(std::iter::empty::<Option<f64>>()),
        });
    }
    let exam_ids: Vec<String> = subject_exams.iter().map(|e| e.id.clone()).collect();
    let marks = source.mark_records(&exam_ids)?;

    // Roster position doubles as the name ordering key.
    let student_pos: HashMap<&str, usize> = roster
        .iter()
        .enumerate()
        .map(|(i, s)| (s.id.as_str(), i))
        .collect();
    let exam_by_id: HashMap<&str, _> = subject_exams.iter().map(|e| (e.id.as_str(), e)).collect();

    let mut keyed: Vec<(usize, GradeDetail)> = Vec::new();
    for m in &marks {
        let (Some(&pos), Some(exam)) = (
            student_pos.get(m.student_id.as_str()),
            exam_by_id.get(m.exam_id.as_str()),
        ) else {
            continue;
        };
        let s = &roster[pos];
        keyed.push((
            pos,
            GradeDetail {
                student_id: s.id.clone(),
                student_name: s.name.clone(),
                roll_number: s.roll_number.clone(),
                exam_id: exam.id.clone(),
                subject: exam.subject.clone(),
                marks_obtained: m.marks_obtained,
                total_marks: exam.total_marks,
                grade: m.grade.clone(),
                gpa: m.gpa,
                passed: m.gpa.map(calc::gpa_passes),
            },
        ));
    }
    keyed.sort_by(|(pa, a), (pb, b)| pa.cmp(pb).then_with(|| a.subject.cmp(&b.subject)));
    let rows: Vec<GradeDetail> = keyed.into_iter().map(|(_, d)| d).collect();
    let stats = calc::gpa_pass_stats(rows.iter().map(|r| r.gpa));

    Ok(GradeDetails {
        class_id: req.class_id.to_string(),
        exam_name: req.exam_name.to_string(),
        rows,
        stats,
    })
}

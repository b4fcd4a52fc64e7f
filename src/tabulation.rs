use serde::{Serialize, Serializer};
use sha2::{Digest, Sha256};
use std::cmp::Ordering;
use std::collections::{BTreeMap, HashMap};

use crate::calc::{self, ResultStatus};
use crate::config::SchoolConfig;
use crate::error::{TabulationError, TabulationResult};

/// Placeholder rendered for a subject with no recorded mark.
pub const MISSING_CELL: &str = "-";

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StudentRosterEntry {
    pub id: String,
    pub name: String,
    pub roll_number: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SubjectExam {
    pub id: String,
    pub subject: String,
    pub total_marks: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MarkRecord {
    pub student_id: String,
    pub exam_id: String,
    pub marks_obtained: f64,
    pub grade: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub gpa: Option<f64>,
}

/// Read side of the results store.
pub trait ResultSource {
    /// Active students of the class (optionally one section), ordered by name.
    fn roster(
        &self,
        class_id: &str,
        section: Option<&str>,
    ) -> TabulationResult<Vec<StudentRosterEntry>>;

    fn subject_exams(&self, class_id: &str, exam_name: &str)
        -> TabulationResult<Vec<SubjectExam>>;

    fn mark_records(&self, exam_ids: &[String]) -> TabulationResult<Vec<MarkRecord>>;
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SubjectCell {
    #[serde(serialize_with = "marks_or_placeholder")]
    pub marks: Option<f64>,
    #[serde(serialize_with = "grade_or_placeholder")]
    pub grade: Option<String>,
}

impl SubjectCell {
    fn missing() -> Self {
        Self {
            marks: None,
            grade: None,
        }
    }
}

fn marks_or_placeholder<S: Serializer>(v: &Option<f64>, s: S) -> Result<S::Ok, S::Error> {
    match v {
        Some(m) => s.serialize_f64(*m),
        None => s.serialize_str(MISSING_CELL),
    }
}

fn grade_or_placeholder<S: Serializer>(v: &Option<String>, s: S) -> Result<S::Ok, S::Error> {
    match v {
        Some(g) => s.serialize_str(g),
        None => s.serialize_str(MISSING_CELL),
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StudentSummary {
    pub student: StudentRosterEntry,
    pub per_subject: BTreeMap<String, SubjectCell>,
    pub total_obtained: f64,
    pub total_max: f64,
    pub percentage: f64,
    pub rank: usize,
    pub result: ResultStatus,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RankedResults {
    pub subjects: Vec<String>,
    pub students: Vec<StudentSummary>,
}

impl RankedResults {
    /// SHA-256 over the serialized subjects and summaries.
    pub fn fingerprint(&self) -> String {
        let bytes = serde_json::to_vec(self).unwrap_or_default();
        format!("{:x}", Sha256::digest(&bytes))
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SchoolHeader {
    pub school_name: String,
    pub academic_year: String,
}

impl From<&SchoolConfig> for SchoolHeader {
    fn from(cfg: &SchoolConfig) -> Self {
        Self {
            school_name: cfg.school_name.clone(),
            academic_year: cfg.academic_year.clone(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Tabulation {
    pub class_id: String,
    pub exam_name: String,
    pub section: Option<String>,
    pub school: SchoolHeader,
    #[serde(flatten)]
    pub results: RankedResults,
    pub pass_count: usize,
    pub fail_count: usize,
    pub fingerprint: String,
}

#[derive(Debug, Clone, Copy)]
pub struct TabulationRequest<'a> {
    pub class_id: &'a str,
    pub exam_name: &'a str,
    pub section: Option<&'a str>,
}

impl<'a> TabulationRequest<'a> {
    pub fn new(class_id: &'a str, exam_name: &'a str, section: Option<&'a str>) -> Self {
        Self {
            class_id: class_id.trim(),
            exam_name: exam_name.trim(),
            section: section.map(str::trim).filter(|s| !s.is_empty()),
        }
    }

    fn is_complete(&self) -> bool {
        !self.class_id.is_empty() && !self.exam_name.is_empty()
    }
}

/// Joins marks onto the roster and ranks by descending percentage.
///
/// Column order is the sorted subject names. The rank key is the unrounded
/// percentage; `percentage` is rounded for display only. Ties keep roster order.
pub fn tabulate(
    roster: &[StudentRosterEntry],
    subject_exams: &[SubjectExam],
    marks: &[MarkRecord],
) -> RankedResults {
    if subject_exams.is_empty() {
        return RankedResults::default();
    }

    let mut subjects: Vec<String> = subject_exams.iter().map(|e| e.subject.clone()).collect();
    subjects.sort();
    subjects.dedup();

    let mark_by_pair: HashMap<(&str, &str), &MarkRecord> = marks
        .iter()
        .map(|m| ((m.student_id.as_str(), m.exam_id.as_str()), m))
        .collect();

    let mut students: Vec<StudentSummary> = roster
        .iter()
        .map(|s| {
            let mut per_subject = BTreeMap::new();
            let mut total_obtained = 0.0_f64;
            let mut total_max = 0.0_f64;
            for e in subject_exams {
                let cell = match mark_by_pair.get(&(s.id.as_str(), e.id.as_str())) {
                    Some(m) => {
                        total_obtained += m.marks_obtained;
                        SubjectCell {
                            marks: Some(m.marks_obtained),
                            grade: Some(m.grade.clone()),
                        }
                    }
                    None => SubjectCell::missing(),
                };
                total_max += e.total_marks;
                per_subject.insert(e.subject.clone(), cell);
            }
            let percentage = calc::percentage(total_obtained, total_max);
            StudentSummary {
                student: s.clone(),
                per_subject,
                total_obtained,
                total_max,
                percentage,
                rank: 0,
                result: ResultStatus::from_percentage(percentage),
            }
        })
        .collect();

    // Sorted on the unrounded ratio. sort_by is stable, so exact ties keep
    // roster (name) order.
    students.sort_by(|a, b| {
        let pa = calc::raw_percentage(a.total_obtained, a.total_max);
        let pb = calc::raw_percentage(b.total_obtained, b.total_max);
        pb.partial_cmp(&pa).unwrap_or(Ordering::Equal)
    });
    for (i, s) in students.iter_mut().enumerate() {
        s.rank = i + 1;
    }

    RankedResults { subjects, students }
}

struct TabulationInputs {
    roster: Vec<StudentRosterEntry>,
    subject_exams: Vec<SubjectExam>,
    marks: Vec<MarkRecord>,
}

fn fetch_inputs<S: ResultSource + ?Sized>(
    source: &S,
    req: &TabulationRequest<'_>,
) -> TabulationResult<TabulationInputs> {
    let roster = source.roster(req.class_id, req.section)?;
    let subject_exams = source.subject_exams(req.class_id, req.exam_name)?;
    let marks = if subject_exams.is_empty() {
        Vec::new()
    } else {
        let exam_ids: Vec<String> = subject_exams.iter().map(|e| e.id.clone()).collect();
        source.mark_records(&exam_ids)?
    };
    Ok(TabulationInputs {
        roster,
        subject_exams,
        marks,
    })
}

/// Builds the ranked tabulation sheet. Returns `Ok(None)` when the class or
/// exam name is blank.
pub fn generate<S: ResultSource + ?Sized>(
    source: &S,
    req: &TabulationRequest<'_>,
    school: &SchoolConfig,
) -> TabulationResult<Option<Tabulation>> {
    if !req.is_complete() {
        tracing::debug!("tabulation skipped: class or exam name is blank");
        return Ok(None);
    }

    let inputs = fetch_inputs(source, req).map_err(|e| {
        tracing::warn!(class_id = req.class_id, exam = req.exam_name, "tabulation aborted: {}", e);
        e
    })?;
    let results = tabulate(&inputs.roster, &inputs.subject_exams, &inputs.marks);
    let pass_count = results
        .students
        .iter()
        .filter(|s| s.result.is_pass())
        .count();
    let fail_count = results.students.len() - pass_count;
    let fingerprint = results.fingerprint();

    tracing::info!(
        class_id = req.class_id,
        exam = req.exam_name,
        subjects = results.subjects.len(),
        students = results.students.len(),
        "tabulation generated"
    );

    Ok(Some(Tabulation {
        class_id: req.class_id.to_string(),
        exam_name: req.exam_name.to_string(),
        section: req.section.map(str::to_string),
        school: SchoolHeader::from(school),
        results,
        pass_count,
        fail_count,
        fingerprint,
    }))
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TranscriptLine {
    pub subject: String,
    pub total_marks: f64,
    #[serde(serialize_with = "marks_or_placeholder")]
    pub marks: Option<f64>,
    #[serde(serialize_with = "grade_or_placeholder")]
    pub grade: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Transcript {
    pub school: SchoolHeader,
    pub class_id: String,
    pub exam_name: String,
    pub student: StudentRosterEntry,
    pub lines: Vec<TranscriptLine>,
    pub total_obtained: f64,
    pub total_max: f64,
    pub percentage: f64,
    pub rank: usize,
    pub class_size: usize,
    pub result: ResultStatus,
}

/// One student's ranked result for a class/exam, laid out per subject.
pub fn transcript<S: ResultSource + ?Sized>(
    source: &S,
    req: &TabulationRequest<'_>,
    student_id: &str,
    school: &SchoolConfig,
) -> TabulationResult<Transcript> {
    if !req.is_complete() {
        return Err(TabulationError::BadParams(
            "classId and examName must not be empty".to_string(),
        ));
    }
    let inputs = fetch_inputs(source, req)?;
    if inputs.subject_exams.is_empty() {
        return Err(TabulationError::not_found("exam"));
    }

    let results = tabulate(&inputs.roster, &inputs.subject_exams, &inputs.marks);
    let class_size = results.students.len();
    let Some(summary) = results
        .students
        .into_iter()
        .find(|s| s.student.id == student_id)
    else {
        return Err(TabulationError::not_found("student"));
    };

    let max_by_subject: HashMap<&str, f64> = inputs
        .subject_exams
        .iter()
        .map(|e| (e.subject.as_str(), e.total_marks))
        .collect();
    let lines = summary
        .per_subject
        .iter()
        .map(|(subject, cell)| TranscriptLine {
            subject: subject.clone(),
            total_marks: max_by_subject.get(subject.as_str()).copied().unwrap_or(0.0),
            marks: cell.marks,
            grade: cell.grade.clone(),
        })
        .collect();

    Ok(Transcript {
        school: SchoolHeader::from(school),
        class_id: req.class_id.to_string(),
        exam_name: req.exam_name.to_string(),
        student: summary.student,
        lines,
        total_obtained: summary.total_obtained,
        total_max: summary.total_max,
        percentage: summary.percentage,
        rank: summary.rank,
        class_size,
        result: summary.result,
    })
}

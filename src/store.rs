use rusqlite::{params_from_iter, types::Value, Connection};

use crate::error::TabulationResult;
use crate::tabulation::{MarkRecord, ResultSource, StudentRosterEntry, SubjectExam};

/// `ResultSource` over the workspace database.
pub struct SqliteSource<'a> {
    conn: &'a Connection,
}

impl<'a> SqliteSource<'a> {
    pub fn new(conn: &'a Connection) -> Self {
        Self { conn }
    }
}

impl ResultSource for SqliteSource<'_> {
    fn roster(
        &self,
        class_id: &str,
        section: Option<&str>,
    ) -> TabulationResult<Vec<StudentRosterEntry>> {
        let mut stmt = self.conn.prepare(
            "SELECT id, name, roll_number
             FROM students
             WHERE class_id = ?1
               AND active = 1
               AND (?2 IS NULL OR section = ?2)
             ORDER BY name, roll_number, id",
        )?;
        let rows = stmt
            .query_map((class_id, section), |r| {
                Ok(StudentRosterEntry {
                    id: r.get(0)?,
                    name: r.get(1)?,
                    roll_number: r.get(2)?,
                })
            })?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(rows)
    }

    fn subject_exams(
        &self,
        class_id: &str,
        exam_name: &str,
    ) -> TabulationResult<Vec<SubjectExam>> {
        let mut stmt = self.conn.prepare(
            "SELECT id, subject, total_marks
             FROM subject_exams
             WHERE class_id = ? AND exam_name = ?",
        )?;
        let rows = stmt
            .query_map((class_id, exam_name), |r| {
                Ok(SubjectExam {
                    id: r.get(0)?,
                    subject: r.get(1)?,
                    total_marks: r.get(2)?,
                })
            })?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(rows)
    }

    fn mark_records(&self, exam_ids: &[String]) -> TabulationResult<Vec<MarkRecord>> {
        if exam_ids.is_empty() {
            return Ok(Vec::new());
        }
        let placeholders = std::iter::repeat("?")
            .take(exam_ids.len())
            .collect::<Vec<_>>()
            .join(",");
        let sql = format!(
            "SELECT student_id, exam_id, marks_obtained, grade, gpa
             FROM mark_records
             WHERE exam_id IN ({})",
            placeholders
        );
        let bind_values: Vec<Value> = exam_ids.iter().map(|id| Value::Text(id.clone())).collect();

        let mut stmt = self.conn.prepare(&sql)?;
        let rows = stmt
            .query_map(params_from_iter(bind_values), |r| {
                Ok(MarkRecord {
                    student_id: r.get(0)?,
                    exam_id: r.get(1)?,
                    marks_obtained: r.get(2)?,
                    grade: r.get(3)?,
                    gpa: r.get(4)?,
                })
            })?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(rows)
    }
}

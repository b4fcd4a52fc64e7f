mod test_support;

use serde_json::json;
use test_support::Session;

#[test]
fn marks_outside_subject_range_are_rejected() {
    let mut s = Session::open("tabulatord-marks-range");
    let class_id = s.create_class("Grade 8");
    let student = s.create_student(&class_id, "Alice", "1");
    let exam = s.upsert_subject(&class_id, "Midterm", "Math", 50.0);

    let code = s.err(
        "marks.upsert",
        json!({ "examId": exam, "studentId": student, "marksObtained": 51.0 }),
    );
    assert_eq!(code, "bad_params");
    let code = s.err(
        "marks.upsert",
        json!({ "examId": exam, "studentId": student, "marksObtained": -1.0 }),
    );
    assert_eq!(code, "bad_params");
    let code = s.err(
        "marks.upsert",
        json!({ "examId": exam, "studentId": student, "marksObtained": "ten" }),
    );
    assert_eq!(code, "bad_params");

    let listed = s.ok("marks.list", json!({ "examId": exam }));
    assert_eq!(listed["marks"], json!([]));
}

#[test]
fn student_from_another_class_cannot_be_marked() {
    let mut s = Session::open("tabulatord-marks-class");
    let class_a = s.create_class("A");
    let class_b = s.create_class("B");
    let outsider = s.create_student(&class_b, "Omar", "9");
    let exam = s.upsert_subject(&class_a, "Final", "Math", 100.0);

    let code = s.err(
        "marks.upsert",
        json!({ "examId": exam, "studentId": outsider, "marksObtained": 10.0 }),
    );
    assert_eq!(code, "bad_params");

    let code = s.err(
        "marks.upsert",
        json!({ "examId": "missing", "studentId": outsider, "marksObtained": 10.0 }),
    );
    assert_eq!(code, "not_found");
}

#[test]
fn upsert_replaces_existing_mark_and_derives_grade() {
    let mut s = Session::open("tabulatord-marks-upsert");
    let class_id = s.create_class("Grade 8");
    let student = s.create_student(&class_id, "Alice", "1");
    let exam = s.upsert_subject(&class_id, "Midterm", "Math", 100.0);

    let first = s.upsert_mark(&exam, &student, 35.0);
    assert_eq!(first["grade"], "D");
    assert_eq!(first["gpa"].as_f64(), Some(1.0));

    let second = s.upsert_mark(&exam, &student, 82.0);
    assert_eq!(second["grade"], "A+");
    assert_eq!(second["markId"], first["markId"]);

    let explicit = s.ok(
        "marks.upsert",
        json!({ "examId": exam, "studentId": student, "marksObtained": 82.0, "grade": "Merit" }),
    );
    assert_eq!(explicit["grade"], "Merit");
    assert!(explicit["gpa"].is_null());

    let listed = s.ok("marks.list", json!({ "examId": exam }));
    let marks = listed["marks"].as_array().expect("marks");
    assert_eq!(marks.len(), 1);
    assert_eq!(marks[0]["marksObtained"].as_f64(), Some(82.0));
    assert_eq!(marks[0]["grade"], "Merit");
}

#[test]
fn deleting_a_mark_turns_the_cell_back_into_a_placeholder() {
    let mut s = Session::open("tabulatord-marks-delete");
    let class_id = s.create_class("Grade 8");
    let student = s.create_student(&class_id, "Alice", "1");
    let exam = s.upsert_subject(&class_id, "Midterm", "Math", 100.0);
    s.upsert_mark(&exam, &student, 60.0);

    let res = s.ok(
        "marks.delete",
        json!({ "examId": exam, "studentId": student }),
    );
    assert_eq!(res["deleted"], true);
    let res = s.ok(
        "marks.delete",
        json!({ "examId": exam, "studentId": student }),
    );
    assert_eq!(res["deleted"], false);

    let tab = s.ok(
        "tabulation.generate",
        json!({ "classId": class_id, "examName": "Midterm" }),
    );
    let row = &tab["students"][0];
    assert_eq!(row["perSubject"]["Math"]["marks"], "-");
    assert_eq!(row["totalObtained"].as_f64(), Some(0.0));
    assert_eq!(row["totalMax"].as_f64(), Some(100.0));
}

#[test]
fn total_marks_cannot_drop_below_a_recorded_mark() {
    let mut s = Session::open("tabulatord-marks-max");
    let class_id = s.create_class("Grade 8");
    let student = s.create_student(&class_id, "Alice", "1");
    let exam = s.upsert_subject(&class_id, "Midterm", "Math", 100.0);
    s.upsert_mark(&exam, &student, 75.0);

    let code = s.err(
        "exams.subjects.upsert",
        json!({ "classId": class_id, "examName": "Midterm", "subject": "Math", "totalMarks": 50.0 }),
    );
    assert_eq!(code, "bad_params");

    let res = s.ok(
        "exams.subjects.upsert",
        json!({ "classId": class_id, "examName": "Midterm", "subject": "Math", "totalMarks": 80.0 }),
    );
    assert_eq!(res["examId"].as_str(), Some(exam.as_str()));
    assert_eq!(res["created"], false);
}

#[test]
fn total_marks_has_an_upper_bound() {
    let mut s = Session::open("tabulatord-marks-cap");
    let class_id = s.create_class("Grade 8");

    let code = s.err(
        "exams.subjects.upsert",
        json!({ "classId": class_id, "examName": "Midterm", "subject": "Math", "totalMarks": 1e308 }),
    );
    assert_eq!(code, "bad_params");
    let code = s.err(
        "exams.subjects.upsert",
        json!({ "classId": class_id, "examName": "Midterm", "subject": "Math", "totalMarks": 10_000.5 }),
    );
    assert_eq!(code, "bad_params");

    let exam = s.upsert_subject(&class_id, "Midterm", "Math", 10_000.0);
    let student = s.create_student(&class_id, "Alice", "1");
    s.upsert_mark(&exam, &student, 10_000.0);

    let tab = s.ok(
        "tabulation.generate",
        json!({ "classId": class_id, "examName": "Midterm" }),
    );
    let row = &tab["students"][0];
    assert_eq!(row["totalMax"].as_f64(), Some(10_000.0));
    assert_eq!(row["percentage"].as_f64(), Some(100.0));
    assert_eq!(row["result"], "PASS");
}

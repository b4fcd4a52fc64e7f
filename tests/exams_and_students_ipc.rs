mod test_support;

use serde_json::json;
use test_support::Session;

fn names(v: &serde_json::Value) -> Vec<String> {
    v["students"]
        .as_array()
        .expect("students")
        .iter()
        .filter_map(|x| x["name"].as_str().map(str::to_string))
        .collect()
}

#[test]
fn deleting_a_subject_exam_removes_its_marks() {
    let mut s = Session::open("tabulatord-exams-delete");
    let class_id = s.create_class("Grade 8");
    let alice = s.create_student(&class_id, "Alice", "1");
    let math = s.upsert_subject(&class_id, "Midterm", "Math", 100.0);
    let science = s.upsert_subject(&class_id, "Midterm", "Science", 100.0);
    s.upsert_mark(&math, &alice, 90.0);
    s.upsert_mark(&science, &alice, 40.0);

    let res = s.ok("exams.subjects.delete", json!({ "examId": math }));
    assert_eq!(res["ok"], true);

    let marks = s.ok("marks.list", json!({ "examId": math }));
    assert_eq!(marks["marks"], json!([]));
    let marks = s.ok("marks.list", json!({ "examId": science }));
    assert_eq!(marks["marks"].as_array().map(Vec::len), Some(1));

    let subjects = s.ok(
        "exams.subjects.list",
        json!({ "classId": class_id, "examName": "Midterm" }),
    );
    let listed: Vec<&str> = subjects["subjects"]
        .as_array()
        .expect("subjects")
        .iter()
        .filter_map(|x| x["subject"].as_str())
        .collect();
    assert_eq!(listed, vec!["Science"]);

    let tab = s.ok(
        "tabulation.generate",
        json!({ "classId": class_id, "examName": "Midterm" }),
    );
    assert_eq!(tab["subjects"], json!(["Science"]));
    assert_eq!(tab["students"][0]["totalObtained"].as_f64(), Some(40.0));
    assert_eq!(tab["students"][0]["totalMax"].as_f64(), Some(100.0));

    // Recreating the subject starts from an empty mark sheet.
    let again = s.upsert_subject(&class_id, "Midterm", "Math", 100.0);
    assert_ne!(again, math);
    let marks = s.ok("marks.list", json!({ "examId": again }));
    assert_eq!(marks["marks"], json!([]));
}

#[test]
fn deleting_an_unknown_subject_exam_is_not_found() {
    let mut s = Session::open("tabulatord-exams-delete-missing");
    let class_id = s.create_class("Grade 8");
    let math = s.upsert_subject(&class_id, "Midterm", "Math", 100.0);

    let code = s.err("exams.subjects.delete", json!({ "examId": "nope" }));
    assert_eq!(code, "not_found");

    let _ = s.ok("exams.subjects.delete", json!({ "examId": math }));
    let code = s.err("exams.subjects.delete", json!({ "examId": math }));
    assert_eq!(code, "not_found");

    let code = s.err("exams.subjects.delete", json!({}));
    assert_eq!(code, "bad_params");
}

#[test]
fn students_list_filters_by_section_and_activity() {
    let mut s = Session::open("tabulatord-students-list");
    let class_id = s.create_class("Grade 6");
    for (name, roll, section) in [("Ben", "2", "B"), ("Ann", "1", "A"), ("Cara", "3", "A")] {
        let _ = s.ok(
            "students.create",
            json!({ "classId": class_id, "name": name, "rollNumber": roll, "section": section }),
        );
    }
    let dan = s.create_student(&class_id, "Dan", "4");
    let _ = s.ok(
        "students.update",
        json!({ "studentId": dan, "patch": { "active": false } }),
    );

    let all = s.ok("students.list", json!({ "classId": class_id }));
    assert_eq!(names(&all), vec!["Ann", "Ben", "Cara"]);

    let with_inactive = s.ok(
        "students.list",
        json!({ "classId": class_id, "includeInactive": true }),
    );
    assert_eq!(names(&with_inactive), vec!["Ann", "Ben", "Cara", "Dan"]);
    let dan_row = with_inactive["students"]
        .as_array()
        .and_then(|arr| arr.iter().find(|x| x["name"] == "Dan"))
        .cloned()
        .expect("dan");
    assert_eq!(dan_row["active"], false);
    assert!(dan_row["section"].is_null());

    let section_a = s.ok(
        "students.list",
        json!({ "classId": class_id, "section": "A" }),
    );
    assert_eq!(names(&section_a), vec!["Ann", "Cara"]);

    let section_b = s.ok(
        "students.list",
        json!({ "classId": class_id, "section": "B", "includeInactive": true }),
    );
    assert_eq!(names(&section_b), vec!["Ben"]);
}

#[test]
fn students_update_rejects_bad_patches() {
    let mut s = Session::open("tabulatord-students-update");
    let class_id = s.create_class("Grade 6");
    let ann = s.create_student(&class_id, "Ann", "1");

    let code = s.err(
        "students.update",
        json!({ "studentId": ann, "patch": { "nickname": "A" } }),
    );
    assert_eq!(code, "bad_params");
    let code = s.err(
        "students.update",
        json!({ "studentId": ann, "patch": { "name": "   " } }),
    );
    assert_eq!(code, "bad_params");
    let code = s.err(
        "students.update",
        json!({ "studentId": ann, "patch": { "rollNumber": "" } }),
    );
    assert_eq!(code, "bad_params");
    let code = s.err(
        "students.update",
        json!({ "studentId": ann, "patch": { "active": "no" } }),
    );
    assert_eq!(code, "bad_params");
    let code = s.err("students.update", json!({ "studentId": ann, "patch": "name" }));
    assert_eq!(code, "bad_params");
    let code = s.err(
        "students.update",
        json!({ "studentId": "ghost", "patch": { "name": "X" } }),
    );
    assert_eq!(code, "not_found");

    // A rejected patch leaves the row as it was.
    let listed = s.ok("students.list", json!({ "classId": class_id }));
    assert_eq!(listed["students"][0]["name"], "Ann");
    assert_eq!(listed["students"][0]["rollNumber"], "1");

    let _ = s.ok(
        "students.update",
        json!({ "studentId": ann, "patch": { "name": "Anna", "section": "C" } }),
    );
    let listed = s.ok("students.list", json!({ "classId": class_id, "section": "C" }));
    assert_eq!(names(&listed), vec!["Anna"]);
}

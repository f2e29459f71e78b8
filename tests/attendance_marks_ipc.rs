mod common;

use serde_json::{json, Value};

use common::Sidecar;

struct Fixture {
    class_id: String,
    teacher_id: String,
    student_ids: Vec<String>,
    parent_id: String,
}

fn seed(sidecar: &mut Sidecar) -> Fixture {
    let class = sidecar.ok(
        "classes.create",
        json!({ "name": "Six", "section": "A", "roomNumber": "201" }),
    );
    let class_id = class["id"].as_str().expect("class id").to_string();

    let teacher = sidecar.ok(
        "teachers.create",
        json!({
            "email": "teacher@example.edu",
            "displayName": "Teacher",
            "employeeId": "EMP-1",
            "subjects": ["Bangla"]
        }),
    );
    let teacher_id = teacher["userId"].as_str().expect("teacher id").to_string();

    let mut student_ids = Vec::new();
    for (i, name) in ["Anika", "Rahim"].iter().enumerate() {
        let student = sidecar.ok(
            "students.enroll",
            json!({
                "email": format!("student{}@example.edu", i),
                "displayName": name,
                "classId": class_id,
                "rollNumber": i + 1
            }),
        );
        student_ids.push(student["userId"].as_str().expect("student id").to_string());
    }

    let parent = sidecar.ok(
        "users.create",
        json!({ "email": "parent@example.edu", "displayName": "Parent", "role": "PARENT" }),
    );
    let parent_id = parent["id"].as_str().expect("parent id").to_string();
    sidecar.ok(
        "parents.link",
        json!({ "parentId": parent_id, "studentId": student_ids[0] }),
    );

    Fixture {
        class_id,
        teacher_id,
        student_ids,
        parent_id,
    }
}

#[test]
fn marking_attendance_notifies_linked_guardians() {
    let dir = tempfile::tempdir().expect("tempdir");
    let mut sidecar = Sidecar::start(dir.path());
    let fx = seed(&mut sidecar);

    let marked = sidecar.ok(
        "attendance.mark",
        json!({
            "date": "2026-03-02",
            "classId": fx.class_id,
            "markedBy": fx.teacher_id,
            "records": [
                { "student_id": fx.student_ids[0], "status": "ABSENT" },
                { "student_id": fx.student_ids[1], "status": "PRESENT" }
            ]
        }),
    );
    assert_eq!(marked["marked"], json!(2));

    // Only the first student has a linked guardian.
    let updates = sidecar.notifications_for("attendance-update");
    assert_eq!(updates.len(), 1);
    assert_eq!(updates[0]["room"], json!(format!("parent-{}", fx.parent_id)));
    assert_eq!(updates[0]["payload"]["status"], json!("ABSENT"));
    assert_eq!(updates[0]["payload"]["student_id"], json!(fx.student_ids[0]));
}

#[test]
fn a_bad_entry_rolls_back_the_whole_attendance_batch() {
    let dir = tempfile::tempdir().expect("tempdir");
    let mut sidecar = Sidecar::start(dir.path());
    let fx = seed(&mut sidecar);

    let code = sidecar.expect_err(
        "attendance.mark",
        json!({
            "date": "2026-03-02",
            "classId": fx.class_id,
            "markedBy": fx.teacher_id,
            "records": [
                { "student_id": fx.student_ids[0], "status": "PRESENT" },
                { "student_id": "no-such-student", "status": "PRESENT" }
            ]
        }),
    );
    assert_eq!(code, "db_failed");

    let report = sidecar.ok(
        "attendance.report",
        json!({ "date": "2026-03-02", "classId": fx.class_id }),
    );
    assert_eq!(report["rows"].as_array().map(Vec::len), Some(0));
    assert!(sidecar.notifications_for("attendance-update").is_empty());
}

#[test]
fn attendance_requests_are_validated_up_front() {
    let dir = tempfile::tempdir().expect("tempdir");
    let mut sidecar = Sidecar::start(dir.path());
    let fx = seed(&mut sidecar);

    let code = sidecar.expect_err(
        "attendance.mark",
        json!({
            "date": "02/03/2026",
            "classId": fx.class_id,
            "markedBy": fx.teacher_id,
            "records": [{ "student_id": fx.student_ids[0], "status": "PRESENT" }]
        }),
    );
    assert_eq!(code, "bad_params");

    let code = sidecar.expect_err(
        "attendance.mark",
        json!({
            "date": "2026-03-02",
            "classId": fx.class_id,
            "markedBy": fx.teacher_id,
            "records": [{ "student_id": fx.student_ids[0], "status": "SLEEPING" }]
        }),
    );
    assert_eq!(code, "bad_params");

    let code = sidecar.expect_err(
        "attendance.mark",
        json!({
            "date": "2026-03-02",
            "classId": fx.class_id,
            "markedBy": fx.teacher_id,
            "records": []
        }),
    );
    assert_eq!(code, "invalid_state");
}

#[test]
fn entering_marks_assigns_grades_and_reports_results() {
    let dir = tempfile::tempdir().expect("tempdir");
    let mut sidecar = Sidecar::start(dir.path());
    let fx = seed(&mut sidecar);

    let exam = sidecar.ok(
        "exams.create",
        json!({
            "name": "Midterm",
            "classId": fx.class_id,
            "type": "WRITTEN",
            "maxMarks": 100,
            "createdBy": fx.teacher_id
        }),
    );
    let exam_id = exam["id"].as_str().expect("exam id").to_string();

    let entered = sidecar.ok(
        "exams.enterMarks",
        json!({
            "examId": exam_id,
            "marks": [
                { "student_id": fx.student_ids[0], "subject": "Bangla", "marks_obtained": 85.0 },
                { "student_id": fx.student_ids[1], "subject": "Bangla", "marks_obtained": 45.0,
                  "remarks": "needs practice" }
            ]
        }),
    );
    assert_eq!(entered["entered"], json!(2));
    let grades: Vec<&str> = entered["marks"]
        .as_array()
        .expect("marks")
        .iter()
        .filter_map(|m| m["grade"].as_str())
        .collect();
    assert_eq!(grades, vec!["A+", "C"]);

    let results = sidecar.ok("exams.results", json!({ "examId": exam_id }));
    let rows = results["results"].as_array().expect("results");
    assert_eq!(rows.len(), 2);
    let anika: &Value = rows
        .iter()
        .find(|r| r["studentName"] == json!("Anika"))
        .expect("anika row");
    assert_eq!(anika["grade"], json!("A+"));
    assert_eq!(anika["examName"], json!("Midterm"));
}

#[test]
fn marks_requests_are_validated_up_front() {
    let dir = tempfile::tempdir().expect("tempdir");
    let mut sidecar = Sidecar::start(dir.path());
    let fx = seed(&mut sidecar);

    let exam = sidecar.ok(
        "exams.create",
        json!({ "name": "Midterm", "classId": fx.class_id, "type": "WRITTEN", "maxMarks": 100 }),
    );

    let code = sidecar.expect_err(
        "exams.enterMarks",
        json!({ "examId": exam["id"], "marks": [] }),
    );
    assert_eq!(code, "invalid_state");

    let code = sidecar.expect_err(
        "exams.enterMarks",
        json!({
            "examId": exam["id"],
            "marks": [{ "student_id": fx.student_ids[0], "subject": "Bangla", "marks_obtained": -1.0 }]
        }),
    );
    assert_eq!(code, "bad_params");

    let code = sidecar.expect_err(
        "exams.enterMarks",
        json!({
            "examId": "no-such-exam",
            "marks": [{ "student_id": fx.student_ids[0], "subject": "Bangla", "marks_obtained": 50.0 }]
        }),
    );
    assert_eq!(code, "not_found");
}

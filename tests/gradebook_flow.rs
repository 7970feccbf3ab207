use serde_json::json;
use std::io::{BufRead, BufReader, Write};
use std::path::PathBuf;
use std::process::{Child, ChildStdin, ChildStdout, Command, Stdio};
use std::time::{SystemTime, UNIX_EPOCH};

fn temp_dir(prefix: &str) -> PathBuf {
    let p = std::env::temp_dir().join(format!(
        "{}-{}",
        prefix,
        SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .expect("clock")
            .as_nanos()
    ));
    std::fs::create_dir_all(&p).expect("create temp dir");
    p
}

fn spawn_sidecar() -> (Child, ChildStdin, BufReader<ChildStdout>) {
    let exe = env!("CARGO_BIN_EXE_gradebookd");
    let mut child = Command::new(exe)
        .stdin(Stdio::piped())
        .stdout(Stdio::piped())
        .stderr(Stdio::null())
        .env_remove("GRADEBOOKD_WORKSPACE")
        .env_remove("GRADEBOOKD_ACCOUNT")
        .spawn()
        .expect("spawn gradebookd");
    let stdin = child.stdin.take().expect("child stdin");
    let stdout = child.stdout.take().expect("child stdout");
    (child, stdin, BufReader::new(stdout))
}

fn request(
    stdin: &mut ChildStdin,
    reader: &mut BufReader<ChildStdout>,
    id: &str,
    method: &str,
    params: serde_json::Value,
) -> serde_json::Value {
    let payload = json!({
        "id": id,
        "method": method,
        "params": params,
    });
    writeln!(stdin, "{}", payload).expect("write request");
    stdin.flush().expect("flush request");

    let mut line = String::new();
    reader.read_line(&mut line).expect("read response line");
    assert!(!line.trim().is_empty(), "empty response for {}", method);
    let value: serde_json::Value = serde_json::from_str(line.trim()).expect("parse response json");
    assert_eq!(value.get("id").and_then(|v| v.as_str()), Some(id));
    value
}

fn request_ok(
    stdin: &mut ChildStdin,
    reader: &mut BufReader<ChildStdout>,
    id: &str,
    method: &str,
    params: serde_json::Value,
) -> serde_json::Value {
    let value = request(stdin, reader, id, method, params);
    assert!(
        value.get("ok").and_then(|v| v.as_bool()).unwrap_or(false),
        "{} failed: {}",
        method,
        value
            .get("error")
            .and_then(|e| e.get("message"))
            .and_then(|v| v.as_str())
            .unwrap_or("unknown error")
    );
    value.get("result").cloned().unwrap_or_else(|| json!({}))
}

fn request_err(
    stdin: &mut ChildStdin,
    reader: &mut BufReader<ChildStdout>,
    id: &str,
    method: &str,
    params: serde_json::Value,
) -> String {
    let value = request(stdin, reader, id, method, params);
    assert_eq!(
        value.get("ok").and_then(|v| v.as_bool()),
        Some(false),
        "{} unexpectedly succeeded: {}",
        method,
        value
    );
    value
        .get("error")
        .and_then(|e| e.get("code"))
        .and_then(|v| v.as_str())
        .unwrap_or("")
        .to_string()
}

fn open(stdin: &mut ChildStdin, reader: &mut BufReader<ChildStdout>, workspace: &PathBuf) {
    let _ = request_ok(
        stdin,
        reader,
        "open",
        "account.open",
        json!({ "path": workspace.to_string_lossy(), "account": "teacher1" }),
    );
}

#[test]
fn student_total_follows_category_weighted_marks() {
    let workspace = temp_dir("gradebook-flow-marks");
    let (mut child, mut stdin, mut reader) = spawn_sidecar();
    open(&mut stdin, &mut reader, &workspace);

    let _ = request_ok(
        &mut stdin,
        &mut reader,
        "1",
        "categories.create",
        json!({ "name": "Tests", "weighting": "30" }),
    );
    let added = request_ok(
        &mut stdin,
        &mut reader,
        "2",
        "categories.create",
        json!({ "name": "Homework", "weighting": " 10 " }),
    );
    assert_eq!(added["message"], json!("Category Added"));
    assert_eq!(added["weighting"], json!(10.0));

    let course = request_ok(&mut stdin, &mut reader, "3", "courses.create", json!({ "name": "Math" }));
    assert_eq!(course["message"], json!("Course has been added"));
    let _ = request_ok(
        &mut stdin,
        &mut reader,
        "4",
        "assignments.create",
        json!({ "courseName": "Math", "name": "Quiz1", "weighting": "5" }),
    );
    let saved = request_ok(
        &mut stdin,
        &mut reader,
        "5",
        "assignments.save",
        json!({
            "courseName": "Math",
            "assignmentName": "Quiz1",
            "weighting": "10",
            "scores": { "Tests": "20", "Homework": "10" },
        }),
    );
    assert_eq!(saved["message"], json!("Saved"));

    let student = request_ok(
        &mut stdin,
        &mut reader,
        "6",
        "students.create",
        json!({ "courseName": "Math", "name": "Ann" }),
    );
    assert_eq!(student["message"], json!("Student has been added"));
    assert_eq!(student["assignmentCount"], json!(1));

    // Freshly enrolled: the copy exists but nothing is graded yet.
    let marks = request_ok(
        &mut stdin,
        &mut reader,
        "7",
        "marks.student",
        json!({ "courseName": "Math", "studentName": "Ann" }),
    );
    assert_eq!(marks["totalMark"], json!(null));
    assert_eq!(marks["assignments"][0]["hasCopy"], json!(true));
    assert_eq!(marks["assignments"][0]["mark"], json!(null));

    let form = request_ok(
        &mut stdin,
        &mut reader,
        "8",
        "assignments.open",
        json!({ "courseName": "Math", "assignmentName": "Quiz1", "studentName": "Ann" }),
    );
    assert_eq!(form["defaultWeighting"], json!(10.0));
    let cats = form["categories"].as_array().expect("categories");
    assert_eq!(cats.len(), 2);
    assert!(cats.iter().all(|c| c["score"].is_null()));

    let _ = request_ok(
        &mut stdin,
        &mut reader,
        "9",
        "assignments.save",
        json!({
            "courseName": "Math",
            "studentName": "Ann",
            "assignmentName": "Quiz1",
            "weighting": "10",
            "scores": { "Tests": "18", "Homework": "8" },
        }),
    );
    let marks = request_ok(
        &mut stdin,
        &mut reader,
        "10",
        "marks.student",
        json!({ "courseName": "Math", "studentName": "Ann" }),
    );
    assert_eq!(marks["totalMark"], json!(87.5));
    assert_eq!(marks["totalMarkAdjusted"], json!(87.5));
    assert_eq!(marks["assignments"][0]["mark"], json!(87.5));
    assert_eq!(marks["assignments"][0]["effectiveWeighting"], json!(10.0));

    let _ = request_ok(
        &mut stdin,
        &mut reader,
        "11",
        "assignments.save",
        json!({
            "courseName": "Math",
            "studentName": "Ann",
            "assignmentName": "Quiz1",
            "weighting": "10",
            "adjustedWeighting": "4",
            "scores": { "Tests": "18", "Homework": "8" },
        }),
    );
    let form = request_ok(
        &mut stdin,
        &mut reader,
        "12",
        "assignments.open",
        json!({ "courseName": "Math", "assignmentName": "Quiz1", "studentName": "Ann" }),
    );
    assert_eq!(form["adjusted"], json!(true));
    assert_eq!(form["effectiveWeighting"], json!(4.0));
    assert_eq!(form["mark"], json!(87.5));

    drop(stdin);
    let _ = child.wait();
    let _ = std::fs::remove_dir_all(workspace);
}

#[test]
fn validation_failures_map_to_stable_codes_and_write_nothing() {
    let workspace = temp_dir("gradebook-flow-validation");
    let (mut child, mut stdin, mut reader) = spawn_sidecar();
    open(&mut stdin, &mut reader, &workspace);

    let _ = request_ok(&mut stdin, &mut reader, "1", "courses.create", json!({ "name": "Math" }));
    assert_eq!(
        request_err(&mut stdin, &mut reader, "2", "courses.create", json!({ "name": "math" })),
        "already_exists"
    );
    assert_eq!(
        request_err(&mut stdin, &mut reader, "3", "courses.create", json!({ "name": "   " })),
        "empty_name"
    );
    assert_eq!(
        request_err(
            &mut stdin,
            &mut reader,
            "4",
            "categories.create",
            json!({ "name": "Weighting", "weighting": "1" })
        ),
        "reserved_name"
    );
    assert_eq!(
        request_err(
            &mut stdin,
            &mut reader,
            "5",
            "categories.create",
            json!({ "name": "Tests", "weighting": "-1" })
        ),
        "negative_entry"
    );
    assert_eq!(
        request_err(
            &mut stdin,
            &mut reader,
            "6",
            "assignments.create",
            json!({ "courseName": "Math", "name": "Quiz1", "weighting": "ten" })
        ),
        "not_a_number"
    );
    assert_eq!(
        request_err(
            &mut stdin,
            &mut reader,
            "7",
            "assignments.create",
            json!({ "courseName": "History", "name": "Quiz1", "weighting": "1" })
        ),
        "not_found"
    );
    assert_eq!(
        request_err(
            &mut stdin,
            &mut reader,
            "8",
            "students.create",
            json!({ "courseName": "History", "name": "Ann" })
        ),
        "not_found"
    );

    let categories = request_ok(&mut stdin, &mut reader, "9", "categories.list", json!({}));
    assert_eq!(categories["categories"], json!([]));
    let assignments = request_ok(&mut stdin, &mut reader, "10", "assignments.list", json!({ "courseName": "Math" }));
    assert_eq!(assignments["assignments"], json!([]));
    let courses = request_ok(&mut stdin, &mut reader, "11", "courses.list", json!({}));
    assert_eq!(courses["courses"].as_array().map(Vec::len), Some(1));

    drop(stdin);
    let _ = child.wait();
    let _ = std::fs::remove_dir_all(workspace);
}

#[test]
fn listings_sort_case_insensitively() {
    let workspace = temp_dir("gradebook-flow-sorting");
    let (mut child, mut stdin, mut reader) = spawn_sidecar();
    open(&mut stdin, &mut reader, &workspace);

    for (i, name) in ["biology", "Art", "chemistry"].iter().enumerate() {
        let _ = request_ok(
            &mut stdin,
            &mut reader,
            &format!("c{i}"),
            "courses.create",
            json!({ "name": name }),
        );
    }
    for (i, name) in ["zoe", "Adam", "mia"].iter().enumerate() {
        let _ = request_ok(
            &mut stdin,
            &mut reader,
            &format!("s{i}"),
            "students.create",
            json!({ "courseName": "Art", "name": name }),
        );
    }

    let courses = request_ok(&mut stdin, &mut reader, "1", "courses.list", json!({}));
    let names: Vec<&str> = courses["courses"]
        .as_array()
        .expect("courses")
        .iter()
        .filter_map(|c| c["name"].as_str())
        .collect();
    assert_eq!(names, vec!["Art", "biology", "chemistry"]);
    assert_eq!(courses["courses"][0]["studentCount"], json!(3));

    let students = request_ok(&mut stdin, &mut reader, "2", "students.list", json!({ "courseName": "Art" }));
    let names: Vec<&str> = students["students"]
        .as_array()
        .expect("students")
        .iter()
        .filter_map(|s| s["name"].as_str())
        .collect();
    assert_eq!(names, vec!["Adam", "mia", "zoe"]);

    drop(stdin);
    let _ = child.wait();
    let _ = std::fs::remove_dir_all(workspace);
}

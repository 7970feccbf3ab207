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

struct Sidecar {
    child: Child,
    stdin: ChildStdin,
    reader: BufReader<ChildStdout>,
    next_id: usize,
}

impl Sidecar {
    fn open(workspace: &PathBuf) -> Self {
        let (child, stdin, reader) = spawn_sidecar();
        let mut s = Self {
            child,
            stdin,
            reader,
            next_id: 0,
        };
        let _ = s.ok(
            "account.open",
            json!({ "path": workspace.to_string_lossy(), "account": "teacher1" }),
        );
        s
    }

    fn id(&mut self) -> String {
        self.next_id += 1;
        self.next_id.to_string()
    }

    fn ok(&mut self, method: &str, params: serde_json::Value) -> serde_json::Value {
        let id = self.id();
        request_ok(&mut self.stdin, &mut self.reader, &id, method, params)
    }

    fn err(&mut self, method: &str, params: serde_json::Value) -> String {
        let id = self.id();
        request_err(&mut self.stdin, &mut self.reader, &id, method, params)
    }

    fn close(self) {
        let Sidecar { mut child, stdin, .. } = self;
        drop(stdin);
        let _ = child.wait();
    }
}

fn seed(s: &mut Sidecar) {
    let _ = s.ok("categories.create", json!({ "name": "Tests", "weighting": "30" }));
    let _ = s.ok("categories.create", json!({ "name": "Homework", "weighting": "10" }));
    let _ = s.ok("courses.create", json!({ "name": "Math" }));
    let _ = s.ok(
        "assignments.create",
        json!({ "courseName": "Math", "name": "Quiz1", "weighting": "10" }),
    );
    let _ = s.ok(
        "assignments.save",
        json!({
            "courseName": "Math",
            "assignmentName": "Quiz1",
            "weighting": "10",
            "scores": { "Tests": "20", "Homework": "10" },
        }),
    );
    let _ = s.ok("students.create", json!({ "courseName": "Math", "name": "Ann" }));
    let _ = s.ok(
        "assignments.save",
        json!({
            "courseName": "Math",
            "studentName": "Ann",
            "assignmentName": "Quiz1",
            "weighting": "10",
            "scores": { "Tests": "18", "Homework": "8" },
        }),
    );
}

fn delete(s: &mut Sidecar, params: serde_json::Value) -> serde_json::Value {
    let pending = s.ok("delete.request", params);
    let token = pending["token"].as_str().expect("token").to_string();
    s.ok("delete.confirm", json!({ "token": token, "account": "teacher1" }))
}

#[test]
fn confirmation_must_come_from_the_open_account() {
    let workspace = temp_dir("gradebook-delete-confirm");
    let mut s = Sidecar::open(&workspace);
    seed(&mut s);

    let pending = s.ok("delete.request", json!({ "kind": "course", "name": "MATH" }));
    assert_eq!(pending["name"], json!("Math"));
    assert_eq!(pending["message"], json!("Please confirm deletion of 'Math'"));
    let token = pending["token"].as_str().expect("token").to_string();

    assert_eq!(
        s.err("delete.confirm", json!({ "token": token, "account": "someone-else" })),
        "confirmation_rejected"
    );
    let courses = s.ok("courses.list", json!({}));
    assert_eq!(courses["courses"].as_array().map(Vec::len), Some(1));

    // Same token, right account.
    let done = s.ok("delete.confirm", json!({ "token": token, "account": " teacher1 " }));
    assert_eq!(done["message"], json!("Course deleted"));
    let courses = s.ok("courses.list", json!({}));
    assert_eq!(courses["courses"], json!([]));
    assert_eq!(s.err("students.list", json!({ "courseName": "Math" })), "not_found");

    assert_eq!(
        s.err("delete.request", json!({ "kind": "course", "name": "Math" })),
        "not_found"
    );
    assert_eq!(
        s.err("delete.request", json!({ "kind": "course", "name": " " })),
        "empty_name"
    );
    assert_eq!(
        s.err("delete.request", json!({ "kind": "markset", "name": "Math" })),
        "bad_params"
    );

    s.close();
    let _ = std::fs::remove_dir_all(workspace);
}

#[test]
fn deleting_a_category_strips_it_from_masters_and_copies() {
    let workspace = temp_dir("gradebook-delete-category");
    let mut s = Sidecar::open(&workspace);
    seed(&mut s);

    let done = delete(&mut s, json!({ "kind": "category", "name": "homework" }));
    assert_eq!(done["message"], json!("Category deleted"));

    let categories = s.ok("categories.list", json!({}));
    assert_eq!(categories["categories"], json!([{ "name": "Tests", "weighting": 30.0 }]));

    let masters = s.ok("assignments.list", json!({ "courseName": "Math" }));
    assert_eq!(masters["assignments"][0]["maxima"], json!({ "Tests": 20.0 }));

    let form = s.ok(
        "assignments.open",
        json!({ "courseName": "Math", "assignmentName": "Quiz1", "studentName": "Ann" }),
    );
    assert_eq!(
        form["categories"],
        json!([{ "name": "Tests", "score": 18.0, "max": 20.0 }])
    );
    assert_eq!(form["mark"], json!(90.0));

    s.close();
    let _ = std::fs::remove_dir_all(workspace);
}

#[test]
fn deleting_an_assignment_removes_every_copy() {
    let workspace = temp_dir("gradebook-delete-assignment");
    let mut s = Sidecar::open(&workspace);
    seed(&mut s);
    let _ = s.ok("students.create", json!({ "courseName": "Math", "name": "Ben" }));

    let pending = s.ok(
        "delete.request",
        json!({ "kind": "assignment", "name": "math", "subName": "QUIZ1" }),
    );
    assert_eq!(pending["name"], json!("Math"));
    assert_eq!(pending["subName"], json!("Quiz1"));
    let token = pending["token"].as_str().expect("token").to_string();
    let _ = s.ok("delete.confirm", json!({ "token": token, "account": "teacher1" }));

    let masters = s.ok("assignments.list", json!({ "courseName": "Math" }));
    assert_eq!(masters["assignments"], json!([]));
    for name in ["Ann", "Ben"] {
        let marks = s.ok("marks.student", json!({ "courseName": "Math", "studentName": name }));
        assert_eq!(marks["assignments"], json!([]));
        assert_eq!(marks["totalMark"], json!(null));
    }
    let students = s.ok("students.list", json!({ "courseName": "Math" }));
    assert!(students["students"]
        .as_array()
        .expect("students")
        .iter()
        .all(|st| st["assignmentCount"] == json!(0)));

    assert_eq!(
        s.err("delete.request", json!({ "kind": "assignment", "name": "Math" })),
        "empty_name"
    );

    s.close();
    let _ = std::fs::remove_dir_all(workspace);
}

#[test]
fn deleting_a_student_leaves_classmates() {
    let workspace = temp_dir("gradebook-delete-student");
    let mut s = Sidecar::open(&workspace);
    seed(&mut s);
    let _ = s.ok("students.create", json!({ "courseName": "Math", "name": "Ben" }));

    let done = delete(&mut s, json!({ "kind": "student", "name": "Math", "subName": "ann" }));
    assert_eq!(done["message"], json!("Student deleted"));

    let students = s.ok("students.list", json!({ "courseName": "Math" }));
    let names: Vec<&str> = students["students"]
        .as_array()
        .expect("students")
        .iter()
        .filter_map(|st| st["name"].as_str())
        .collect();
    assert_eq!(names, vec!["Ben"]);
    assert_eq!(
        s.err("marks.student", json!({ "courseName": "Math", "studentName": "Ann" })),
        "not_found"
    );

    s.close();
    let _ = std::fs::remove_dir_all(workspace);
}

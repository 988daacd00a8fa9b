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
    let exe = env!("CARGO_BIN_EXE_schooladmind");
    let mut child = Command::new(exe)
        .stdin(Stdio::piped())
        .stdout(Stdio::piped())
        .stderr(Stdio::null())
        .spawn()
        .expect("spawn schooladmind");
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
    );
    value.get("result").cloned().unwrap_or_else(|| json!({}))
}

fn error_code(value: &serde_json::Value) -> &str {
    value
        .pointer("/error/code")
        .and_then(|v| v.as_str())
        .unwrap_or("")
}

/// Opens `workspace` and signs in with the default admin account.
fn open_and_login(
    stdin: &mut ChildStdin,
    reader: &mut BufReader<ChildStdout>,
    workspace: &std::path::Path,
) {
    let _ = request_ok(
        stdin,
        reader,
        "open",
        "workspace.select",
        json!({ "path": workspace.to_string_lossy() }),
    );
    let _ = request_ok(
        stdin,
        reader,
        "login",
        "session.login",
        json!({ "username": "admin", "password": "adminadmin" }),
    );
}

#[test]
fn subject_names_are_normalized_before_the_duplicate_check() {
    let workspace = temp_dir("schooladmind-subjects-dup");
    let (_child, mut stdin, mut reader) = spawn_sidecar();
    open_and_login(&mut stdin, &mut reader, &workspace);

    let first = request_ok(
        &mut stdin,
        &mut reader,
        "1",
        "subjects.add",
        json!({ "grade": "Grade 5", "subject": "maths" }),
    );
    assert_eq!(first["id"], json!("Maths-Grade 5"));
    assert_eq!(first["subjectName"], json!("Maths"));

    let dup = request(
        &mut stdin,
        &mut reader,
        "2",
        "subjects.add",
        json!({ "grade": "Grade 5", "subject": "MATHS" }),
    );
    assert_eq!(error_code(&dup), "duplicate");
    assert_eq!(
        dup.pointer("/error/message").and_then(|v| v.as_str()),
        Some("The subject \"Maths\" already exists for Grade 5!")
    );

    let missing = request(&mut stdin, &mut reader, "3", "subjects.add", json!({ "grade": "" }));
    assert_eq!(error_code(&missing), "validation_failed");
    let fields = missing
        .pointer("/error/details/fields")
        .and_then(|v| v.as_array())
        .cloned()
        .unwrap_or_default();
    assert_eq!(fields.len(), 2);
    assert_eq!(fields[0]["message"], json!("Grade is required"));
    assert_eq!(fields[1]["message"], json!("Subject is required"));

    let _ = std::fs::remove_dir_all(workspace);
}

#[test]
fn subject_list_pages_follow_the_configured_size() {
    let workspace = temp_dir("schooladmind-subjects-pages");
    let (_child, mut stdin, mut reader) = spawn_sidecar();
    open_and_login(&mut stdin, &mut reader, &workspace);

    let names = [
        "art", "biology", "civics", "drama", "english", "french", "geography", "history",
        "ict", "japanese",
    ];
    for (i, name) in names.iter().enumerate() {
        let _ = request_ok(
            &mut stdin,
            &mut reader,
            &format!("add-{}", i),
            "subjects.add",
            json!({ "grade": "Grade 9", "subject": name }),
        );
    }
    let _ = request_ok(
        &mut stdin,
        &mut reader,
        "other",
        "subjects.add",
        json!({ "grade": "Grade 10", "subject": "art" }),
    );

    let page2 = request_ok(
        &mut stdin,
        &mut reader,
        "p2",
        "subjects.list",
        json!({ "grade": "Grade 9", "page": 2 }),
    );
    assert_eq!(page2["pageSize"], json!(8));
    assert_eq!(page2["totalItems"], json!(10));
    assert_eq!(page2["items"].as_array().map(|a| a.len()), Some(2));

    let _ = request_ok(
        &mut stdin,
        &mut reader,
        "cfg",
        "setup.update",
        json!({ "section": "pagination", "patch": { "subjectsPageSize": 3 } }),
    );
    let page4 = request_ok(
        &mut stdin,
        &mut reader,
        "p4",
        "subjects.list",
        json!({ "grade": "Grade 9", "page": 4 }),
    );
    assert_eq!(page4["totalPages"], json!(4));
    assert_eq!(page4["items"].as_array().map(|a| a.len()), Some(1));

    let all = request_ok(&mut stdin, &mut reader, "all", "subjects.list", json!({ "page": 9 }));
    assert_eq!(all["totalItems"], json!(11));
    assert_eq!(all["items"], json!([]));

    let _ = std::fs::remove_dir_all(workspace);
}

#[test]
fn edit_and_delete_touch_only_the_directory() {
    let workspace = temp_dir("schooladmind-subjects-edit");
    let (_child, mut stdin, mut reader) = spawn_sidecar();
    open_and_login(&mut stdin, &mut reader, &workspace);

    let s = request_ok(
        &mut stdin,
        &mut reader,
        "1",
        "subjects.add",
        json!({ "grade": "Grade 12", "subject": "physics", "stream": "Physical Science" }),
    );
    assert_eq!(s["id"], json!("Physics-Grade 12-Physical Science"));

    let edited = request_ok(
        &mut stdin,
        &mut reader,
        "2",
        "subjects.edit",
        json!({ "id": s["id"], "subjectName": "Applied physics", "grade": "Grade 12" }),
    );
    assert_eq!(edited["subjectName"], json!("Applied physics"));
    assert_eq!(edited["stream"], json!("Physical Science"));

    let _ = request_ok(&mut stdin, &mut reader, "3", "subjects.delete", json!({ "id": s["id"] }));
    let gone = request(&mut stdin, &mut reader, "4", "subjects.delete", json!({ "id": s["id"] }));
    assert_eq!(error_code(&gone), "not_found");

    let bad_stream = request(
        &mut stdin,
        &mut reader,
        "5",
        "subjects.add",
        json!({ "grade": "Grade 8", "subject": "physics", "stream": "Arts" }),
    );
    assert_eq!(error_code(&bad_stream), "validation_failed");

    let _ = std::fs::remove_dir_all(workspace);
}

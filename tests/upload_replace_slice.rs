use serde_json::json;
use std::io::{BufRead, BufReader, Write};
use std::path::{Path, PathBuf};
use std::process::{Child, ChildStdin, ChildStdout, Command, Stdio};
use std::time::{SystemTime, UNIX_EPOCH};

const UPLOAD_CODE: &str = "exam-cell-2025";

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

fn write_sheet(dir: &Path, name: &str, contents: &str) -> String {
    let p = dir.join(name);
    std::fs::write(&p, contents).expect("write sheet");
    p.to_string_lossy().to_string()
}

fn spawn_sidecar(cwd: &Path) -> (Child, ChildStdin, BufReader<ChildStdout>) {
    let exe = env!("CARGO_BIN_EXE_resultd");
    let mut child = Command::new(exe)
        .current_dir(cwd)
        .env("RESULTD_AUTH__UPLOAD_CODE", UPLOAD_CODE)
        .env_remove("RESULTD_WORKSPACE__PATH")
        .stdin(Stdio::piped())
        .stdout(Stdio::piped())
        .stderr(Stdio::null())
        .spawn()
        .expect("spawn resultd");
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
    value["result"].clone()
}

struct Session {
    child: Child,
    stdin: ChildStdin,
    reader: BufReader<ChildStdout>,
    token: String,
    next_id: usize,
}

impl Session {
    fn open(workspace: &Path) -> Self {
        let (child, mut stdin, mut reader) = spawn_sidecar(workspace);
        request_ok(
            &mut stdin,
            &mut reader,
            "select",
            "workspace.select",
            json!({ "path": workspace.to_string_lossy() }),
        );
        let unlocked = request_ok(
            &mut stdin,
            &mut reader,
            "unlock",
            "upload.unlock",
            json!({ "code": UPLOAD_CODE }),
        );
        let token = unlocked["sessionToken"]
            .as_str()
            .expect("sessionToken")
            .to_string();
        Session {
            child,
            stdin,
            reader,
            token,
            next_id: 0,
        }
    }

    fn call(&mut self, method: &str, params: serde_json::Value) -> serde_json::Value {
        self.next_id += 1;
        let id = self.next_id.to_string();
        request(&mut self.stdin, &mut self.reader, &id, method, params)
    }

    fn upload(&mut self, department: &str, semester: i64, source: &str) -> serde_json::Value {
        let token = self.token.clone();
        self.call(
            "results.upload",
            json!({
                "sessionToken": token,
                "department": department,
                "semester": semester,
                "source": source,
            }),
        )
    }

    fn view(&mut self, enrollment: &str, department: &str, semester: i64) -> serde_json::Value {
        let resp = self.call(
            "results.view",
            json!({
                "enrollment": enrollment,
                "department": department,
                "semester": semester,
            }),
        );
        assert_eq!(resp["ok"], true, "view failed: {}", resp);
        resp["result"].clone()
    }

    fn slice_records(&mut self, department: &str, semester: i64) -> i64 {
        let resp = self.call(
            "results.sliceInfo",
            json!({ "department": department, "semester": semester }),
        );
        resp["result"]["records"].as_i64().expect("records")
    }

    fn close(mut self) {
        drop(self.stdin);
        let _ = self.child.wait();
    }
}

#[test]
fn two_student_sheet_then_smaller_replacement() {
    let workspace = temp_dir("resultd-upload-e2e");
    let first = write_sheet(
        &workspace,
        "sem3.csv",
        "enrollment,name,department,exam_name,academic_year,Math,Physics\n\
         2201001,Asha Patel,COMPUTER,Winter 2024,2024-25,78,65\n\
         2201002,Ravi Shah,COMPUTER,Winter 2024,2024-25,54,88\n",
    );
    let mut s = Session::open(&workspace);

    let resp = s.upload("COMPUTER", 3, &first);
    assert_eq!(resp["ok"], true, "upload failed: {}", resp);
    let report = &resp["result"];
    assert_eq!(report["recordsWritten"], 4);
    assert_eq!(report["students"], 2);
    assert_eq!(report["subjects"], json!(["Math", "Physics"]));
    assert_eq!(report["department"], "COMPUTER");
    assert_eq!(report["semester"], 3);
    assert_eq!(s.slice_records("COMPUTER", 3), 4);

    let asha = s.view("2201001", "COMPUTER", 3);
    assert_eq!(asha["found"], true);
    assert_eq!(asha["student"]["name"], "Asha Patel");
    assert_eq!(asha["student"]["examName"], "Winter 2024");
    assert_eq!(asha["student"]["academicYear"], "2024-25");
    assert_eq!(asha["student"]["semester"], 3);
    assert_eq!(
        asha["marks"],
        json!([
            { "subject": "Math", "marks": 78 },
            { "subject": "Physics", "marks": 65 }
        ])
    );
    let ravi = s.view("2201002", "COMPUTER", 3);
    assert_eq!(ravi["marks"][1], json!({ "subject": "Physics", "marks": 88 }));

    for department in ["computer", " COMPUTER ", "Computer"] {
        let resp = s.call(
            "results.view",
            json!({ "enrollment": "2201001", "department": department, "semester": 3 }),
        );
        assert_eq!(resp["ok"], false, "{:?} matched: {}", department, resp);
        assert_eq!(resp["error"]["code"], "bad_params");
    }
    assert_eq!(s.view("2201001 ", "COMPUTER", 3)["found"], false);

    let second = write_sheet(
        &workspace,
        "sem3-revised.csv",
        "enrollment,name,exam_name,academic_year,Chemistry\n\
         2201009,Meera Iyer,Summer 2025,2024-25,91\n",
    );
    let resp = s.upload("COMPUTER", 3, &second);
    assert_eq!(resp["ok"], true, "upload failed: {}", resp);
    assert_eq!(resp["result"]["recordsWritten"], 1);
    assert_eq!(s.slice_records("COMPUTER", 3), 1);
    assert_eq!(s.view("2201001", "COMPUTER", 3)["found"], false);
    assert_eq!(s.view("2201002", "COMPUTER", 3)["found"], false);
    assert_eq!(
        s.view("2201009", "COMPUTER", 3)["marks"],
        json!([{ "subject": "Chemistry", "marks": 91 }])
    );

    s.close();
}

#[test]
fn blank_marks_cell_is_zero_and_upload_succeeds() {
    let workspace = temp_dir("resultd-upload-blank");
    let sheet = write_sheet(
        &workspace,
        "blank.csv",
        "enrollment,name,department,exam_name,academic_year,Math,Physics\n\
         E1,Asha,IT,Winter,2024-25,,71\n\
         E2,Ravi,IT,Winter,2024-25,66,AB\n",
    );
    let mut s = Session::open(&workspace);

    let resp = s.upload("IT", 2, &sheet);
    assert_eq!(resp["ok"], true, "upload failed: {}", resp);
    assert_eq!(resp["result"]["recordsWritten"], 4);
    assert_eq!(resp["result"]["blankCells"], 1);
    assert_eq!(resp["result"]["nonNumericCells"], 1);

    let e1 = s.view("E1", "IT", 2);
    assert_eq!(e1["marks"][0], json!({ "subject": "Math", "marks": 0 }));
    let e2 = s.view("E2", "IT", 2);
    assert_eq!(e2["marks"][1], json!({ "subject": "Physics", "marks": 0 }));

    s.close();
}

#[test]
fn other_slices_survive_and_reupload_is_idempotent() {
    let workspace = temp_dir("resultd-upload-slices");
    let sheet = write_sheet(
        &workspace,
        "marks.csv",
        "enrollment,name,exam_name,academic_year,Drawing,Workshop\n\
         M1,Kiran,Winter,2024-25,60,70\n\
         M2,Neha,Winter,2024-25,61,71\n\
         M3,Omar,Winter,2024-25,62,72\n",
    );
    let mut s = Session::open(&workspace);

    assert_eq!(s.upload("MECHANICAL", 1, &sheet)["ok"], true);
    assert_eq!(s.upload("MECHANICAL", 2, &sheet)["ok"], true);
    assert_eq!(s.upload("AUTOMOBILE", 1, &sheet)["ok"], true);
    assert_eq!(s.slice_records("MECHANICAL", 1), 6);

    let before = s.view("M2", "MECHANICAL", 1);
    assert_eq!(s.upload("MECHANICAL", 1, &sheet)["ok"], true);
    assert_eq!(s.slice_records("MECHANICAL", 1), 6);
    assert_eq!(s.view("M2", "MECHANICAL", 1), before);

    assert_eq!(s.slice_records("MECHANICAL", 2), 6);
    assert_eq!(s.slice_records("AUTOMOBILE", 1), 6);
    assert_eq!(s.view("M1", "CIVIL", 1)["found"], false);

    s.close();
}

#[test]
fn failed_upload_leaves_previous_slice_in_place() {
    let workspace = temp_dir("resultd-upload-failure");
    let good = write_sheet(
        &workspace,
        "good.csv",
        "enrollment,name,exam_name,academic_year,Math\nE1,Asha,Winter,2024-25,90\n",
    );
    let mut s = Session::open(&workspace);
    assert_eq!(s.upload("CDDM", 5, &good)["ok"], true);

    let missing = workspace.join("nope.csv").to_string_lossy().to_string();
    let resp = s.upload("CDDM", 5, &missing);
    assert_eq!(resp["ok"], false);
    assert_eq!(resp["error"]["code"], "source_unavailable");
    assert_eq!(resp["error"]["details"]["source"], missing.as_str());

    let no_name = write_sheet(
        &workspace,
        "no-name.csv",
        "enrollment,exam_name,academic_year,Math\nE1,Winter,2024-25,10\n",
    );
    let resp = s.upload("CDDM", 5, &no_name);
    assert_eq!(resp["ok"], false);
    assert_eq!(resp["error"]["code"], "upload_failed");
    assert_eq!(resp["error"]["details"]["missingColumn"], "name");

    assert_eq!(s.slice_records("CDDM", 5), 1);
    assert_eq!(
        s.view("E1", "CDDM", 5)["marks"],
        json!([{ "subject": "Math", "marks": 90 }])
    );

    s.close();
}

#[test]
fn upload_validates_selection_before_reading_the_source() {
    let workspace = temp_dir("resultd-upload-validation");
    let sheet = write_sheet(
        &workspace,
        "ok.csv",
        "enrollment,name,exam_name,academic_year,Math\nE1,Asha,Winter,2024-25,90\n",
    );
    let mut s = Session::open(&workspace);
    let token = s.token.clone();

    for (params, fragment) in [
        (
            json!({ "sessionToken": token, "department": "-- Select Department --", "semester": 1, "source": sheet }),
            "unknown department",
        ),
        (
            json!({ "sessionToken": token, "department": "IT", "semester": "-- Select Sem --", "source": sheet }),
            "semester",
        ),
        (
            json!({ "sessionToken": token, "department": "IT", "semester": 1, "source": "  " }),
            "missing source",
        ),
    ] {
        let resp = s.call("results.upload", params);
        assert_eq!(resp["ok"], false);
        assert_eq!(resp["error"]["code"], "bad_params");
        let message = resp["error"]["message"].as_str().expect("message");
        assert!(message.contains(fragment), "{} !~ {}", message, fragment);
    }
    assert_eq!(s.slice_records("IT", 1), 0);

    s.close();
}

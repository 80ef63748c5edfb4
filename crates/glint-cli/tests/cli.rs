use std::io::Write;
use std::path::PathBuf;
use std::process::{Command, Output, Stdio};

fn workspace(name: &str) -> PathBuf {
    let dir = std::env::temp_dir().join(format!("glint-it-{}-{}", name, std::process::id()));
    std::fs::create_dir_all(&dir).unwrap();
    dir
}

fn glint(dir: &PathBuf, args: &[&str]) -> Output {
    Command::new(env!("CARGO_BIN_EXE_glint"))
        .args(args)
        .current_dir(dir)
        .env_remove("RUST_LOG")
        .output()
        .expect("failed to spawn glint")
}

#[test]
fn check_fails_on_type_errors() {
    let dir = workspace("check");
    std::fs::write(dir.join("ok.frag"), "void main() { float a = 1.0; a += 2.0; }").unwrap();
    std::fs::write(dir.join("bad.frag"), "void main() {\n  int x = 1.5;\n}").unwrap();

    let output = glint(&dir, &["check", "ok.frag"]);
    assert!(output.status.success(), "{:?}", output);

    let output = glint(&dir, &["check", "ok.frag", "bad.frag"]);
    assert!(!output.status.success());
    let stdout = String::from_utf8(output.stdout).unwrap();
    assert!(stdout.contains("bad.frag:2:"), "{}", stdout);
    assert!(stdout.contains("error[TypeError]"), "{}", stdout);
    assert!(stdout.contains("checked 2 files"), "{}", stdout);
}

#[test]
fn check_json_lists_every_file() {
    let dir = workspace("json");
    std::fs::write(dir.join("a.frag"), "float f;").unwrap();
    std::fs::write(dir.join("b.frag"), "vec3 v = vec3(1.0,").unwrap();

    let output = glint(&dir, &["check", "--json", "a.frag", "b.frag"]);
    let value: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    let reports = value.as_array().unwrap();
    assert_eq!(reports.len(), 2);
    assert!(reports[0]["diagnostics"].as_array().unwrap().is_empty());
    assert!(reports[1]["diagnostics"]
        .as_array()
        .unwrap()
        .iter()
        .any(|d| d["kind"] == "SyntaxError"));
}

#[test]
fn outline_and_inspect() {
    let dir = workspace("outline");
    let src = "struct Light { vec3 color; };\nconst float k = 0.5 * 4.0;\nvoid main() { float y = k; }";
    std::fs::write(dir.join("s.frag"), src).unwrap();

    let output = glint(&dir, &["outline", "--json", "s.frag"]);
    let value: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    let names: Vec<&str> = value
        .as_array()
        .unwrap()
        .iter()
        .map(|item| item["name"].as_str().unwrap())
        .collect();
    assert_eq!(names, ["Light", "k", "main"]);

    let offset = src.rfind('k').unwrap().to_string();
    let output = glint(&dir, &["inspect", "s.frag", "--offset", &offset]);
    let stdout = String::from_utf8(output.stdout).unwrap();
    assert!(stdout.contains("constant:    2.0"), "{}", stdout);
    assert!(stdout.contains("declaration: const float k at 2:13"), "{}", stdout);

    let output = glint(&dir, &["inspect", "s.frag", "--offset", "9999"]);
    assert!(!output.status.success());
}

#[test]
fn colors_respect_config() {
    let dir = workspace("colors");
    std::fs::write(dir.join("c.frag"), "vec3 c = vec3(1.0, 0.5, 0.0);").unwrap();

    let output = glint(&dir, &["colors", "c.frag"]);
    let stdout = String::from_utf8(output.stdout).unwrap();
    assert!(stdout.contains("#FF8000"), "{}", stdout);

    std::fs::write(dir.join("glint.toml"), "[colors]\nenabled = false\n").unwrap();
    let output = glint(&dir, &["colors", "c.frag"]);
    assert!(output.status.success());
    assert!(output.stdout.is_empty());
}

#[test]
fn builtins_lookup() {
    let dir = workspace("builtins");
    let output = glint(&dir, &["builtins", "mix"]);
    let stdout = String::from_utf8(output.stdout).unwrap();
    assert!(stdout.contains("vec3 mix(vec3, vec3, float)"), "{}", stdout);

    let output = glint(&dir, &["builtins", "no_such_thing"]);
    assert!(!output.status.success());
}

#[test]
fn lsp_stdout_is_pure_jsonrpc() {
    let dir = workspace("lsp");
    let mut child = Command::new(env!("CARGO_BIN_EXE_glint"))
        .arg("lsp")
        .current_dir(&dir)
        .stdin(Stdio::piped())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .spawn()
        .expect("failed to spawn glint lsp");

    let messages = [
        r#"{"jsonrpc":"2.0","id":1,"method":"initialize","params":{"capabilities":{}}}"#,
        r#"{"jsonrpc":"2.0","id":2,"method":"shutdown"}"#,
        r#"{"jsonrpc":"2.0","method":"exit"}"#,
    ];
    {
        let stdin = child.stdin.as_mut().expect("child stdin missing");
        for body in messages {
            write!(stdin, "Content-Length: {}\r\n\r\n{}", body.len(), body).unwrap();
        }
    }
    drop(child.stdin.take());

    let output = child.wait_with_output().expect("failed waiting for child");
    let stdout = String::from_utf8(output.stdout).expect("stdout not utf-8");

    assert!(
        !stdout.contains('\u{1b}'),
        "stdout contaminated with ANSI escape codes: {stdout:?}"
    );
    let header = stdout
        .strip_prefix("Content-Length: ")
        .expect("stdout must start with an LSP header");
    let (length, rest) = header.split_once("\r\n\r\n").expect("missing header separator");
    let length: usize = length.trim().parse().unwrap();
    let value: serde_json::Value =
        serde_json::from_str(&rest[..length]).expect("response is not valid JSON");
    assert_eq!(value["id"], 1);
    assert_eq!(value["result"]["serverInfo"]["name"], "glint");
    assert_eq!(value["result"]["capabilities"]["hoverProvider"], true);
}

use std::io::Write;
use std::path::Path;
use std::process::{Command, Output};

fn write_config(dir: &Path, name: &str, body: &str) -> std::path::PathBuf {
    let path = dir.join(name);
    let mut file = std::fs::File::create(&path).unwrap();
    file.write_all(body.as_bytes()).unwrap();
    path
}

fn ngxconf(args: &[&str]) -> Output {
    Command::new(env!("CARGO_BIN_EXE_ngxconf"))
        .args(args)
        .env_remove("RUST_LOG")
        .output()
        .expect("Failed to run ngxconf")
}

#[test]
fn validate_accepts_valid_config() {
    let dir = tempfile::tempdir().unwrap();
    let path = write_config(dir.path(), "nginx.conf", "server {\n  listen 80;\n}\n");

    let output = ngxconf(&["validate", path.to_str().unwrap()]);
    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("is valid"), "stdout: {stdout}");
}

#[test]
fn validate_rejects_unbalanced_braces() {
    let dir = tempfile::tempdir().unwrap();
    let path = write_config(dir.path(), "nginx.conf", "server {\n  listen 80;\n}\n}\n");

    let output = ngxconf(&["validate", path.to_str().unwrap()]);
    assert_eq!(output.status.code(), Some(1));
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("Unexpected '}'"), "stderr: {stderr}");
}

#[test]
fn validate_rejects_missing_file() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("na_config");

    let output = ngxconf(&["validate", path.to_str().unwrap()]);
    assert_eq!(output.status.code(), Some(1));
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("not found"), "stderr: {stderr}");
}

#[test]
fn fmt_prints_canonical_form() {
    let dir = tempfile::tempdir().unwrap();
    let path = write_config(
        dir.path(),
        "nginx.conf",
        "# comment\nfoo   \"bar\" ;server{listen 80;\n\n}",
    );

    let output = ngxconf(&["fmt", path.to_str().unwrap()]);
    assert!(output.status.success());
    assert_eq!(
        String::from_utf8_lossy(&output.stdout),
        "foo \"bar\";\nserver {\n  listen 80;\n}\n"
    );
}

#[test]
fn fmt_check() {
    let dir = tempfile::tempdir().unwrap();
    let canonical = write_config(dir.path(), "canonical.conf", "foo;\nbar {\n  baz 1;\n}\n");
    let messy = write_config(dir.path(), "messy.conf", "foo; bar { baz 1; }\n");

    assert!(ngxconf(&["fmt", "--check", canonical.to_str().unwrap()]).status.success());
    assert_eq!(
        ngxconf(&["fmt", "--check", messy.to_str().unwrap()]).status.code(),
        Some(1)
    );
}

#[test]
fn dump_prints_json_tree() {
    let dir = tempfile::tempdir().unwrap();
    let path = write_config(dir.path(), "nginx.conf", "server {\n  listen 80;\n}\n");

    let output = ngxconf(&["dump", path.to_str().unwrap()]);
    assert!(output.status.success());

    let json: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(json["statements"][0]["tokens"][0], "server");
    assert_eq!(
        json["statements"][0]["child_block"]["statements"][0]["tokens"][1],
        "80"
    );
}

#[test]
fn max_depth_flag() {
    let dir = tempfile::tempdir().unwrap();
    let path = write_config(dir.path(), "nginx.conf", "a { b { c; } }\n");

    assert!(ngxconf(&["validate", path.to_str().unwrap()]).status.success());
    assert_eq!(
        ngxconf(&["--max-depth", "1", "validate", path.to_str().unwrap()])
            .status
            .code(),
        Some(1)
    );
}

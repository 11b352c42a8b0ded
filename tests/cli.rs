use std::fs;
use std::path::{Path, PathBuf};
use std::process::Command;
use tempfile::TempDir;

fn ragchat_binary() -> PathBuf {
    let mut path = std::env::current_exe().unwrap();
    path.pop(); // remove test binary name
    path.pop(); // remove deps/
    path.push("ragchat");
    path
}

/// Returns a port nothing is listening on.
fn closed_port() -> u16 {
    let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    listener.local_addr().unwrap().port()
}

fn setup_test_env() -> (TempDir, PathBuf) {
    let tmp = TempDir::new().unwrap();
    let root = tmp.path().to_path_buf();

    let config_dir = root.join("config");
    fs::create_dir_all(&config_dir).unwrap();

    // Create test files
    let files_dir = root.join("files");
    fs::create_dir_all(files_dir.join("nested")).unwrap();
    fs::write(files_dir.join("alpha.pdf"), b"%PDF-1.4 alpha").unwrap();
    fs::write(files_dir.join("beta.txt"), "beta notes").unwrap();
    fs::write(files_dir.join("nested").join("gamma.pdf"), [0u8, 1, 2, 255]).unwrap();

    let port = closed_port();
    let config_content = format!(
        r#"[cache]
backend = "sqlite"
path = "{}/data/ragchat.sqlite"

[endpoints]
ingest_url = "http://127.0.0.1:{port}/ingest-pdf"
query_url = "http://127.0.0.1:{port}/query"
timeout_secs = 5

[session]
language = "english"
"#,
        root.display(),
    );

    let config_path = config_dir.join("ragchat.toml");
    fs::write(&config_path, config_content).unwrap();

    (tmp, config_path)
}

fn run_ragchat(config_path: &Path, args: &[&str]) -> (String, String, bool) {
    let binary = ragchat_binary();
    let output = Command::new(&binary)
        .arg("--config")
        .arg(config_path.to_str().unwrap())
        .args(args)
        .output()
        .unwrap_or_else(|e| panic!("Failed to run ragchat binary at {:?}: {}", binary, e));

    let stdout = String::from_utf8_lossy(&output.stdout).to_string();
    let stderr = String::from_utf8_lossy(&output.stderr).to_string();
    let success = output.status.success();
    (stdout, stderr, success)
}

fn file_arg(config_path: &Path, rel: &str) -> String {
    let root = config_path.parent().unwrap().parent().unwrap();
    root.join("files").join(rel).display().to_string()
}

#[test]
fn test_init_creates_database() {
    let (tmp, config_path) = setup_test_env();

    let (stdout, stderr, success) = run_ragchat(&config_path, &["init"]);
    assert!(success, "init failed: stdout={}, stderr={}", stdout, stderr);
    assert!(stdout.contains("initialized"));
    assert!(tmp.path().join("data").join("ragchat.sqlite").exists());
}

#[test]
fn test_init_idempotent() {
    let (_tmp, config_path) = setup_test_env();

    let (_, _, success1) = run_ragchat(&config_path, &["init"]);
    assert!(success1, "First init failed");

    let (_, _, success2) = run_ragchat(&config_path, &["init"]);
    assert!(success2, "Second init failed (not idempotent)");
}

#[test]
fn test_list_empty() {
    let (_tmp, config_path) = setup_test_env();

    let (stdout, _, success) = run_ragchat(&config_path, &["list"]);
    assert!(success);
    assert!(stdout.contains("No cached documents."));
}

#[test]
fn test_add_persists_across_runs() {
    let (_tmp, config_path) = setup_test_env();

    let alpha = file_arg(&config_path, "alpha.pdf");
    let (stdout, stderr, success) = run_ragchat(&config_path, &["add", &alpha]);
    assert!(success, "add failed: stdout={}, stderr={}", stdout, stderr);
    assert!(stdout.contains("1 document(s) cached."));

    let (stdout, _, success) = run_ragchat(&config_path, &["list"]);
    assert!(success);
    assert!(stdout.contains("alpha.pdf"));
    assert!(stdout.contains("14"), "size column missing: {}", stdout);
}

#[test]
fn test_add_directory_walks_recursively() {
    let (_tmp, config_path) = setup_test_env();

    let dir = file_arg(&config_path, "");
    let (stdout, stderr, success) = run_ragchat(&config_path, &["add", &dir]);
    assert!(success, "add failed: stdout={}, stderr={}", stdout, stderr);
    assert!(stdout.contains("3 document(s) cached."));

    let (stdout, _, _) = run_ragchat(&config_path, &["list"]);
    assert!(stdout.contains("gamma.pdf"));
}

#[test]
fn test_add_missing_file_fails() {
    let (_tmp, config_path) = setup_test_env();

    let missing = file_arg(&config_path, "nope.pdf");
    let (_, stderr, success) = run_ragchat(&config_path, &["add", &missing]);
    assert!(!success);
    assert!(stderr.contains("No such file"));
}

#[test]
fn test_remove_keeps_order() {
    let (_tmp, config_path) = setup_test_env();

    let alpha = file_arg(&config_path, "alpha.pdf");
    let beta = file_arg(&config_path, "beta.txt");
    let gamma = file_arg(&config_path, "nested/gamma.pdf");
    run_ragchat(&config_path, &["add", &alpha, &beta, &gamma]);

    let (stdout, _, success) = run_ragchat(&config_path, &["remove", "1"]);
    assert!(success);
    assert!(stdout.contains("removed: beta.txt"));

    let (stdout, _, _) = run_ragchat(&config_path, &["list"]);
    let alpha_pos = stdout.find("alpha.pdf").unwrap();
    let gamma_pos = stdout.find("gamma.pdf").unwrap();
    assert!(alpha_pos < gamma_pos);
    assert!(!stdout.contains("beta.txt"));
}

#[test]
fn test_remove_out_of_range_is_noop() {
    let (_tmp, config_path) = setup_test_env();

    let alpha = file_arg(&config_path, "alpha.pdf");
    run_ragchat(&config_path, &["add", &alpha]);

    let (stdout, _, success) = run_ragchat(&config_path, &["remove", "7"]);
    assert!(success);
    assert!(stdout.contains("No document at index 7"));

    let (stdout, _, _) = run_ragchat(&config_path, &["list"]);
    assert!(stdout.contains("alpha.pdf"));
}

#[test]
fn test_clear() {
    let (_tmp, config_path) = setup_test_env();

    let alpha = file_arg(&config_path, "alpha.pdf");
    run_ragchat(&config_path, &["add", &alpha]);

    let (stdout, _, success) = run_ragchat(&config_path, &["clear"]);
    assert!(success);
    assert!(stdout.contains("Cleared 1 document(s)."));

    let (stdout, _, _) = run_ragchat(&config_path, &["list"]);
    assert!(stdout.contains("No cached documents."));
}

#[test]
fn test_languages_without_config() {
    let tmp = TempDir::new().unwrap();
    let missing = tmp.path().join("missing.toml");

    let (stdout, _, success) = run_ragchat(&missing, &["languages"]);
    assert!(success);
    for tag in ["english", "hindi", "malayalam", "tamil", "french"] {
        assert!(stdout.contains(tag), "missing {}", tag);
    }
}

#[test]
fn test_ask_with_nothing_to_ask_fails() {
    let (_tmp, config_path) = setup_test_env();

    let (stdout, stderr, success) = run_ragchat(&config_path, &["ask", "   "]);
    assert!(!success);
    assert!(stdout.is_empty(), "no transcript expected: {}", stdout);
    assert!(stderr.contains("type a question"));
}

#[test]
fn test_ask_rejects_unknown_language() {
    let (_tmp, config_path) = setup_test_env();

    let (_, stderr, success) = run_ragchat(&config_path, &["ask", "hi", "--language", "en"]);
    assert!(!success);
    assert!(stderr.contains("unsupported language"));
}

#[test]
fn test_ask_unreachable_service_reports_in_transcript() {
    let (_tmp, config_path) = setup_test_env();

    let (stdout, stderr, success) = run_ragchat(&config_path, &["ask", "What is this?"]);
    assert!(success, "ask failed: stdout={}, stderr={}", stdout, stderr);
    assert!(stdout.contains("User: What is this?"));
    assert!(stdout.contains("Bot: Something went wrong while fetching response."));
}

#[test]
fn test_ask_upload_failure_names_document() {
    let (_tmp, config_path) = setup_test_env();

    let alpha = file_arg(&config_path, "alpha.pdf");
    run_ragchat(&config_path, &["add", &alpha]);

    let (stdout, stderr, success) = run_ragchat(&config_path, &["ask"]);
    assert!(success, "ask failed: stdout={}, stderr={}", stdout, stderr);
    assert!(stdout.contains("User: Ask something about the uploaded documents"));
    assert!(stdout.contains("File upload failed: alpha.pdf."));

    // The cache is untouched by a failed submission.
    let (stdout, _, _) = run_ragchat(&config_path, &["list"]);
    assert!(stdout.contains("alpha.pdf"));
}

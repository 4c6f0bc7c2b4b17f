#![deny(clippy::all, clippy::pedantic)]

use assert_cmd::Command;
use httpmock::MockServer;
use predicates::str::contains;
use std::io::Write;
use tempfile::NamedTempFile;

fn key_file(contents: &str) -> NamedTempFile {
    let mut file = NamedTempFile::new().expect("tmp file");
    file.write_all(contents.as_bytes()).expect("write key");
    file
}

fn cli(server: &MockServer, key: &NamedTempFile) -> Command {
    let mut cmd = Command::new(assert_cmd::cargo::cargo_bin!("reportobello"));
    cmd.env("REPORTOBELLO_HOST", server.base_url())
        .env("REPORTOBELLO_API_KEY_FILE", key.path())
        .env_remove("REPORTOBELLO_API_KEY")
        .env_remove("REPORTOBELLO_CONFIG_FILE");
    cmd
}

#[test]
fn ls_lists_templates_end_to_end() {
    let server = MockServer::start();
    let mock = server.mock(|when, then| {
        when.method("GET")
            .path("/api/v1/templates")
            .header("authorization", "Bearer cli-test-key");
        then.status(200)
            .header("content-type", "application/json")
            .body(r#"[{"name":"invoice","template":"= Invoice","version":3,"variables":{"amount":{"kind":"number"}}}]"#);
    });

    let key = key_file("cli-test-key\n");
    let assert = cli(&server, &key).arg("ls").assert().success();

    let output = String::from_utf8_lossy(&assert.get_output().stdout);
    assert!(output.contains("invoice"));
    assert!(output.contains("amount:number"));
    mock.assert();
}

#[test]
fn build_prints_artifact_url() {
    let server = MockServer::start();
    server.mock(|when, then| {
        when.method("GET").path("/api/v1/template/invoice");
        then.status(200)
            .header("content-type", "application/json")
            .body(r#"[{"name":"invoice","template":"= Invoice","version":1}]"#);
    });
    let submit = server.mock(|when, then| {
        when.method("POST").path("/api/v1/template/invoice/build");
        then.status(200).body("/api/v1/files/out.pdf");
    });

    let key = key_file("cli-test-key");
    cli(&server, &key)
        .args(["build", "invoice", "--var", "customer=Acme"])
        .assert()
        .success()
        .stdout(contains("/api/v1/files/out.pdf"));
    submit.assert();
}

#[test]
fn render_failure_reports_service_diagnostic() {
    let server = MockServer::start();
    server.mock(|when, then| {
        when.method("GET").path("/api/v1/template/invoice");
        then.status(200)
            .header("content-type", "application/json")
            .body(r#"[{"name":"invoice","template":"= Invoice","version":1}]"#);
    });
    server.mock(|when, then| {
        when.method("POST").path("/api/v1/template/invoice/build");
        then.status(400).body("error: unknown variable: total");
    });

    let key = key_file("cli-test-key");
    cli(&server, &key)
        .args(["build", "invoice"])
        .assert()
        .failure()
        .code(1)
        .stderr(contains("error: template `invoice` failed to render"))
        .stderr(contains("unknown variable: total"));
}

#[test]
fn unauthorized_is_reported() {
    let server = MockServer::start();
    server.mock(|when, then| {
        when.method("GET").path("/api/v1/templates");
        then.status(401).body("invalid api key");
    });

    let key = key_file("wrong");
    cli(&server, &key)
        .arg("ls")
        .assert()
        .failure()
        .stderr(contains("unauthorized"));
}

#[test]
fn missing_api_key_fails_fast() {
    let mut cmd = Command::new(assert_cmd::cargo::cargo_bin!("reportobello"));
    cmd.arg("ls")
        .env("REPORTOBELLO_HOST", "http://127.0.0.1:9")
        .env_remove("REPORTOBELLO_API_KEY")
        .env_remove("REPORTOBELLO_API_KEY_FILE")
        .env_remove("REPORTOBELLO_CONFIG_FILE")
        .assert()
        .failure()
        .code(1)
        .stderr(contains("api key is required"));
}

#[test]
fn api_key_and_timeout_are_read_from_the_environment() {
    let server = MockServer::start();
    let mock = server.mock(|when, then| {
        when.method("GET")
            .path("/api/v1/templates")
            .header("authorization", "Bearer env-key");
        then.status(200)
            .header("content-type", "application/json")
            .body("[]");
    });

    let mut cmd = Command::new(assert_cmd::cargo::cargo_bin!("reportobello"));
    cmd.arg("ls")
        .env("REPORTOBELLO_HOST", server.base_url())
        .env("REPORTOBELLO_API_KEY", "env-key")
        .env("REPORTOBELLO_POLLING__TIMEOUT_SECONDS", "45")
        .env_remove("REPORTOBELLO_API_KEY_FILE")
        .env_remove("REPORTOBELLO_CONFIG_FILE")
        .assert()
        .success();
    mock.assert();
}

#[test]
fn ls_template_shows_every_version_and_content_with_a() {
    let server = MockServer::start();
    server.mock(|when, then| {
        when.method("GET").path("/api/v1/template/invoice");
        then.status(200)
            .header("content-type", "application/json")
            .body(r#"[{"name":"invoice","template":"= First","version":1},{"name":"invoice","template":"= Second","version":2}]"#);
    });

    let key = key_file("cli-test-key");
    let assert = cli(&server, &key)
        .args(["ls", "invoice"])
        .assert()
        .success();
    let output = String::from_utf8_lossy(&assert.get_output().stdout).into_owned();
    assert_eq!(output.matches("invoice").count(), 2);
    assert!(!output.contains("= Second"));

    cli(&server, &key)
        .args(["ls", "invoice", "-a"])
        .assert()
        .success()
        .stdout(contains("= First"))
        .stdout(contains("= Second"));
}

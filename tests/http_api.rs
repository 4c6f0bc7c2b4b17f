use std::collections::BTreeMap;
use std::time::Duration;

use httpmock::MockServer;
use reportobello::Reportobello;
use reportobello::application::error::ApiError;
use reportobello::application::sync::SyncOutcome;
use reportobello::config::{ApiSettings, LoggingSettings, PollSettings, Settings};
use reportobello::domain::build::BuildOptions;
use reportobello::domain::template::Template;
use reportobello::infra::transport::FilePart;
use serde_json::{Map, json};
use time::macros::datetime;
use url::Url;

fn client(server: &MockServer) -> Reportobello {
    let settings = Settings {
        api: ApiSettings {
            host: Url::parse(&server.base_url()).expect("base url"),
            api_key: "http-key".to_string(),
            request_timeout: Duration::from_secs(5),
        },
        logging: LoggingSettings::default(),
        polling: PollSettings {
            initial_delay: Duration::from_millis(5),
            max_delay: Duration::from_millis(20),
            multiplier: 2,
            timeout: Duration::from_secs(5),
        },
    };
    Reportobello::from_settings(&settings).expect("client")
}

#[tokio::test]
async fn push_then_build_over_http() {
    let server = MockServer::start();
    let lookup = server.mock(|when, then| {
        when.method("GET")
            .path("/api/v1/template/receipt")
            .header("authorization", "Bearer http-key");
        then.status(404).body("not found");
    });
    let create = server.mock(|when, then| {
        when.method("POST")
            .path("/api/v1/template/receipt")
            .header("content-type", "application/json")
            .json_body_includes(r#"{"template": "= Receipt"}"#);
        then.status(201)
            .header("content-type", "application/json")
            .body(r#"{"name":"receipt","template":"= Receipt","version":1}"#);
    });
    let build = server.mock(|when, then| {
        when.method("POST")
            .path("/api/v1/template/receipt/build")
            .query_param_exists("justUrl");
        then.status(202)
            .header("content-type", "application/json")
            .body(r#"{"status":"pending","job":"b-1"}"#);
    });
    let poll = server.mock(|when, then| {
        when.method("GET").path("/api/v1/build/b-1");
        then.status(200)
            .header("content-type", "application/json")
            .body(r#"{"status":"ready","url":"/api/v1/files/receipt.pdf","filename":"receipt.pdf"}"#);
    });
    let file = server.mock(|when, then| {
        when.method("GET").path("/api/v1/files/receipt.pdf");
        then.status(200).body("%PDF-receipt");
    });

    let client = client(&server);
    let template = Template::inline("receipt", "= Receipt").expect("template");

    let outcome = client.ensure_remote(&template).await.expect("sync");
    assert!(matches!(outcome, SyncOutcome::Created(_)));

    let handle = client
        .build(&template, Map::new(), BuildOptions::default())
        .await
        .expect("build");
    assert_eq!(handle.filename(), Some("receipt.pdf"));
    let bytes = handle.fetch_bytes().await.expect("bytes");
    assert_eq!(bytes.as_ref(), b"%PDF-receipt");

    lookup.assert();
    create.assert();
    build.assert();
    poll.assert();
    file.assert();
}

#[tokio::test]
async fn server_errors_and_missing_templates_are_classified() {
    let server = MockServer::start();
    server.mock(|when, then| {
        when.method("DELETE").path("/api/v1/template/ghost");
        then.status(404);
    });
    server.mock(|when, then| {
        when.method("GET").path("/api/v1/templates");
        then.status(503).body("maintenance");
    });

    let client = client(&server);

    let err = client
        .api()
        .delete_template("ghost")
        .await
        .expect_err("missing");
    assert!(matches!(err, ApiError::NotFound(_)));

    let err = client.api().list_templates().await.expect_err("down");
    match err {
        ApiError::Server { status, message } => {
            assert_eq!(status, 503);
            assert!(message.contains("maintenance"));
        }
        other => panic!("unexpected error: {other:?}"),
    }
}

#[tokio::test]
async fn recent_builds_are_decoded() {
    let server = MockServer::start();
    let mock = server.mock(|when, then| {
        when.method("GET")
            .path("/api/v1/template/receipt/recent")
            .query_param("before", "2025-03-01T12:00:00Z");
        then.status(200)
            .header("content-type", "application/json")
            .body(
                r#"[
                    {"filename":"r1.pdf","requested_version":-1,"actual_version":3,"template_name":"receipt","started_at":"2025-02-28T09:00:00Z","finished_at":"2025-02-28T09:00:01Z","error_message":null},
                    {"filename":null,"requested_version":2,"actual_version":2,"template_name":"receipt","started_at":"2025-02-27T09:00:00Z","finished_at":"2025-02-27T09:00:01Z","error_message":"unknown variable"}
                ]"#,
            );
    });

    let records = client(&server)
        .api()
        .recent_builds("receipt", Some(datetime!(2025-03-01 12:00 UTC)))
        .await
        .expect("recent");

    mock.assert();
    assert_eq!(records.len(), 2);
    assert!(records[0].was_successful());
    assert!(!records[1].was_successful());
}

#[tokio::test]
async fn env_vars_round_trip_through_the_api() {
    let server = MockServer::start();
    let get = server.mock(|when, then| {
        when.method("GET").path("/api/v1/env");
        then.status(200)
            .header("content-type", "application/json")
            .body(r#"{"COMPANY":"Acme"}"#);
    });
    let post = server.mock(|when, then| {
        when.method("POST")
            .path("/api/v1/env")
            .json_body(json!({"TZ": "UTC"}));
        then.status(200);
    });

    let client = client(&server);
    let vars = client.api().env_vars().await.expect("env");
    assert_eq!(vars.get("COMPANY").map(String::as_str), Some("Acme"));

    let mut update = BTreeMap::new();
    update.insert("TZ".to_string(), "UTC".to_string());
    client.api().update_env_vars(&update).await.expect("update");

    client.api().delete_env_vars(&[]).await.expect("no-op delete");

    get.assert();
    post.assert();
}

#[tokio::test]
async fn data_files_are_uploaded_as_multipart() {
    let server = MockServer::start();
    let upload = server.mock(|when, then| {
        when.method("POST")
            .path("/api/v1/template/receipt/files")
            .header("authorization", "Bearer http-key")
            .header_includes("content-type", "multipart/form-data")
            .body_includes(r#"filename="logo.svg""#)
            .body_includes(r#"filename="rates.csv""#)
            .body_includes("eur,1.0");
        then.status(200);
    });

    let client = client(&server);
    client
        .api()
        .upload_data_files(
            "receipt",
            vec![
                FilePart::new("logo.svg", "<svg/>"),
                FilePart::new("rates.csv", "eur,1.0\n"),
            ],
        )
        .await
        .expect("upload");
    client
        .api()
        .upload_data_files("receipt", Vec::new())
        .await
        .expect("nothing to upload");

    upload.assert();
}

#[tokio::test]
async fn data_file_upload_errors_are_classified() {
    let server = MockServer::start();
    server.mock(|when, then| {
        when.method("POST").path("/api/v1/template/bad/files");
        then.status(400).body("unsupported file type");
    });
    server.mock(|when, then| {
        when.method("POST").path("/api/v1/template/ghost/files");
        then.status(404).body("not found");
    });
    server.mock(|when, then| {
        when.method("POST").path("/api/v1/template/big/files");
        then.status(413).body("file exceeds limit");
    });

    let client = client(&server);
    let upload = |name: &'static str| {
        let api = client.api().clone();
        async move {
            api.upload_data_files(name, vec![FilePart::new("data.csv", "a,b\n")])
                .await
        }
    };

    match upload("bad").await.expect_err("rejected") {
        ApiError::Rejected(details) => assert_eq!(details, "unsupported file type"),
        other => panic!("unexpected error: {other:?}"),
    }
    assert!(matches!(
        upload("ghost").await,
        Err(ApiError::NotFound(_))
    ));
    match upload("big").await.expect_err("too large") {
        ApiError::TooLarge(details) => assert_eq!(details, "file exceeds limit"),
        other => panic!("unexpected error: {other:?}"),
    }
}

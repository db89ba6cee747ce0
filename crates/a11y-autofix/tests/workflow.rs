//! Requestor runs against a mock Spacecat API with in-memory storage and queue.

use std::path::Path;

use a11y_autofix::fakes::{MemoryObjectStore, MemoryQueue};
use a11y_autofix::workflow::{self, Backends, WorkflowArgs};
use a11y_autofix::{AutofixConfig, SpacecatClient};
use autofix_core::{OpsError, ScriptedPrompter};
use serde_json::{json, Value};
use tempfile::TempDir;
use wiremock::matchers::{header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

const QUEUE_URL: &str = "https://sqs.us-east-1.amazonaws.com/123/spacecat-to-mystique";

fn scratch_repo() -> (TempDir, std::path::PathBuf) {
    let dir = tempfile::tempdir().unwrap();
    let repo = dir.path().join("sunstar-site");
    std::fs::create_dir_all(repo.join("blocks")).unwrap();
    std::fs::write(repo.join("blocks/hero.js"), "export default function hero() {}\n").unwrap();
    (dir, repo)
}

fn config(server: &MockServer, repo: &Path) -> AutofixConfig {
    AutofixConfig {
        api_base: server.uri(),
        api_key: "test-key".into(),
        ims_org_id: "org@AdobeOrg".into(),
        s3_bucket: "mystique-assets".into(),
        sqs_queue_url: QUEUE_URL.into(),
        aws_region: "us-east-1".into(),
        repo_path: repo.to_path_buf(),
    }
}

async fn mount(server: &MockServer, route: &str, body: Value) {
    Mock::given(method("GET"))
        .and(path(route))
        .and(header("x-api-key", "test-key"))
        .respond_with(ResponseTemplate::new(200).set_body_json(body))
        .mount(server)
        .await;
}

async fn sunstargum_catalog(server: &MockServer) {
    mount(
        server,
        "/sites",
        json!([
            {"id": "site-1", "baseURL": "https://www.sunstargum.com"},
            {"id": "site-2", "baseURL": "https://krisshop.com"}
        ]),
    )
    .await;
    mount(
        server,
        "/sites/site-1/opportunities",
        json!([{"id": "opp-1", "type": "a11y-accessibility"}]),
    )
    .await;
    mount(
        server,
        "/sites/site-1/opportunities/opp-1/suggestions",
        json!([
            {
                "id": "sugg-1",
                "type": "CODE_CHANGE",
                "status": "NEW",
                "data": {
                    "aggregationKey": "img|alt-text|x",
                    "url": "https://www.sunstargum.com/en/",
                    "faultyLine": "<img src=\"hero.png\">",
                    "targetSelector": "main img.hero"
                }
            },
            {"id": "sugg-2", "data": {"url": "https://www.sunstargum.com/"}}
        ]),
    )
    .await;
}

fn name_args(name: &str) -> WorkflowArgs {
    WorkflowArgs {
        name: Some(name.into()),
        ..WorkflowArgs::default()
    }
}

#[tokio::test]
async fn single_issue_request_is_uploaded_and_sent() {
    let server = MockServer::start().await;
    sunstargum_catalog(&server).await;
    let (_dir, repo) = scratch_repo();
    let config = config(&server, &repo);

    let catalog = SpacecatClient::new(&config).unwrap();
    let store = MemoryObjectStore::default();
    let queue = MemoryQueue::default();
    let mut prompter = ScriptedPrompter::new(["1", "y"]);

    let dispatched = workflow::run(
        &config,
        &name_args("SUNSTARGUM"),
        Backends {
            catalog: &catalog,
            store: &store,
            queue: &queue,
        },
        &mut prompter,
    )
    .await
    .unwrap();
    assert_eq!(dispatched.message_id, "msg-1");

    let objects = store.objects();
    assert_eq!(objects.len(), 1);
    let (bucket, key, body) = &objects[0];
    assert_eq!(bucket, "mystique-assets");
    assert!(key.starts_with("tmp/codefix/source/sunstar-site-"));
    assert!(key.ends_with(".tar.gz"));
    assert!(!body.is_empty());

    let sent = queue.sent();
    assert_eq!(sent.len(), 1);
    assert_eq!(sent[0].0, QUEUE_URL);
    let message: Value = serde_json::from_str(&sent[0].1).unwrap();
    assert_eq!(message["type"], "guidance:accessibility-remediation");
    assert_eq!(message["siteId"], "site-1");
    assert_eq!(message["data"]["opportunityId"], "opp-1");
    assert_eq!(message["data"]["codePath"], key.as_str());
    let issues = message["data"]["issuesList"].as_array().unwrap();
    assert_eq!(issues.len(), 1);
    assert_eq!(issues[0]["issue_name"], "alt-text");
    assert_eq!(issues[0]["target_selector"], "main img.hero");
    assert_eq!(issues[0]["suggestion_id"], "sugg-1");
}

#[tokio::test]
async fn declining_confirmation_sends_nothing() {
    let server = MockServer::start().await;
    sunstargum_catalog(&server).await;
    let (_dir, repo) = scratch_repo();
    let config = config(&server, &repo);

    let catalog = SpacecatClient::new(&config).unwrap();
    let store = MemoryObjectStore::default();
    let queue = MemoryQueue::default();
    let mut prompter = ScriptedPrompter::new(["1", "n"]);

    let err = workflow::run(
        &config,
        &name_args("sunstargum"),
        Backends {
            catalog: &catalog,
            store: &store,
            queue: &queue,
        },
        &mut prompter,
    )
    .await
    .unwrap_err();

    assert!(matches!(err, OpsError::Cancelled));
    assert_eq!(err.exit_code(), 0);
    assert!(queue.sent().is_empty());
    assert_eq!(
        prompter.prompts().last().map(String::as_str),
        Some("Send this message? (Y/N): ")
    );
}

#[tokio::test]
async fn interrupted_confirmation_is_a_clean_cancel() {
    let server = MockServer::start().await;
    sunstargum_catalog(&server).await;
    let (_dir, repo) = scratch_repo();
    let config = config(&server, &repo);

    let catalog = SpacecatClient::new(&config).unwrap();
    let store = MemoryObjectStore::default();
    let queue = MemoryQueue::default();
    let mut prompter = ScriptedPrompter::new(["1"]).then_interrupt();

    let err = workflow::run(
        &config,
        &name_args("sunstargum"),
        Backends {
            catalog: &catalog,
            store: &store,
            queue: &queue,
        },
        &mut prompter,
    )
    .await
    .unwrap_err();
    assert!(matches!(err, OpsError::Cancelled));
    assert!(queue.sent().is_empty());
}

#[tokio::test]
async fn direct_ids_skip_discovery_and_send_all_related_issues() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/sites"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
        .expect(0)
        .mount(&server)
        .await;
    mount(
        &server,
        "/sites/site-9/opportunities/opp-9/suggestions",
        json!([
            {"id": "a", "data": {"aggregationKey": "img|alt-text|x", "url": "https://s.test/"}},
            {"id": "b", "data": {"aggregationKey": "btn|button-name|y"}},
            {"id": "c", "data": {"aggregationKey": "img|alt-text|x", "issueDescription": "Logo lacks alt"}}
        ]),
    )
    .await;
    let (_dir, repo) = scratch_repo();
    let config = config(&server, &repo);

    let catalog = SpacecatClient::new(&config).unwrap();
    let store = MemoryObjectStore::default();
    let queue = MemoryQueue::default();
    let mut prompter = ScriptedPrompter::new([" Y "]);

    let args = WorkflowArgs {
        site_id: Some("site-9".into()),
        opportunity_id: Some("opp-9".into()),
        suggestion_id: Some("c".into()),
        send_all_issues: true,
        ..WorkflowArgs::default()
    };
    let dispatched = workflow::run(
        &config,
        &args,
        Backends {
            catalog: &catalog,
            store: &store,
            queue: &queue,
        },
        &mut prompter,
    )
    .await
    .unwrap();

    let issues = &dispatched.request.data.issues_list;
    let ids: Vec<&str> = issues.iter().map(|i| i.suggestion_id.as_str()).collect();
    assert_eq!(ids, vec!["a", "c"]);
    assert_eq!(issues[0].issue_description, "Accessibility issue: alt-text");
    assert_eq!(issues[1].issue_description, "Logo lacks alt");
    assert_eq!(dispatched.request.data.url, "");
    assert_eq!(queue.sent().len(), 1);
}

#[tokio::test]
async fn unknown_direct_suggestion_is_fatal() {
    let server = MockServer::start().await;
    mount(
        &server,
        "/sites/site-9/opportunities/opp-9/suggestions",
        json!([{"id": "a", "data": {"aggregationKey": "img|alt-text|x"}}]),
    )
    .await;
    let (_dir, repo) = scratch_repo();
    let config = config(&server, &repo);

    let catalog = SpacecatClient::new(&config).unwrap();
    let store = MemoryObjectStore::default();
    let queue = MemoryQueue::default();
    let mut prompter = ScriptedPrompter::default();

    let args = WorkflowArgs {
        site_id: Some("site-9".into()),
        opportunity_id: Some("opp-9".into()),
        suggestion_id: Some("zzz".into()),
        ..WorkflowArgs::default()
    };
    let err = workflow::run(
        &config,
        &args,
        Backends {
            catalog: &catalog,
            store: &store,
            queue: &queue,
        },
        &mut prompter,
    )
    .await
    .unwrap_err();
    assert!(matches!(err, OpsError::NotFound(ref m) if m.contains("zzz")));
    assert!(store.objects().is_empty());
}

#[tokio::test]
async fn half_of_direct_ids_is_rejected_before_any_request() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
        .expect(0)
        .mount(&server)
        .await;
    let (_dir, repo) = scratch_repo();
    let config = config(&server, &repo);

    let catalog = SpacecatClient::new(&config).unwrap();
    let store = MemoryObjectStore::default();
    let queue = MemoryQueue::default();
    let mut prompter = ScriptedPrompter::default();

    let args = WorkflowArgs {
        site_id: Some("site-1".into()),
        opportunity_id: Some("opp-1".into()),
        ..WorkflowArgs::default()
    };
    let err = workflow::run(
        &config,
        &args,
        Backends {
            catalog: &catalog,
            store: &store,
            queue: &queue,
        },
        &mut prompter,
    )
    .await
    .unwrap_err();
    assert!(matches!(err, OpsError::InvalidConfig(_)));
    assert_eq!(err.exit_code(), 1);
}

#[tokio::test]
async fn rejected_credentials_stop_the_run() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/sites"))
        .respond_with(ResponseTemplate::new(401))
        .expect(1)
        .mount(&server)
        .await;
    let (_dir, repo) = scratch_repo();
    let config = config(&server, &repo);

    let catalog = SpacecatClient::new(&config).unwrap();
    let store = MemoryObjectStore::default();
    let queue = MemoryQueue::default();
    let mut prompter = ScriptedPrompter::default();

    let err = workflow::run(
        &config,
        &name_args("sunstargum"),
        Backends {
            catalog: &catalog,
            store: &store,
            queue: &queue,
        },
        &mut prompter,
    )
    .await
    .unwrap_err();
    assert!(matches!(err, OpsError::Unauthorized { status: 401, .. }));
    assert!(err.hint().is_some());
    assert!(store.objects().is_empty());
}

#[tokio::test]
async fn failed_opportunity_listing_degrades_to_not_found() {
    let server = MockServer::start().await;
    mount(
        &server,
        "/sites",
        json!([{"id": "site-1", "baseURL": "https://www.sunstargum.com"}]),
    )
    .await;
    Mock::given(method("GET"))
        .and(path("/sites/site-1/opportunities"))
        .respond_with(ResponseTemplate::new(500))
        .expect(1)
        .mount(&server)
        .await;
    let (_dir, repo) = scratch_repo();
    let config = config(&server, &repo);

    let catalog = SpacecatClient::new(&config).unwrap();
    let store = MemoryObjectStore::default();
    let queue = MemoryQueue::default();
    let mut prompter = ScriptedPrompter::default();

    let err = workflow::run(
        &config,
        &name_args("sunstargum"),
        Backends {
            catalog: &catalog,
            store: &store,
            queue: &queue,
        },
        &mut prompter,
    )
    .await
    .unwrap_err();
    assert!(matches!(err, OpsError::NotFound(ref m) if m.contains("opportunities")));
}

#[tokio::test]
async fn missing_repository_fails_before_upload() {
    let server = MockServer::start().await;
    sunstargum_catalog(&server).await;
    let dir = tempfile::tempdir().unwrap();
    let config = config(&server, &dir.path().join("absent"));

    let catalog = SpacecatClient::new(&config).unwrap();
    let store = MemoryObjectStore::default();
    let queue = MemoryQueue::default();
    let mut prompter = ScriptedPrompter::new(["1", "y"]);

    let err = workflow::run(
        &config,
        &name_args("sunstargum"),
        Backends {
            catalog: &catalog,
            store: &store,
            queue: &queue,
        },
        &mut prompter,
    )
    .await
    .unwrap_err();
    assert!(matches!(err, OpsError::NotFound(ref m) if m.contains("Repo path")));
    assert!(store.objects().is_empty());
    assert!(queue.sent().is_empty());
}

#[tokio::test]
async fn storage_failure_is_fatal_and_nothing_is_sent() {
    let server = MockServer::start().await;
    sunstargum_catalog(&server).await;
    let (_dir, repo) = scratch_repo();
    let config = config(&server, &repo);

    let catalog = SpacecatClient::new(&config).unwrap();
    let store = MemoryObjectStore::failing("AccessDenied");
    let queue = MemoryQueue::default();
    let mut prompter = ScriptedPrompter::new(["1", "y"]);

    let err = workflow::run(
        &config,
        &name_args("sunstargum"),
        Backends {
            catalog: &catalog,
            store: &store,
            queue: &queue,
        },
        &mut prompter,
    )
    .await
    .unwrap_err();
    assert!(matches!(err, OpsError::Storage(_)));
    assert!(queue.sent().is_empty());
}

#[tokio::test]
async fn queue_failure_after_confirmation_is_fatal() {
    let server = MockServer::start().await;
    sunstargum_catalog(&server).await;
    let (_dir, repo) = scratch_repo();
    let config = config(&server, &repo);

    let catalog = SpacecatClient::new(&config).unwrap();
    let store = MemoryObjectStore::default();
    let queue = MemoryQueue::failing("AWS.SimpleQueueService.NonExistentQueue");
    let mut prompter = ScriptedPrompter::new(["1", "y"]);

    let err = workflow::run(
        &config,
        &name_args("sunstargum"),
        Backends {
            catalog: &catalog,
            store: &store,
            queue: &queue,
        },
        &mut prompter,
    )
    .await
    .unwrap_err();
    assert!(matches!(err, OpsError::Queue(ref m) if m.contains("NonExistentQueue")));
    assert_eq!(err.exit_code(), 1);
    assert_eq!(store.objects().len(), 1);
    assert!(queue.sent().is_empty());
}

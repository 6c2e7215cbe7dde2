use std::fs;
use std::path::PathBuf;

use civic_profile::config::WidgetSettings;
use civic_profile::profile::{LoadOutcome, ProfileLoadError, ProfileLoader, ProfileSource};
use civic_profile::render::ViewOptions;
use civic_profile::role::{DEFAULT_ROLE_STORAGE_KEY, RoleKey};
use civic_profile::server::serve_with_listener;
use civic_profile::test_support::{SAMPLE_PROFILES_JSON, remove_dir_if_exists, temp_path};
use reqwest::StatusCode;
use tokio::net::TcpListener;
use tokio::task::JoinHandle;

struct RunningServer {
    task: JoinHandle<()>,
    base_url: String,
    data_dir: PathBuf,
}

impl Drop for RunningServer {
    fn drop(&mut self) {
        self.task.abort();
        remove_dir_if_exists(&self.data_dir);
    }
}

fn settings_for(source: ProfileSource) -> WidgetSettings {
    let view = ViewOptions::default();
    WidgetSettings {
        profile_source: source,
        role_storage_path: temp_path("transport-storage").join("local_storage.json"),
        role_storage_key: DEFAULT_ROLE_STORAGE_KEY.to_owned(),
        exposed_roles: view.exposed_roles,
        placeholder_icon: view.placeholder_icon,
    }
}

async fn start_server(document: Option<&str>) -> Option<RunningServer> {
    let data_dir = temp_path("transport-data");
    fs::create_dir_all(&data_dir).expect("data dir should be creatable");
    let data_path = data_dir.join("profiles.json");
    if let Some(document) = document {
        fs::write(&data_path, document).expect("profile document should be writable");
    }

    let server = start_server_with(
        settings_for(ProfileSource::File(data_path)),
        data_dir.clone(),
    )
    .await;
    if server.is_none() {
        remove_dir_if_exists(&data_dir);
    }
    server
}

async fn start_server_with(settings: WidgetSettings, data_dir: PathBuf) -> Option<RunningServer> {
    let listener = match TcpListener::bind("127.0.0.1:0").await {
        Ok(listener) => listener,
        Err(error) if error.kind() == std::io::ErrorKind::PermissionDenied => return None,
        Err(error) => panic!("ephemeral port should be available for bind: {error}"),
    };
    let addr = listener
        .local_addr()
        .expect("ephemeral listener should have local address");

    let task = tokio::spawn(async move {
        let _ = serve_with_listener(listener, &settings).await;
    });

    Some(RunningServer {
        task,
        base_url: format!("http://{addr}"),
        data_dir,
    })
}

fn http_loader(url: &str) -> ProfileLoader {
    let source: ProfileSource = url.parse().expect("URL source should parse");
    ProfileLoader::new(source)
}

#[tokio::test]
async fn http_loader_fetches_served_document() {
    let Some(server) = start_server(Some(SAMPLE_PROFILES_JSON)).await else {
        eprintln!("skipping: local TCP bind is not permitted in this environment");
        return;
    };

    let outcome = http_loader(&format!("{}/profiles.json", server.base_url))
        .load()
        .await;
    let store = match outcome {
        LoadOutcome::Loaded(store) => store,
        other => panic!("expected loaded outcome, got {other:?}"),
    };
    assert_eq!(store.len(), 2);
    let citizen = store
        .record_for(&RoleKey::from("citizen"))
        .expect("citizen record");
    assert_eq!(citizen.name.as_deref(), Some("Alex"));
}

#[tokio::test]
async fn http_loader_reports_status_failures() {
    let Some(server) = start_server(None).await else {
        eprintln!("skipping: local TCP bind is not permitted in this environment");
        return;
    };

    let missing_route = http_loader(&format!("{}/nope.json", server.base_url))
        .load()
        .await;
    assert!(matches!(
        missing_route,
        LoadOutcome::Failed(ProfileLoadError::HttpStatus { status, .. }) if status == StatusCode::NOT_FOUND
    ));

    // The server has no document to serve.
    let unavailable = http_loader(&format!("{}/profiles.json", server.base_url))
        .load()
        .await;
    assert!(matches!(
        unavailable,
        LoadOutcome::Failed(ProfileLoadError::HttpStatus { status, .. }) if status == StatusCode::BAD_GATEWAY
    ));
}

#[tokio::test]
async fn unreachable_host_is_a_transport_failure() {
    let outcome = http_loader("http://127.0.0.1:9/profiles.json").load().await;
    assert!(matches!(
        outcome,
        LoadOutcome::Failed(ProfileLoadError::Transport(_))
    ));
}

#[tokio::test]
async fn widget_fragments_follow_requested_role() {
    let Some(server) = start_server(Some(SAMPLE_PROFILES_JSON)).await else {
        eprintln!("skipping: local TCP bind is not permitted in this environment");
        return;
    };
    let client = reqwest::Client::new();

    let health = client
        .get(format!("{}/health", server.base_url))
        .send()
        .await
        .expect("health request should complete");
    assert_eq!(health.status(), StatusCode::OK);

    let popup = client
        .get(format!("{}/widget/popup", server.base_url))
        .send()
        .await
        .expect("popup request should complete")
        .text()
        .await
        .expect("popup body should be text");
    assert!(popup.contains(r#"id="login-citizen""#));

    let summary = client
        .get(format!("{}/widget/summary?role=citizen", server.base_url))
        .send()
        .await
        .expect("summary request should complete")
        .text()
        .await
        .expect("summary body should be text");
    assert!(summary.contains(r#"src="/a.png""#));

    let unknown = client
        .get(format!("{}/widget/popup?role=retired", server.base_url))
        .send()
        .await
        .expect("popup request should complete")
        .text()
        .await
        .expect("popup body should be text");
    assert!(unknown.contains("logout-btn"));
    assert!(unknown.contains("bg-yellow-100"));
}

#[tokio::test]
async fn remote_source_document_is_not_proxied() {
    let source = "http://127.0.0.1:9/profiles.json"
        .parse::<ProfileSource>()
        .expect("URL source should parse");
    let data_dir = temp_path("transport-remote");
    let Some(server) = start_server_with(settings_for(source), data_dir).await else {
        eprintln!("skipping: local TCP bind is not permitted in this environment");
        return;
    };

    let response = reqwest::get(format!("{}/profiles.json", server.base_url))
        .await
        .expect("profiles request should complete");
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    let body = response.text().await.expect("error body should be text");
    assert!(body.contains("remote data source"));

    let popup = reqwest::get(format!("{}/widget/popup", server.base_url))
        .await
        .expect("popup request should complete")
        .text()
        .await
        .expect("popup body should be text");
    assert!(popup.contains(r#"id="login-citizen""#));
}

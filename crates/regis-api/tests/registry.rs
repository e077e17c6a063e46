//! End-to-end behaviour of the deploy and image registries over the
//! in-memory store.

use std::sync::{Arc, Once};
use std::time::Duration;

use futures::StreamExt;
use regis_api::{
    DeployRegistry, Deployment, DeploymentConfig, DeploymentStatus, Image, ImageRegistry,
    ImageRepository,
};
use regis_registry::{DropReason, InMemorySink, RegistryError, WatchState, WatchStream};
use regis_store::{InMemoryStore, KeyValueStore, StoreConfig, StoreError, WatchEnd};
use regis_types::{encode, EventType, Everything, Expression, Resource, Selector, WatchEvent};

fn init_tracing() {
    static INIT: Once = Once::new();
    INIT.call_once(|| {
        let _ = tracing_subscriber::fmt()
            .with_max_level(tracing::Level::DEBUG)
            .with_test_writer()
            .try_init();
    });
}

fn store() -> Arc<InMemoryStore> {
    init_tracing();
    Arc::new(InMemoryStore::new())
}

async fn next<K: Resource>(stream: &mut WatchStream<K>) -> Option<WatchEvent<K>> {
    tokio::time::timeout(Duration::from_secs(2), stream.next())
        .await
        .expect("timed out waiting on watch")
}

fn labelled_deployment(id: &str, app: &str) -> Deployment {
    let mut deployment = Deployment::new(id);
    deployment.metadata = deployment.metadata.with_label("app", app);
    deployment
}

#[test]
fn created_entity_reads_back_equal() {
    let registry = DeployRegistry::new(store());
    let mut config = DeploymentConfig::new("frontend");
    config.metadata = config.metadata.with_label("tier", "web");
    config.latest_version = 2;

    let created = registry.create_deployment_config(&config).unwrap();
    let fetched = registry.get_deployment_config("frontend").unwrap();
    assert_eq!(fetched, created);
    assert_eq!(fetched.labels(), config.labels());
    assert_eq!(fetched.latest_version, 2);
}

#[test]
fn list_returns_matching_subset_in_key_order() {
    let registry = DeployRegistry::new(store());
    for (id, app) in [("d3", "api"), ("d1", "web"), ("d2", "api")] {
        registry.create_deployment(&labelled_deployment(id, app)).unwrap();
    }

    let all = registry.list_deployments(&Everything).unwrap();
    let ids: Vec<&str> = all.iter().map(|d| d.id()).collect();
    assert_eq!(ids, ["d1", "d2", "d3"]);

    let api: Selector = [("app", "api")].into_iter().collect();
    let ids: Vec<String> = registry
        .list_deployments(&api)
        .unwrap()
        .into_iter()
        .map(|d| d.id().to_string())
        .collect();
    assert_eq!(ids, ["d2", "d3"]);

    let none = Selector::from(Expression::equal("app", "batch"));
    assert!(registry.list_deployments(&none).unwrap().is_empty());
}

#[test]
fn delete_then_get_is_not_found() {
    let registry = ImageRegistry::new(store());
    registry.create_image_repository(&ImageRepository::new("ruby")).unwrap();
    registry.delete_image_repository("ruby").unwrap();
    let err = registry.get_image_repository("ruby").unwrap_err();
    assert!(err.is_not_found());
    assert_eq!(err.kind(), Some("imageRepository"));
    assert_eq!(err.to_string(), "imageRepository \"ruby\" not found");
}

#[test]
fn second_create_is_already_exists() {
    let registry = ImageRegistry::new(store());
    registry.create_image(&Image::new("img", "ref")).unwrap();
    let err = registry.create_image(&Image::new("img", "other")).unwrap_err();
    assert!(err.is_already_exists());
    assert_eq!(registry.get_image("img").unwrap().docker_image_reference, "ref");
}

#[tokio::test]
async fn empty_id_is_rejected_and_never_hidden_from_list_or_watch() {
    let store = store();
    let registry = DeployRegistry::new(store.clone());
    let mut stream = registry.watch_deployments("", |_| true).unwrap();

    let err = registry.create_deployment(&Deployment::new("")).unwrap_err();
    assert!(err.is_internal());
    assert_eq!(err.id(), Some(""));
    assert!(registry.update_deployment(&Deployment::new("")).unwrap_err().is_internal());
    assert!(registry.get_deployment("").unwrap_err().is_not_found());
    assert_eq!(store.current_index(), 0);

    registry.create_deployment(&Deployment::new("x")).unwrap();
    let event = next(&mut stream).await.unwrap();
    assert_eq!(event.object().id(), "x");
    assert_eq!(event.object().resource_version(), Some("1"));
    assert_eq!(registry.list_deployments(&Everything).unwrap().len(), 1);
}

#[test]
fn image_update_is_unsupported_for_any_input() {
    let registry = ImageRegistry::new(store());
    let stored = registry.create_image(&Image::new("img", "ref")).unwrap();
    for image in [stored, Image::new("ghost", "ref"), Image::default()] {
        assert!(registry.update_image(&image).unwrap_err().is_unsupported());
    }
}

#[test]
fn updates_from_the_same_stale_read_both_succeed() {
    let registry = DeployRegistry::new(store());
    registry.create_deployment(&Deployment::new("d1")).unwrap();
    let read = registry.get_deployment("d1").unwrap();

    let mut first = read.clone();
    first.status = DeploymentStatus::Running;
    let mut second = read;
    second.status = DeploymentStatus::Failed;

    registry.update_deployment(&first).unwrap();
    registry.update_deployment(&second).unwrap();
    assert_eq!(registry.get_deployment("d1").unwrap().status, DeploymentStatus::Failed);
}

#[test]
fn watch_rejects_unparseable_versions() {
    let registry = ImageRegistry::new(store());
    let err = registry.watch_image_repositories("abc", |_| true).unwrap_err();
    match err {
        RegistryError::InvalidResourceVersion { kind, version, .. } => {
            assert_eq!(kind, "imageRepository");
            assert_eq!(version, "abc");
        }
        other => panic!("unexpected error: {other}"),
    }
}

#[tokio::test]
async fn watch_from_version_delivers_only_later_changes() {
    let registry = DeployRegistry::new(store());
    for i in 1..=8 {
        registry.create_deployment(&Deployment::new(format!("d{i}"))).unwrap();
    }
    let mut stream = registry.watch_deployments("5", |_| true).unwrap();
    registry.delete_deployment("d1").unwrap();

    let mut versions = Vec::new();
    for _ in 0..4 {
        let event = next(&mut stream).await.unwrap();
        versions.push(event.object().meta().version().unwrap());
    }
    assert_eq!(versions, [6, 7, 8, 9]);
}

#[tokio::test]
async fn watch_forwards_only_matching_events_of_its_kind() {
    let store = store();
    let sink = Arc::new(InMemorySink::new());
    let registry = DeployRegistry::with_diagnostics(store.clone(), sink.clone());
    let mut stream = registry
        .watch_deployments("", |d: &Deployment| d.labels().get("app").is_some_and(|a| a == "web"))
        .unwrap();

    store
        .create_only("/deployments/stray", encode(&Image::new("stray", "ref")).unwrap())
        .unwrap();
    registry.create_deployment(&labelled_deployment("api-1", "api")).unwrap();
    registry.create_deployment(&labelled_deployment("web-1", "web")).unwrap();
    registry.delete_deployment("web-1").unwrap();

    let added = next(&mut stream).await.unwrap();
    assert_eq!(added.event_type(), EventType::Added);
    assert_eq!(added.object().id(), "web-1");
    let deleted = next(&mut stream).await.unwrap();
    assert_eq!(deleted.event_type(), EventType::Deleted);
    assert_eq!(deleted.object().resource_version(), Some("4"));

    let diagnostics = sink.entries();
    assert_eq!(diagnostics.len(), 1);
    assert_eq!(diagnostics[0].watch_kind, "deployment");
    assert_eq!(
        diagnostics[0].reason,
        DropReason::UnexpectedKind {
            found: "Image".into()
        }
    );
}

#[tokio::test]
async fn stopped_watch_ends_without_error() {
    let registry = ImageRegistry::new(store());
    let mut stream = registry.watch_images("", |_| true).unwrap();
    registry.create_image(&Image::new("a", "ref")).unwrap();
    assert_eq!(next(&mut stream).await.unwrap().object().id(), "a");

    stream.stop();
    registry.create_image(&Image::new("b", "ref")).unwrap();
    assert!(next(&mut stream).await.is_none());
    assert_eq!(stream.state(), WatchState::Closed);
    assert_eq!(stream.end_reason(), Some(WatchEnd::Stopped));
}

#[tokio::test]
async fn slow_watcher_is_ended_as_lagged() {
    init_tracing();
    let config = StoreConfig::from_toml_str("channel_capacity = 2\nwatch_buffer = 1").unwrap();
    let store = Arc::new(InMemoryStore::with_config(config).unwrap());
    let registry = ImageRegistry::new(store);
    let mut stream = registry.watch_image_repositories("", |_| true).unwrap();

    // Nothing is consumed until the first poll, so the feed overflows.
    for i in 0..6 {
        registry
            .create_image_repository(&ImageRepository::new(format!("r{i}")))
            .unwrap();
    }
    assert!(next(&mut stream).await.is_none());
    assert_eq!(stream.state(), WatchState::Closed);
    assert!(matches!(stream.end_reason(), Some(WatchEnd::Lagged { skipped }) if skipped > 0));
}

#[tokio::test]
async fn closing_the_store_ends_watches_and_fails_calls() {
    let store = store();
    let registry = DeployRegistry::new(store.clone());
    let mut stream = registry.watch_deployment_configs("", |_| true).unwrap();

    store.close();
    assert!(next(&mut stream).await.is_none());
    assert_eq!(stream.end_reason(), Some(WatchEnd::StoreClosed));

    let err = registry.create_deployment_config(&DeploymentConfig::new("x")).unwrap_err();
    assert!(err.is_internal());
    let err = registry.list_deployment_configs(&Everything).unwrap_err();
    assert!(matches!(err, RegistryError::Store(StoreError::Closed)));
}

#[tokio::test]
async fn families_share_one_store_and_one_index() {
    let store = store();
    let deploy = DeployRegistry::new(store.clone());
    let image = ImageRegistry::new(store.clone());

    let config = deploy.create_deployment_config(&DeploymentConfig::new("app")).unwrap();
    let repo = image.create_image_repository(&ImageRepository::new("app")).unwrap();
    assert_eq!(config.resource_version(), Some("1"));
    assert_eq!(repo.resource_version(), Some("2"));

    let keys: Vec<String> = store
        .extract_all("/imageRepositories")
        .unwrap()
        .into_iter()
        .map(|r| r.key)
        .collect();
    assert_eq!(keys, ["/imageRepositories/app"]);
}

#[tokio::test]
async fn resuming_past_retained_history_fails() {
    init_tracing();
    let config = StoreConfig::from_toml_str("history_limit = 2").unwrap();
    let store = Arc::new(InMemoryStore::with_config(config).unwrap());
    let registry = ImageRegistry::new(store);
    for i in 0..5 {
        registry.create_image(&Image::new(format!("i{i}"), "ref")).unwrap();
    }
    let err = registry.watch_images("1", |_| true).unwrap_err();
    assert!(matches!(err, RegistryError::Store(StoreError::IndexCleared { .. })));
    assert!(registry.watch_images("4", |_| true).is_ok());
}

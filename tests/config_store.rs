//! ConfigStore behavior under direct and concurrent use.

use std::sync::Arc;
use std::time::Duration;

use alertmgr_sidecar::amconfig::AmConfig;
use alertmgr_sidecar::error::Error;
use alertmgr_sidecar::mgr::build_receiver_pair;
use alertmgr_sidecar::store::ConfigStore;

mod common;

async fn bootstrapped_store(upstream: std::net::SocketAddr) -> (Arc<ConfigStore>, tempfile::TempDir) {
    let dir = tempfile::TempDir::new().unwrap();
    let path = dir.path().join("alertmanager.yml");
    let store = Arc::new(
        ConfigStore::new(&path, format!("http://{upstream}"), Duration::from_secs(5)).unwrap(),
    );
    store.bootstrap(&common::test_init_info()).await.unwrap();
    (store, dir)
}

fn parse_config(store: &ConfigStore) -> AmConfig {
    let text = std::fs::read_to_string(store.path()).unwrap();
    serde_yaml::from_str(&text).unwrap()
}

#[tokio::test]
async fn test_concurrent_mutations_stay_consistent() {
    let mock = common::start_mock_alertmanager().await;
    let (store, _dir) = bootstrapped_store(mock.addr).await;

    let names: Vec<String> = (0..8).map(|i| format!("org{i}")).collect();

    let mut tasks = Vec::new();
    for name in &names {
        let writer = store.clone();
        let pair = build_receiver_pair(&common::email_receiver(name)).unwrap();
        tasks.push(tokio::spawn(async move { writer.add_receiver(&pair).await }));
        // readers interleave with the writers on the same lock
        let reader = store.clone();
        tasks.push(tokio::spawn(async move { reader.list_receivers().await.map(|_| ()) }));
    }
    for task in tasks {
        task.await.unwrap().unwrap();
    }

    let config = parse_config(&store);
    assert_eq!(config.receivers.len(), names.len() + 1); // + default
    assert_eq!(config.route.routes.len(), names.len());

    // delete half, concurrently
    let mut tasks = Vec::new();
    for name in names.iter().take(4) {
        let store = store.clone();
        let composite = build_receiver_pair(&common::email_receiver(name))
            .unwrap()
            .receiver
            .name;
        tasks.push(tokio::spawn(async move {
            store.remove_receiver(&composite).await
        }));
    }
    for task in tasks {
        task.await.unwrap().unwrap();
    }

    let config = parse_config(&store);
    assert_eq!(config.receivers.len(), 4 + 1);
    assert_eq!(config.route.routes.len(), 4);
}

#[tokio::test]
async fn test_add_duplicate_conflicts_and_leaves_one() {
    let mock = common::start_mock_alertmanager().await;
    let (store, _dir) = bootstrapped_store(mock.addr).await;

    let pair = build_receiver_pair(&common::email_receiver("org1")).unwrap();
    store.add_receiver(&pair).await.unwrap();
    assert!(matches!(
        store.add_receiver(&pair).await,
        Err(Error::AlreadyExists(_))
    ));

    let config = parse_config(&store);
    let count = config
        .receivers
        .iter()
        .filter(|r| r.name == pair.receiver.name)
        .count();
    assert_eq!(count, 1);
}

#[tokio::test]
async fn test_remove_unknown_receiver_writes_nothing() {
    let mock = common::start_mock_alertmanager().await;
    let (store, _dir) = bootstrapped_store(mock.addr).await;

    let before = std::fs::read(store.path()).unwrap();
    let reloads = mock.state.reloads();
    assert!(matches!(
        store.remove_receiver("org1-u1-error-email").await,
        Err(Error::ReceiverNotFound(_))
    ));
    assert_eq!(std::fs::read(store.path()).unwrap(), before);
    assert_eq!(mock.state.reloads(), reloads);
}

#[tokio::test]
async fn test_every_write_triggers_a_reload() {
    let mock = common::start_mock_alertmanager().await;
    let (store, _dir) = bootstrapped_store(mock.addr).await;
    assert_eq!(mock.state.reloads(), 1); // bootstrap

    let pair = build_receiver_pair(&common::email_receiver("org1")).unwrap();
    store.add_receiver(&pair).await.unwrap();
    assert_eq!(mock.state.reloads(), 2);

    store.remove_receiver(&pair.receiver.name).await.unwrap();
    assert_eq!(mock.state.reloads(), 3);

    store.list_receivers().await.unwrap();
    assert_eq!(mock.state.reloads(), 3, "reads must not reload");
}

#[tokio::test]
async fn test_bootstrap_completes_a_partial_file() {
    let mock = common::start_mock_alertmanager().await;
    let dir = tempfile::TempDir::new().unwrap();
    let path = dir.path().join("alertmanager.yml");
    // a file someone created by hand, missing the smtp globals
    std::fs::write(&path, "route:\n  receiver: default\nreceivers:\n- name: default\n").unwrap();

    let store =
        ConfigStore::new(&path, format!("http://{}", mock.addr), Duration::from_secs(5)).unwrap();
    let wrote = store.bootstrap(&common::test_init_info()).await.unwrap();
    assert!(wrote);

    let config: AmConfig =
        serde_yaml::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
    assert!(config.smtp_initialized());
}

#[tokio::test]
async fn test_wait_for_upstream_is_bounded() {
    let store = ConfigStore::new(
        "/tmp/unused.yml",
        "http://127.0.0.1:9",
        Duration::from_millis(200),
    )
    .unwrap();
    let result = store
        .wait_for_upstream(2, Duration::from_millis(10))
        .await;
    assert!(matches!(result, Err(Error::Connectivity { .. })));
}

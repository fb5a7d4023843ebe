//! Cluster Tests
//!
//! Real nodes on loopback listeners, talking to each other over HTTP.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use groupcache::api::{create_router, AppState};
use groupcache::peers::{PeerPick, PeerPicker};
use groupcache::{
    spawn_membership_task, ClientPicker, GetterFn, Group, GroupRegistry, LocalRegistry, Loaded,
    ServiceRegistry,
};
use tokio::net::TcpListener;

const SERVICE: &str = "cluster-test";

// == Helper Functions ==

struct Node {
    addr: String,
    group: Arc<Group>,
    picker: Arc<ClientPicker>,
    loads: Arc<AtomicUsize>,
}

/// Every key `k` loads as `value-of-k`; keys starting with `missing` have no data.
fn counting_getter(
    loads: Arc<AtomicUsize>,
) -> GetterFn<impl Fn(&str) -> Option<Loaded> + Send + Sync> {
    GetterFn(move |key: &str| {
        loads.fetch_add(1, Ordering::SeqCst);
        (!key.starts_with("missing")).then(|| Loaded::new(format!("value-of-{key}")))
    })
}

async fn bind() -> (TcpListener, String) {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap().to_string();
    (listener, addr)
}

fn start_node(listener: TcpListener, addr: String) -> Node {
    let loads = Arc::new(AtomicUsize::new(0));
    let groups = Arc::new(GroupRegistry::new());
    let group = groups.create_or_get("scores", 1 << 16, Arc::new(counting_getter(loads.clone())));

    let picker = Arc::new(
        ClientPicker::new(addr.clone())
            .with_service_name(SERVICE)
            .with_timeout(Duration::from_secs(2)),
    );
    group.register_peers(picker.clone());

    let app = create_router(AppState::new(groups, addr.clone()));
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });

    Node {
        addr,
        group,
        picker,
        loads,
    }
}

async fn start_cluster() -> (Node, Node) {
    let (listener_a, addr_a) = bind().await;
    let (listener_b, addr_b) = bind().await;
    let a = start_node(listener_a, addr_a);
    let b = start_node(listener_b, addr_b);

    let registry: Arc<dyn ServiceRegistry> = Arc::new(LocalRegistry::new());
    registry.register(SERVICE, &a.addr).await.unwrap();
    spawn_membership_task(a.picker.clone(), registry.clone());
    spawn_membership_task(b.picker.clone(), registry.clone());
    registry.register(SERVICE, &b.addr).await.unwrap();

    for _ in 0..50 {
        if a.picker.peers().len() == 2 && b.picker.peers().len() == 2 {
            return (a, b);
        }
        tokio::time::sleep(Duration::from_millis(20)).await;
    }
    panic!("membership never converged");
}

fn is_local(picker: &ClientPicker, key: &str) -> bool {
    matches!(picker.pick_peer(key), PeerPick::Local)
}

fn keys() -> Vec<String> {
    (0..40).map(|i| format!("key-{i}")).collect()
}

// == Routing Tests ==

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_each_key_is_loaded_once_by_its_owner() {
    let (a, b) = start_cluster().await;
    let keys = keys();

    let owned_by_a = keys.iter().filter(|k| is_local(&a.picker, k)).count();
    assert!(owned_by_a > 0 && owned_by_a < keys.len(), "ring did not split keys");

    for key in &keys {
        // Both nodes agree on the owner
        assert_ne!(is_local(&a.picker, key), is_local(&b.picker, key));

        let from_a = a.group.get(key).await.unwrap();
        let from_b = b.group.get(key).await.unwrap();
        assert!(from_a.equal_str(&format!("value-of-{key}")));
        assert!(from_a.equal(&from_b));
    }

    assert_eq!(a.loads.load(Ordering::SeqCst), owned_by_a);
    assert_eq!(b.loads.load(Ordering::SeqCst), keys.len() - owned_by_a);
    assert_eq!(
        a.group.stats().peer_loads + b.group.stats().peer_loads,
        keys.len() as u64
    );
    assert_eq!(a.group.stats().peer_errors, 0);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_missing_key_is_not_found_everywhere() {
    let (a, b) = start_cluster().await;
    let key = (0..100)
        .map(|i| format!("missing-{i}"))
        .find(|k| !is_local(&a.picker, k))
        .unwrap();

    // The owner reports not found, which the asking node retries locally once
    let err = a.group.get(&key).await.unwrap_err();
    assert!(err.is_not_found());
    assert_eq!(a.group.stats().peer_errors, 1);
    assert_eq!(b.loads.load(Ordering::SeqCst), 1);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_delete_reaches_the_owner() {
    let (a, b) = start_cluster().await;
    let key = keys().into_iter().find(|k| !is_local(&a.picker, k)).unwrap();

    a.group.get(&key).await.unwrap();
    assert_eq!(b.loads.load(Ordering::SeqCst), 1);

    assert!(a.group.delete(&key).await.unwrap());

    // Owner reloads after the delete; the asker's copy is gone as well
    a.group.get(&key).await.unwrap();
    assert_eq!(b.loads.load(Ordering::SeqCst), 2);
    assert_eq!(a.loads.load(Ordering::SeqCst), 0);
}

// == Failure Tests ==

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_unreachable_peer_falls_back_to_loader() {
    let (listener, addr) = bind().await;
    let node = start_node(listener, addr);
    // Nothing listens on the discard port
    node.picker.join("127.0.0.1:9");

    let keys = keys();
    let remote: Vec<&String> = keys.iter().filter(|k| !is_local(&node.picker, k)).collect();
    assert!(!remote.is_empty());

    for key in &keys {
        let value = node.group.get(key).await.unwrap();
        assert!(value.equal_str(&format!("value-of-{key}")));
    }

    assert_eq!(node.loads.load(Ordering::SeqCst), keys.len());
    assert_eq!(node.group.stats().peer_errors, remote.len() as u64);

    // Remote-owned delete surfaces the transport error
    assert!(node.group.delete(remote[0]).await.is_err());
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_node_leaving_moves_keys_home() {
    let (a, b) = start_cluster().await;
    let key = keys().into_iter().find(|k| !is_local(&a.picker, k)).unwrap();

    assert!(a.picker.leave(&b.addr));
    assert!(is_local(&a.picker, &key));

    a.group.get(&key).await.unwrap();
    assert_eq!(a.loads.load(Ordering::SeqCst), 1);
    assert_eq!(b.loads.load(Ordering::SeqCst), 0);
}

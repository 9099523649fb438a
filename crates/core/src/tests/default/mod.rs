use std::sync::atomic::AtomicBool;
use std::sync::atomic::Ordering;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;
use chordring_transport::connections::MemoryNetwork;
use chordring_transport::core::callback::CallbackError;
use chordring_transport::core::callback::TransportCallback;

use crate::config::DhtConfig;
use crate::dht::Endpoint;
use crate::dht::IdSpace;
use crate::dht::NodeId;
use crate::message::Message;
use crate::message::MessageHandler;
use crate::node::Node;

mod test_stabilization;
mod test_storage;

pub fn test_config() -> DhtConfig {
    DhtConfig {
        ring_bits: 8,
        request_timeout_ms: 500,
        ..Default::default()
    }
}

pub fn space() -> IdSpace {
    test_config().space().unwrap()
}

/// Build node `name` and register its handler on `network`.
pub fn prepare_node(network: &Arc<MemoryNetwork>, name: &str) -> Arc<Node> {
    prepare_node_with(network, name, test_config())
}

pub fn prepare_node_with(network: &Arc<MemoryNetwork>, name: &str, config: DhtConfig) -> Arc<Node> {
    let node = Node::new(name, config, Arc::new(network.transport())).unwrap();
    network.register(name, node.handler()).unwrap();
    println!("node: {}", node.endpoint());
    Arc::new(node)
}

/// Handles every request, but once `stalled` is set holds back the answer to the
/// requests `matches` selects for `delay`.
pub struct StalledHandler {
    inner: Arc<MessageHandler>,
    stalled: Arc<AtomicBool>,
    matches: fn(&Message) -> bool,
    delay: Duration,
}

#[async_trait]
impl TransportCallback for StalledHandler {
    async fn on_request(&self, data: &Bytes) -> Result<Bytes, CallbackError> {
        let resp = self.inner.on_request(data).await;
        let held = self.stalled.load(Ordering::SeqCst)
            && Message::decode(data).map_or(false, |msg| (self.matches)(&msg));
        if held {
            tokio::time::sleep(self.delay).await;
        }
        resp
    }
}

/// Like [prepare_node_with], the returned flag turns late answers on and off.
pub fn prepare_stalled_node(
    network: &Arc<MemoryNetwork>,
    name: &str,
    config: DhtConfig,
    matches: fn(&Message) -> bool,
) -> (Arc<Node>, Arc<AtomicBool>) {
    let delay = config.request_timeout() * 4;
    let node = Node::new(name, config, Arc::new(network.transport())).unwrap();
    let stalled = Arc::new(AtomicBool::new(false));
    let handler = StalledHandler {
        inner: node.handler(),
        stalled: stalled.clone(),
        matches,
        delay,
    };
    network.register(name, Arc::new(handler)).unwrap();
    (Arc::new(node), stalled)
}

/// A config with short request timeouts.
pub fn fast_timeout_config() -> DhtConfig {
    DhtConfig {
        request_timeout_ms: 100,
        ..test_config()
    }
}

/// First name `{prefix}-{i}` whose id lies in `(from, to)`.
pub fn name_in(prefix: &str, from: NodeId, to: NodeId) -> String {
    let space = space();
    (0..)
        .map(|i| format!("{}-{}", prefix, i))
        .find(|name| space.hash(name).in_open(from, to))
        .unwrap()
}

/// Three node names `a`, `c`, `b` placed clockwise with room between each of them.
pub fn three_names() -> (String, String, String) {
    let space = space();
    let a = "node-a".to_string();
    let a_id = space.hash(&a);
    let b = name_in("node-b", space.add(a_id, 96), space.add(a_id, 160));
    let c = name_in("node-c", space.add(a_id, 32), space.add(a_id, 64));
    (a, c, b)
}

/// Run `rounds` stabilization rounds on every node in turn.
pub async fn run_stabilize(nodes: &[Arc<Node>], rounds: usize) {
    for _ in 0..rounds {
        for node in nodes {
            if node.is_in_ring() {
                node.stabilizer().stabilize().await.unwrap();
            }
        }
    }
}

/// Owner of `id` among `nodes`: the first node at or after `id` clockwise.
pub fn expected_owner(nodes: &[Arc<Node>], id: NodeId) -> Endpoint {
    let space = space();
    nodes
        .iter()
        .map(|n| n.endpoint().clone())
        .min_by_key(|e| space.distance(id, e.id))
        .unwrap()
}

/// Assert successor and predecessor of every node match the clockwise order of `nodes`.
pub fn assert_ring_order(nodes: &[Arc<Node>]) {
    let space = space();
    let mut sorted = nodes.to_vec();
    sorted.sort_by_key(|n| n.id());
    let len = sorted.len();
    for (i, node) in sorted.iter().enumerate() {
        let next = &sorted[(i + 1) % len];
        let prev = &sorted[(i + len - 1) % len];
        let ring = node.ring();
        assert_eq!(
            ring.successor().unwrap().id,
            next.id(),
            "successor of {} in ring of 2^{}",
            node.endpoint(),
            space.bits()
        );
        assert_eq!(
            ring.predecessor().unwrap().map(|p| p.id),
            Some(prev.id()),
            "predecessor of {}",
            node.endpoint()
        );
    }
}

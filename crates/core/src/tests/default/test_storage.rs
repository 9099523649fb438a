use std::sync::atomic::Ordering;
use std::sync::Arc;

use chordring_transport::connections::MemoryNetwork;

use crate::dht::ChordStorage;
use crate::dht::NodeId;
use crate::error::Error;
use crate::error::Result;
use crate::message::GetValue;
use crate::message::Message;
use crate::message::StoreKeys;
use crate::node::Node;
use crate::tests::default::expected_owner;
use crate::tests::default::fast_timeout_config;
use crate::tests::default::name_in;
use crate::tests::default::prepare_node;
use crate::tests::default::prepare_node_with;
use crate::tests::default::prepare_stalled_node;
use crate::tests::default::run_stabilize;
use crate::tests::default::space;
use crate::tests::default::three_names;
use crate::tests::setup_tracing;

async fn two_node_ring(network: &Arc<MemoryNetwork>) -> (Arc<Node>, Arc<Node>, Arc<Node>) {
    let (a, c, b) = three_names();
    let a = prepare_node(network, &a);
    let b = prepare_node(network, &b);
    let c = prepare_node(network, &c);
    a.create().unwrap();
    b.join(a.name()).await.unwrap();
    run_stabilize(&[a.clone(), b.clone()], 2).await;
    (a, c, b)
}

/// A key whose id lies in `(from, to]`.
fn key_in(from: NodeId, to: NodeId) -> (String, NodeId) {
    let key = name_in("key", from, space().add(to, 1));
    let id = space().hash(&key);
    (key, id)
}

#[tokio::test]
async fn test_put_and_get_from_any_node() -> Result<()> {
    let network = MemoryNetwork::new();
    let (a, c, b) = two_node_ring(&network).await;
    c.join(a.name()).await?;
    let nodes = [a.clone(), b.clone(), c.clone()];
    run_stabilize(&nodes, 4).await;

    for i in 0..20 {
        let key = format!("key-{}", i);
        let writer = &nodes[i % 3];
        writer.put(&key, &format!("value-{}", i)).await?;

        let id = space().hash(&key);
        let owner = expected_owner(&nodes, id);
        for node in nodes.iter() {
            let stored = node.ring().fetch(id).await?;
            assert_eq!(stored.is_some(), node.id() == owner.id, "{} on {}", key, node.endpoint());
            assert_eq!(node.get(&key).await?, Some(format!("value-{}", i)));
        }
    }
    assert_eq!(a.get("missing").await?, None);
    assert_eq!(b.get("missing").await?, None);
    Ok(())
}

#[tokio::test]
async fn test_keys_move_to_joining_node() -> Result<()> {
    let network = MemoryNetwork::new();
    let (a, c, b) = two_node_ring(&network).await;

    let (key, id) = key_in(a.id(), c.id());
    a.put(&key, "moved").await?;
    assert_eq!(b.ring().fetch(id).await?, Some("moved".to_string()));

    c.join(a.name()).await?;
    assert_eq!(c.ring().fetch(id).await?, Some("moved".to_string()));
    assert_eq!(b.ring().fetch(id).await?, None);

    let nodes = [a.clone(), b.clone(), c.clone()];
    run_stabilize(&nodes, 4).await;
    for node in nodes.iter() {
        assert_eq!(node.get(&key).await?, Some("moved".to_string()));
    }
    Ok(())
}

#[tokio::test]
async fn test_new_predecessor_takes_keys_over() -> Result<()> {
    let network = MemoryNetwork::new();
    let (a, c, b) = two_node_ring(&network).await;
    c.join(a.name()).await?;

    // a still routes (a, b] to b, so the pair lands on b.
    let (key, id) = key_in(a.id(), c.id());
    a.put(&key, "late").await?;
    assert_eq!(b.ring().fetch(id).await?, Some("late".to_string()));

    run_stabilize(&[a.clone(), b.clone(), c.clone()], 1).await;
    assert_eq!(c.ring().fetch(id).await?, Some("late".to_string()));
    assert_eq!(b.ring().fetch(id).await?, None);
    Ok(())
}

#[tokio::test]
async fn test_leave_hands_keys_to_successor() -> Result<()> {
    let network = MemoryNetwork::new();
    let (a, c, b) = two_node_ring(&network).await;
    c.join(a.name()).await?;
    run_stabilize(&[a.clone(), b.clone(), c.clone()], 4).await;

    let (key, id) = key_in(a.id(), c.id());
    b.put(&key, "kept").await?;
    assert_eq!(c.ring().fetch(id).await?, Some("kept".to_string()));

    c.leave().await?;
    assert_eq!(c.ring().storage.count().await?, 0);
    assert_eq!(b.ring().fetch(id).await?, Some("kept".to_string()));

    run_stabilize(&[a.clone(), b.clone()], 4).await;
    assert_eq!(a.get(&key).await?, Some("kept".to_string()));
    assert_eq!(b.get(&key).await?, Some("kept".to_string()));
    Ok(())
}

#[tokio::test]
async fn test_leave_keeps_keys_when_successor_is_gone() -> Result<()> {
    let network = MemoryNetwork::new();
    let (a, _, b) = two_node_ring(&network).await;

    let (key, id) = key_in(b.id(), a.id());
    b.put(&key, "stays").await?;
    assert_eq!(a.ring().fetch(id).await?, Some("stays".to_string()));

    assert!(network.unregister(b.name()));
    assert!(a.leave().await.unwrap_err().is_peer_failure());
    assert!(a.is_in_ring());
    assert_eq!(a.ring().fetch(id).await?, Some("stays".to_string()));
    Ok(())
}

#[tokio::test]
async fn test_malformed_store_keys_is_rejected() -> Result<()> {
    let network = MemoryNetwork::new();
    let a = prepare_node(&network, "node-a");
    a.create()?;
    a.put("k", "v").await?;

    let handler = a.handler();
    for payload in [
        "12:ok;garbage;",
        "12:ok;x:bad;",
        "99999999999999999999999:v;",
        "12:ok;300:v;",
    ] {
        let msg = Message::StoreKeys(StoreKeys {
            payload: payload.to_string(),
        });
        let result = handler.handle_message(&msg).await;
        assert!(matches!(result, Err(Error::MalformedPayload(_))), "{}", payload);
    }
    assert_eq!(a.ring().storage.count().await?, 1);
    assert_eq!(a.ring().fetch(NodeId::new(12)).await?, None);

    let out_of_ring = Message::GetValue(GetValue {
        key: NodeId::new(300),
    });
    assert!(matches!(
        handler.handle_message(&out_of_ring).await,
        Err(Error::MalformedPayload(_))
    ));

    let msg = Message::StoreKeys(StoreKeys {
        payload: "12:ok;13:a:b;".to_string(),
    });
    handler.handle_message(&msg).await?;
    assert_eq!(a.ring().fetch(NodeId::new(13)).await?, Some("a:b".to_string()));
    assert_eq!(a.ring().storage.count().await?, 3);
    Ok(())
}

#[tokio::test]
async fn test_value_with_separator_is_rejected() -> Result<()> {
    let network = MemoryNetwork::new();
    let a = prepare_node(&network, "node-a");
    a.create()?;

    assert!(matches!(a.put("k", "a;b").await, Err(Error::InvalidValue)));
    assert!(matches!(a.put("k", "").await, Err(Error::InvalidValue)));
    assert_eq!(a.get("k").await?, None);
    a.put("k", "a:b").await?;
    assert_eq!(a.get("k").await?, Some("a:b".to_string()));
    Ok(())
}

#[tokio::test]
async fn test_empty_value_reads_as_absent_everywhere() -> Result<()> {
    let network = MemoryNetwork::new();
    let (a, _, b) = two_node_ring(&network).await;

    let (key, id) = key_in(a.id(), b.id());
    let msg = Message::StoreKeys(StoreKeys {
        payload: format!("{}:;", id),
    });
    b.handler().handle_message(&msg).await?;
    assert_eq!(b.ring().fetch(id).await?, Some(String::new()));

    assert_eq!(b.get(&key).await?, None);
    assert_eq!(a.get(&key).await?, None);
    Ok(())
}

#[tokio::test]
async fn test_timed_out_join_keeps_keys() -> Result<()> {
    setup_tracing();
    let network = MemoryNetwork::new();
    let (a, c, b) = three_names();
    let config = fast_timeout_config();
    let a = prepare_node_with(&network, &a, config.clone());
    let (b, stalled) = prepare_stalled_node(&network, &b, config.clone(), |msg| {
        matches!(msg, Message::GetKeys(_))
    });
    let c = prepare_node_with(&network, &c, config);
    a.create()?;
    b.join(a.name()).await?;
    run_stabilize(&[a.clone(), b.clone()], 2).await;

    let (key, id) = key_in(a.id(), c.id());
    a.put(&key, "precious").await?;
    assert_eq!(b.ring().fetch(id).await?, Some("precious".to_string()));

    // b answers getKeys after c gave up waiting.
    stalled.store(true, Ordering::SeqCst);
    let err = c.join(a.name()).await.unwrap_err();
    assert!(matches!(&err, Error::RequestTimeout(name) if name == b.name()), "{:?}", err);
    assert!(!c.is_in_ring());
    assert_eq!(b.ring().fetch(id).await?, Some("precious".to_string()));
    assert_eq!(a.get(&key).await?, Some("precious".to_string()));

    // A later join takes the pair over and b drops its copy.
    stalled.store(false, Ordering::SeqCst);
    c.join(a.name()).await?;
    assert_eq!(c.ring().fetch(id).await?, Some("precious".to_string()));
    assert_eq!(b.ring().fetch(id).await?, None);
    Ok(())
}

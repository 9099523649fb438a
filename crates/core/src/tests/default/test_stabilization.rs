use std::sync::atomic::Ordering;
use std::sync::Arc;
use std::time::Duration;

use chordring_transport::connections::MemoryNetwork;

use crate::dht::Chord;
use crate::dht::Liveness;
use crate::dht::Route;
use crate::dht::StabilizeStep;
use crate::dht::SuccessorReader;
use crate::error::Error;
use crate::error::Result;
use crate::message::Probe;
use crate::node::Node;
use crate::tests::default::assert_ring_order;
use crate::tests::default::expected_owner;
use crate::tests::default::fast_timeout_config;
use crate::tests::default::prepare_node;
use crate::tests::default::prepare_node_with;
use crate::tests::default::prepare_stalled_node;
use crate::tests::default::run_stabilize;
use crate::tests::default::space;
use crate::tests::default::test_config;
use crate::tests::default::three_names;
use crate::tests::setup_tracing;
use crate::transport::RingTransport;

async fn three_node_ring(network: &Arc<MemoryNetwork>) -> (Arc<Node>, Arc<Node>, Arc<Node>) {
    let (a, c, b) = three_names();
    let a = prepare_node(network, &a);
    let b = prepare_node(network, &b);
    let c = prepare_node(network, &c);

    a.create().unwrap();
    b.join(a.name()).await.unwrap();
    run_stabilize(&[a.clone(), b.clone()], 2).await;
    c.join(a.name()).await.unwrap();
    run_stabilize(&[a.clone(), b.clone(), c.clone()], 4).await;
    (a, c, b)
}

#[tokio::test]
async fn test_singleton_ring() -> Result<()> {
    let network = MemoryNetwork::new();
    let a = prepare_node(&network, "solo");
    a.create()?;

    let ring = a.ring();
    assert_eq!(ring.successor()?, *a.endpoint());
    assert_eq!(ring.predecessor()?, Some(a.endpoint().clone()));
    assert_eq!(ring.successors().list()?, vec![a.endpoint().clone(); 3]);
    assert_eq!(
        ring.find_successor(space().add(a.id(), 17))?,
        Route::Found(a.endpoint().clone())
    );

    // Stabilizing a singleton ring changes nothing.
    run_stabilize(&[a.clone()], 2).await;
    assert_eq!(ring.successor()?, *a.endpoint());
    assert_eq!(ring.predecessor()?, Some(a.endpoint().clone()));
    assert_eq!(a.lookup(space().add(a.id(), 200)).await?, *a.endpoint());
    Ok(())
}

#[tokio::test]
async fn test_two_node_ring() -> Result<()> {
    let network = MemoryNetwork::new();
    let (a, _, b) = three_names();
    let a = prepare_node(&network, &a);
    let b = prepare_node(&network, &b);

    a.create()?;
    b.join(a.name()).await?;
    assert_eq!(b.ring().successor()?, *a.endpoint());
    assert_eq!(b.ring().predecessor()?, None);
    assert!(a.successor_links_back().await?);
    assert!(!b.successor_links_back().await?);
    // Reading the predecessor of a notified nobody.
    assert_eq!(a.ring().predecessor()?, Some(a.endpoint().clone()));

    run_stabilize(&[a.clone(), b.clone()], 2).await;
    assert_ring_order(&[a.clone(), b.clone()]);
    assert!(a.successor_links_back().await?);
    assert!(b.successor_links_back().await?);

    // Predecessor and successor coincide, each node owns the other half.
    for offset in [0, 1, 64, 255] {
        let id = space().add(a.id(), offset);
        let owner = expected_owner(&[a.clone(), b.clone()], id);
        assert_eq!(a.lookup(id).await?, owner);
        assert_eq!(b.lookup(id).await?, owner);
    }
    Ok(())
}

#[tokio::test]
async fn test_join_between_two_nodes() -> Result<()> {
    let network = MemoryNetwork::new();
    let (a, c, b) = three_node_ring(&network).await;

    assert_ring_order(&[a.clone(), b.clone(), c.clone()]);
    assert_eq!(a.ring().successor()?, *c.endpoint());
    assert_eq!(c.ring().successor()?, *b.endpoint());
    assert_eq!(b.ring().successor()?, *a.endpoint());

    assert_eq!(a.ring().successors().list()?, vec![
        c.endpoint().clone(),
        b.endpoint().clone(),
        a.endpoint().clone()
    ]);
    Ok(())
}

#[tokio::test]
async fn test_step_machine() -> Result<()> {
    let network = MemoryNetwork::new();
    let (a, _, b) = three_names();
    let a = prepare_node(&network, &a);
    let b = prepare_node(&network, &b);
    a.create()?;
    b.join(a.name()).await?;

    let stabilizer = b.stabilizer();
    assert_eq!(stabilizer.check_predecessor().await?, Liveness::Skipped);
    assert_eq!(stabilizer.check_successor().await?, Liveness::Alive);

    let mut step = StabilizeStep::CheckPredecessor;
    for _ in 0..5 {
        step = stabilizer.step(step).await;
    }
    assert_eq!(step, StabilizeStep::Sleep);
    // b notified a during its probe, a left its singleton ring.
    assert_eq!(a.ring().predecessor()?, Some(b.endpoint().clone()));
    assert_eq!(a.ring().successor()?, *b.endpoint());
    Ok(())
}

#[tokio::test]
async fn test_crashed_node_is_repaired() -> Result<()> {
    let network = MemoryNetwork::new();
    let (a, c, b) = three_node_ring(&network).await;

    assert!(network.unregister(c.name()));
    assert_eq!(a.stabilizer().check_successor().await?, Liveness::Dead);
    assert_eq!(b.stabilizer().check_predecessor().await?, Liveness::Dead);

    let live = [a.clone(), b.clone()];
    run_stabilize(&live, 4).await;
    assert_ring_order(&live);
    assert!(!a.ring().successors().contains(c.id())?);

    for offset in (0..256).step_by(13) {
        let id = space().add(c.id(), offset);
        assert_eq!(a.lookup(id).await?, expected_owner(&live, id));
        assert_eq!(b.lookup(id).await?, expected_owner(&live, id));
    }
    Ok(())
}

#[tokio::test]
async fn test_hanging_node_is_repaired() -> Result<()> {
    setup_tracing();
    let network = MemoryNetwork::new();
    let config = fast_timeout_config();
    let (a, c, b) = three_names();
    let a = prepare_node_with(&network, &a, config.clone());
    let b = prepare_node_with(&network, &b, config.clone());
    let (c, stalled) = prepare_stalled_node(&network, &c, config.clone(), |_| true);

    a.create()?;
    b.join(a.name()).await?;
    run_stabilize(&[a.clone(), b.clone()], 2).await;
    c.join(a.name()).await?;
    run_stabilize(&[a.clone(), b.clone(), c.clone()], 4).await;
    assert_ring_order(&[a.clone(), b.clone(), c.clone()]);

    // c keeps handling requests but never answers in time.
    stalled.store(true, Ordering::SeqCst);
    let transport = RingTransport::new(
        Arc::new(network.transport()),
        config.request_timeout(),
        config.max_hops,
    );
    let err = transport
        .alive(c.name(), Probe::CheckSuccessor)
        .await
        .unwrap_err();
    assert!(matches!(&err, Error::RequestTimeout(name) if name == c.name()), "{:?}", err);
    assert!(err.is_peer_failure());

    assert_eq!(a.stabilizer().check_successor().await?, Liveness::Dead);
    assert_eq!(a.ring().successor()?, *b.endpoint());
    assert_eq!(b.stabilizer().check_predecessor().await?, Liveness::Dead);
    assert_eq!(b.ring().predecessor()?, None);

    let live = [a.clone(), b.clone()];
    run_stabilize(&live, 4).await;
    assert_ring_order(&live);
    assert!(!a.ring().successors().contains(c.id())?);
    Ok(())
}

#[tokio::test]
async fn test_lookup_converges_over_many_nodes() -> Result<()> {
    let network = MemoryNetwork::new();
    let space = space();

    let mut nodes: Vec<Arc<Node>> = vec![];
    let mut ids = vec![];
    for i in 0.. {
        if nodes.len() == 8 {
            break;
        }
        let name = format!("ring-{}", i);
        let id = space.hash(&name);
        if ids.contains(&id) {
            continue;
        }
        ids.push(id);
        let node = prepare_node(&network, &name);
        match nodes.first() {
            None => node.create()?,
            Some(first) => node.join(first.name()).await?,
        }
        nodes.push(node);
        run_stabilize(&nodes, 4).await;
    }
    run_stabilize(&nodes, 4).await;
    assert_ring_order(&nodes);

    for node in nodes.iter() {
        for offset in (0..256).step_by(7) {
            let id = space.add(node.id(), offset);
            assert_eq!(node.lookup(id).await?, expected_owner(&nodes, id));
        }
        let fingers = node.ring().fingers()?;
        for index in 1..=8 {
            let start = space.finger_start(node.id(), index)?;
            assert_eq!(
                fingers.get(index).cloned(),
                Some(expected_owner(&nodes, start)),
                "finger {} of {}",
                index,
                node.endpoint()
            );
        }
    }
    Ok(())
}

#[tokio::test]
async fn test_background_stabilization_with_delays() -> Result<()> {
    let network = MemoryNetwork::with_random_delay(1, 4);
    let config = crate::config::DhtConfig {
        stabilize_interval_ms: 20,
        ..test_config()
    };
    let (a, c, b) = three_names();
    let nodes: Vec<Arc<Node>> = [a, b, c]
        .iter()
        .map(|name| prepare_node_with(&network, name, config.clone()))
        .collect();

    nodes[0].create()?;
    for node in nodes[1..].iter() {
        node.join(nodes[0].name()).await?;
    }
    tokio::select! {
        _ = futures::future::join_all(nodes.iter().map(|n| n.run_stabilization())) => {}
        _ = tokio::time::sleep(Duration::from_secs(3)) => {}
    }
    assert_ring_order(&nodes);

    // Background loops end once their node is out of ring.
    nodes[1].leave().await?;
    tokio::time::timeout(Duration::from_secs(1), nodes[1].run_stabilization())
        .await
        .expect("stabilization of a node out of ring returns");
    Ok(())
}

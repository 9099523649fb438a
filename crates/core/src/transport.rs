//! Transport adapter: ring operations as requests over a
//! [TransportInterface](chordring_transport::core::transport::TransportInterface).
#![warn(missing_docs)]
use std::time::Duration;

use bytes::Bytes;
use chordring_transport::core::transport::SharedTransport;

use crate::dht::Chord;
use crate::dht::Endpoint;
use crate::dht::IdSpace;
use crate::dht::NodeId;
use crate::dht::RingState;
use crate::dht::Route;
use crate::error::Error;
use crate::error::Result;
use crate::message::codec;
use crate::message::Alive;
use crate::message::FindSuccessor;
use crate::message::GetKeys;
use crate::message::GetValue;
use crate::message::JoinSuccessor;
use crate::message::Message;
use crate::message::Probe;
use crate::message::PutValue;
use crate::message::ReleaseKeys;
use crate::message::Response;
use crate::message::SendSuccessorList;
use crate::message::StabilizeP1;
use crate::message::StabilizeP2;
use crate::message::StoreKeys;

/// RingTransport sends [Message]s to named nodes and waits for their [Response].
///
/// A request not answered within `timeout` fails with [Error::RequestTimeout]. A request
/// the transport cannot deliver, or the remote cannot handle, fails with
/// [Error::Unreachable]. Both count as the remote being unreachable.
pub struct RingTransport {
    inner: SharedTransport,
    timeout: Duration,
    max_hops: usize,
}

impl RingTransport {
    /// Create a new RingTransport.
    pub fn new(inner: SharedTransport, timeout: Duration, max_hops: usize) -> Self {
        Self {
            inner,
            timeout,
            max_hops,
        }
    }

    /// Send `msg` to `target` and wait for the response.
    pub async fn send(&self, target: &str, msg: Message) -> Result<Response> {
        tracing::trace!("send {} to {}", msg, target);
        let data = Bytes::from(msg.encode()?);
        let resp = tokio::time::timeout(self.timeout, self.inner.request(target, data))
            .await
            .map_err(|_| Error::RequestTimeout(target.to_string()))?
            .map_err(|e| Error::Unreachable(target.to_string(), e.to_string()))?;
        Response::decode(&resp)
    }

    /// `join.successor`: first lookup hop of a joining node.
    pub async fn join_successor(&self, target: &str, name: &str) -> Result<Route> {
        let msg = Message::JoinSuccessor(JoinSuccessor {
            name: name.to_string(),
        });
        match self.send(target, msg).await? {
            Response::Route(route) => Ok(route),
            _ => Err(Error::UnexpectedResponse("join.successor")),
        }
    }

    /// Ask `target` for its local step towards the owner of `id`.
    pub async fn find_successor(&self, target: &str, id: NodeId) -> Result<Route> {
        let msg = Message::FindSuccessor(FindSuccessor { target: id });
        match self.send(target, msg).await? {
            Response::Route(route) => Ok(route),
            _ => Err(Error::UnexpectedResponse("findSuccessor")),
        }
    }

    /// `join.getKeys`: pull the pairs a joining node now owns from its successor.
    pub async fn get_keys(&self, target: &str, name: &str) -> Result<Vec<(NodeId, String)>> {
        let msg = Message::GetKeys(GetKeys {
            name: name.to_string(),
        });
        match self.send(target, msg).await? {
            Response::KeyValues(payload) => codec::decode_key_values(&payload),
            _ => Err(Error::UnexpectedResponse("join.getKeys")),
        }
    }

    /// Tell `target` the pairs answered to `join.getKeys` are stored and may be dropped.
    pub async fn release_keys(&self, target: &str, pairs: &[(NodeId, String)]) -> Result<()> {
        let msg = Message::ReleaseKeys(ReleaseKeys {
            payload: codec::encode_key_values_terminated(pairs),
        });
        match self.send(target, msg).await? {
            Response::Ack => Ok(()),
            _ => Err(Error::UnexpectedResponse("releaseKeys")),
        }
    }

    /// Liveness probe. Any failure to get a positive answer is reported as an error.
    pub async fn alive(&self, target: &str, probe: Probe) -> Result<()> {
        match self.send(target, Message::Alive(Alive { probe })).await? {
            Response::Alive(true) => Ok(()),
            Response::Alive(false) => Err(Error::Unreachable(
                target.to_string(),
                "negative liveness ack".to_string(),
            )),
            _ => Err(Error::UnexpectedResponse("alive")),
        }
    }

    /// `stabilize.p1`: read the predecessor of `target` and notify it of `me`.
    pub async fn stabilize_p1(&self, target: &str, me: &str) -> Result<Option<Endpoint>> {
        let msg = Message::StabilizeP1(StabilizeP1 {
            name: me.to_string(),
        });
        match self.send(target, msg).await? {
            Response::Predecessor(pred) => Ok(pred),
            _ => Err(Error::UnexpectedResponse("stabilize.p1")),
        }
    }

    /// `stabilize.p2`: read the predecessor of `target`.
    pub async fn stabilize_p2(&self, target: &str) -> Result<Option<Endpoint>> {
        match self
            .send(target, Message::StabilizeP2(StabilizeP2))
            .await?
        {
            Response::Predecessor(pred) => Ok(pred),
            _ => Err(Error::UnexpectedResponse("stabilize.p2")),
        }
    }

    /// `stabilize.updateSuccessorList.sendSuccList`
    pub async fn successor_list(&self, target: &str, space: &IdSpace) -> Result<Vec<Endpoint>> {
        match self
            .send(target, Message::SendSuccessorList(SendSuccessorList))
            .await?
        {
            Response::SuccessorList(payload) => {
                Ok(codec::decode_successor_list(space, &payload))
            }
            _ => Err(Error::UnexpectedResponse("sendSuccList")),
        }
    }

    /// `storeKeys`
    pub async fn store_keys(&self, target: &str, pairs: &[(NodeId, String)]) -> Result<()> {
        let msg = Message::StoreKeys(StoreKeys {
            payload: codec::encode_key_values_terminated(pairs),
        });
        match self.send(target, msg).await? {
            Response::Ack => Ok(()),
            _ => Err(Error::UnexpectedResponse("storeKeys")),
        }
    }

    /// `get`: the value is empty when absent.
    pub async fn get_value(&self, target: &str, key: NodeId) -> Result<String> {
        match self
            .send(target, Message::GetValue(GetValue { key }))
            .await?
        {
            Response::Value(value) => Ok(value),
            _ => Err(Error::UnexpectedResponse("get")),
        }
    }

    /// `put`
    pub async fn put_value(&self, target: &str, key: NodeId, value: &str) -> Result<()> {
        let msg = Message::PutValue(PutValue {
            key,
            value: value.to_string(),
        });
        match self.send(target, msg).await? {
            Response::Ack => Ok(()),
            _ => Err(Error::UnexpectedResponse("put")),
        }
    }

    /// Resolve the owner of `target`, starting with the local state of `ring`.
    pub async fn lookup(&self, ring: &RingState, target: NodeId) -> Result<Endpoint> {
        let route = ring.next_hop(target)?;
        self.follow(target, route).await
    }

    /// Resolve the successor of the joining node `name` through `bootstrap`.
    pub async fn join_lookup(&self, bootstrap: &str, name: &str, id: NodeId) -> Result<Endpoint> {
        let route = self.join_successor(bootstrap, name).await?;
        self.follow(id, route).await
    }

    /// Keep asking the next hop until an owner is found.
    async fn follow(&self, target: NodeId, mut route: Route) -> Result<Endpoint> {
        for hop in 0..self.max_hops {
            match route {
                Route::Found(owner) => {
                    tracing::debug!("lookup {} found {} after {} hops", target, owner, hop);
                    return Ok(owner);
                }
                Route::NotFound => return Err(Error::RouteNotFound(target)),
                Route::Forward { next, index } => {
                    tracing::debug!("lookup {} forward to {} (finger {})", target, next, index);
                    route = self.find_successor(&next.name, target).await?;
                }
            }
        }
        match route {
            Route::Found(owner) => Ok(owner),
            _ => Err(Error::LookupExhausted(target, self.max_hops)),
        }
    }
}

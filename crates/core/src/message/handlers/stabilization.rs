use async_trait::async_trait;

use crate::dht::Chord;
use crate::dht::ChordStorage;
use crate::dht::Endpoint;
use crate::dht::SuccessorReader;
use crate::error::Result;
use crate::message::codec;
use crate::message::types::Alive;
use crate::message::types::Response;
use crate::message::types::SendSuccessorList;
use crate::message::types::StabilizeP1;
use crate::message::types::StabilizeP2;
use crate::message::HandleMsg;
use crate::message::MessageHandler;

impl MessageHandler {
    /// Push the pairs a new predecessor took over from the previous one.
    ///
    /// Only a predecessor strictly between the previous one and this node takes keys over,
    /// so a predecessor moving backwards never receives anything. The transfer is
    /// best-effort: on failure the pairs are kept here.
    async fn hand_off_to_predecessor(
        &self,
        previous: Option<Endpoint>,
        current: &Endpoint,
    ) -> Result<()> {
        let Some(previous) = previous else {
            return Ok(());
        };
        if previous.id == current.id || !current.id.in_open(previous.id, self.ring.id()) {
            return Ok(());
        }
        let pairs = self.ring.take_range(previous.id, current.id).await?;
        if pairs.is_empty() {
            return Ok(());
        }
        tracing::info!(
            "{} hands {} keys over to new predecessor {}",
            self.ring.endpoint(),
            pairs.len(),
            current
        );
        if let Err(e) = self.transport.store_keys(&current.name, &pairs).await {
            tracing::warn!("failed to hand keys over to {}: {}", current, e);
            self.ring.store_all(pairs).await?;
        }
        Ok(())
    }
}

#[async_trait]
impl HandleMsg<Alive> for MessageHandler {
    async fn handle(&self, msg: &Alive) -> Result<Response> {
        tracing::trace!("{} alive probe {:?}", self.ring.endpoint(), msg.probe);
        Ok(Response::Alive(true))
    }
}

#[async_trait]
impl HandleMsg<StabilizeP1> for MessageHandler {
    /// Answer with the predecessor as it was before notifying, then notify.
    async fn handle(&self, msg: &StabilizeP1) -> Result<Response> {
        let candidate = Endpoint::from_name(self.ring.space(), msg.name.as_str());
        let previous = self.ring.notify(candidate.clone())?;
        self.hand_off_to_predecessor(previous.clone(), &candidate)
            .await?;
        Ok(Response::Predecessor(previous))
    }
}

#[async_trait]
impl HandleMsg<StabilizeP2> for MessageHandler {
    async fn handle(&self, _msg: &StabilizeP2) -> Result<Response> {
        Ok(Response::Predecessor(self.ring.predecessor()?))
    }
}

#[async_trait]
impl HandleMsg<SendSuccessorList> for MessageHandler {
    async fn handle(&self, _msg: &SendSuccessorList) -> Result<Response> {
        let list = self.ring.successors().list()?;
        Ok(Response::SuccessorList(codec::encode_successor_list(&list)))
    }
}

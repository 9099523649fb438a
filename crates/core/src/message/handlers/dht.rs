use async_trait::async_trait;

use crate::dht::Chord;
use crate::dht::ChordStorage;
use crate::error::Result;
use crate::message::codec;
use crate::message::types::FindSuccessor;
use crate::message::types::GetKeys;
use crate::message::types::JoinSuccessor;
use crate::message::types::ReleaseKeys;
use crate::message::types::Response;
use crate::message::HandleMsg;
use crate::message::MessageHandler;

#[async_trait]
impl HandleMsg<JoinSuccessor> for MessageHandler {
    async fn handle(&self, msg: &JoinSuccessor) -> Result<Response> {
        let id = self.ring.space().hash(&msg.name);
        tracing::debug!("{} locates successor of joining {}({})", self.ring.endpoint(), msg.name, id);
        Ok(Response::Route(self.ring.next_hop(id)?))
    }
}

#[async_trait]
impl HandleMsg<FindSuccessor> for MessageHandler {
    async fn handle(&self, msg: &FindSuccessor) -> Result<Response> {
        Ok(Response::Route(self.ring.next_hop(msg.target)?))
    }
}

#[async_trait]
impl HandleMsg<GetKeys> for MessageHandler {
    /// Pairs stay here until the joiner sends [ReleaseKeys].
    async fn handle(&self, msg: &GetKeys) -> Result<Response> {
        let joiner = self.ring.space().hash(&msg.name);
        let pairs = self.ring.keys_for_predecessor(joiner).await?;
        tracing::info!(
            "{} hands {} keys over to joining {}",
            self.ring.endpoint(),
            pairs.len(),
            msg.name
        );
        Ok(Response::KeyValues(codec::encode_key_values(&pairs)))
    }
}

#[async_trait]
impl HandleMsg<ReleaseKeys> for MessageHandler {
    async fn handle(&self, msg: &ReleaseKeys) -> Result<Response> {
        let pairs = codec::decode_key_values_in(self.ring.space(), &msg.payload)?;
        let removed = self.ring.release(&pairs).await?;
        tracing::debug!(
            "{} released {} of {} keys",
            self.ring.endpoint(),
            removed,
            pairs.len()
        );
        Ok(Response::Ack)
    }
}

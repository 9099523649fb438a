use async_trait::async_trait;

use crate::dht::ChordStorage;
use crate::error::Result;
use crate::message::codec;
use crate::message::types::GetValue;
use crate::message::types::PutValue;
use crate::message::types::Response;
use crate::message::types::StoreKeys;
use crate::message::HandleMsg;
use crate::message::MessageHandler;

#[async_trait]
impl HandleMsg<StoreKeys> for MessageHandler {
    /// The whole payload is parsed before anything is stored.
    async fn handle(&self, msg: &StoreKeys) -> Result<Response> {
        let pairs = codec::decode_key_values_in(self.ring.space(), &msg.payload).map_err(|e| {
            tracing::error!("{} drops storeKeys: {}", self.ring.endpoint(), e);
            e
        })?;
        tracing::debug!("{} stores {} handed over keys", self.ring.endpoint(), pairs.len());
        self.ring.store_all(pairs).await?;
        Ok(Response::Ack)
    }
}

#[async_trait]
impl HandleMsg<GetValue> for MessageHandler {
    async fn handle(&self, msg: &GetValue) -> Result<Response> {
        codec::check_key(self.ring.space(), msg.key)?;
        let value = self.ring.fetch(msg.key).await?;
        Ok(Response::Value(value.unwrap_or_default()))
    }
}

#[async_trait]
impl HandleMsg<PutValue> for MessageHandler {
    async fn handle(&self, msg: &PutValue) -> Result<Response> {
        codec::check_key(self.ring.space(), msg.key)?;
        codec::check_value(&msg.value)?;
        self.ring.store(msg.key, msg.value.clone()).await?;
        Ok(Response::Ack)
    }
}

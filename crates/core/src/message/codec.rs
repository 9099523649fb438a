//! Text formats of key/value lists and successor lists.
//!
//! Key/value lists are `key:value;key:value;...` where `key` is a hashed key in decimal.
//! A value may contain `:`, the key ends at the first one, but never `;`.
//! Successor lists are `name;name;...;`.

use crate::consts::KEY_VALUE_SEPARATOR;
use crate::consts::LIST_SEPARATOR;
use crate::dht::Endpoint;
use crate::dht::IdSpace;
use crate::dht::NodeId;
use crate::error::Error;
use crate::error::Result;

/// Reject values that would break the list format. An empty value reads as absent on
/// the wire, so it is rejected too.
pub fn check_value(value: &str) -> Result<()> {
    if value.is_empty() || value.contains(LIST_SEPARATOR) {
        return Err(Error::InvalidValue);
    }
    Ok(())
}

/// Reject a hashed key no lookup in `space` can reach.
pub fn check_key(space: &IdSpace, key: NodeId) -> Result<()> {
    if !space.contains(key) {
        return Err(Error::MalformedPayload(format!(
            "key {key} outside ring of 2^{}",
            space.bits()
        )));
    }
    Ok(())
}

/// [decode_key_values], keeping only lists whose every key lies in `space`.
pub fn decode_key_values_in(space: &IdSpace, payload: &str) -> Result<Vec<(NodeId, String)>> {
    let pairs = decode_key_values(payload)?;
    for (key, _) in pairs.iter() {
        check_key(space, *key)?;
    }
    Ok(pairs)
}

fn pair(key: &NodeId, value: &str) -> String {
    format!("{key}{KEY_VALUE_SEPARATOR}{value}")
}

/// `key:value;key:value`, as answered to `join.getKeys`.
pub fn encode_key_values(pairs: &[(NodeId, String)]) -> String {
    pairs
        .iter()
        .map(|(k, v)| pair(k, v))
        .collect::<Vec<_>>()
        .join(&LIST_SEPARATOR.to_string())
}

/// `key:value;key:value;`, every pair terminated, as sent with `storeKeys`.
pub fn encode_key_values_terminated(pairs: &[(NodeId, String)]) -> String {
    pairs
        .iter()
        .map(|(k, v)| format!("{}{LIST_SEPARATOR}", pair(k, v)))
        .collect()
}

/// Parse a key/value list in either form. Nothing is returned unless every pair parses.
pub fn decode_key_values(payload: &str) -> Result<Vec<(NodeId, String)>> {
    payload
        .split(LIST_SEPARATOR)
        .filter(|s| !s.is_empty())
        .map(|s| {
            let (key, value) = s
                .split_once(KEY_VALUE_SEPARATOR)
                .ok_or_else(|| Error::MalformedPayload(format!("pair without key: {s:?}")))?;
            Ok((key.parse::<NodeId>()?, value.to_string()))
        })
        .collect()
}

/// `name;name;...;`
pub fn encode_successor_list(list: &[Endpoint]) -> String {
    list.iter()
        .map(|e| format!("{}{LIST_SEPARATOR}", e.name))
        .collect()
}

/// Parse a successor list. Ids are recomputed from names.
pub fn decode_successor_list(space: &IdSpace, payload: &str) -> Vec<Endpoint> {
    payload
        .split(LIST_SEPARATOR)
        .filter(|s| !s.is_empty())
        .map(|name| Endpoint::from_name(space, name))
        .collect()
}

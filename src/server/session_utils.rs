use std::cmp::PartialEq;
use std::collections::HashMap;
use std::hash::Hash;

use crate::game::types::PlayerId;
use crate::server::room::messages::{ConnId, Connection};

/// Generic check that the value registered under `key` carries the expected address.
pub fn is_addr_valid<K, V, A>(map: &HashMap<K, V>, key: &K, addr: &A, addr_extractor: impl Fn(&V) -> &A) -> bool
where
    K: Eq + Hash,
    A: PartialEq,
{
    map.get(key).is_some_and(|value| addr_extractor(value) == addr)
}

/// Whether `conn_id` is the connection currently registered for `player`.
/// Messages from a replaced connection fail this check.
pub fn is_current_connection(connections: &HashMap<PlayerId, Connection>, player: PlayerId, conn_id: &ConnId) -> bool {
    is_addr_valid(connections, &player, conn_id, |conn| &conn.id)
}

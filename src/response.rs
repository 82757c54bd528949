//! Bridge reply parsing.
//!
//! Mutating requests are answered with a JSON array of single-key objects, each
//! either `{"success": {"/resource/path": value}}` or
//! `{"error": {"type": n, "address": "...", "description": "..."}}`.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// An `error` entry of a bridge reply.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BridgeError {
    #[serde(rename = "type", default)]
    pub error_type: Option<u64>,
    #[serde(default)]
    pub address: Option<String>,
    #[serde(default)]
    pub description: String,
}

/// One element of a bridge reply array.
#[derive(Debug, Clone, PartialEq)]
pub enum ReplyEntry<'a> {
    Success(&'a Map<String, Value>),
    Error(BridgeError),
    /// Anything that is neither a success nor an error object.
    Other(&'a Value),
}

impl<'a> ReplyEntry<'a> {
    fn parse(entry: &'a Value) -> Self {
        if let Some(success) = entry.get("success").and_then(Value::as_object) {
            return ReplyEntry::Success(success);
        }
        match entry.get("error") {
            Some(error) => ReplyEntry::Error(
                serde_json::from_value(error.clone()).unwrap_or_else(|_| BridgeError {
                    error_type: None,
                    address: None,
                    description: error.to_string(),
                }),
            ),
            None => ReplyEntry::Other(entry),
        }
    }
}

/// All entries of a reply; empty when the reply is not an array.
pub fn entries(reply: &Value) -> impl Iterator<Item = ReplyEntry<'_>> {
    reply
        .as_array()
        .into_iter()
        .flatten()
        .map(ReplyEntry::parse)
}

/// The first entry of a reply, if the reply is a non-empty array.
pub fn first_entry(reply: &Value) -> Option<ReplyEntry<'_>> {
    entries(reply).next()
}

/// Every `(path, value)` pair confirmed by the `success` entries of a reply.
pub fn successes(reply: &Value) -> impl Iterator<Item = (&str, &Value)> {
    entries(reply)
        .filter_map(|entry| match entry {
            ReplyEntry::Success(map) => Some(map),
            _ => None,
        })
        .flat_map(|map| map.iter().map(|(k, v)| (k.as_str(), v)))
}

/// The first `error` entry of a reply.
pub fn first_error(reply: &Value) -> Option<BridgeError> {
    entries(reply).find_map(|entry| match entry {
        ReplyEntry::Error(error) => Some(error),
        _ => None,
    })
}

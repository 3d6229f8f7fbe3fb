//! Versioned envelopes for the three persisted local records.
//!
//! Every record is stored as `{"version": N, "data": ...}`. A record whose envelope cannot be
//! parsed, whose version is unknown, or whose payload does not match the expected shape is
//! reported as a [`DecodeError`] and treated by the store as absent.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize, de::DeserializeOwned};
use serde_json::Value;
use thiserror::Error;

use crate::dao::models::{CardAnswer, DeckStatsMap};

/// Schema version written by this build.
pub const SCHEMA_VERSION: u32 = 1;

/// A logical record kept in the local store.
pub trait RecordKind {
    /// Storage key of the record.
    const KEY: &'static str;
    /// In-memory shape of the record; `Default` is the value of an absent record.
    type Value: Serialize + DeserializeOwned + Default;
}

/// Per-deck totals.
pub struct DeckStatsRecord;

impl RecordKind for DeckStatsRecord {
    const KEY: &'static str = "deck_stats";
    type Value = DeckStatsMap;
}

/// Answers not yet confirmed by the remote store (the outbox).
pub struct PendingAnswersRecord;

impl RecordKind for PendingAnswersRecord {
    const KEY: &'static str = "pending_answers";
    type Value = Vec<CardAnswer>;
}

/// Card identifiers already answered by the current identity.
pub struct AnsweredCardIdsRecord;

impl RecordKind for AnsweredCardIdsRecord {
    const KEY: &'static str = "answered_card_ids";
    type Value = BTreeSet<String>;
}

/// Reasons a stored record could not be decoded.
#[derive(Debug, Error)]
pub enum DecodeError {
    /// The raw text is not a valid envelope or the payload has the wrong shape.
    #[error("malformed record")]
    Malformed(#[source] serde_json::Error),
    /// The envelope was written by an unknown schema version.
    #[error("unsupported schema version {0}")]
    UnsupportedVersion(u32),
}

#[derive(Serialize)]
struct EnvelopeRef<'a, T> {
    version: u32,
    data: &'a T,
}

#[derive(Deserialize)]
struct Envelope {
    version: u32,
    data: Value,
}

/// Serialize a record into its envelope.
pub fn encode<T: Serialize>(value: &T) -> serde_json::Result<String> {
    serde_json::to_string(&EnvelopeRef {
        version: SCHEMA_VERSION,
        data: value,
    })
}

/// Parse an envelope and its payload.
pub fn decode<T: DeserializeOwned>(raw: &str) -> Result<T, DecodeError> {
    let envelope: Envelope = serde_json::from_str(raw).map_err(DecodeError::Malformed)?;
    if envelope.version != SCHEMA_VERSION {
        return Err(DecodeError::UnsupportedVersion(envelope.version));
    }
    serde_json::from_value(envelope.data).map_err(DecodeError::Malformed)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dao::models::DeckStats;

    #[test]
    fn encoded_record_carries_version() {
        let mut stats = DeckStatsMap::new();
        stats.insert(
            "Exercise".into(),
            DeckStats {
                cards_played: 2,
                total_correct: 1,
                total_wrong: 1,
            },
        );
        let raw = encode(&stats).unwrap();
        let value: Value = serde_json::from_str(&raw).unwrap();
        assert_eq!(value["version"], SCHEMA_VERSION);
        assert_eq!(value["data"]["Exercise"]["cards_played"], 2);

        let decoded: DeckStatsMap = decode(&raw).unwrap();
        assert_eq!(decoded, stats);
    }

    #[test]
    fn unknown_version_is_rejected() {
        let err = decode::<DeckStatsMap>(r#"{"version": 99, "data": {}}"#).unwrap_err();
        assert!(matches!(err, DecodeError::UnsupportedVersion(99)));
    }

    #[test]
    fn bare_payload_without_envelope_is_malformed() {
        let err = decode::<Vec<CardAnswer>>("[]").unwrap_err();
        assert!(matches!(err, DecodeError::Malformed(_)));
    }

    #[test]
    fn wrong_payload_shape_is_malformed() {
        let err = decode::<BTreeSet<String>>(r#"{"version": 1, "data": {"a": 1}}"#).unwrap_err();
        assert!(matches!(err, DecodeError::Malformed(_)));
    }
}

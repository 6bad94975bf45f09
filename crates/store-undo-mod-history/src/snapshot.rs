/// Serialized state snapshots and their encodings.
use anyhow::{Context, Result};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

/// Encoding used to turn a state value into snapshot bytes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SnapshotFormat {
    /// Canonical JSON text (serde_json). Works with any serde data model.
    #[default]
    Json,
    /// Compact binary (bincode). Not usable with self-describing types
    /// such as `serde_json::Value` or untagged enums.
    Bincode,
}

/// An immutable, self-contained copy of a container's state.
///
/// The bytes own everything they describe, so a decoded value never
/// shares nested data with the live state it was taken from.
#[derive(Clone, PartialEq, Eq)]
pub struct Snapshot {
    format: SnapshotFormat,
    bytes: Box<[u8]>,
}

impl std::fmt::Debug for Snapshot {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut dbg = f.debug_struct("Snapshot");
        dbg.field("format", &self.format).field("len", &self.bytes.len());
        if let Some(text) = self.as_text() {
            dbg.field("text", &text);
        }
        dbg.finish()
    }
}

impl Snapshot {
    /// Serializes `state` into a new snapshot.
    ///
    /// # Errors
    ///
    /// Returns an error if the state contains values the format cannot
    /// represent (e.g. non-string map keys in JSON).
    pub fn encode<S: Serialize + ?Sized>(format: SnapshotFormat, state: &S) -> Result<Self> {
        let bytes = match format {
            SnapshotFormat::Json => {
                serde_json::to_vec(state).context("Failed to encode JSON snapshot")?
            }
            SnapshotFormat::Bincode => {
                bincode::serialize(state).context("Failed to encode bincode snapshot")?
            }
        };
        Ok(Self {
            format,
            bytes: bytes.into_boxed_slice(),
        })
    }

    /// Deserializes the snapshot into a fresh state value.
    ///
    /// # Errors
    ///
    /// Returns an error if the bytes do not describe a valid `S`.
    pub fn decode<S: DeserializeOwned>(&self) -> Result<S> {
        match self.format {
            SnapshotFormat::Json => {
                serde_json::from_slice(&self.bytes).context("Failed to decode JSON snapshot")
            }
            SnapshotFormat::Bincode => {
                bincode::deserialize(&self.bytes).context("Failed to decode bincode snapshot")
            }
        }
    }

    pub fn format(&self) -> SnapshotFormat {
        self.format
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }

    /// Number of encoded bytes.
    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    /// Returns the JSON text of a JSON snapshot, `None` for binary formats.
    pub fn as_text(&self) -> Option<&str> {
        match self.format {
            SnapshotFormat::Json => std::str::from_utf8(&self.bytes).ok(),
            SnapshotFormat::Bincode => None,
        }
    }
}

//! Pending navigation intents.
//!
//! An intent names the incident a notification tap should open. It is staged
//! into one of two fixed slots and consumed exactly once by the dispatcher.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Freshness window shared by both slots, in seconds.
pub const DEFAULT_FRESHNESS_WINDOW_SECS: u64 = 5 * 60;

/// Schema version written into every persisted record.
pub const INTENT_SCHEMA_VERSION: u32 = 1;

/// The lifecycle state that produced a staged intent.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Slot {
    /// The app was launched from a terminated state by a notification tap.
    Initial,
    /// The app was resumed from the background by a notification tap.
    Pending,
}

impl Slot {
    /// Evaluation order for a dispatch pass. Cold start wins.
    pub const DISPATCH_ORDER: [Slot; 2] = [Slot::Initial, Slot::Pending];

    /// Storage key holding this slot's record.
    #[must_use]
    pub fn key(self) -> &'static str {
        match self {
            Self::Initial => "initialNotificationNavigation",
            Self::Pending => "pendingNotificationNavigation",
        }
    }

    /// Look a slot up by its storage key.
    #[must_use]
    pub fn from_key(key: &str) -> Option<Self> {
        Self::DISPATCH_ORDER.into_iter().find(|slot| slot.key() == key)
    }
}

impl std::fmt::Display for Slot {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Initial => f.pad("initial"),
            Self::Pending => f.pad("pending"),
        }
    }
}

/// A deferred request to open an incident.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PendingIntent {
    /// Identifier of the incident to open.
    pub target_id: String,
    /// When the intent was staged.
    pub created_at: DateTime<Utc>,
}

/// On-disk shape of an intent.
///
/// Records written before versioning carry no `schemaVersion` and decode as
/// version 0.
#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct IntentRecord {
    incident_id: String,
    timestamp: i64,
    #[serde(default)]
    schema_version: u32,
}

impl PendingIntent {
    /// Create an intent staged at `created_at`.
    #[must_use]
    pub fn new(target_id: impl Into<String>, created_at: DateTime<Utc>) -> Self {
        Self {
            target_id: target_id.into(),
            created_at,
        }
    }

    /// How long ago the intent was staged. Never negative.
    #[must_use]
    pub fn age(&self, now: DateTime<Utc>) -> Duration {
        (now - self.created_at).max(Duration::zero())
    }

    /// Whether the intent may still trigger navigation.
    #[must_use]
    pub fn is_fresh(&self, now: DateTime<Utc>, window: Duration) -> bool {
        self.age(now) <= window
    }

    /// Serialize to the persisted JSON record.
    ///
    /// # Errors
    ///
    /// Returns an error if JSON serialization fails.
    pub fn encode(&self) -> Result<String> {
        let record = IntentRecord {
            incident_id: self.target_id.clone(),
            timestamp: self.created_at.timestamp_millis(),
            schema_version: INTENT_SCHEMA_VERSION,
        };
        Ok(serde_json::to_string(&record)?)
    }

    /// Parse a persisted JSON record read from `slot`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::CorruptIntent`] when the record cannot be decoded and
    /// [`Error::UnsupportedSchema`] when it was written by a newer schema.
    pub fn decode(slot: Slot, raw: &str) -> Result<Self> {
        let record: IntentRecord =
            serde_json::from_str(raw).map_err(|e| Error::corrupt_intent(slot, e.to_string()))?;

        if record.schema_version > INTENT_SCHEMA_VERSION {
            return Err(Error::UnsupportedSchema {
                slot,
                version: record.schema_version,
            });
        }

        if record.incident_id.trim().is_empty() {
            return Err(Error::corrupt_intent(slot, "empty incidentId"));
        }

        let created_at = DateTime::from_timestamp_millis(record.timestamp).ok_or_else(|| {
            Error::corrupt_intent(slot, format!("timestamp out of range: {}", record.timestamp))
        })?;

        Ok(Self {
            target_id: record.incident_id,
            created_at,
        })
    }
}

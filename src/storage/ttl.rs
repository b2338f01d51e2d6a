//! Time-to-live settings and expiration timestamps

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

use super::errors::{StorageError, StorageResult};
use super::models::PartitionKind;

/// Largest TTL accepted, in seconds. Beyond this the millisecond count no
/// longer fits a `chrono::Duration`.
const MAX_TTL_SECONDS: f64 = (i64::MAX / 1000) as f64;

/// TTL settings as supplied by configuration, in seconds per partition.
///
/// Values may be fractional (`1.5` is one and a half seconds).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TtlSettings {
    /// TTL of user data
    #[serde(default, alias = "userData")]
    pub user_data: Option<f64>,
    /// TTL of conversation data
    #[serde(default, alias = "conversationData")]
    pub conversation_data: Option<f64>,
    /// TTL of private conversation data
    #[serde(default, alias = "privateConversationData")]
    pub private_conversation_data: Option<f64>,
}

impl TtlSettings {
    /// Same TTL for every partition
    pub fn uniform(seconds: impl Into<f64>) -> Self {
        let seconds = seconds.into();
        Self {
            user_data: Some(seconds),
            conversation_data: Some(seconds),
            private_conversation_data: Some(seconds),
        }
    }

    fn value(&self, kind: PartitionKind) -> Option<f64> {
        match kind {
            PartitionKind::UserData => self.user_data,
            PartitionKind::ConversationData => self.conversation_data,
            PartitionKind::PrivateConversationData => self.private_conversation_data,
        }
    }
}

/// Duration of a TTL value, or `None` unless it is finite, strictly positive
/// and in range. Sub-millisecond remainders round up.
fn to_duration(seconds: f64) -> Option<Duration> {
    if !seconds.is_finite() || seconds <= 0.0 || seconds > MAX_TTL_SECONDS {
        return None;
    }
    Duration::try_milliseconds((seconds * 1000.0).ceil() as i64)
}

/// Validated TTL configuration. Every duration is strictly positive.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TtlConfig {
    user_data: Duration,
    conversation_data: Duration,
    private_conversation_data: Duration,
}

impl TtlConfig {
    /// TTL of one partition
    pub fn get(&self, kind: PartitionKind) -> Duration {
        match kind {
            PartitionKind::UserData => self.user_data,
            PartitionKind::ConversationData => self.conversation_data,
            PartitionKind::PrivateConversationData => self.private_conversation_data,
        }
    }
}

impl TryFrom<TtlSettings> for TtlConfig {
    type Error = StorageError;

    fn try_from(settings: TtlSettings) -> StorageResult<Self> {
        let duration = |kind: PartitionKind| -> StorageResult<Duration> {
            let value = settings.value(kind);
            value
                .and_then(to_duration)
                .ok_or(StorageError::InvalidTtl {
                    partition: kind,
                    value,
                })
        };

        Ok(Self {
            user_data: duration(PartitionKind::UserData)?,
            conversation_data: duration(PartitionKind::ConversationData)?,
            private_conversation_data: duration(PartitionKind::PrivateConversationData)?,
        })
    }
}

/// Computes when a partition write expires
pub struct ExpirationPolicy;

impl ExpirationPolicy {
    /// True only if all three partitions carry a finite, strictly positive value
    pub fn validate(settings: &TtlSettings) -> bool {
        PartitionKind::ALL
            .into_iter()
            .all(|kind| settings.value(kind).and_then(to_duration).is_some())
    }

    /// `now + ttl[kind]`, or `None` when TTL is disabled
    pub fn expire_at(
        kind: PartitionKind,
        ttl: Option<&TtlConfig>,
        now: DateTime<Utc>,
    ) -> Option<DateTime<Utc>> {
        ttl.map(|ttl| {
            now.checked_add_signed(ttl.get(kind))
                .unwrap_or(DateTime::<Utc>::MAX_UTC)
        })
    }
}

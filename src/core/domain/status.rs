//! Reconciliation status attached to encrypted records.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Outcome class of the most recent reconciliation.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum StatusState {
    #[default]
    Unknown,
    Ready,
    Error,
}

impl std::fmt::Display for StatusState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::Unknown => "Unknown",
            Self::Ready => "Ready",
            Self::Error => "Error",
        };
        f.write_str(s)
    }
}

/// Status of an encrypted record.
///
/// `Ready` iff the last pass produced a consistent derived secret; `Error`
/// iff decryption or the write failed, with the failing stage in `message`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReconciliationStatus {
    pub status: StatusState,
    #[serde(default)]
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_transition_time: Option<DateTime<Utc>>,
}

impl ReconciliationStatus {
    pub fn ready(message: impl Into<String>) -> Self {
        Self::at(StatusState::Ready, message)
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self::at(StatusState::Error, message)
    }

    fn at(status: StatusState, message: impl Into<String>) -> Self {
        Self {
            status,
            message: message.into(),
            last_transition_time: Some(Utc::now()),
        }
    }

    /// Carry the previous transition time forward when the state is unchanged.
    pub fn after(mut self, previous: Option<&ReconciliationStatus>) -> Self {
        if let Some(prev) = previous {
            if prev.status == self.status && prev.last_transition_time.is_some() {
                self.last_transition_time = prev.last_transition_time;
            }
        }
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_is_unknown() {
        assert_eq!(ReconciliationStatus::default().status, StatusState::Unknown);
    }

    #[test]
    fn test_transition_time_kept_for_same_state() {
        let first = ReconciliationStatus::ready("ok");
        let second = ReconciliationStatus::ready("ok again").after(Some(&first));
        assert_eq!(second.last_transition_time, first.last_transition_time);
        assert_eq!(second.message, "ok again");
    }

    #[test]
    fn test_transition_time_moves_on_state_change() {
        let mut first = ReconciliationStatus::ready("ok");
        first.last_transition_time = DateTime::from_timestamp(0, 0);
        let second = ReconciliationStatus::error("boom").after(Some(&first));
        assert_ne!(second.last_transition_time, first.last_transition_time);
    }

    #[test]
    fn test_serializes_state_name() {
        let json = serde_json::to_string(&ReconciliationStatus::error("x")).unwrap();
        assert!(json.contains(r#""status":"Error""#));
    }
}

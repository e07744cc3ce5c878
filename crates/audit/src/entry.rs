use core::convert::Infallible;
use core::str::FromStr;

use chrono::{DateTime, NaiveDateTime, SecondsFormat, SubsecRound, Utc};
use serde::{Deserialize, Serialize};

use comptrack_core::{DomainError, DomainResult, Sku, ValueObject};

/// SKU column value for events not tied to a component.
pub const NOT_APPLICABLE: &str = "N/A";

/// What happened. Known session/inventory events plus free text.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(into = "String", from = "String")]
pub enum AuditAction {
    LoginSucceeded,
    LoginFailed,
    ItemAdded,
    ItemRemoved,
    QuantityUpdated,
    Other(String),
}

impl AuditAction {
    pub fn as_str(&self) -> &str {
        match self {
            AuditAction::LoginSucceeded => "Login Success",
            AuditAction::LoginFailed => "Login Failed",
            AuditAction::ItemAdded => "Item added",
            AuditAction::ItemRemoved => "Item removed",
            AuditAction::QuantityUpdated => "Quantity updated",
            AuditAction::Other(text) => text,
        }
    }
}

impl core::fmt::Display for AuditAction {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for AuditAction {
    type Err = Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(match s {
            "Login Success" => AuditAction::LoginSucceeded,
            "Login Failed" => AuditAction::LoginFailed,
            "Item added" => AuditAction::ItemAdded,
            "Item removed" => AuditAction::ItemRemoved,
            "Quantity updated" => AuditAction::QuantityUpdated,
            other => AuditAction::Other(other.to_string()),
        })
    }
}

impl From<String> for AuditAction {
    fn from(value: String) -> Self {
        match value.parse() {
            Ok(action) => action,
            Err(never) => match never {},
        }
    }
}

impl From<&str> for AuditAction {
    fn from(value: &str) -> Self {
        AuditAction::from(value.to_string())
    }
}

impl From<AuditAction> for String {
    fn from(value: AuditAction) -> Self {
        match value {
            AuditAction::Other(text) => text,
            known => known.as_str().to_string(),
        }
    }
}

/// One row of the audit trail.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuditEntry {
    pub timestamp: DateTime<Utc>,
    pub action: AuditAction,
    /// `None` is written as [`NOT_APPLICABLE`].
    pub sku: Option<String>,
}

impl ValueObject for AuditEntry {}

impl AuditEntry {
    /// `timestamp` is truncated to the microsecond precision that is stored.
    pub fn new(
        timestamp: DateTime<Utc>,
        action: impl Into<AuditAction>,
        sku: Option<&Sku>,
    ) -> Self {
        Self {
            timestamp: timestamp.trunc_subsecs(6),
            action: action.into(),
            sku: sku.map(|s| s.to_string()),
        }
    }

    /// Decode the three text columns of a stored row.
    pub fn from_columns(timestamp: &str, action: &str, sku: &str) -> DomainResult<Self> {
        Ok(Self {
            timestamp: parse_timestamp(timestamp)?,
            action: AuditAction::from(action),
            sku: (sku != NOT_APPLICABLE).then(|| sku.to_string()),
        })
    }

    /// Timestamp, action, SKU in file order.
    pub fn to_record(&self) -> [String; 3] {
        [
            self.timestamp.to_rfc3339_opts(SecondsFormat::Micros, true),
            self.action.to_string(),
            self.sku_text().to_string(),
        ]
    }

    pub fn sku_text(&self) -> &str {
        self.sku.as_deref().unwrap_or(NOT_APPLICABLE)
    }
}

/// RFC 3339, or the legacy `YYYY-MM-DD HH:MM:SS[.ffffff]` form read as UTC.
fn parse_timestamp(text: &str) -> DomainResult<DateTime<Utc>> {
    if let Ok(ts) = DateTime::parse_from_rfc3339(text) {
        return Ok(ts.with_timezone(&Utc));
    }
    NaiveDateTime::parse_from_str(text, "%Y-%m-%d %H:%M:%S%.f")
        .map(|naive| naive.and_utc())
        .map_err(|e| DomainError::validation(format!("timestamp '{text}': {e}")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn action_text_round_trips() {
        for action in [
            AuditAction::LoginSucceeded,
            AuditAction::LoginFailed,
            AuditAction::ItemAdded,
            AuditAction::ItemRemoved,
            AuditAction::QuantityUpdated,
            AuditAction::Other("Stock take".to_string()),
        ] {
            assert_eq!(AuditAction::from(action.to_string()), action);
        }
    }

    #[test]
    fn record_uses_sentinel_for_missing_sku() {
        let ts = Utc.with_ymd_and_hms(2024, 3, 1, 9, 30, 0).unwrap();
        let entry = AuditEntry::new(ts, AuditAction::LoginFailed, None);
        assert_eq!(
            entry.to_record(),
            ["2024-03-01T09:30:00.000000Z", "Login Failed", "N/A"].map(String::from)
        );

        let back =
            AuditEntry::from_columns("2024-03-01T09:30:00.000000Z", "Login Failed", "N/A").unwrap();
        assert_eq!(back, entry);
    }

    #[test]
    fn timestamps_survive_the_text_form() {
        let ts = Utc.with_ymd_and_hms(2024, 3, 1, 9, 30, 0).unwrap()
            + chrono::Duration::nanoseconds(123_456_789);
        let entry = AuditEntry::new(ts, AuditAction::ItemAdded, None);
        let [t, a, s] = entry.to_record();
        assert_eq!(AuditEntry::from_columns(&t, &a, &s).unwrap(), entry);
    }

    #[test]
    fn legacy_timestamps_are_accepted() {
        let entry =
            AuditEntry::from_columns("2024-03-01 09:30:00.123456", "Item added", "100").unwrap();
        assert_eq!(entry.sku.as_deref(), Some("100"));
        assert_eq!(entry.action, AuditAction::ItemAdded);
        assert_eq!(
            entry.timestamp,
            Utc.with_ymd_and_hms(2024, 3, 1, 9, 30, 0).unwrap()
                + chrono::Duration::microseconds(123_456)
        );

        assert!(AuditEntry::from_columns("2024-03-01 09:30:00", "x", "N/A").is_ok());
        assert!(AuditEntry::from_columns("yesterday", "x", "N/A").is_err());
    }
}

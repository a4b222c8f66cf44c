use std::fmt::Display;

use serde::{Deserialize, Serialize};

/// Stripe subscription lifecycle status as reported by the billing API.
///
/// Statuses this build does not know yet are kept verbatim in `Unknown` so the
/// cached record still says what Stripe said.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(from = "String", into = "String")]
pub enum SubscriptionStatus {
    Incomplete,
    IncompleteExpired,
    Trialing,
    Active,
    PastDue,
    Canceled,
    Unpaid,
    Paused,
    Unknown(String),
}

impl Display for SubscriptionStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let status = match self {
            SubscriptionStatus::Incomplete => "incomplete",
            SubscriptionStatus::IncompleteExpired => "incomplete_expired",
            SubscriptionStatus::Trialing => "trialing",
            SubscriptionStatus::Active => "active",
            SubscriptionStatus::PastDue => "past_due",
            SubscriptionStatus::Canceled => "canceled",
            SubscriptionStatus::Unpaid => "unpaid",
            SubscriptionStatus::Paused => "paused",
            SubscriptionStatus::Unknown(raw) => raw,
        };
        write!(f, "{}", status)
    }
}

impl From<String> for SubscriptionStatus {
    fn from(value: String) -> Self {
        match SubscriptionStatus::from_str(&value) {
            SubscriptionStatus::Unknown(_) => SubscriptionStatus::Unknown(value),
            known => known,
        }
    }
}

impl From<SubscriptionStatus> for String {
    fn from(status: SubscriptionStatus) -> Self {
        match status {
            SubscriptionStatus::Unknown(raw) => raw,
            known => known.to_string(),
        }
    }
}

impl SubscriptionStatus {
    pub fn from_str(value: &str) -> Self {
        match value {
            "incomplete" => SubscriptionStatus::Incomplete,
            "incomplete_expired" => SubscriptionStatus::IncompleteExpired,
            "trialing" => SubscriptionStatus::Trialing,
            "active" => SubscriptionStatus::Active,
            "past_due" => SubscriptionStatus::PastDue,
            "canceled" => SubscriptionStatus::Canceled,
            "unpaid" => SubscriptionStatus::Unpaid,
            "paused" => SubscriptionStatus::Paused,
            other => SubscriptionStatus::Unknown(other.to_string()),
        }
    }

    /// Only `active` and `trialing` subscriptions can unlock the product.
    pub fn is_entitled(&self) -> bool {
        matches!(
            self,
            SubscriptionStatus::Active | SubscriptionStatus::Trialing
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unknown_status_strings_are_kept_verbatim() {
        let status: SubscriptionStatus = serde_json::from_str("\"something_new\"").unwrap();
        assert_eq!(status, SubscriptionStatus::Unknown("something_new".to_string()));
        assert!(!status.is_entitled());

        assert_eq!(status.to_string(), "something_new");
        assert_eq!(serde_json::to_string(&status).unwrap(), "\"something_new\"");
    }

    #[test]
    fn display_matches_wire_format() {
        for raw in ["incomplete_expired", "trialing", "active", "past_due", "canceled"] {
            let status = SubscriptionStatus::from_str(raw);
            assert!(!matches!(status, SubscriptionStatus::Unknown(_)));
            assert_eq!(status.to_string(), raw);
            assert_eq!(serde_json::to_string(&status).unwrap(), format!("\"{raw}\""));
        }
    }

    #[test]
    fn non_string_statuses_are_rejected() {
        assert!(serde_json::from_str::<SubscriptionStatus>("42").is_err());
    }
}

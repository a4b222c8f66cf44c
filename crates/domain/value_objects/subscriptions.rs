use chrono::{DateTime, TimeZone, Utc};
use serde::{Deserialize, Serialize};

use crate::domain::value_objects::enums::subscription_statuses::SubscriptionStatus;

/// Cached projection of one Stripe subscription, keyed by customer id.
///
/// Never authored locally: every value is derived from a subscription object
/// fetched from Stripe, and staleness is resolved by fetching again.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct SubscriptionState {
    pub status: SubscriptionStatus,
    #[serde(default, with = "iso_timestamp")]
    pub current_period_end: Option<DateTime<Utc>>,
    #[serde(default, with = "iso_timestamp")]
    pub trial_end: Option<DateTime<Utc>>,
}

impl SubscriptionState {
    /// Builds a state from Stripe's unix-second fields. Zero or negative
    /// timestamps are treated as unset.
    pub fn from_unix(
        status: SubscriptionStatus,
        current_period_end: Option<i64>,
        trial_end: Option<i64>,
    ) -> Self {
        Self {
            status,
            current_period_end: current_period_end.and_then(unix_to_datetime),
            trial_end: trial_end.and_then(unix_to_datetime),
        }
    }

    pub fn grants_access_at(&self, now: DateTime<Utc>) -> bool {
        let within_period = self.current_period_end.is_some_and(|end| end > now);
        let within_trial = self.trial_end.is_some_and(|end| end > now);

        self.status.is_entitled() && (within_period || within_trial)
    }
}

/// Access decision for an optional cached state. A missing state never grants access.
pub fn evaluate_access(state: Option<&SubscriptionState>, now: DateTime<Utc>) -> bool {
    state.is_some_and(|state| state.grants_access_at(now))
}

pub fn unix_to_datetime(ts: i64) -> Option<DateTime<Utc>> {
    if ts <= 0 {
        return None;
    }
    Utc.timestamp_opt(ts, 0).single()
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct AccessResponse {
    pub has_access: bool,
    pub status: Option<SubscriptionStatus>,
    #[serde(default, with = "iso_timestamp")]
    pub current_period_end: Option<DateTime<Utc>>,
    #[serde(default, with = "iso_timestamp")]
    pub trial_end: Option<DateTime<Utc>>,
}

impl AccessResponse {
    pub fn denied() -> Self {
        Self {
            has_access: false,
            status: None,
            current_period_end: None,
            trial_end: None,
        }
    }

    pub fn evaluate(state: &SubscriptionState, now: DateTime<Utc>) -> Self {
        Self {
            has_access: state.grants_access_at(now),
            status: Some(state.status.clone()),
            current_period_end: state.current_period_end,
            trial_end: state.trial_end,
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct CreateCheckoutRequest {
    pub plan: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct CreateCheckoutResponse {
    pub url: String,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct LinkSessionRequest {
    pub session_id: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LinkSessionResponse {
    pub ok: bool,
    pub customer_id: String,
    pub sub: Option<SubscriptionState>,
}

#[derive(Debug, Serialize)]
pub struct WebhookReceivedResponse {
    pub received: bool,
}

#[derive(Debug, Serialize)]
pub struct WebhookNotConfiguredResponse {
    pub ok: bool,
    pub note: &'static str,
}

/// RFC 3339 with millisecond precision and a `Z` suffix, the format the
/// frontend already parses.
mod iso_timestamp {
    use chrono::{DateTime, SecondsFormat, Utc};
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S>(value: &Option<DateTime<Utc>>, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        match value {
            Some(ts) => serializer.serialize_str(&ts.to_rfc3339_opts(SecondsFormat::Millis, true)),
            None => serializer.serialize_none(),
        }
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Option<DateTime<Utc>>, D::Error>
    where
        D: Deserializer<'de>,
    {
        Option::<DateTime<Utc>>::deserialize(deserializer)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;
    use proptest::prelude::*;

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 10, 17, 12, 0, 0).unwrap()
    }

    fn state(
        status: SubscriptionStatus,
        period_end: Option<DateTime<Utc>>,
        trial_end: Option<DateTime<Utc>>,
    ) -> SubscriptionState {
        SubscriptionState {
            status,
            current_period_end: period_end,
            trial_end,
        }
    }

    #[test]
    fn serializes_with_js_style_timestamps() {
        let value = state(
            SubscriptionStatus::Active,
            Some(Utc.with_ymd_and_hms(2026, 11, 17, 0, 0, 0).unwrap()),
            None,
        );

        let json = serde_json::to_value(&value).unwrap();
        assert_eq!(
            json,
            serde_json::json!({
                "status": "active",
                "currentPeriodEnd": "2026-11-17T00:00:00.000Z",
                "trialEnd": null
            })
        );

        let back: SubscriptionState = serde_json::from_value(json).unwrap();
        assert_eq!(back, value);
    }

    #[test]
    fn missing_timestamp_keys_deserialize_as_none() {
        let value: SubscriptionState =
            serde_json::from_str(r#"{"status":"trialing"}"#).unwrap();
        assert_eq!(value.current_period_end, None);
        assert_eq!(value.trial_end, None);
    }

    #[test]
    fn zero_unix_timestamps_are_unset() {
        let value = SubscriptionState::from_unix(SubscriptionStatus::Active, Some(0), None);
        assert_eq!(value.current_period_end, None);
    }

    #[test]
    fn trial_alone_grants_access_while_running() {
        let value = state(
            SubscriptionStatus::Trialing,
            None,
            Some(now() + Duration::days(3)),
        );
        assert!(value.grants_access_at(now()));
        assert!(!value.grants_access_at(now() + Duration::days(4)));
    }

    #[test]
    fn period_end_equal_to_now_is_expired() {
        let value = state(SubscriptionStatus::Active, Some(now()), None);
        assert!(!value.grants_access_at(now()));
    }

    #[test]
    fn denied_response_serializes_nulls() {
        let json = serde_json::to_value(AccessResponse::denied()).unwrap();
        assert_eq!(
            json,
            serde_json::json!({
                "hasAccess": false,
                "status": null,
                "currentPeriodEnd": null,
                "trialEnd": null
            })
        );
    }

    fn any_status() -> impl Strategy<Value = SubscriptionStatus> {
        prop_oneof![
            Just(SubscriptionStatus::Incomplete),
            Just(SubscriptionStatus::IncompleteExpired),
            Just(SubscriptionStatus::Trialing),
            Just(SubscriptionStatus::Active),
            Just(SubscriptionStatus::PastDue),
            Just(SubscriptionStatus::Canceled),
            Just(SubscriptionStatus::Unpaid),
            Just(SubscriptionStatus::Paused),
            Just(SubscriptionStatus::Unknown("suspended".to_string())),
        ]
    }

    fn non_entitled_status() -> impl Strategy<Value = SubscriptionStatus> {
        any_status().prop_filter("entitled", |status| !status.is_entitled())
    }

    fn entitled_status() -> impl Strategy<Value = SubscriptionStatus> {
        prop_oneof![
            Just(SubscriptionStatus::Active),
            Just(SubscriptionStatus::Trialing)
        ]
    }

    fn offset() -> impl Strategy<Value = Option<i64>> {
        proptest::option::of(-400_000_000i64..400_000_000i64)
    }

    fn shifted(offset: Option<i64>) -> Option<DateTime<Utc>> {
        offset.map(|secs| now() + Duration::seconds(secs))
    }

    proptest! {
        #[test]
        fn non_entitled_status_never_grants_access(
            status in non_entitled_status(),
            period in offset(),
            trial in offset(),
        ) {
            let value = state(status, shifted(period), shifted(trial));
            prop_assert!(!evaluate_access(Some(&value), now()));
        }

        #[test]
        fn entitled_status_without_timestamps_is_denied(status in entitled_status()) {
            let value = state(status, None, None);
            prop_assert!(!evaluate_access(Some(&value), now()));
        }

        #[test]
        fn active_with_future_period_ignores_trial(
            period in 1i64..400_000_000i64,
            trial in offset(),
        ) {
            let value = state(SubscriptionStatus::Active, shifted(Some(period)), shifted(trial));
            prop_assert!(evaluate_access(Some(&value), now()));
        }

        #[test]
        fn absent_state_is_always_denied(secs in -4_000_000_000i64..4_000_000_000i64) {
            prop_assert!(!evaluate_access(None, now() + Duration::seconds(secs)));
        }

        #[test]
        fn decision_is_deterministic(
            status in any_status(),
            period in offset(),
            trial in offset(),
        ) {
            let value = state(status, shifted(period), shifted(trial));
            prop_assert_eq!(
                evaluate_access(Some(&value), now()),
                evaluate_access(Some(&value), now())
            );
        }
    }
}

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::domain::value_objects::{
    enums::subscription_statuses::SubscriptionStatus, subscriptions::SubscriptionState,
};

/// A Stripe reference that is either a bare id or an expanded object.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(untagged)]
pub enum Expandable {
    Id(String),
    Object { id: String },
}

impl Expandable {
    pub fn id(&self) -> &str {
        match self {
            Expandable::Id(id) => id,
            Expandable::Object { id } => id,
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct StripeList<T> {
    pub data: Vec<T>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct StripeEvent {
    pub id: Option<String>,
    #[serde(rename = "type")]
    pub type_: String,
    pub created: Option<i64>,
    pub livemode: Option<bool>,
    pub data: StripeEventData,
}

#[derive(Debug, Clone, Deserialize)]
pub struct StripeEventData {
    pub object: serde_json::Value,
}

#[derive(Debug, Clone, Default, Deserialize, PartialEq)]
pub struct StripeCheckoutSession {
    pub id: Option<String>,
    pub url: Option<String>,
    pub mode: Option<String>,
    pub status: Option<String>,
    pub customer: Option<Expandable>,
    pub subscription: Option<Expandable>,
    pub metadata: Option<HashMap<String, String>>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct StripeErrorEnvelope {
    pub(crate) error: StripeErrorDetails,
}

#[derive(Debug, Deserialize)]
pub(crate) struct StripeErrorDetails {
    #[serde(rename = "type")]
    pub(crate) type_: Option<String>,
    pub(crate) code: Option<String>,
    pub(crate) message: Option<String>,
    pub(crate) param: Option<String>,
}

#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct StripeSubscription {
    pub id: Option<String>,
    pub customer: Option<Expandable>,
    pub status: SubscriptionStatus,
    pub current_period_end: Option<i64>,
    pub trial_end: Option<i64>,
    #[serde(default)]
    pub items: StripeSubscriptionItems,
}

#[derive(Debug, Clone, Deserialize, Default, PartialEq)]
pub struct StripeSubscriptionItems {
    pub data: Vec<StripeSubscriptionItem>,
}

#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct StripeSubscriptionItem {
    pub current_period_end: Option<i64>,
}

impl StripeSubscription {
    /// Returns the subscription period end timestamp, falling back to the first item when needed.
    pub fn period_end(&self) -> Option<i64> {
        self.current_period_end.or_else(|| {
            self.items
                .data
                .first()
                .and_then(|item| item.current_period_end)
        })
    }

    pub fn customer_id(&self) -> Option<&str> {
        self.customer
            .as_ref()
            .map(Expandable::id)
            .filter(|id| !id.is_empty())
    }

    /// The one place a Stripe subscription becomes a cache record.
    pub fn to_state(&self) -> SubscriptionState {
        SubscriptionState::from_unix(self.status.clone(), self.period_end(), self.trial_end)
    }
}

#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct StripeProduct {
    pub id: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub active: bool,
    #[serde(default)]
    pub metadata: HashMap<String, String>,
}

#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct StripePrice {
    pub id: String,
    pub lookup_key: Option<String>,
    #[serde(default)]
    pub currency: String,
    pub unit_amount: Option<i64>,
    pub recurring: Option<StripeRecurring>,
}

#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct StripeRecurring {
    pub interval: String,
}

/// Parameters for `POST /v1/prices`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewPrice {
    pub product_id: String,
    pub currency: &'static str,
    pub unit_amount: i64,
    pub interval: &'static str,
    pub lookup_key: &'static str,
    pub nickname: &'static str,
}

/// Parameters for `POST /v1/checkout/sessions`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewCheckoutSession {
    pub mode: &'static str,
    pub price_id: String,
    pub success_url: String,
    pub cancel_url: String,
    pub allow_promotion_codes: bool,
    pub trial_period_days: Option<u32>,
}

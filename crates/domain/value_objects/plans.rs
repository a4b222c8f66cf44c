use std::fmt::Display;

use serde::{Deserialize, Serialize};

pub const CURRENCY: &str = "usd";
pub const PRICE_INTERVAL: &str = "month";
pub const PRODUCT_NAME: &str = "NovaMark AI";
pub const PRODUCT_SLUG: &str = "novamark_ai";

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum PlanId {
    Starter,
    Pro,
    Premium,
}

/// Static pricing row used to provision Stripe prices and to build checkout sessions.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlanSpec {
    pub id: PlanId,
    pub amount_minor: i64,
    pub lookup_key: &'static str,
    pub nickname: &'static str,
    pub trial_period_days: Option<u32>,
}

pub const PLAN_CATALOG: [PlanSpec; 3] = [
    PlanSpec {
        id: PlanId::Starter,
        amount_minor: 1399,
        lookup_key: "novamark_starter_monthly_usd_1399",
        nickname: "Starter Monthly",
        trial_period_days: None,
    },
    PlanSpec {
        id: PlanId::Pro,
        amount_minor: 2899,
        lookup_key: "novamark_pro_monthly_usd_2899",
        nickname: "Pro Monthly",
        trial_period_days: Some(7),
    },
    PlanSpec {
        id: PlanId::Premium,
        amount_minor: 8799,
        lookup_key: "novamark_premium_monthly_usd_8799",
        nickname: "Premium Monthly",
        trial_period_days: None,
    },
];

impl Display for PlanId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let plan = match self {
            PlanId::Starter => "starter",
            PlanId::Pro => "pro",
            PlanId::Premium => "premium",
        };
        write!(f, "{}", plan)
    }
}

impl PlanId {
    pub fn from_str(value: &str) -> Option<Self> {
        match value {
            "starter" => Some(PlanId::Starter),
            "pro" => Some(PlanId::Pro),
            "premium" => Some(PlanId::Premium),
            _ => None,
        }
    }

    pub fn spec(self) -> &'static PlanSpec {
        match self {
            PlanId::Starter => &PLAN_CATALOG[0],
            PlanId::Pro => &PLAN_CATALOG[1],
            PlanId::Premium => &PLAN_CATALOG[2],
        }
    }
}

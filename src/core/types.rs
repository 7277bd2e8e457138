use serde::{Serialize, Serializer};

pub const DEFAULT_LIFETIME_YEARS: u32 = 25;
pub const DEFAULT_INFLATION_RATE: f64 = 0.022;
pub const DEFAULT_DISCOUNT_RATE: f64 = 0.04;
pub const DEFAULT_EFFICIENCY_DRIFT: f64 = 0.005;
pub const MAX_LIFETIME_YEARS: u32 = 100;

pub const PAYBACK_NOT_ACHIEVED: &str = "Not achieved";

/// Financial and technical inputs for one plant. Rates are fractions
/// (0.04 = 4%), money is in a single unspecified currency.
#[derive(Debug, Clone, PartialEq)]
pub struct RoiInputs {
    pub capex: f64,
    pub opex: f64,
    /// Year-one energy output, before any degradation.
    pub generation: f64,
    pub tariff: f64,
    pub lifetime: u32,
    pub inflation_rate: f64,
    pub discount_rate: f64,
    pub efficiency_drift: f64,
    pub one_time_incentive: f64,
    pub feed_in_tariff_bonus: f64,
}

impl RoiInputs {
    pub fn with_defaults(capex: f64, opex: f64, generation: f64, tariff: f64) -> Self {
        Self {
            capex,
            opex,
            generation,
            tariff,
            lifetime: DEFAULT_LIFETIME_YEARS,
            inflation_rate: DEFAULT_INFLATION_RATE,
            discount_rate: DEFAULT_DISCOUNT_RATE,
            efficiency_drift: DEFAULT_EFFICIENCY_DRIFT,
            one_time_incentive: 0.0,
            feed_in_tariff_bonus: 0.0,
        }
    }
}

#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum PaybackPeriod {
    Year(u32),
    NotAchieved,
}

impl PaybackPeriod {
    pub fn year(self) -> Option<u32> {
        match self {
            PaybackPeriod::Year(year) => Some(year),
            PaybackPeriod::NotAchieved => None,
        }
    }
}

impl From<Option<u32>> for PaybackPeriod {
    fn from(value: Option<u32>) -> Self {
        value.map_or(PaybackPeriod::NotAchieved, PaybackPeriod::Year)
    }
}

impl Serialize for PaybackPeriod {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            PaybackPeriod::Year(year) => serializer.serialize_u32(*year),
            PaybackPeriod::NotAchieved => serializer.serialize_str(PAYBACK_NOT_ACHIEVED),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ProjectionResult {
    pub capex: f64,
    pub opex: f64,
    pub lifetime: u32,
    pub inflation_rate: f64,
    pub discount_rate: f64,
    pub efficiency_drift: f64,
    pub annual_savings: Vec<f64>,
    pub utility_costs: Vec<f64>,
    pub cumulative_savings: Vec<f64>,
    pub payback_period_years: PaybackPeriod,
    pub roi_percent: f64,
    pub total_profit: f64,
    pub present_value_profit: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FlatRoiResult {
    pub annual_profit: f64,
    pub payback_period_years: f64,
    pub roi_percent: f64,
    pub total_profit: f64,
}

use super::error::RoiError;
use super::types::{FlatRoiResult, MAX_LIFETIME_YEARS, PaybackPeriod, ProjectionResult, RoiInputs};

/// Year-by-year projection: panel output decays by `efficiency_drift`, the
/// avoided utility cost inflates, and payback is the first year whose running
/// profit covers `capex - one_time_incentive`.
pub fn run_projection(inputs: &RoiInputs) -> Result<ProjectionResult, RoiError> {
    validate_inputs(inputs)?;

    let years = inputs.lifetime as usize;
    let mut annual_savings = Vec::with_capacity(years);
    let mut utility_costs = Vec::with_capacity(years);
    let mut cumulative_savings = Vec::with_capacity(years);

    let effective_tariff = inputs.tariff + inputs.feed_in_tariff_bonus;
    let payback_threshold = inputs.capex - inputs.one_time_incentive;
    let mut cumulative = 0.0;
    let mut present_value = 0.0;
    let mut payback_year: Option<u32> = None;

    for year in 1..=inputs.lifetime {
        let elapsed = (year - 1) as i32;
        let degraded_generation =
            inputs.generation * (1.0 - inputs.efficiency_drift).powi(elapsed);
        let annual_revenue = degraded_generation * effective_tariff;
        let annual_profit = annual_revenue - inputs.opex;
        let inflated_utility_cost =
            inputs.tariff * degraded_generation * (1.0 + inputs.inflation_rate).powi(elapsed);

        present_value += annual_profit / (1.0 + inputs.discount_rate).powi(year as i32);
        cumulative += annual_profit;

        annual_savings.push(round2(annual_profit));
        utility_costs.push(round2(inflated_utility_cost));
        cumulative_savings.push(round2(cumulative));

        if payback_year.is_none() && cumulative >= payback_threshold {
            payback_year = Some(year);
        }
    }

    let net_profit = cumulative - inputs.capex + inputs.one_time_incentive;
    let roi_percent = net_profit / inputs.capex * 100.0;

    for (label, series) in [
        ("annual_savings", &annual_savings),
        ("utility_costs", &utility_costs),
        ("cumulative_savings", &cumulative_savings),
    ] {
        if let Some(value) = series.iter().find(|v| !v.is_finite()) {
            return Err(non_finite(label, *value));
        }
    }

    Ok(ProjectionResult {
        capex: inputs.capex,
        opex: inputs.opex,
        lifetime: inputs.lifetime,
        inflation_rate: inputs.inflation_rate,
        discount_rate: inputs.discount_rate,
        efficiency_drift: inputs.efficiency_drift,
        annual_savings,
        utility_costs,
        cumulative_savings,
        payback_period_years: PaybackPeriod::from(payback_year),
        roi_percent: finite("roi_percent", round2(roi_percent))?,
        total_profit: finite("total_profit", round2(net_profit))?,
        present_value_profit: finite("present_value_profit", round2(present_value))?,
    })
}

/// Single-rate calculation: one year's profit repeated over the lifetime,
/// with a fractional payback period. Rejects plants that never make money.
pub fn run_flat(inputs: &RoiInputs) -> Result<FlatRoiResult, RoiError> {
    validate_base_inputs(inputs)?;

    let annual_profit = inputs.generation * inputs.tariff - inputs.opex;
    if annual_profit <= 0.0 {
        return Err(RoiError::NonPositiveProfit);
    }

    let lifetime_profit = annual_profit * f64::from(inputs.lifetime);
    let payback_period = inputs.capex / annual_profit;
    let roi = (lifetime_profit - inputs.capex) / inputs.capex * 100.0;
    let total_profit = lifetime_profit - inputs.capex;

    Ok(FlatRoiResult {
        annual_profit: finite("annual_profit", round2(annual_profit))?,
        payback_period_years: finite("payback_period_years", round2(payback_period))?,
        roi_percent: finite("roi_percent", round2(roi))?,
        total_profit: finite("total_profit", round2(total_profit))?,
    })
}

/// Drift may be negative (output improving with age) but not above 1, where
/// generation would turn negative.
pub fn validate_inputs(inputs: &RoiInputs) -> Result<(), RoiError> {
    validate_base_inputs(inputs)?;

    for (field, value) in [
        ("inflation_rate", inputs.inflation_rate),
        ("discount_rate", inputs.discount_rate),
        ("efficiency_drift", inputs.efficiency_drift),
        ("one_time_incentive", inputs.one_time_incentive),
        ("feed_in_tariff_bonus", inputs.feed_in_tariff_bonus),
    ] {
        require_finite(field, value)?;
    }

    if inputs.discount_rate == -1.0 {
        return Err(RoiError::invalid("discount_rate", "must not be -1"));
    }
    if inputs.efficiency_drift > 1.0 {
        return Err(RoiError::invalid(
            "efficiency_drift",
            "must be <= 1, larger values make generation negative",
        ));
    }
    if inputs.one_time_incentive < 0.0 {
        return Err(RoiError::invalid("one_time_incentive", "must be >= 0"));
    }
    if inputs.feed_in_tariff_bonus < 0.0 {
        return Err(RoiError::invalid("feed_in_tariff_bonus", "must be >= 0"));
    }
    Ok(())
}

// Fields shared by both calculations.
fn validate_base_inputs(inputs: &RoiInputs) -> Result<(), RoiError> {
    for (field, value) in [
        ("capex", inputs.capex),
        ("opex", inputs.opex),
        ("generation", inputs.generation),
        ("tariff", inputs.tariff),
    ] {
        require_finite(field, value)?;
    }

    if inputs.capex <= 0.0 {
        return Err(RoiError::invalid("capex", "must be > 0"));
    }
    if inputs.opex < 0.0 {
        return Err(RoiError::invalid("opex", "must be >= 0"));
    }
    if inputs.generation <= 0.0 {
        return Err(RoiError::invalid("generation", "must be > 0"));
    }
    if inputs.tariff <= 0.0 {
        return Err(RoiError::invalid("tariff", "must be > 0"));
    }
    if inputs.lifetime == 0 {
        return Err(RoiError::invalid("lifetime", "must be > 0"));
    }
    if inputs.lifetime > MAX_LIFETIME_YEARS {
        return Err(RoiError::invalid(
            "lifetime",
            format!("must be <= {MAX_LIFETIME_YEARS}"),
        ));
    }
    Ok(())
}

fn require_finite(field: &'static str, value: f64) -> Result<(), RoiError> {
    if value.is_finite() {
        Ok(())
    } else {
        Err(RoiError::invalid(field, "must be a finite number"))
    }
}

fn finite(label: &str, value: f64) -> Result<f64, RoiError> {
    if value.is_finite() {
        Ok(value)
    } else {
        Err(non_finite(label, value))
    }
}

fn non_finite(label: &str, value: f64) -> RoiError {
    RoiError::Computation(format!("{label} is not a finite number ({value})"))
}

// Above 2^52 a double has no fractional digits left to round.
const NO_FRACTION_ABOVE: f64 = 4_503_599_627_370_496.0;

/// Two decimal places, exact ties to even.
pub fn round2(value: f64) -> f64 {
    let scaled = value * 100.0;
    if value.abs() >= NO_FRACTION_ABOVE || !scaled.is_finite() {
        return value;
    }
    scaled.round_ties_even() / 100.0
}

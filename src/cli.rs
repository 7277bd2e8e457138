use clap::{Args, Parser, Subcommand};
use serde::Serialize;
use std::net::{IpAddr, Ipv4Addr, SocketAddr};

use crate::core::{
    DEFAULT_DISCOUNT_RATE, DEFAULT_EFFICIENCY_DRIFT, DEFAULT_INFLATION_RATE,
    DEFAULT_LIFETIME_YEARS, RoiError, RoiInputs,
};

pub const DEFAULT_PORT: u16 = 5000;

#[derive(Parser, Debug)]
#[command(
    name = "solar_roi",
    about = "Return on investment and payback period for a solar power plant"
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Serve the HTTP API and landing page
    Serve(ServeArgs),
    /// Year-by-year projection with degradation, inflation and incentives
    Project(PlantArgs),
    /// Single-rate ROI with a fractional payback period
    Flat(PlantArgs),
}

#[derive(Args, Debug, Clone)]
pub struct ServeArgs {
    #[arg(long, default_value_t = IpAddr::V4(Ipv4Addr::UNSPECIFIED))]
    pub host: IpAddr,
    #[arg(long, env = "PORT", default_value_t = DEFAULT_PORT)]
    pub port: u16,
}

impl ServeArgs {
    pub fn socket_addr(&self) -> SocketAddr {
        SocketAddr::new(self.host, self.port)
    }
}

#[derive(Args, Debug, Clone)]
pub struct PlantArgs {
    #[arg(long, help = "Capital expenditure")]
    pub capex: f64,
    #[arg(long, help = "Operating expenses per year")]
    pub opex: f64,
    #[arg(long, help = "Energy generation in year one")]
    pub generation: f64,
    #[arg(long, help = "Tariff per energy unit")]
    pub tariff: f64,
    #[arg(long, default_value_t = DEFAULT_LIFETIME_YEARS, help = "Plant lifetime in years")]
    pub lifetime: u32,
    #[arg(
        long,
        default_value_t = DEFAULT_INFLATION_RATE,
        allow_negative_numbers = true,
        help = "Annual utility price inflation as a fraction, e.g. 0.022"
    )]
    pub inflation_rate: f64,
    #[arg(
        long,
        default_value_t = DEFAULT_DISCOUNT_RATE,
        allow_negative_numbers = true,
        help = "Discount rate as a fraction, e.g. 0.04"
    )]
    pub discount_rate: f64,
    #[arg(
        long,
        default_value_t = DEFAULT_EFFICIENCY_DRIFT,
        allow_negative_numbers = true,
        help = "Annual panel output decline as a fraction, negative for improving output"
    )]
    pub efficiency_drift: f64,
    #[arg(long, default_value_t = 0.0, help = "One-time incentive netted against capex")]
    pub one_time_incentive: f64,
    #[arg(long, default_value_t = 0.0, help = "Extra revenue per exported energy unit")]
    pub feed_in_tariff_bonus: f64,
}

impl From<PlantArgs> for RoiInputs {
    fn from(args: PlantArgs) -> Self {
        RoiInputs {
            capex: args.capex,
            opex: args.opex,
            generation: args.generation,
            tariff: args.tariff,
            lifetime: args.lifetime,
            inflation_rate: args.inflation_rate,
            discount_rate: args.discount_rate,
            efficiency_drift: args.efficiency_drift,
            one_time_incentive: args.one_time_incentive,
            feed_in_tariff_bonus: args.feed_in_tariff_bonus,
        }
    }
}

/// Pretty JSON for a calculation result, matching the HTTP response body.
pub fn render<T: Serialize>(result: Result<T, RoiError>) -> Result<String, RoiError> {
    let value = result?;
    serde_json::to_string_pretty(&value).map_err(|e| RoiError::Computation(e.to_string()))
}

/// Exit code for a failed calculation: 1 for rejected input, 2 otherwise.
pub fn exit_code(err: &RoiError) -> i32 {
    if err.is_validation() { 1 } else { 2 }
}

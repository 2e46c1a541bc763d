//! The seven standard pipeline stages.
//!
//! Each module exports its registry `NAME` and method-name constants; the
//! typed helpers on `System` build cache keys from them.

pub mod account;
pub mod forecast_combine;
pub mod forecast_scale_cap;
pub mod portfolios;
pub mod position_sizing;
pub mod raw_data;
pub mod rules;

pub use account::{pandl_for_instrument_forecast, Account, ForecastPandlParams};
pub use forecast_combine::{EqualWeightEstimator, ForecastCombine, ForecastWeightEstimator};
pub use forecast_scale_cap::ForecastScaleCap;
pub use portfolios::Portfolios;
pub use position_sizing::PositionSizing;
pub use raw_data::RawData;
pub use rules::Rules;

use crate::stage::Stage;

/// Default implementations of every stage, in pipeline order.
pub fn standard_stages() -> Vec<Box<dyn Stage>> {
    vec![
        Box::new(RawData::new()),
        Box::new(Rules),
        Box::new(ForecastScaleCap::new()),
        Box::new(ForecastCombine::new()),
        Box::new(PositionSizing),
        Box::new(Portfolios),
        Box::new(Account::new()),
    ]
}

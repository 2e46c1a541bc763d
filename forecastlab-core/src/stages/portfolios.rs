//! Instrument weighting of subsystem positions.

use crate::cache::CacheKey;
use crate::error::PipelineError;
use crate::stage::{Stage, StageOutput};
use crate::system::System;

pub const NAME: &str = "portfolio";
pub const NOTIONAL_POSITION: &str = "notional_position";

const METHODS: &[&str] = &[NOTIONAL_POSITION];

#[derive(Debug, Clone, Copy, Default)]
pub struct Portfolios;

impl Stage for Portfolios {
    fn name(&self) -> &'static str {
        NAME
    }

    fn methods(&self) -> &'static [&'static str] {
        METHODS
    }

    fn compute(&self, system: &System, key: &CacheKey) -> Result<StageOutput, PipelineError> {
        if key.method != NOTIONAL_POSITION {
            return Err(PipelineError::unknown_method(key));
        }
        let instrument = key.require_instrument()?;
        let config = system.config();
        let factor = config.instrument_weight(instrument) * config.instrument_div_multiplier;
        let position = system.subsystem_position(instrument)?.scale(factor);
        Ok(StageOutput::series(position))
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::config::ConfigBuilder;
    use crate::data_source::InMemoryData;
    use crate::rules::TradingRule;
    use crate::stages::standard_stages;
    use crate::test_support::{assert_approx, wavy_prices};

    #[test]
    fn weight_and_idm_scale_subsystem_position() {
        let config = ConfigBuilder::new()
            .instruments(["SOFR", "ES"])
            .instrument_weight("SOFR", 0.4)
            .instrument_weight("ES", 0.6)
            .instrument_div_multiplier(1.5)
            .rule("ewmac8", TradingRule::ewmac(8, None))
            .build()
            .unwrap();
        let data = InMemoryData::new()
            .with_prices("SOFR", wavy_prices(120))
            .with_prices("ES", wavy_prices(120));
        let sys = System::new(standard_stages(), Arc::new(data), config).unwrap();

        let sub = sys.subsystem_position("SOFR").unwrap();
        let notional = sys.notional_position("SOFR").unwrap();
        for (s, n) in sub.values().iter().zip(notional.values()) {
            if s.is_finite() {
                assert_approx(*n, s * 0.6, 1e-9);
            }
        }
    }

    #[test]
    fn default_weights_split_equally() {
        let config = ConfigBuilder::new()
            .instruments(["SOFR", "ES"])
            .rule("ewmac8", TradingRule::ewmac(8, None))
            .build()
            .unwrap();
        assert_eq!(config.instrument_weight("SOFR"), 0.5);
        assert_eq!(config.instrument_weight("ES"), 0.5);
    }
}

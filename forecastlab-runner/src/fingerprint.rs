//! Content hashes identifying a configuration and the data it ran on.

use forecastlab_core::config::Config;
use forecastlab_core::series::TimeSeries;

fn update_f64(hasher: &mut blake3::Hasher, v: f64) {
    hasher.update(&v.to_le_bytes());
}

fn update_str(hasher: &mut blake3::Hasher, s: &str) {
    // length prefix keeps ("ab","c") distinct from ("a","bc")
    hasher.update(&(s.len() as u64).to_le_bytes());
    hasher.update(s.as_bytes());
}

/// BLAKE3 over every configuration field in a fixed order.
///
/// Maps are `BTreeMap`s, so iteration order is already canonical. Rules are
/// hashed through their description; custom closures hash by name only.
pub fn config_fingerprint(config: &Config) -> String {
    let mut h = blake3::Hasher::new();

    for code in &config.instruments {
        update_str(&mut h, code);
    }
    h.update(b"|weights");
    for (code, w) in &config.instrument_weights {
        update_str(&mut h, code);
        update_f64(&mut h, *w);
    }
    h.update(b"|rules");
    for (name, rule) in &config.trading_rules {
        update_str(&mut h, name);
        update_str(&mut h, &rule.describe());
    }
    h.update(b"|scalars");
    for (rule, s) in &config.forecast_scalars {
        update_str(&mut h, rule);
        update_f64(&mut h, *s);
    }
    h.update(b"|forecast_weights");
    for (rule, w) in &config.forecast_weights {
        update_str(&mut h, rule);
        update_f64(&mut h, *w);
    }
    h.update(b"|instrument_forecast_weights");
    for (code, weights) in &config.instrument_forecast_weights {
        update_str(&mut h, code);
        for (rule, w) in weights {
            update_str(&mut h, rule);
            update_f64(&mut h, *w);
        }
    }
    h.update(b"|system");
    update_f64(&mut h, config.instrument_div_multiplier);
    update_f64(&mut h, config.forecast_div_multiplier);
    update_f64(&mut h, config.forecast_cap);
    update_f64(&mut h, config.percentage_vol_target);
    update_f64(&mut h, config.notional_trading_capital);
    update_str(&mut h, &config.base_currency);
    for date in [config.start_date, config.end_date] {
        update_str(&mut h, &date.map(|d| d.to_string()).unwrap_or_default());
    }
    h.update(&[
        u8::from(config.use_forecast_weight_estimates),
        u8::from(config.use_forecast_scale_estimates),
    ]);

    h.finalize().to_hex().to_string()
}

/// BLAKE3 over the dates and value bits of a series.
pub fn series_hash(series: &TimeSeries) -> String {
    let mut h = blake3::Hasher::new();
    for (date, value) in series.iter() {
        h.update(date.to_string().as_bytes());
        update_f64(&mut h, value);
    }
    h.finalize().to_hex().to_string()
}

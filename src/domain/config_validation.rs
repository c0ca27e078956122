//! Configuration validation.
//!
//! Every check runs against the raw [`ConfigPort`] values, before any data is
//! fetched. Missing optional keys validate against their defaults.

use crate::domain::error::TurtleError;
use crate::domain::position::System;
use crate::domain::timeframe::Timeframe;
use crate::ports::config_port::ConfigPort;
use chrono::NaiveDate;

pub const DATE_FORMAT: &str = "%Y-%m-%d";

pub fn validate_backtest_config(config: &dyn ConfigPort) -> Result<(), TurtleError> {
    validate_symbol(config)?;
    let timeframe = parse_timeframe(config)?;
    validate_dates(config)?;
    validate_initial_balance(config)?;
    validate_commission(config)?;
    validate_leverage(config)?;
    validate_systems(config)?;
    validate_risk_free_rate(config)?;
    validate_warmup(config, timeframe)?;
    validate_data_source(config)?;
    Ok(())
}

pub fn validate_strategy_config(config: &dyn ConfigPort) -> Result<(), TurtleError> {
    validate_fraction(config, "risk_per_trade", 0.01)?;
    validate_positive(config, "stop_multiplier", 2.0)?;
    validate_positive(config, "pyramid_multiplier", 0.5)?;
    validate_max_units(config)?;
    validate_fraction(config, "margin_threshold", 0.8)?;
    validate_fraction(config, "margin_fraction", 0.1)?;
    validate_positive(config, "min_unit_size", 0.001)?;
    Ok(())
}

fn validate_symbol(config: &dyn ConfigPort) -> Result<(), TurtleError> {
    match config.get_string("backtest", "symbol") {
        Some(s) if s.trim().is_empty() => Err(TurtleError::config_invalid(
            "backtest",
            "symbol",
            "symbol must not be empty",
        )),
        _ => Ok(()),
    }
}

pub fn parse_timeframe(config: &dyn ConfigPort) -> Result<Timeframe, TurtleError> {
    match config.get_string("backtest", "timeframe") {
        None => Ok(Timeframe::D1),
        Some(raw) => raw
            .parse()
            .map_err(|reason: String| TurtleError::config_invalid("backtest", "timeframe", reason)),
    }
}

fn validate_dates(config: &dyn ConfigPort) -> Result<(), TurtleError> {
    let start_date = parse_date(config, "start_date")?;
    let end_date = parse_date(config, "end_date")?;

    if start_date >= end_date {
        return Err(TurtleError::config_invalid(
            "backtest",
            "start_date",
            "start_date must be before end_date",
        ));
    }
    Ok(())
}

pub fn parse_date(config: &dyn ConfigPort, field: &str) -> Result<NaiveDate, TurtleError> {
    let raw = config
        .get_string("backtest", field)
        .ok_or_else(|| TurtleError::config_missing("backtest", field))?;
    NaiveDate::parse_from_str(raw.trim(), DATE_FORMAT).map_err(|_| {
        TurtleError::config_invalid(
            "backtest",
            field,
            format!("invalid {field} format, expected YYYY-MM-DD"),
        )
    })
}

fn validate_initial_balance(config: &dyn ConfigPort) -> Result<(), TurtleError> {
    let value = config.get_double("backtest", "initial_balance", 10_000.0);
    if !value.is_finite() || value <= 0.0 {
        return Err(TurtleError::config_invalid(
            "backtest",
            "initial_balance",
            "initial_balance must be positive",
        ));
    }
    Ok(())
}

fn validate_commission(config: &dyn ConfigPort) -> Result<(), TurtleError> {
    let value = config.get_double("backtest", "commission_rate", 0.0004);
    if !(0.0..1.0).contains(&value) {
        return Err(TurtleError::config_invalid(
            "backtest",
            "commission_rate",
            "commission_rate must be in [0, 1)",
        ));
    }
    Ok(())
}

fn validate_leverage(config: &dyn ConfigPort) -> Result<(), TurtleError> {
    let value = config.get_double("backtest", "leverage", 1.0);
    if !value.is_finite() || value <= 0.0 {
        return Err(TurtleError::config_invalid(
            "backtest",
            "leverage",
            "leverage must be positive",
        ));
    }
    Ok(())
}

pub fn parse_systems(config: &dyn ConfigPort) -> Result<Vec<System>, TurtleError> {
    let Some(items) = config.get_list("backtest", "systems") else {
        return Ok(vec![System::One, System::Two]);
    };

    let mut systems = Vec::with_capacity(items.len());
    for item in items {
        let system = item
            .parse::<u8>()
            .map_err(|_| format!("'{item}' is not a system number"))
            .and_then(System::try_from)
            .map_err(|reason| TurtleError::config_invalid("backtest", "systems", reason))?;
        if systems.contains(&system) {
            return Err(TurtleError::config_invalid(
                "backtest",
                "systems",
                format!("system {system} listed twice"),
            ));
        }
        systems.push(system);
    }

    if systems.is_empty() {
        return Err(TurtleError::config_invalid(
            "backtest",
            "systems",
            "at least one system is required",
        ));
    }
    Ok(systems)
}

fn validate_systems(config: &dyn ConfigPort) -> Result<(), TurtleError> {
    parse_systems(config).map(|_| ())
}

fn validate_risk_free_rate(config: &dyn ConfigPort) -> Result<(), TurtleError> {
    let value = config.get_double("backtest", "risk_free_rate", 0.02);
    if !(0.0..1.0).contains(&value) {
        return Err(TurtleError::config_invalid(
            "backtest",
            "risk_free_rate",
            "risk_free_rate must be between 0 and 1",
        ));
    }
    Ok(())
}

fn validate_warmup(config: &dyn ConfigPort, timeframe: Timeframe) -> Result<(), TurtleError> {
    let minimum = timeframe.atr_period() as i64;
    let value = config.get_int("backtest", "warmup_bars", minimum);
    if value < minimum {
        return Err(TurtleError::config_invalid(
            "backtest",
            "warmup_bars",
            format!("warmup_bars must be at least the ATR period ({minimum}) for {timeframe}"),
        ));
    }
    Ok(())
}

fn validate_data_source(config: &dyn ConfigPort) -> Result<(), TurtleError> {
    match config.get_string("data", "source").as_deref().map(str::trim) {
        None | Some("csv") | Some("synthetic") => Ok(()),
        Some(other) => Err(TurtleError::config_invalid(
            "data",
            "source",
            format!("unknown source '{other}', expected csv or synthetic"),
        )),
    }
}

fn validate_fraction(config: &dyn ConfigPort, key: &str, default: f64) -> Result<(), TurtleError> {
    let value = config.get_double("strategy", key, default);
    if !(value > 0.0 && value <= 1.0) {
        return Err(TurtleError::config_invalid(
            "strategy",
            key,
            format!("{key} must be in (0, 1]"),
        ));
    }
    Ok(())
}

fn validate_positive(config: &dyn ConfigPort, key: &str, default: f64) -> Result<(), TurtleError> {
    let value = config.get_double("strategy", key, default);
    if !value.is_finite() || value <= 0.0 {
        return Err(TurtleError::config_invalid(
            "strategy",
            key,
            format!("{key} must be positive"),
        ));
    }
    Ok(())
}

fn validate_max_units(config: &dyn ConfigPort) -> Result<(), TurtleError> {
    let value = config.get_int("strategy", "max_units_per_market", 4);
    if value < 1 {
        return Err(TurtleError::config_invalid(
            "strategy",
            "max_units_per_market",
            "max_units_per_market must be at least 1",
        ));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::file_config_adapter::FileConfigAdapter;

    fn make_config(content: &str) -> FileConfigAdapter {
        FileConfigAdapter::from_string(content).unwrap()
    }

    fn with_dates(extra: &str) -> FileConfigAdapter {
        make_config(&format!(
            "[backtest]\nstart_date = 2024-01-01\nend_date = 2024-06-30\n{extra}\n"
        ))
    }

    fn invalid_key(result: Result<(), TurtleError>) -> Option<String> {
        match result {
            Err(TurtleError::ConfigInvalid { key, .. }) => Some(key),
            _ => None,
        }
    }

    #[test]
    fn valid_backtest_config_passes() {
        let config = make_config(
            r#"
[backtest]
symbol = ETHUSDT
timeframe = 4h
start_date = 2024-01-01
end_date = 2024-06-30
initial_balance = 25000
commission_rate = 0.0004
leverage = 3
systems = 2, 1
risk_free_rate = 0.02
warmup_bars = 30

[data]
source = synthetic
"#,
        );
        assert!(validate_backtest_config(&config).is_ok());
    }

    #[test]
    fn dates_are_the_only_required_keys() {
        assert!(validate_backtest_config(&with_dates("")).is_ok());
        assert!(validate_strategy_config(&with_dates("")).is_ok());
    }

    #[test]
    fn missing_end_date_fails() {
        let config = make_config("[backtest]\nstart_date = 2024-01-01\n");
        assert!(matches!(
            validate_backtest_config(&config),
            Err(TurtleError::ConfigMissing { ref key, .. }) if key == "end_date"
        ));
    }

    #[test]
    fn invalid_date_format_fails() {
        let config = make_config("[backtest]\nstart_date = 01/01/2024\nend_date = 2024-06-30\n");
        assert_eq!(
            invalid_key(validate_backtest_config(&config)).as_deref(),
            Some("start_date")
        );
    }

    #[test]
    fn start_after_end_fails() {
        let config = make_config("[backtest]\nstart_date = 2024-06-30\nend_date = 2024-01-01\n");
        assert!(validate_backtest_config(&config).is_err());
    }

    #[test]
    fn unknown_timeframe_fails() {
        let config = with_dates("timeframe = 3d");
        assert_eq!(
            invalid_key(validate_backtest_config(&config)).as_deref(),
            Some("timeframe")
        );
    }

    #[test]
    fn non_positive_balance_fails() {
        let config = with_dates("initial_balance = 0");
        assert_eq!(
            invalid_key(validate_backtest_config(&config)).as_deref(),
            Some("initial_balance")
        );
    }

    #[test]
    fn negative_commission_fails() {
        let config = with_dates("commission_rate = -0.1");
        assert_eq!(
            invalid_key(validate_backtest_config(&config)).as_deref(),
            Some("commission_rate")
        );
    }

    #[test]
    fn zero_leverage_fails() {
        let config = with_dates("leverage = 0");
        assert_eq!(
            invalid_key(validate_backtest_config(&config)).as_deref(),
            Some("leverage")
        );
    }

    #[test]
    fn systems_parse_in_order() {
        let config = with_dates("systems = 2,1");
        assert_eq!(
            parse_systems(&config).unwrap(),
            vec![System::Two, System::One]
        );
        assert_eq!(parse_systems(&with_dates("")).unwrap().len(), 2);
    }

    #[test]
    fn bad_systems_fail() {
        for raw in ["systems = 3", "systems = 1,1", "systems = ,", "systems = one"] {
            let config = with_dates(raw);
            assert_eq!(
                invalid_key(validate_backtest_config(&config)).as_deref(),
                Some("systems"),
                "{raw}"
            );
        }
    }

    #[test]
    fn warmup_shorter_than_atr_fails() {
        let config = with_dates("timeframe = 1h\nwarmup_bars = 10");
        assert_eq!(
            invalid_key(validate_backtest_config(&config)).as_deref(),
            Some("warmup_bars")
        );
        assert!(validate_backtest_config(&with_dates("timeframe = 1h\nwarmup_bars = 24")).is_ok());
    }

    #[test]
    fn unknown_data_source_fails() {
        let config = make_config(
            "[backtest]\nstart_date = 2024-01-01\nend_date = 2024-06-30\n[data]\nsource = exchange\n",
        );
        assert_eq!(
            invalid_key(validate_backtest_config(&config)).as_deref(),
            Some("source")
        );
    }

    #[test]
    fn strategy_ranges() {
        let bad = [
            "risk_per_trade = 0",
            "risk_per_trade = 1.5",
            "stop_multiplier = -2",
            "pyramid_multiplier = 0",
            "max_units_per_market = 0",
            "margin_threshold = 2",
            "margin_fraction = 0",
            "min_unit_size = 0",
        ];
        for line in bad {
            let config = make_config(&format!("[strategy]\n{line}\n"));
            assert!(validate_strategy_config(&config).is_err(), "{line}");
        }
    }
}

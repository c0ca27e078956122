mod common;

use common::*;
use proptest::prelude::*;
use turtletrader::domain::backtest::run_backtest;
use turtletrader::domain::indicator::{check_breakout, donchian_high};
use turtletrader::domain::metrics::drawdown_curve;
use turtletrader::domain::position::{Direction, Position, System, TradingUnit};
use turtletrader::domain::strategy::{MarketContext, StrategyParams, TurtleStrategy};
use turtletrader::domain::timeframe::Timeframe;

fn unit(price: f64, size: f64, stop: f64, n: usize) -> TradingUnit {
    TradingUnit {
        entry_price: price,
        entry_time: day(n as i64),
        size,
        stop_loss: stop,
        system: System::One,
        unit_number: n,
    }
}

proptest! {
    #![proptest_config(ProptestConfig {
        cases: 64,
        .. ProptestConfig::default()
    })]

    #[test]
    fn breakout_ignores_the_current_bar(
        closes in prop::collection::vec(10.0f64..1_000.0, 3..60),
        period in 1usize..20,
    ) {
        let bars = daily_bars(&closes);
        let fired = check_breakout(&bars, period, Direction::Long);
        if bars.len() < period + 1 {
            prop_assert!(!fired);
        } else {
            let (current, history) = bars.split_last().unwrap();
            let prior_high = donchian_high(history, period).unwrap();
            prop_assert_eq!(fired, current.close > prior_high);
            // the current bar's own high is always >= its close
            prop_assert!(donchian_high(&bars, period).unwrap() >= current.close);
        }
    }

    #[test]
    fn position_totals_track_units(
        fills in prop::collection::vec((10.0f64..1_000.0, 0.01f64..50.0), 1..6),
    ) {
        let (price, size) = fills[0];
        let mut position = Position::open(SYMBOL, Direction::Long, unit(price, size, price - 5.0, 1));
        for (i, &(price, size)) in fills.iter().enumerate().skip(1) {
            position.add_unit(unit(price, size, price - 5.0, i + 1));
        }

        let total: f64 = fills.iter().map(|&(_, s)| s).sum();
        let weighted: f64 = fills.iter().map(|&(p, s)| p * s).sum::<f64>() / total;
        prop_assert_eq!(position.unit_count(), fills.len());
        prop_assert!((position.total_size() - total).abs() <= 1e-9 * total);
        prop_assert!((position.average_price() - weighted).abs() <= 1e-9 * weighted);
    }

    #[test]
    fn stops_never_loosen(
        start in 50.0f64..150.0,
        moves in prop::collection::vec(-20.0f64..20.0, 1..30),
        short in any::<bool>(),
    ) {
        let direction = if short { Direction::Short } else { Direction::Long };
        let mut position = Position::open(SYMBOL, direction, unit(100.0, 1.0, start, 1));
        let mut previous = start;
        for delta in moves {
            position.tighten_stops(previous + delta);
            let stop = position.units()[0].stop_loss;
            match direction {
                Direction::Long => prop_assert!(stop >= previous),
                Direction::Short => prop_assert!(stop <= previous),
            }
            previous = stop;
        }
    }

    #[test]
    fn unit_cap_is_never_exceeded(
        max_units in 1usize..6,
        attempts in 1usize..12,
    ) {
        let params = StrategyParams { max_units_per_market: max_units, ..StrategyParams::default() };
        let mut strategy = TurtleStrategy::new(params, Timeframe::D1, Box::new(RecordingJournal::new()));
        for i in 0..attempts {
            let ctx = MarketContext {
                price: 100.0 + i as f64,
                timestamp: day(i as i64),
                balance: 10_000.0,
                leverage: 1.0,
            };
            strategy.execute_entry(SYMBOL, Direction::Long, System::One, 2.0, &ctx);
            let units = strategy.position(SYMBOL).map_or(0, |p| p.unit_count());
            prop_assert!(units <= max_units);
            prop_assert_eq!(units, (i + 1).min(max_units));
        }
    }

    #[test]
    fn driver_runs_reconcile(
        closes in prop::collection::vec(20.0f64..500.0, 40..120),
    ) {
        let bars = daily_bars(&closes);
        let config = config_for(&bars);
        let results = run_backtest(&bars, &config, Box::new(RecordingJournal::new())).unwrap();

        prop_assert!(results.report.max_drawdown >= 0.0);
        prop_assert!(results.report.max_drawdown.is_finite());
        for point in drawdown_curve(&results.equity_curve) {
            prop_assert!(point.drawdown >= 0.0);
        }
        for t in &results.trades {
            let expected = t.direction.sign() * (t.exit_price - t.entry_price) * t.size;
            prop_assert!((t.pnl - expected).abs() <= 1e-9 * expected.abs().max(1.0));
        }
        let total_pnl: f64 = results.trades.iter().map(|t| t.pnl).sum();
        let expected = results.initial_balance + total_pnl - results.total_commission;
        prop_assert!((results.final_balance - expected).abs() <= 1e-6 * results.initial_balance.max(expected.abs()));
    }
}

//! CLI definition and dispatch.

use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use tracing::warn;

use crate::adapters::csv_adapter::CsvBarAdapter;
use crate::adapters::csv_journal::CsvJournal;
use crate::adapters::file_config_adapter::FileConfigAdapter;
use crate::adapters::json_results_adapter::JsonResultsAdapter;
use crate::adapters::synthetic_adapter::SyntheticDataAdapter;
use crate::adapters::tracing_journal::TracingJournal;
use crate::domain::backtest::{self as backtest_engine, BacktestConfig, BacktestResults};
use crate::domain::config_validation::{
    parse_date, parse_systems, parse_timeframe, validate_backtest_config, validate_strategy_config,
};
use crate::domain::error::TurtleError;
use crate::domain::strategy::StrategyParams;
use crate::ports::config_port::ConfigPort;
use crate::ports::data_port::DataPort;
use crate::ports::journal_port::JournalPort;
use crate::ports::results_port::ResultsPort;

const MIN_LEVERAGE: f64 = 1.0;
const MAX_LEVERAGE: f64 = 125.0;
const DEFAULT_RESULTS_PATH: &str = "backtest_results.json";

#[derive(Parser, Debug)]
#[command(name = "turtletrader", about = "Turtle trading backtester")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Run a backtest
    Backtest {
        #[arg(short, long)]
        config: PathBuf,
        /// Where to write the JSON results
        #[arg(short, long)]
        output: Option<PathBuf>,
        /// Write a CSV trade journal here instead of logging trades
        #[arg(short, long)]
        journal: Option<PathBuf>,
        #[arg(long)]
        symbol: Option<String>,
        #[arg(long)]
        timeframe: Option<String>,
        #[arg(long)]
        dry_run: bool,
    },
    /// Validate a configuration file and print the resolved settings
    Validate {
        #[arg(short, long)]
        config: PathBuf,
    },
    /// Print the summary of saved results
    Show {
        #[arg(short, long)]
        results: PathBuf,
    },
}

pub fn run(cli: Cli) -> ExitCode {
    match cli.command {
        Command::Backtest {
            config,
            output,
            journal,
            symbol,
            timeframe,
            dry_run,
        } => {
            let overrides = Overrides {
                symbol: symbol.as_deref(),
                timeframe: timeframe.as_deref(),
            };
            if dry_run {
                run_dry_run(&config, &overrides)
            } else {
                run_backtest(&config, output.as_deref(), journal.as_deref(), &overrides)
            }
        }
        Command::Validate { config } => run_dry_run(&config, &Overrides::default()),
        Command::Show { results } => run_show(&results),
    }
}

#[derive(Debug, Default)]
pub struct Overrides<'a> {
    pub symbol: Option<&'a str>,
    pub timeframe: Option<&'a str>,
}

pub fn load_config(path: &Path, overrides: &Overrides<'_>) -> Result<FileConfigAdapter, ExitCode> {
    let mut adapter = FileConfigAdapter::from_file(path).map_err(|err| {
        eprintln!("error: {err}");
        ExitCode::from(&err)
    })?;
    if let Some(symbol) = overrides.symbol {
        adapter.set("backtest", "symbol", symbol);
    }
    if let Some(timeframe) = overrides.timeframe {
        adapter.set("backtest", "timeframe", timeframe);
    }
    Ok(adapter)
}

fn fail(err: TurtleError) -> ExitCode {
    eprintln!("error: {err}");
    ExitCode::from(&err)
}

fn run_backtest(
    config_path: &Path,
    output_path: Option<&Path>,
    journal_path: Option<&Path>,
    overrides: &Overrides<'_>,
) -> ExitCode {
    // Stage 1: Load and validate config
    eprintln!("Loading config from {}", config_path.display());
    let adapter = match load_config(config_path, overrides) {
        Ok(a) => a,
        Err(code) => return code,
    };
    if let Err(e) = validate_backtest_config(&adapter).and_then(|_| validate_strategy_config(&adapter)) {
        return fail(e);
    }
    let bt_config = match build_backtest_config(&adapter) {
        Ok(c) => c,
        Err(e) => return fail(e),
    };

    // Stage 2: Wire collaborators
    let data_port = build_data_port(&adapter);
    let journal: Box<dyn JournalPort> = match journal_path
        .map(Path::to_path_buf)
        .or_else(|| adapter.get_string("output", "journal_path").map(PathBuf::from))
    {
        Some(path) => match CsvJournal::create(&path) {
            Ok(j) => {
                eprintln!("Writing trade journal to {}", path.display());
                Box::new(j)
            }
            Err(e) => return fail(e),
        },
        None => Box::new(TracingJournal::new()),
    };

    // Stage 3: Fetch and run
    let results = match run_backtest_pipeline(data_port.as_ref(), &bt_config, journal) {
        Ok(r) => r,
        Err(e) => return fail(e),
    };
    print_summary(&results);

    // Stage 4: Persist
    let output = output_path
        .map(Path::to_path_buf)
        .or_else(|| adapter.get_string("output", "results_path").map(PathBuf::from))
        .unwrap_or_else(|| PathBuf::from(DEFAULT_RESULTS_PATH));
    match JsonResultsAdapter::new().save(&results, &output.to_string_lossy()) {
        Ok(()) => {
            eprintln!("\nResults written to: {}", output.display());
            ExitCode::SUCCESS
        }
        Err(e) => fail(e),
    }
}

/// Fetches the configured window and runs the driver over it.
pub fn run_backtest_pipeline(
    data_port: &dyn DataPort,
    bt_config: &BacktestConfig,
    journal: Box<dyn JournalPort>,
) -> Result<BacktestResults, TurtleError> {
    let bars = data_port.fetch_bars(
        &bt_config.symbol,
        bt_config.timeframe,
        bt_config.start_date,
        bt_config.end_date,
    )?;

    eprintln!(
        "Running backtest: {} {} from {} to {} ({} bars)",
        bt_config.symbol,
        bt_config.timeframe,
        bt_config.start_date,
        bt_config.end_date,
        bars.len(),
    );

    backtest_engine::run_backtest(&bars, bt_config, journal)
}

pub fn build_backtest_config(adapter: &dyn ConfigPort) -> Result<BacktestConfig, TurtleError> {
    let timeframe = parse_timeframe(adapter)?;
    let start_date = parse_date(adapter, "start_date")?;
    let end_date = parse_date(adapter, "end_date")?;
    let symbol = adapter
        .get_string("backtest", "symbol")
        .map(|s| s.trim().to_string())
        .unwrap_or_else(|| "BTCUSDT".to_string());

    let mut config = BacktestConfig::new(symbol, timeframe, start_date, end_date);

    let leverage = adapter.get_double("backtest", "leverage", 1.0);
    let clamped = leverage.clamp(MIN_LEVERAGE, MAX_LEVERAGE);
    if clamped != leverage {
        warn!(leverage, clamped, "leverage out of range, clamped");
    }

    let default_warmup = config.warmup_bars as i64;
    config.initial_balance = adapter.get_double("backtest", "initial_balance", config.initial_balance);
    config.commission_rate = adapter.get_double("backtest", "commission_rate", config.commission_rate);
    config.leverage = clamped;
    config.systems = parse_systems(adapter)?;
    config.risk_free_rate = adapter.get_double("backtest", "risk_free_rate", config.risk_free_rate);
    config.warmup_bars = adapter
        .get_int("backtest", "warmup_bars", default_warmup)
        .max(default_warmup) as usize;
    config.strategy = build_strategy_params(adapter);
    Ok(config)
}

pub fn build_strategy_params(adapter: &dyn ConfigPort) -> StrategyParams {
    let d = StrategyParams::default();
    StrategyParams {
        risk_per_trade: adapter.get_double("strategy", "risk_per_trade", d.risk_per_trade),
        stop_multiplier: adapter.get_double("strategy", "stop_multiplier", d.stop_multiplier),
        pyramid_multiplier: adapter.get_double("strategy", "pyramid_multiplier", d.pyramid_multiplier),
        max_units_per_market: adapter
            .get_int("strategy", "max_units_per_market", d.max_units_per_market as i64)
            .max(1) as usize,
        margin_threshold: adapter.get_double("strategy", "margin_threshold", d.margin_threshold),
        margin_fraction: adapter.get_double("strategy", "margin_fraction", d.margin_fraction),
        min_unit_size: adapter.get_double("strategy", "min_unit_size", d.min_unit_size),
        trail_stops_on_pyramid: adapter.get_bool(
            "strategy",
            "trail_stops_on_pyramid",
            d.trail_stops_on_pyramid,
        ),
    }
}

/// `[data] source = synthetic` selects the generator; anything else reads CSV
/// files from `csv_dir` (default `data`).
pub fn build_data_port(adapter: &dyn ConfigPort) -> Box<dyn DataPort> {
    let source = adapter
        .get_string("data", "source")
        .unwrap_or_else(|| "csv".to_string());
    if source.trim() == "synthetic" {
        let seed = adapter.get_int("data", "seed", 42).max(0) as u64;
        let base_price = adapter.get_double("data", "base_price", 50_000.0);
        Box::new(SyntheticDataAdapter::new(seed, base_price))
    } else {
        let dir = adapter
            .get_string("data", "csv_dir")
            .unwrap_or_else(|| "data".to_string());
        Box::new(CsvBarAdapter::new(PathBuf::from(dir)))
    }
}

pub fn print_summary(results: &BacktestResults) {
    let report = &results.report;
    let config = &results.config;

    eprintln!("\n=== {} {} Results ===", config.symbol, config.timeframe);
    eprintln!("Period:           {} to {}", results.start, results.end);
    eprintln!("Initial Balance:  {:.2}", results.initial_balance);
    eprintln!("Final Balance:    {:.2}", results.final_balance);
    eprintln!("Commission Paid:  {:.2}", results.total_commission);
    eprintln!("Total Return:     {:.2}%", report.total_return * 100.0);
    eprintln!("Annualized:       {:.2}%", report.annualized_return * 100.0);
    eprintln!("Sharpe Ratio:     {:.2}", report.sharpe_ratio);
    eprintln!("Sortino Ratio:    {:.2}", report.sortino_ratio);
    eprintln!("Max Drawdown:     -{:.1}%", report.max_drawdown * 100.0);
    eprintln!("Total Trades:     {}", report.total_trades);
    eprintln!("Win Rate:         {:.1}%", report.win_rate * 100.0);
    eprintln!("Profit Factor:    {:.2}", report.profit_factor);
    eprintln!(
        "Streaks:          {} wins / {} losses",
        report.max_consecutive_wins, report.max_consecutive_losses
    );

    let subsets = [
        ("Long", &report.long),
        ("Short", &report.short),
        ("System 1", &report.system_1),
        ("System 2", &report.system_2),
    ];
    if report.total_trades > 0 {
        eprintln!("\n=== Breakdown ===");
        for (label, stats) in subsets {
            if stats.trades == 0 {
                continue;
            }
            let pnl_sign = if stats.total_pnl >= 0.0 { "+" } else { "" };
            eprintln!(
                "  {:<9} {} trades, {:.1}% win rate, {}{:.2}",
                format!("{label}:"),
                stats.trades,
                stats.win_rate * 100.0,
                pnl_sign,
                stats.total_pnl,
            );
        }
    }
}

pub fn run_dry_run(config_path: &Path, overrides: &Overrides<'_>) -> ExitCode {
    eprintln!("Loading config from {}", config_path.display());
    let adapter = match load_config(config_path, overrides) {
        Ok(a) => a,
        Err(code) => return code,
    };

    if let Err(e) = validate_backtest_config(&adapter) {
        return fail(e);
    }
    if let Err(e) = validate_strategy_config(&adapter) {
        return fail(e);
    }
    let config = match build_backtest_config(&adapter) {
        Ok(c) => c,
        Err(e) => return fail(e),
    };
    eprintln!("Config validated successfully");

    let systems: Vec<String> = config.systems.iter().map(|s| s.to_string()).collect();
    eprintln!("\nBacktest:");
    eprintln!("  symbol:          {}", config.symbol);
    eprintln!("  timeframe:       {}", config.timeframe);
    eprintln!("  window:          {} to {}", config.start_date, config.end_date);
    eprintln!("  initial_balance: {}", config.initial_balance);
    eprintln!("  commission_rate: {}", config.commission_rate);
    eprintln!("  leverage:        {}", config.leverage);
    eprintln!("  systems:         {}", systems.join(", "));
    eprintln!("  warmup_bars:     {}", config.warmup_bars);

    let s = &config.strategy;
    eprintln!("\nStrategy:");
    eprintln!("  risk_per_trade:       {}", s.risk_per_trade);
    eprintln!("  stop_multiplier:      {}", s.stop_multiplier);
    eprintln!("  pyramid_multiplier:   {}", s.pyramid_multiplier);
    eprintln!("  max_units_per_market: {}", s.max_units_per_market);
    eprintln!("  margin_threshold:     {}", s.margin_threshold);

    eprintln!("\nDry run complete: configuration is valid");
    ExitCode::SUCCESS
}

fn run_show(results_path: &Path) -> ExitCode {
    eprintln!("Loading results from {}", results_path.display());
    match JsonResultsAdapter::new().load(&results_path.to_string_lossy()) {
        Ok(results) => {
            print_summary(&results);
            ExitCode::SUCCESS
        }
        Err(e) => fail(e),
    }
}

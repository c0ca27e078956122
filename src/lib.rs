//! turtletrader: turtle trading backtester.
//!
//! Hexagonal architecture: domain logic in [`domain`], port traits in [`ports`],
//! concrete implementations in [`adapters`], command-line entry points in
//! [`cli`].

pub mod domain;
pub mod ports;
pub mod adapters;
pub mod cli;

//! Core domain types and logic.

pub mod bar;
pub mod signal;
pub mod position;
pub mod order;
pub mod broker;
pub mod backtest;
pub mod simulator;
pub mod portfolio;
pub mod metrics;
pub mod indicator;
pub mod strategy;
pub mod error;

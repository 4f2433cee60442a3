//! PoolPrice Library
//!
//! USD price discovery for tokens that only trade in liquidity pools,
//! anchored to an oracle-priced reference asset

pub mod config;
pub mod error;
pub mod graph;
pub mod health;
pub mod inventory;
pub mod logging;
pub mod oracle;
pub mod pricing;
pub mod service;
pub mod types;

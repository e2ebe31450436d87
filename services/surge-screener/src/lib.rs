//! Surge Screener Library
//!
//! Screens Hong Kong equities for turnover surges: instruments that trade
//! heavily in the current session and whose daily turnover jumped between
//! the two most recent sessions.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────┐
//! │                     surge-screener (CLI: surge)                     │
//! ├─────────────────────────────────────────────────────────────────────┤
//! │  ┌─────────────────┐  ┌─────────────────┐  ┌─────────────────┐     │
//! │  │  Market Data    │  │  Screener       │  │  Report /       │     │
//! │  │  (eastmoney,    │─▶│  (filter,       │─▶│  CSV export     │     │
//! │  │   csv)          │  │   growth tiers) │  │                 │     │
//! │  └─────────────────┘  └─────────────────┘  └─────────────────┘     │
//! └─────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! # Key Concepts
//!
//! - **Turnover**: traded value (成交额). Snapshot turnover comes from the
//!   provider; session turnover is approximated as volume × close.
//! - **Growth ratio**: recent session turnover over the previous one.
//! - **Tiers**: grow50 / grow100 / grow200, ratio strictly above 1.5 / 2.0 /
//!   3.0 by default. A tier contains every stricter tier.

#![warn(clippy::all)]
#![allow(clippy::pedantic)]

pub mod config;
pub mod data;
pub mod screener;

pub use config::AppConfig;

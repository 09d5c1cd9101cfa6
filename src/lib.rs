//! # canline
//!
//! Discrete-event simulation of a tomato canning line.
//!
//! The crate has two layers:
//! - [`engine`]: a single-timeline process-oriented simulation kernel with a
//!   virtual clock, a FIFO-stable event queue, processes written as
//!   coroutines, and contention primitives (facilities, stores, wait queues)
//! - [`line`]: the canning line built on it, from tomato arrival through
//!   sorting, filling, batch sterilization, labelling and date printing
//!
//! ## Example
//!
//! ```rust
//! use canline::prelude::*;
//!
//! let config = LineConfig::builder()
//!     .seed(7)
//!     .horizon(3_600.0)
//!     .build()
//!     .unwrap();
//! let report = simulate(&config).unwrap();
//! assert_eq!(report.counters.tomatoes_generated, 3_601);
//! ```

#![forbid(unsafe_code)]
#![deny(clippy::unwrap_used, clippy::expect_used, clippy::panic)]
#![warn(clippy::pedantic, clippy::nursery)]
#![allow(
    clippy::module_name_repetitions,
    clippy::similar_names,
    clippy::cast_precision_loss,
    clippy::cast_possible_truncation,
    clippy::cast_sign_loss,
    clippy::suspicious_operation_groupings,  // False positive for variance = E[X²] - E[X]²
    clippy::too_many_lines,
    clippy::missing_const_for_fn,  // Many functions can't be const in stable Rust
    clippy::future_not_send,       // Processes are single-threaded by construction
)]

pub mod cli;
pub mod config;
pub mod engine;
pub mod error;
pub mod line;
pub mod report;

/// Prelude for convenient imports
pub mod prelude {
    pub use crate::config::{LineConfig, LineConfigBuilder, RejectionConfig, StationConfig};
    pub use crate::engine::rng::{FixedSource, RandomSource, SimRng};
    pub use crate::engine::{SimEngine, SimHandle, SimTime};
    pub use crate::error::{SimError, SimResult};
    pub use crate::line::{simulate, simulate_with, CanningLine, LineCounters};
    pub use crate::report::LineReport;
}

/// Re-export for public API
pub use error::{SimError, SimResult};

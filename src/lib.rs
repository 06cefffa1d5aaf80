//! # forkpar - deferred parallel computations
//!
//! forkpar describes parallel work as plain values and only runs it when the
//! description is handed an execution context.
//!
//! - **Descriptions, not threads**: a [`Par<A>`](par::Par) says how to compute
//!   an `A`; nothing happens until [`run`](par::run) applies it to a context.
//! - **Small algebra**: [`unit`](par::unit), [`lazy_unit`](par::lazy_unit),
//!   [`fork`](par::fork) and [`map2`](par::map2) compose into larger
//!   computations.
//! - **Handles**: every application yields a [`Handle`](par::Handle) with
//!   cancellation, blocking and timed retrieval.
//! - **Pluggable contexts**: an elastic crossbeam-backed pool, a fixed rayon
//!   pool, or inline execution.
//!
//! ## Library Usage
//!
//! ```rust
//! use forkpar::context::{Context, ElasticPool};
//! use forkpar::par::{Handle, run};
//! use forkpar::sum::sum;
//! use std::sync::Arc;
//! use std::time::Duration;
//!
//! let ctx: Context = Arc::new(ElasticPool::new(Duration::from_secs(1), "docs"));
//! let total = run(&ctx, &sum(vec![1, 2, 3, 4, 5, 6])).get()?;
//! assert_eq!(total, 21);
//! # Ok::<(), forkpar::error::ParError>(())
//! ```
//!
//! ## Command Line
//!
//! ```bash
//! forkpar sum 1 2 3 4 5 6
//! forkpar sum --context rayon --timeout-ms 500 -- -3 7 12
//! forkpar config show
//! ```

pub mod cli;
pub mod config;
pub mod context;
pub mod error;
pub mod par;
pub mod sum;

pub use config::ForkparConfig;
pub use error::{ParError, ParResult};
pub use par::{Handle, Par};

/// Version information
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
pub const PKG_NAME: &str = env!("CARGO_PKG_NAME");

//! Configuration for forkpar
//!
//! Settings are merged from, lowest priority first:
//!
//! 1. Embedded defaults (`default-config.toml`)
//! 2. `~/.config/forkpar/config.toml`, then `./forkpar.toml`
//!    (or only the file passed with `--config`)
//! 3. `FORKPAR_` environment variables, `__` separating sections
//!    (`FORKPAR_RUN__TIMEOUT_MS=500`)

mod core;

pub use self::core::{ContextConfig, ContextKind, ForkparConfig, RunConfig};

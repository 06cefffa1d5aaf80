//! Parallel sum command
//!
//! Runs the divide-and-conquer `sum` on the configured execution context.

use anyhow::{Context as _, Result, bail};
use clap::Args;
use std::time::{Duration, Instant};

use crate::cli::Output;
use crate::config::{ContextKind, ForkparConfig};
use crate::context;
use crate::error::ParError;
use crate::par::{Handle, run};
use crate::sum::sum;

#[derive(Args)]
pub struct SumArgs {
    /// Integers to add (none sums to 0)
    #[arg(allow_negative_numbers = true)]
    pub values: Vec<i64>,

    /// Give up after this many milliseconds (0 waits indefinitely)
    #[arg(long, value_name = "MS")]
    pub timeout_ms: Option<u64>,

    /// Execution context to run on
    #[arg(long, value_enum)]
    pub context: Option<ContextKind>,

    /// Print the result as JSON
    #[arg(long)]
    pub json: bool,
}

pub fn execute(args: SumArgs, config: &ForkparConfig, output: &Output) -> Result<()> {
    let mut context_config = config.context.clone();
    if let Some(kind) = args.context {
        context_config.kind = kind;
    }
    let timeout = match args.timeout_ms {
        Some(0) => None,
        Some(ms) => Some(Duration::from_millis(ms)),
        None => config.run.timeout(),
    };

    let ctx = context::from_config(&context_config)?;
    let count = args.values.len();
    output.verbose(&format!(
        "Summing {} values on the {} context",
        count,
        ctx.name()
    ));

    let start = Instant::now();
    let handle = run(&ctx, &sum(args.values));
    let outcome = match timeout {
        Some(timeout) => handle.get_timeout(timeout),
        None => handle.get(),
    };

    let total = match outcome {
        Ok(total) => total,
        Err(ParError::Timeout(_)) => {
            handle.cancel(true);
            tracing::warn!("sum timed out, cancelled outstanding work");
            bail!(
                "Sum of {} values did not finish within {}ms",
                count,
                timeout.map_or(0, |t| t.as_millis())
            );
        }
        Err(e) => return Err(e).context("Parallel sum failed"),
    };
    let elapsed = start.elapsed();
    tracing::info!(count, ?elapsed, "sum finished");

    if args.json {
        let report = serde_json::json!({
            "sum": total,
            "count": count,
            "context": context_config.kind,
            "elapsed_ms": elapsed.as_millis() as u64,
        });
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else if output.is_quiet() {
        println!("{}", total);
    } else {
        output.success(&format!("Sum of {} values: {}", count, total));
        output.verbose(&format!("Finished in {:.2}ms", elapsed.as_secs_f64() * 1000.0));
    }

    Ok(())
}

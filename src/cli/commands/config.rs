//! Configuration command implementations

use crate::cli::{ConfigCommands, Output};
use crate::config::ForkparConfig;
use anyhow::Result;

pub fn execute(cmd: ConfigCommands, config: &ForkparConfig, output: &Output) -> Result<()> {
    match cmd {
        ConfigCommands::Show => show(config, output),
    }
}

fn show(config: &ForkparConfig, output: &Output) -> Result<()> {
    output.verbose("Merged defaults, config files and FORKPAR_ environment");
    println!("{}", serde_json::to_string_pretty(config)?);
    Ok(())
}

//! Command implementations for the forkpar CLI

pub mod config;
pub mod sum;

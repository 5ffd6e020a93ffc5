//! Chained AWS credential resolution for `credential_process`.

pub mod aws;
pub mod cache;
pub mod chain;
pub mod cli;
pub mod commands;
pub mod config;
pub mod constants;
pub mod credentials;
pub mod error;
pub mod output;
pub mod providers;

#[cfg(test)]
pub(crate) mod testing;

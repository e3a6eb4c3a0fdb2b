//! Command-line front end for maildex stores

pub mod cli;
pub mod commands;
pub mod config;
pub mod output;

//! Configuration file of the `oxycheck` runner.

pub mod app_config;
pub mod model;

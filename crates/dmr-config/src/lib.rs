//! Typed stack configuration and its TOML loader.

pub mod stack_config;
pub mod toml_config;

pub use stack_config::{CfgLink, CfgRepeater, CfgStation, StackConfig};

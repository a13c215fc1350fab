//! Layered configuration: CLI arguments override the TOML file, which
//! overrides [`defaults::DefaultsConfig`].

pub mod builder;
pub mod defaults;
pub mod file;

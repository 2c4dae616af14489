// src/config/mod.rs

//! Engine configuration loading and validation for nodeflow.
//!
//! Responsibilities:
//! - Define the TOML-backed data model (`model.rs`).
//! - Load a config file from disk (`loader.rs`).
//! - Validate basic invariants like positive intervals (`validate.rs`).
//!
//! Graph submissions are validated separately in [`crate::dag::validate`].

pub mod loader;
pub mod model;
pub mod validate;

pub use loader::{default_config_path, load_and_validate, load_from_path, load_or_default};
pub use model::{CheckpointSection, ConfigFile, EngineSection, ExecutorSection, RawConfigFile};

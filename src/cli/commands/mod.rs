//! Command execution functions.

pub mod build;
pub mod inspect;

pub use build::{CliResult, configuration_from_args, execute};
pub use inspect::{list_identities, list_presets, show_classification};

//! macOS installer package builder library
//!
//! This library builds `.pkg` installers from disk images, archives, app
//! bundles, directories and executables by orchestrating an external
//! packaging engine:
//! - [`bundler::settings`] validates build intent and serializes engine arguments
//! - [`bundler::classify`] derives metadata from an input path
//! - [`bundler::signing`] discovers installer signing identities
//! - [`bundler::builder`] runs, observes and cancels the engine
//!
//! It can be used both as a CLI tool and as a library dependency.

pub mod bundler;
pub mod cli;
pub mod error;
pub mod metadata;
pub mod source;

// Re-export commonly used types
pub use error::{BundlerError, CliError, Result};

//! macOS installer package building.
//!
//! The pieces, leaves first:
//!
//! - [`settings`] - build configuration, validation, engine arguments, presets
//! - [`classify`] - metadata derived from a dropped input path
//! - [`signing`] - installer signing identities from the keychain
//! - [`builder`] - the [`BuildOrchestrator`] running the packaging engine
//!
//! # Example
//!
//! ```no_run
//! use kodegen_bundler_pkg::bundler::{BuildOrchestrator, ConfigurationBuilder, classify};
//!
//! # async fn example() -> kodegen_bundler_pkg::bundler::Result<()> {
//! let input = classify("/tmp/Acme-2.1.dmg");
//! let configuration = ConfigurationBuilder::new().input(&input).build()?;
//!
//! let orchestrator = BuildOrchestrator::new();
//! orchestrator
//!     .start(&configuration, &input.path, "/tmp/Acme.pkg")
//!     .await?;
//! println!("{}", orchestrator.wait().await);
//! # Ok(())
//! # }
//! ```

pub mod builder;
pub mod classify;
pub mod error;
pub mod settings;
pub mod signing;

pub use builder::{
    BuildFailure, BuildOrchestrator, BuildState, EngineLocator, FailureKind, OutputChunk,
    OutputStream, PackageArtifact, SessionSnapshot, SessionStatus, StateTag,
};
pub use classify::{InputDescriptor, InputKind, classify};
pub use error::{Error, ErrorExt, Result};
pub use settings::{
    BuildConfiguration, ConfigurationBuilder, PackageMode, Preset, PresetRegistry, Severity,
    ValidationIssue, ValidationReport,
};
pub use signing::{IdentityCatalog, IdentityDiscovery, SigningIdentity};

//! Signing identity discovery.
//!
//! Installer packages are signed with "Developer ID Installer" (or "3rd Party
//! Mac Developer Installer") certificates from the user's keychain. This
//! module lists them by running `security find-identity -v` and parsing its
//! free-text output.

mod discovery;
mod identity;

pub use discovery::{FIND_IDENTITY_ARGS, IdentityCatalog, IdentityDiscovery, SECURITY_TOOL};
pub use identity::{
    INSTALLER_CERTIFICATE_CLASSES, SigningIdentity, installer_identities, parse_identity_line,
    parse_security_output,
};

//! kodegen_bundler_pkg - macOS installer package builder.
//!
//! This binary turns a disk image, archive, app bundle, directory or
//! executable into a `.pkg` by driving the packaging engine.

use kodegen_bundler_pkg::cli;
use std::process;

#[tokio::main]
async fn main() {
    // Initialize logging
    env_logger::init();

    let exit_code = match cli::run().await {
        Ok(code) => code,
        Err(e) => {
            eprintln!("Error: {}", e);
            for suggestion in e.recovery_suggestions() {
                eprintln!("  {}", suggestion);
            }
            e.exit_code()
        }
    };

    process::exit(exit_code);
}

//! Build script for the RFM12 node firmware
//!
//! Handles:
//! - Linker scripts for the Cortex-M binary (embedded builds only)

fn main() {
    println!("cargo:rerun-if-changed=build.rs");

    // Host builds (`--features std`) link as a normal library
    if std::env::var_os("CARGO_FEATURE_EMBEDDED").is_some() {
        println!("cargo:rustc-link-arg-bins=--nmagic");
        println!("cargo:rustc-link-arg-bins=-Tlink.x");
        println!("cargo:rustc-link-arg-bins=-Tdefmt.x");
    }
}

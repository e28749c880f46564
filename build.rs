// SPDX-License-Identifier: MPL-2.0

use std::process::Command;

fn main() {
    // Re-run build script if git HEAD changes
    println!("cargo::rerun-if-changed=.git/HEAD");
    println!("cargo::rerun-if-env-changed=VISION_PORTAL_VERSION");

    // Packagers may pin the version string
    let version = std::env::var("VISION_PORTAL_VERSION").unwrap_or_else(|_| build_version());

    println!("cargo::rustc-env=VISION_PORTAL_BUILD_VERSION={}", version);
}

/// Package version, tagged with the commit it was built from when known
fn build_version() -> String {
    let package = std::env::var("CARGO_PKG_VERSION").unwrap_or_else(|_| "0.0.0".to_string());
    match commit_hash() {
        Some(hash) => format!("{}-{}", package, hash),
        None => package,
    }
}

fn commit_hash() -> Option<String> {
    let output = Command::new("git")
        .args(["rev-parse", "--short", "HEAD"])
        .output()
        .ok()?;

    if output.status.success() {
        Some(String::from_utf8_lossy(&output.stdout).trim().to_string())
    } else {
        None
    }
}

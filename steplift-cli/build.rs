// Stamps the binary with a version taken from `git describe`
//
// Released builds (exact `vX.Y.Z` tag) report the tag. Anything else reports
// the package version plus the describe suffix, e.g. `0.1.0+3-gabc123-dirty`.
// Without git the package version is used as-is.

use std::process::Command;

fn main() {
    let version = describe_version().unwrap_or_else(|| env!("CARGO_PKG_VERSION").to_string());

    println!("cargo:rustc-env=STEPLIFT_VERSION={}", version);
    println!("cargo:rerun-if-changed=.git/HEAD");
    println!("cargo:rerun-if-changed=.git/refs/tags");
}

fn describe_version() -> Option<String> {
    let output = Command::new("git")
        .args(["describe", "--tags", "--always", "--dirty"])
        .output()
        .ok()?;
    if !output.status.success() {
        return None;
    }

    let described = String::from_utf8(output.stdout).ok()?;
    let described = described.trim();
    let package = env!("CARGO_PKG_VERSION");

    match described.strip_prefix('v') {
        Some(tag) if !tag.contains('-') => Some(tag.to_string()),
        // `v0.1.0-3-gabc123[-dirty]`: commits past a tag
        Some(tagged) => {
            let suffix = tagged.split_once('-').map_or("", |(_, rest)| rest);
            Some(format!("{}+{}", package, suffix))
        }
        // No tag reachable: bare commit hash
        None => Some(format!("{}+{}", package, described)),
    }
}

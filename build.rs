// build.rs
use std::process::Command;

fn main() {
    // Revision of the generator itself, shown by `--version` and stamped into
    // the Script payload of freshly created declaration files.
    let output = Command::new("git")
        .args(["rev-parse", "--short", "HEAD"])
        .output();

    let git_hash = match output {
        Ok(output) if output.status.success() => String::from_utf8(output.stdout)
            .map(|s| s.trim().to_string())
            .unwrap_or_else(|_| "unknown".to_string()),
        // not a checkout (e.g. built from a crate tarball) or git missing
        _ => "unknown".to_string(),
    };

    println!("cargo:rustc-env=GIT_REVISION={}", git_hash);
    println!("cargo:rerun-if-changed=.git/HEAD");
}

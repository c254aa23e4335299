//! Build script: embeds version metadata for the binary.
use std::process::Command;

fn main() {
    // RSYSLOG_COOKBOOK_VERSION wins (release builds); otherwise git describe.
    if let Ok(version) = std::env::var("RSYSLOG_COOKBOOK_VERSION") {
        println!("cargo:rustc-env=RSYSLOG_COOKBOOK_VERSION={version}");
    } else if let Ok(output) = Command::new("git")
        .args(["describe", "--tags", "--always", "--dirty"])
        .output()
        && output.status.success()
    {
        let version = String::from_utf8_lossy(&output.stdout).trim().to_string();
        println!("cargo:rustc-env=RSYSLOG_COOKBOOK_VERSION={version}");
    }

    println!("cargo:rerun-if-changed=.git/HEAD");
    println!("cargo:rerun-if-changed=.git/refs/");
    println!("cargo:rerun-if-changed=templates");
    println!("cargo:rerun-if-env-changed=RSYSLOG_COOKBOOK_VERSION");
}

// Shared helpers for integration tests.
//
// Wraps the resolve -> build pipeline for a named platform and provides a
// temporary attribute file so each test can state only what it varies.
//
// Used by all integration test binaries that declare `mod common;`.
#![allow(dead_code)]

use std::path::PathBuf;

use rsyslog_cookbook::config::ConfigInput;
use rsyslog_cookbook::plan::{ActionPayload, ResourcePlan, build};
use rsyslog_cookbook::platform::PlatformProfile;
use rsyslog_cookbook::resolver::{ResolvedConfig, resolve};

/// Platforms exercised by the scenario tests, as `(name, version)`.
pub const PLATFORMS: &[(&str, &str)] = &[
    ("ubuntu", "16.04"),
    ("debian", "9.4"),
    ("centos", "5.11"),
    ("centos", "6.9"),
    ("centos", "7.4"),
    ("smartos", "5.11"),
    ("omnios", "151018"),
];

/// CA file used by TLS scenarios.
pub const CA_FILE: &str = "/etc/path/to/ssl-ca.crt";

/// Parse a platform, panicking on unsupported input.
pub fn platform(name: &str, version: &str) -> PlatformProfile {
    PlatformProfile::new(name, version).expect("supported platform")
}

/// Resolve `input` for the named platform.
pub fn resolved(name: &str, version: &str, input: &ConfigInput) -> ResolvedConfig {
    resolve(input, &platform(name, version)).expect("valid attributes")
}

/// Resolve and build the plan for the named platform.
pub fn plan_for(name: &str, version: &str, input: &ConfigInput) -> ResourcePlan {
    build(&resolved(name, version, input)).expect("plan builds")
}

/// Attributes with TLS enabled and a CA file, over `protocol`.
pub fn tls_input(protocol: &str) -> ConfigInput {
    ConfigInput {
        enable_tls: true,
        tls_ca_file: Some(PathBuf::from(CA_FILE)),
        protocol: protocol.to_string(),
        ..ConfigInput::default()
    }
}

/// Attributes enabling imfile with `PollingInterval = 10`.
pub fn imfile_input() -> ConfigInput {
    let mut input = ConfigInput {
        use_imfile: true,
        ..ConfigInput::default()
    };
    input
        .imfile_options
        .insert("PollingInterval".to_string(), "10".to_string());
    input
}

/// Rendered content of the file action targeting `path`.
pub fn rendered(plan: &ResourcePlan, path: &str) -> String {
    let id = format!("template[{path}]");
    match plan.action(&id).map(|a| &a.payload) {
        Some(ActionPayload::RenderFile { content, .. }) => content.clone(),
        other => panic!("{id} is not a rendered file: {other:?}"),
    }
}

/// Write `content` to a temporary attribute file.
pub fn attribute_file(content: &str) -> (tempfile::TempDir, PathBuf) {
    let dir = tempfile::tempdir().expect("create temp dir");
    let path = dir.path().join("attributes.toml");
    std::fs::write(&path, content).expect("write attributes");
    (dir, path)
}

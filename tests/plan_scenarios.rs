#![allow(
    clippy::expect_used,
    clippy::unwrap_used,
    clippy::wildcard_imports,
    clippy::indexing_slicing,
    clippy::panic
)]
//! Integration tests for attribute resolution and plan construction.
//!
//! These tests drive the resolve -> build pipeline end to end for each
//! supported platform and check the properties a consumer of the plan
//! relies on: which packages are installed, how the imfile drop-in is
//! rendered, which legacy services are displaced, and how notifications
//! connect config files to the daemon.

mod common;

use common::*;
use rsyslog_cookbook::config::{ConfigInput, ConfigStyle};
use rsyslog_cookbook::error::ValidationError;
use rsyslog_cookbook::plan::{ActionKind, NotifyTiming, NotifyVerb, build};
use rsyslog_cookbook::resolver::{TLS_PACKAGE, resolve};

// ---------------------------------------------------------------------------
// Snapshots: action order per platform
// ---------------------------------------------------------------------------

#[test]
fn ubuntu_action_order() {
    let plan = plan_for("ubuntu", "16.04", &ConfigInput::default());
    insta::assert_snapshot!(plan.ids().join("\n"), @r"
    package[rsyslog]
    directory[/etc/rsyslog.d]
    directory[/var/spool/rsyslog]
    template[/etc/rsyslog.conf]
    template[/etc/rsyslog.d/50-default.conf]
    service_enable[rsyslog]
    service_start[rsyslog]
    ");
}

#[test]
fn rhel5_action_order() {
    let plan = plan_for("centos", "5.11", &ConfigInput::default());
    insta::assert_snapshot!(plan.ids().join("\n"), @r"
    package[rsyslog]
    directory[/etc/rsyslog.d]
    directory[/var/spool/rsyslog]
    template[/etc/rsyslog.conf]
    template[/etc/rsyslog.d/50-default.conf]
    service_stop[syslog]
    service_disable[syslog]
    service_enable[rsyslog]
    service_start[rsyslog]
    ");
}

#[test]
fn omnios_action_order_and_edges() {
    let plan = plan_for("omnios", "151018", &ConfigInput::default());
    insta::assert_snapshot!(plan.ids().join("\n"), @r"
    package[rsyslog]
    directory[/opt/local/etc/rsyslog.d]
    directory[/var/spool/rsyslog]
    template[/opt/local/etc/rsyslog.conf]
    template[/opt/local/etc/rsyslog.d/50-default.conf]
    template[/var/svc/manifest/system/rsyslogd.xml]
    execute[import rsyslog manifest]
    service_disable[system-log]
    service_enable[system/rsyslogd]
    service_start[system/rsyslogd]
    ");
    let edges: Vec<String> = plan.edges.iter().map(ToString::to_string).collect();
    insta::assert_snapshot!(edges.join("\n"), @r"
    template[/var/svc/manifest/system/rsyslogd.xml] -> execute[import rsyslog manifest] (run, immediate)
    template[/opt/local/etc/rsyslog.conf] -> service_start[system/rsyslogd] (restart, delayed)
    template[/opt/local/etc/rsyslog.d/50-default.conf] -> service_start[system/rsyslogd] (restart, delayed)
    execute[import rsyslog manifest] -> service_start[system/rsyslogd] (restart, delayed)
    ");
}

// ---------------------------------------------------------------------------
// TLS
// ---------------------------------------------------------------------------

/// TLS with a CA file over anything but TCP is rejected for every platform.
#[test]
fn tls_over_udp_is_rejected_everywhere() {
    for (name, version) in PLATFORMS {
        let err = resolve(&tls_input("udp"), &platform(name, version)).unwrap_err();
        assert!(
            matches!(err, ValidationError::IncompatibleProtocol { .. }),
            "{name} {version}: {err}"
        );
        let msg = err.to_string();
        assert!(msg.contains("TLS") && msg.contains(CA_FILE) && msg.contains("udp"));
    }
}

/// `enable_tls` without a CA file never installs the TLS package.
#[test]
fn tls_without_ca_installs_no_tls_package() {
    for protocol in ["tcp", "udp"] {
        let input = ConfigInput {
            enable_tls: true,
            protocol: protocol.to_string(),
            ..ConfigInput::default()
        };
        for (name, version) in PLATFORMS {
            let plan = plan_for(name, version, &input);
            assert!(!plan.installs_package(TLS_PACKAGE), "{name} {version} {protocol}");
        }
    }
}

/// TLS with a CA file over TCP installs the TLS package exactly once.
#[test]
fn tls_over_tcp_installs_one_tls_package() {
    for (name, version) in PLATFORMS {
        let plan = plan_for(name, version, &tls_input("tcp"));
        let count = plan
            .actions_of(ActionKind::InstallPackage)
            .filter(|a| a.id == format!("package[{TLS_PACKAGE}]").as_str())
            .count();
        assert_eq!(count, 1, "{name} {version}");
    }
}

// ---------------------------------------------------------------------------
// Determinism and structure
// ---------------------------------------------------------------------------

#[test]
fn build_is_idempotent() {
    let mut input = imfile_input();
    input.use_relp = true;
    input.enable_tls = true;
    input.tls_ca_file = Some(CA_FILE.into());
    for (name, version) in PLATFORMS {
        let config = resolved(name, version, &input);
        assert_eq!(build(&config).unwrap(), build(&config).unwrap(), "{name}");
    }
}

#[test]
fn edges_only_point_forward() {
    for (name, version) in PLATFORMS {
        let plan = plan_for(name, version, &imfile_input());
        for edge in &plan.edges {
            let from = plan.position(edge.source.as_str()).unwrap();
            let to = plan.position(edge.target.as_str()).unwrap();
            assert!(from <= to, "{name}: {edge}");
        }
    }
}

#[test]
fn conf_dir_by_platform() {
    let default = ConfigInput::default();
    assert_eq!(
        resolved("debian", "9.4", &default).conf_dir.to_str(),
        Some("/etc/rsyslog.d")
    );
    assert_eq!(
        resolved("ubuntu", "16.04", &default).conf_dir.to_str(),
        Some("/etc/rsyslog.d")
    );
    assert_eq!(
        resolved("smartos", "5.11", &default).conf_dir.to_str(),
        Some("/opt/local/etc/rsyslog.d")
    );
}

// ---------------------------------------------------------------------------
// imfile
// ---------------------------------------------------------------------------

#[test]
fn rhel6_imfile_uses_legacy_syntax() {
    let config = resolved("centos", "6", &imfile_input());
    assert_eq!(config.imfile_style, ConfigStyle::Legacy);
    let plan = build(&config).unwrap();
    let content = rendered(&plan, "/etc/rsyslog.d/35-imfile.conf");
    assert!(content.contains("$ModLoad imfile"));
    assert!(!content.contains("PollingInterval"));
}

#[test]
fn ubuntu_imfile_uses_rainer_syntax() {
    let config = resolved("ubuntu", "16.04", &imfile_input());
    assert_eq!(config.config_style, None);
    assert_eq!(config.imfile_style, ConfigStyle::Rainer);
    let plan = build(&config).unwrap();
    let content = rendered(&plan, "/etc/rsyslog.d/35-imfile.conf");
    assert!(content.contains(r#"module(load="imfile""#));
    assert!(content.contains(r#"PollingInterval="10""#));
}

#[test]
fn explicit_legacy_style_wins_on_ubuntu() {
    let mut input = imfile_input();
    input.config_style = Some(ConfigStyle::Legacy);
    let plan = plan_for("ubuntu", "16.04", &input);
    let content = rendered(&plan, "/etc/rsyslog.d/35-imfile.conf");
    assert!(content.contains("$ModLoad imfile"));
}

// ---------------------------------------------------------------------------
// Services and notifications
// ---------------------------------------------------------------------------

#[test]
fn rhel5_stops_and_disables_syslog() {
    let plan = plan_for("centos", "5.11", &ConfigInput::default());
    assert!(plan.action("service_stop[syslog]").is_some());
    assert!(plan.action("service_disable[syslog]").is_some());
    assert_eq!(plan.edges_from("service_stop[syslog]").count(), 0);
    assert_eq!(plan.edges_from("service_disable[syslog]").count(), 0);
}

#[test]
fn omnios_manifest_runs_import_which_restarts_service() {
    let plan = plan_for("omnios", "151018", &ConfigInput::default());
    let run = plan
        .edges_from("template[/var/svc/manifest/system/rsyslogd.xml]")
        .find(|e| e.verb == NotifyVerb::Run)
        .expect("manifest run edge");
    assert_eq!(run.target, "execute[import rsyslog manifest]");
    assert_eq!(run.timing, NotifyTiming::Immediate);

    let restart = plan
        .edges_from("execute[import rsyslog manifest]")
        .next()
        .expect("import restart edge");
    assert_eq!(restart.verb, NotifyVerb::Restart);
    assert_eq!(restart.target, "service_start[system/rsyslogd]");
}

#[test]
fn every_config_file_restarts_the_daemon() {
    for (name, version) in PLATFORMS {
        let config = resolved(name, version, &imfile_input());
        let plan = build(&config).unwrap();
        let start = format!("service_start[{}]", config.service_name);
        for path in [
            &config.conf_file,
            &config.default_conf_file,
            &config.imfile_conf_file,
        ] {
            let id = format!("template[{}]", path.display());
            assert!(
                plan.edges_from(&id)
                    .any(|e| e.target == start.as_str() && e.verb == NotifyVerb::Restart),
                "{name}: {id}"
            );
        }
    }
}

// ---------------------------------------------------------------------------
// Rendered contract
// ---------------------------------------------------------------------------

#[test]
fn main_config_loads_resolved_modules_in_order() {
    let input = ConfigInput {
        use_relp: true,
        ..ConfigInput::default()
    };
    for (name, version) in PLATFORMS {
        let config = resolved(name, version, &input);
        let plan = build(&config).unwrap();
        let content = rendered(&plan, &config.conf_file.display().to_string());
        assert!(content.contains("Config generated by Chef - manual edits will be overwritten"));
        let loads: Vec<&str> = content
            .lines()
            .filter_map(|l| l.strip_prefix("$ModLoad "))
            .collect();
        assert_eq!(loads, config.modules, "{name}");
    }
}

#[test]
fn default_rules_by_platform() {
    let rhel = plan_for("centos", "7.4", &ConfigInput::default());
    let content = rendered(&rhel, "/etc/rsyslog.d/50-default.conf");
    assert!(content.contains("*.emerg    :omusrmsg:*"));
    assert!(content.contains("mail.*    -/var/log/maillog"));

    for name in ["smartos", "omnios"] {
        let version = if name == "smartos" { "5.11" } else { "151018" };
        let plan = plan_for(name, version, &ConfigInput::default());
        let content = rendered(&plan, "/opt/local/etc/rsyslog.d/50-default.conf");
        assert!(content.contains("/var/adm/messages"), "{name}");
        assert!(content.contains("*.emerg    :omusrmsg:*"), "{name}");
    }
}

//! Resource graph builder: resolved configuration -> ordered plan.
use std::path::Path;

use super::{
    ActionId, ActionPayload, FileSpec, NotificationEdge, NotifyTiming, NotifyVerb,
    ResourceAction, ResourcePlan,
};
use crate::error::PlanError;
use crate::render::{Renderer, Template};
use crate::resolver::{Displacement, ResolvedConfig};

/// Name of the execute action that imports the SMF manifest.
pub const IMPORT_MANIFEST: &str = "import rsyslog manifest";

const ROOT: &str = "root";
const DIR_MODE: u32 = 0o755;
const SPOOL_MODE: u32 = 0o700;
const FILE_MODE: u32 = 0o644;

/// Accumulates actions and edges in declaration order.
#[derive(Debug, Default)]
struct PlanBuilder {
    plan: ResourcePlan,
}

impl PlanBuilder {
    fn push(&mut self, payload: ActionPayload) -> ActionId {
        let action = ResourceAction::new(payload);
        let id = action.id.clone();
        self.plan.actions.push(action);
        id
    }

    fn notify(&mut self, source: &ActionId, target: &ActionId, verb: NotifyVerb, timing: NotifyTiming) {
        self.plan.edges.push(NotificationEdge {
            source: source.clone(),
            target: target.clone(),
            verb,
            timing,
        });
    }

    fn package(&mut self, name: &str) -> ActionId {
        self.push(ActionPayload::InstallPackage {
            name: name.to_string(),
        })
    }

    fn directory(&mut self, spec: FileSpec) -> ActionId {
        self.push(ActionPayload::Directory { spec })
    }

    fn render(
        &mut self,
        renderer: &Renderer,
        template: Template,
        config: &ResolvedConfig,
        path: &Path,
    ) -> Result<ActionId, PlanError> {
        let content = renderer
            .render(template, config)
            .map_err(|e| PlanError::Render {
                path: path.display().to_string(),
                reason: e.to_string(),
            })?;
        Ok(self.push(ActionPayload::RenderFile {
            spec: FileSpec::new(path, FILE_MODE, ROOT, ROOT),
            template: template.name().to_string(),
            content,
        }))
    }
}

/// Build the resource plan for `config`.
///
/// Actions are listed in dependency order: packages, directories, config
/// files, SMF manifest import, displaced services, then the primary
/// service. Every rendered config file notifies a delayed restart of the
/// primary service. The returned plan has already passed
/// [`ResourcePlan::validate`].
///
/// # Errors
///
/// Returns [`PlanError::Render`] if a template fails to render, or another
/// [`PlanError`] if the assembled plan violates an invariant.
///
/// # Examples
///
/// ```
/// use rsyslog_cookbook::config::ConfigInput;
/// use rsyslog_cookbook::plan::build;
/// use rsyslog_cookbook::platform::PlatformProfile;
/// use rsyslog_cookbook::resolver::resolve;
///
/// let platform = PlatformProfile::new("centos", "5.11").unwrap();
/// let config = resolve(&ConfigInput::default(), &platform).unwrap();
/// let plan = build(&config).unwrap();
/// assert!(plan.action("service_stop[syslog]").is_some());
/// assert!(plan.action("service_disable[syslog]").is_some());
/// ```
pub fn build(config: &ResolvedConfig) -> Result<ResourcePlan, PlanError> {
    let renderer = Renderer::new().map_err(|e| PlanError::Render {
        path: config.conf_file.display().to_string(),
        reason: e.to_string(),
    })?;
    let mut b = PlanBuilder::default();

    b.package(&config.package);
    if let Some(relp) = &config.relp_package {
        b.package(relp);
    }
    if let Some(tls) = &config.tls_package {
        b.package(tls);
    }

    b.directory(FileSpec::new(&config.conf_dir, DIR_MODE, ROOT, ROOT));
    b.directory(FileSpec::new(
        &config.spool_dir,
        SPOOL_MODE,
        &config.spool_owner,
        &config.spool_group,
    ));

    let mut config_files = Vec::new();
    if config.use_imfile {
        config_files.push(b.render(&renderer, Template::Imfile, config, &config.imfile_conf_file)?);
    }
    config_files.push(b.render(&renderer, Template::MainConfig, config, &config.conf_file)?);
    config_files.push(b.render(
        &renderer,
        Template::DefaultRules(config.default_rules),
        config,
        &config.default_conf_file,
    )?);

    let mut restart_sources = config_files;
    if let Some(manifest) = &config.smf_manifest {
        let manifest_id = b.render(&renderer, Template::SmfManifest, config, manifest)?;
        let import_id = b.push(ActionPayload::Execute {
            name: IMPORT_MANIFEST.to_string(),
            command: format!("svccfg import {}", manifest.display()),
            on_notify_only: true,
        });
        b.notify(&manifest_id, &import_id, NotifyVerb::Run, NotifyTiming::Immediate);
        restart_sources.push(import_id);
    }

    for displaced in &config.displaced_services {
        let service = displaced.name.clone();
        if displaced.displacement == Displacement::StopAndDisable {
            b.push(ActionPayload::ServiceStop {
                service: service.clone(),
            });
        }
        b.push(ActionPayload::ServiceDisable { service });
    }

    b.push(ActionPayload::ServiceEnable {
        service: config.service_name.clone(),
    });
    let start_id = b.push(ActionPayload::ServiceStart {
        service: config.service_name.clone(),
    });
    for source in &restart_sources {
        b.notify(source, &start_id, NotifyVerb::Restart, NotifyTiming::Delayed);
    }

    let plan = b.plan;
    plan.validate()?;
    tracing::debug!(
        "built plan for {}: {} action(s), {} edge(s)",
        config.platform,
        plan.actions.len(),
        plan.edges.len()
    );
    Ok(plan)
}

#[cfg(test)]
#[allow(
    clippy::expect_used,
    clippy::unwrap_used,
    clippy::indexing_slicing,
    clippy::panic
)]
mod tests {
    use super::*;
    use crate::config::ConfigInput;
    use crate::plan::ActionKind;
    use crate::platform::PlatformProfile;
    use crate::resolver::{RELP_PACKAGE, TLS_PACKAGE, resolve};
    use std::path::PathBuf;

    fn plan_for(name: &str, version: &str, input: &ConfigInput) -> ResourcePlan {
        let platform = PlatformProfile::new(name, version).unwrap();
        build(&resolve(input, &platform).unwrap()).unwrap()
    }

    fn default_plan(name: &str, version: &str) -> ResourcePlan {
        plan_for(name, version, &ConfigInput::default())
    }

    fn spec_of<'a>(plan: &'a ResourcePlan, id: &str) -> &'a FileSpec {
        match &plan.action(id).unwrap().payload {
            ActionPayload::Directory { spec } | ActionPayload::RenderFile { spec, .. } => spec,
            other => panic!("{id} has no file spec: {other:?}"),
        }
    }

    fn content_of<'a>(plan: &'a ResourcePlan, id: &str) -> &'a str {
        match &plan.action(id).unwrap().payload {
            ActionPayload::RenderFile { content, .. } => content,
            other => panic!("{id} is not a rendered file: {other:?}"),
        }
    }

    fn has_edge(plan: &ResourcePlan, source: &str, target: &str, verb: NotifyVerb) -> bool {
        plan.edges_from(source)
            .any(|e| e.target == target && e.verb == verb)
    }

    // -----------------------------------------------------------------------
    // Ordering
    // -----------------------------------------------------------------------

    #[test]
    fn debian_default_order() {
        let plan = default_plan("ubuntu", "16.04");
        assert_eq!(
            plan.ids(),
            [
                "package[rsyslog]",
                "directory[/etc/rsyslog.d]",
                "directory[/var/spool/rsyslog]",
                "template[/etc/rsyslog.conf]",
                "template[/etc/rsyslog.d/50-default.conf]",
                "service_enable[rsyslog]",
                "service_start[rsyslog]",
            ]
        );
    }

    #[test]
    fn optional_packages_follow_the_daemon() {
        let input = ConfigInput {
            use_relp: true,
            enable_tls: true,
            tls_ca_file: Some(PathBuf::from("/etc/path/to/ssl-ca.crt")),
            ..ConfigInput::default()
        };
        let plan = plan_for("ubuntu", "16.04", &input);
        assert_eq!(
            &plan.ids()[..3],
            ["package[rsyslog]", "package[rsyslog-relp]", "package[rsyslog-gnutls]"]
        );
        assert!(plan.installs_package(RELP_PACKAGE));
        assert!(plan.installs_package(TLS_PACKAGE));
    }

    #[test]
    fn imfile_dropin_precedes_main_config() {
        let input = ConfigInput {
            use_imfile: true,
            ..ConfigInput::default()
        };
        let plan = default_plan("ubuntu", "16.04");
        assert!(plan.action("template[/etc/rsyslog.d/35-imfile.conf]").is_none());

        let plan = plan_for("ubuntu", "16.04", &input);
        let imfile = plan.position("template[/etc/rsyslog.d/35-imfile.conf]").unwrap();
        let main = plan.position("template[/etc/rsyslog.conf]").unwrap();
        assert!(imfile < main);
    }

    #[test]
    fn directories_precede_files_precede_services() {
        for (name, version) in [("ubuntu", "16.04"), ("centos", "5.11"), ("omnios", "151018")] {
            let plan = default_plan(name, version);
            let last_dir = plan
                .actions
                .iter()
                .rposition(|a| a.kind() == ActionKind::Directory)
                .unwrap();
            let first_file = plan
                .actions
                .iter()
                .position(|a| a.kind() == ActionKind::RenderFile)
                .unwrap();
            let first_service = plan
                .actions
                .iter()
                .position(|a| a.id.as_str().starts_with("service_"))
                .unwrap();
            assert!(last_dir < first_file, "{name}");
            assert!(first_file < first_service, "{name}");
        }
    }

    // -----------------------------------------------------------------------
    // Permissions
    // -----------------------------------------------------------------------

    #[test]
    fn conf_dir_and_spool_ownership_differ() {
        let plan = default_plan("ubuntu", "16.04");
        let conf = spec_of(&plan, "directory[/etc/rsyslog.d]");
        assert_eq!((conf.mode, conf.owner.as_str(), conf.group.as_str()), (0o755, "root", "root"));
        let spool = spec_of(&plan, "directory[/var/spool/rsyslog]");
        assert_eq!(
            (spool.mode, spool.owner.as_str(), spool.group.as_str()),
            (0o700, "syslog", "adm")
        );
    }

    #[test]
    fn rendered_files_are_root_0644() {
        let plan = default_plan("smartos", "5.11");
        for action in plan.actions_of(ActionKind::RenderFile) {
            let spec = spec_of(&plan, action.id.as_str());
            assert_eq!(spec.mode, 0o644, "{}", action.id);
            assert_eq!(spec.owner, "root");
            assert_eq!(spec.group, "root");
        }
    }

    // -----------------------------------------------------------------------
    // Notifications
    // -----------------------------------------------------------------------

    #[test]
    fn every_config_render_restarts_the_service() {
        let input = ConfigInput {
            use_imfile: true,
            ..ConfigInput::default()
        };
        let plan = plan_for("centos", "7.4", &input);
        for action in plan.actions_of(ActionKind::RenderFile) {
            assert!(
                has_edge(&plan, action.id.as_str(), "service_start[rsyslog]", NotifyVerb::Restart),
                "{}",
                action.id
            );
        }
        assert!(plan.edges.iter().all(|e| e.timing == NotifyTiming::Delayed));
    }

    #[test]
    fn rhel5_displaces_syslog_without_edges() {
        let plan = default_plan("centos", "5.11");
        let stop = plan.position("service_stop[syslog]").unwrap();
        let disable = plan.position("service_disable[syslog]").unwrap();
        let enable = plan.position("service_enable[rsyslog]").unwrap();
        assert!(stop < disable && disable < enable);
        assert!(
            !plan
                .edges
                .iter()
                .any(|e| e.target == "service_stop[syslog]" || e.target == "service_disable[syslog]")
        );
        assert_eq!(plan.edges_from("service_stop[syslog]").count(), 0);
    }

    #[test]
    fn rhel6_has_no_syslog_actions() {
        let plan = default_plan("centos", "6.9");
        assert!(plan.action("service_stop[syslog]").is_none());
    }

    #[test]
    fn smartos_disables_system_log() {
        let plan = default_plan("smartos", "5.11");
        assert!(plan.action("service_disable[system-log]").is_some());
        assert!(plan.action("service_stop[system-log]").is_none());
        assert!(plan.action("execute[import rsyslog manifest]").is_none());
    }

    #[test]
    fn omnios_manifest_chain() {
        let plan = default_plan("omnios", "151018");
        let manifest = "template[/var/svc/manifest/system/rsyslogd.xml]";
        let import = "execute[import rsyslog manifest]";
        let start = "service_start[system/rsyslogd]";

        let edge = plan.edges_from(manifest).next().unwrap();
        assert_eq!(edge.target, import);
        assert_eq!(edge.verb, NotifyVerb::Run);
        assert_eq!(edge.timing, NotifyTiming::Immediate);
        assert!(has_edge(&plan, import, start, NotifyVerb::Restart));

        match &plan.action(import).unwrap().payload {
            ActionPayload::Execute {
                command,
                on_notify_only,
                ..
            } => {
                assert_eq!(command, "svccfg import /var/svc/manifest/system/rsyslogd.xml");
                assert!(on_notify_only);
            }
            other => panic!("unexpected payload {other:?}"),
        }
    }

    // -----------------------------------------------------------------------
    // Content and determinism
    // -----------------------------------------------------------------------

    #[test]
    fn main_config_content_is_rendered() {
        let plan = default_plan("centos", "6.9");
        let content = content_of(&plan, "template[/etc/rsyslog.conf]");
        assert!(content.contains("$ModLoad imuxsock"));
        let rules = content_of(&plan, "template[/etc/rsyslog.d/50-default.conf]");
        assert!(rules.contains("mail.*    -/var/log/maillog"));
    }

    #[test]
    fn build_is_deterministic() {
        let input = ConfigInput {
            use_relp: true,
            use_imfile: true,
            ..ConfigInput::default()
        };
        assert_eq!(
            plan_for("omnios", "151018", &input),
            plan_for("omnios", "151018", &input)
        );
    }

    #[test]
    fn built_plans_validate() {
        for (name, version) in [
            ("ubuntu", "16.04"),
            ("centos", "5.11"),
            ("centos", "6.9"),
            ("smartos", "5.11"),
            ("omnios", "151018"),
        ] {
            assert!(default_plan(name, version).validate().is_ok(), "{name}");
        }
    }
}

//! In-memory host used by the CLI and the test suite.
use std::collections::{BTreeMap, BTreeSet};
use std::fmt::Write as _;
use std::path::{Path, PathBuf};

use sha2::{Digest, Sha256};

use super::{ApplyResult, Provider};
use crate::error::ApplyError;
use crate::plan::{ActionId, ActionPayload, FileSpec, NotifyVerb, ResourceAction};
use crate::platform::{PlatformFamily, PlatformProfile};

/// Run/boot state of a service.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ServiceState {
    /// Currently running.
    pub running: bool,
    /// Started at boot.
    pub enabled: bool,
}

/// A managed file: ownership plus a SHA-256 of its content.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileState {
    /// Permission bits.
    pub mode: u32,
    /// Owning user.
    pub owner: String,
    /// Owning group.
    pub group: String,
    /// Lowercase hex SHA-256 of the content.
    pub checksum: String,
    /// Content as last written.
    pub content: String,
}

/// Host state kept entirely in memory.
///
/// Implements [`Provider`] with check-then-apply semantics: every action
/// compares the desired state with the recorded one and reports
/// [`ApplyResult::Unchanged`] when they already match.
#[derive(Debug, Clone, Default)]
pub struct SimulatedHost {
    smf: bool,
    packages: BTreeSet<String>,
    directories: BTreeMap<PathBuf, FileSpec>,
    files: BTreeMap<PathBuf, FileState>,
    services: BTreeMap<String, ServiceState>,
    executed: Vec<String>,
    restarts: Vec<String>,
    failures: BTreeSet<ActionId>,
}

/// Lowercase hex SHA-256 digest of `content`.
#[must_use]
pub fn checksum(content: &str) -> String {
    let digest = Sha256::digest(content.as_bytes());
    let mut hex = String::with_capacity(64);
    for b in &digest {
        // write! to a String is infallible.
        write!(hex, "{b:02x}").unwrap_or(());
    }
    hex
}

impl SimulatedHost {
    /// An empty host.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// A freshly installed host of the given platform.
    ///
    /// RHEL 5 ships the classic `syslog` daemon running and enabled; SMF
    /// platforms run `system-log`.
    #[must_use]
    pub fn fixture(platform: &PlatformProfile) -> Self {
        let mut host = Self {
            smf: platform.family.uses_smf(),
            ..Self::default()
        };
        let running = ServiceState {
            running: true,
            enabled: true,
        };
        match platform.family {
            PlatformFamily::Rhel if platform.rhel_release() == Some(5) => {
                host.services.insert("syslog".to_string(), running);
            }
            PlatformFamily::SmartOs | PlatformFamily::Illumos => {
                host.services.insert("system-log".to_string(), running);
            }
            PlatformFamily::Rhel | PlatformFamily::Debian => {}
        }
        tracing::debug!("simulated host for {platform}: {} service(s)", host.services.len());
        host
    }

    /// Make the action with `id` fail on its next apply or notify.
    #[must_use]
    pub fn fail_on(mut self, id: ActionId) -> Self {
        self.failures.insert(id);
        self
    }

    /// Whether `name` is installed.
    #[must_use]
    pub fn has_package(&self, name: &str) -> bool {
        self.packages.contains(name)
    }

    /// Recorded directory, if any.
    #[must_use]
    pub fn directory(&self, path: &Path) -> Option<&FileSpec> {
        self.directories.get(path)
    }

    /// Recorded file, if any.
    #[must_use]
    pub fn file(&self, path: &Path) -> Option<&FileState> {
        self.files.get(path)
    }

    /// State of `name`; unknown services are stopped and disabled.
    #[must_use]
    pub fn service(&self, name: &str) -> ServiceState {
        self.services.get(name).copied().unwrap_or_default()
    }

    /// Commands run so far, in order.
    #[must_use]
    pub fn executed(&self) -> &[String] {
        &self.executed
    }

    /// Services restarted so far, in order.
    #[must_use]
    pub fn restarts(&self) -> &[String] {
        &self.restarts
    }

    /// Write a file directly, bypassing any plan (local drift).
    pub fn write_file(&mut self, path: &Path, content: &str) {
        let state = self.files.entry(path.to_path_buf()).or_insert_with(|| FileState {
            mode: 0o644,
            owner: "root".to_string(),
            group: "root".to_string(),
            checksum: String::new(),
            content: String::new(),
        });
        state.checksum = checksum(content);
        state.content = content.to_string();
    }

    fn check_failure(&self, id: &ActionId) -> Result<(), ApplyError> {
        if self.failures.contains(id) {
            return Err(ApplyError::ActionFailed {
                action: id.to_string(),
                reason: "simulated failure".to_string(),
            });
        }
        Ok(())
    }

    fn update_service(&mut self, name: &str, f: impl FnOnce(&mut ServiceState)) -> ApplyResult {
        let state = self.services.entry(name.to_string()).or_default();
        let before = *state;
        f(state);
        if *state == before {
            ApplyResult::Unchanged
        } else {
            ApplyResult::Changed
        }
    }

    fn render_file(&mut self, spec: &FileSpec, content: &str) -> ApplyResult {
        let desired = FileState {
            mode: spec.mode,
            owner: spec.owner.clone(),
            group: spec.group.clone(),
            checksum: checksum(content),
            content: content.to_string(),
        };
        if self.files.get(&spec.path) == Some(&desired) {
            return ApplyResult::Unchanged;
        }
        tracing::debug!("write {} ({})", spec.path.display(), desired.checksum);
        self.files.insert(spec.path.clone(), desired);
        ApplyResult::Changed
    }
}

impl Provider for SimulatedHost {
    fn apply(&mut self, action: &ResourceAction) -> Result<ApplyResult, ApplyError> {
        self.check_failure(&action.id)?;
        let smf = self.smf;
        let result = match &action.payload {
            ActionPayload::InstallPackage { name } => {
                if self.packages.insert(name.clone()) {
                    ApplyResult::Changed
                } else {
                    ApplyResult::Unchanged
                }
            }
            ActionPayload::Directory { spec } => {
                if self.directories.get(&spec.path) == Some(spec) {
                    ApplyResult::Unchanged
                } else {
                    self.directories.insert(spec.path.clone(), spec.clone());
                    ApplyResult::Changed
                }
            }
            ActionPayload::RenderFile { spec, content, .. } => self.render_file(spec, content),
            ActionPayload::ServiceEnable { service } => {
                self.update_service(service, |s| s.enabled = true)
            }
            ActionPayload::ServiceStart { service } => {
                self.update_service(service, |s| s.running = true)
            }
            ActionPayload::ServiceStop { service } => {
                self.update_service(service, |s| s.running = false)
            }
            ActionPayload::ServiceDisable { service } => self.update_service(service, |s| {
                s.enabled = false;
                // svcadm disable also stops the instance.
                if smf {
                    s.running = false;
                }
            }),
            ActionPayload::Execute {
                command,
                on_notify_only,
                ..
            } => {
                if *on_notify_only {
                    ApplyResult::Deferred
                } else {
                    self.executed.push(command.clone());
                    ApplyResult::Changed
                }
            }
        };
        Ok(result)
    }

    fn notify(
        &mut self,
        action: &ResourceAction,
        verb: NotifyVerb,
    ) -> Result<ApplyResult, ApplyError> {
        self.check_failure(&action.id)?;
        match (&action.payload, verb) {
            (
                ActionPayload::ServiceStart { service } | ActionPayload::ServiceEnable { service },
                NotifyVerb::Restart,
            ) => {
                self.restarts.push(service.clone());
                self.services.entry(service.clone()).or_default().running = true;
                Ok(ApplyResult::Changed)
            }
            (ActionPayload::Execute { command, .. }, NotifyVerb::Run) => {
                self.executed.push(command.clone());
                Ok(ApplyResult::Changed)
            }
            _ => Err(ApplyError::UnsupportedNotification {
                action: action.id.to_string(),
                verb: verb.to_string(),
            }),
        }
    }
}

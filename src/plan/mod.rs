//! Resource plan: an ordered action list plus the notification edges between
//! actions.
//!
//! A [`ResourcePlan`] is produced by [`build`] from a
//! [`ResolvedConfig`](crate::resolver::ResolvedConfig) and consumed by the
//! convergence engine. Plans are plain data: building twice from the same
//! input yields equal plans.
mod builder;
mod graph;

use std::fmt;
use std::path::PathBuf;

use serde::{Serialize, Serializer};

use crate::error::PlanError;

pub use builder::{IMPORT_MANIFEST, build};

/// Stable identifier of an action, formatted `<label>[<target>]`.
///
/// # Examples
///
/// ```
/// use rsyslog_cookbook::plan::{ActionId, ActionKind};
///
/// let id = ActionId::new(ActionKind::InstallPackage, "rsyslog");
/// assert_eq!(id.as_str(), "package[rsyslog]");
/// ```
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(transparent)]
pub struct ActionId(String);

impl ActionId {
    /// Build the identifier for an action of `kind` on `target`.
    #[must_use]
    pub fn new(kind: ActionKind, target: impl fmt::Display) -> Self {
        Self(format!("{}[{target}]", kind.label()))
    }

    /// The identifier text.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ActionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl PartialEq<str> for ActionId {
    fn eq(&self, other: &str) -> bool {
        self.0 == other
    }
}

impl PartialEq<&str> for ActionId {
    fn eq(&self, other: &&str) -> bool {
        self.0 == *other
    }
}

/// Fieldless discriminant of [`ActionPayload`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ActionKind {
    /// Install a package.
    InstallPackage,
    /// Create a directory.
    Directory,
    /// Render a file from a template.
    RenderFile,
    /// Enable a service at boot.
    ServiceEnable,
    /// Start a service.
    ServiceStart,
    /// Stop a service.
    ServiceStop,
    /// Disable a service at boot.
    ServiceDisable,
    /// Run a command.
    Execute,
}

impl ActionKind {
    /// Label used as the [`ActionId`] prefix.
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::InstallPackage => "package",
            Self::Directory => "directory",
            Self::RenderFile => "template",
            Self::ServiceEnable => "service_enable",
            Self::ServiceStart => "service_start",
            Self::ServiceStop => "service_stop",
            Self::ServiceDisable => "service_disable",
            Self::Execute => "execute",
        }
    }
}

impl fmt::Display for ActionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Path, permissions and ownership of a managed directory or file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FileSpec {
    /// Absolute path on the target host.
    pub path: PathBuf,
    /// Permission bits.
    #[serde(serialize_with = "serialize_mode")]
    pub mode: u32,
    /// Owning user.
    pub owner: String,
    /// Owning group.
    pub group: String,
}

impl FileSpec {
    /// Create a spec for `path`.
    #[must_use]
    pub fn new(path: impl Into<PathBuf>, mode: u32, owner: &str, group: &str) -> Self {
        Self {
            path: path.into(),
            mode,
            owner: owner.to_string(),
            group: group.to_string(),
        }
    }

    /// Mode formatted as four octal digits (`0755`).
    #[must_use]
    pub fn mode_string(&self) -> String {
        format!("{:04o}", self.mode)
    }
}

fn serialize_mode<S: Serializer>(mode: &u32, serializer: S) -> Result<S::Ok, S::Error> {
    serializer.serialize_str(&format!("{mode:04o}"))
}

/// What an action does.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ActionPayload {
    /// Install a package.
    InstallPackage {
        /// Package name.
        name: String,
    },
    /// Create a directory.
    Directory {
        /// Directory path and ownership.
        spec: FileSpec,
    },
    /// Write rendered content to a file.
    RenderFile {
        /// File path and ownership.
        spec: FileSpec,
        /// Name of the template the content came from.
        template: String,
        /// Rendered content.
        #[serde(skip)]
        content: String,
    },
    /// Enable a service at boot.
    ServiceEnable {
        /// Service name.
        service: String,
    },
    /// Start a service.
    ServiceStart {
        /// Service name.
        service: String,
    },
    /// Stop a service.
    ServiceStop {
        /// Service name.
        service: String,
    },
    /// Disable a service at boot.
    ServiceDisable {
        /// Service name.
        service: String,
    },
    /// Run a command.
    Execute {
        /// Human-readable name; also the id target.
        name: String,
        /// Command line.
        command: String,
        /// Only run when notified.
        on_notify_only: bool,
    },
}

impl ActionPayload {
    /// Kind of this payload.
    #[must_use]
    pub const fn kind(&self) -> ActionKind {
        match self {
            Self::InstallPackage { .. } => ActionKind::InstallPackage,
            Self::Directory { .. } => ActionKind::Directory,
            Self::RenderFile { .. } => ActionKind::RenderFile,
            Self::ServiceEnable { .. } => ActionKind::ServiceEnable,
            Self::ServiceStart { .. } => ActionKind::ServiceStart,
            Self::ServiceStop { .. } => ActionKind::ServiceStop,
            Self::ServiceDisable { .. } => ActionKind::ServiceDisable,
            Self::Execute { .. } => ActionKind::Execute,
        }
    }

    fn target(&self) -> String {
        match self {
            Self::InstallPackage { name } | Self::Execute { name, .. } => name.clone(),
            Self::Directory { spec } | Self::RenderFile { spec, .. } => {
                spec.path.display().to_string()
            }
            Self::ServiceEnable { service }
            | Self::ServiceStart { service }
            | Self::ServiceStop { service }
            | Self::ServiceDisable { service } => service.clone(),
        }
    }
}

/// One step of the plan.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ResourceAction {
    /// Identifier, derived from the payload.
    pub id: ActionId,
    /// What to do.
    #[serde(flatten)]
    pub payload: ActionPayload,
}

impl ResourceAction {
    /// Wrap `payload`, deriving its identifier.
    #[must_use]
    pub fn new(payload: ActionPayload) -> Self {
        Self {
            id: ActionId::new(payload.kind(), payload.target()),
            payload,
        }
    }

    /// Kind of this action.
    #[must_use]
    pub const fn kind(&self) -> ActionKind {
        self.payload.kind()
    }
}

/// Verb a notification asks the target to perform.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum NotifyVerb {
    /// Restart a service.
    Restart,
    /// Run a command.
    Run,
}

impl fmt::Display for NotifyVerb {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Restart => write!(f, "restart"),
            Self::Run => write!(f, "run"),
        }
    }
}

/// When a notification fires relative to the pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum NotifyTiming {
    /// Queued, deduplicated, and fired once after the last action.
    Delayed,
    /// Fired right after the source action.
    Immediate,
}

impl fmt::Display for NotifyTiming {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Delayed => write!(f, "delayed"),
            Self::Immediate => write!(f, "immediate"),
        }
    }
}

/// "When `source` changes, ask `target` to `verb`."
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct NotificationEdge {
    /// Notifying action.
    pub source: ActionId,
    /// Notified action.
    pub target: ActionId,
    /// Requested verb.
    pub verb: NotifyVerb,
    /// Firing time.
    pub timing: NotifyTiming,
}

impl fmt::Display for NotificationEdge {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} -> {} ({}, {})",
            self.source, self.target, self.verb, self.timing
        )
    }
}

/// Ordered actions and the notification edges between them.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ResourcePlan {
    /// Actions in application order.
    pub actions: Vec<ResourceAction>,
    /// Notification edges, in declaration order.
    pub edges: Vec<NotificationEdge>,
}

impl ResourcePlan {
    /// Look up an action by id.
    #[must_use]
    pub fn action(&self, id: &str) -> Option<&ResourceAction> {
        self.actions.iter().find(|a| a.id == id)
    }

    /// Position of an action in the list.
    #[must_use]
    pub fn position(&self, id: &str) -> Option<usize> {
        self.actions.iter().position(|a| a.id == id)
    }

    /// Actions of the given kind, in order.
    pub fn actions_of(&self, kind: ActionKind) -> impl Iterator<Item = &ResourceAction> {
        self.actions.iter().filter(move |a| a.kind() == kind)
    }

    /// Edges whose source is `id`.
    pub fn edges_from<'a>(&'a self, id: &'a str) -> impl Iterator<Item = &'a NotificationEdge> {
        self.edges.iter().filter(move |e| e.source == id)
    }

    /// Whether the plan installs `name`.
    #[must_use]
    pub fn installs_package(&self, name: &str) -> bool {
        self.actions.iter().any(|a| {
            matches!(&a.payload, ActionPayload::InstallPackage { name: n } if n == name)
        })
    }

    /// Action ids in order.
    #[must_use]
    pub fn ids(&self) -> Vec<&str> {
        self.actions.iter().map(|a| a.id.as_str()).collect()
    }

    /// Check the plan invariants: unique ids, known edge endpoints,
    /// edges pointing forward, and no notification cycles.
    ///
    /// # Errors
    ///
    /// Returns the first violated invariant as a [`PlanError`].
    pub fn validate(&self) -> Result<(), PlanError> {
        graph::validate(self)
    }
}

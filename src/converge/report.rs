//! Per-pass convergence report.
use std::fmt;

use serde::Serialize;

use super::ApplyResult;
use crate::plan::{ActionId, NotifyTiming, NotifyVerb};

/// Result of applying one plan action.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ActionOutcome {
    /// Action identifier.
    pub id: ActionId,
    /// What happened.
    pub result: ApplyResult,
}

/// A notification that fired during the pass.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FiredNotification {
    /// Notifying action; `None` for a flushed delayed notification, which
    /// may have been queued by several sources.
    pub source: Option<ActionId>,
    /// Notified action.
    pub target: ActionId,
    /// Requested verb.
    pub verb: NotifyVerb,
    /// When it fired.
    pub timing: NotifyTiming,
    /// What the notified action reported.
    pub result: ApplyResult,
}

/// Everything that happened during one convergence pass.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ConvergeReport {
    /// Action outcomes in application order.
    pub outcomes: Vec<ActionOutcome>,
    /// Notifications in firing order.
    pub notifications: Vec<FiredNotification>,
}

impl ConvergeReport {
    fn count(&self, result: ApplyResult) -> usize {
        self.outcomes.iter().filter(|o| o.result == result).count()
    }

    /// Number of actions that changed the host.
    #[must_use]
    pub fn changed(&self) -> usize {
        self.count(ApplyResult::Changed)
    }

    /// Number of actions that were already in the desired state.
    #[must_use]
    pub fn unchanged(&self) -> usize {
        self.count(ApplyResult::Unchanged)
    }

    /// Number of notify-only actions that did not run.
    #[must_use]
    pub fn deferred(&self) -> usize {
        self.count(ApplyResult::Deferred)
    }

    /// Outcome of the action with `id`, if it was applied.
    #[must_use]
    pub fn outcome(&self, id: &str) -> Option<ApplyResult> {
        self.outcomes.iter().find(|o| o.id == id).map(|o| o.result)
    }

    /// Whether any notification targeted `id`.
    #[must_use]
    pub fn was_notified(&self, id: &str) -> bool {
        self.notifications.iter().any(|n| n.target == id)
    }

    /// Whether the pass left the host untouched.
    #[must_use]
    pub fn is_noop(&self) -> bool {
        self.changed() == 0 && self.notifications.is_empty()
    }

    /// One-line summary, e.g. `3 changed, 4 already ok`.
    #[must_use]
    pub fn summary(&self) -> String {
        let mut line = format!("{} changed, {} already ok", self.changed(), self.unchanged());
        let deferred = self.deferred();
        if deferred > 0 {
            line.push_str(&format!(", {deferred} deferred"));
        }
        if !self.notifications.is_empty() {
            line.push_str(&format!(", {} notification(s)", self.notifications.len()));
        }
        line
    }
}

impl fmt::Display for ConvergeReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for outcome in &self.outcomes {
            let marker = match outcome.result {
                ApplyResult::Changed => "changed",
                ApplyResult::Unchanged => "ok",
                ApplyResult::Deferred => "deferred",
            };
            writeln!(f, "  {marker:<8} {}", outcome.id)?;
        }
        for n in &self.notifications {
            let source = n
                .source
                .as_ref()
                .map_or_else(|| "queued".to_string(), ToString::to_string);
            writeln!(f, "  notify   {} {} ({source}, {})", n.verb, n.target, n.timing)?;
        }
        write!(f, "  {}", self.summary())
    }
}

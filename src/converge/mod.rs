//! Convergence: apply a [`ResourcePlan`] through a [`Provider`] and fire
//! notifications.
//!
//! Actions are applied in list order. An edge fires only when its source
//! reports [`ApplyResult::Changed`]. Immediate edges fire at once; delayed
//! edges are queued once per `(target, verb)` and flushed after the last
//! action. The first error aborts the run.
mod report;
mod simulated;

use std::collections::{HashSet, VecDeque};

use crate::error::ApplyError;
use crate::plan::{ActionId, NotifyTiming, NotifyVerb, ResourceAction, ResourcePlan};

pub use report::{ActionOutcome, ConvergeReport, FiredNotification};
pub use simulated::{FileState, ServiceState, SimulatedHost, checksum};

/// Outcome of applying one action or notification.
///
/// # Examples
///
/// ```
/// use rsyslog_cookbook::converge::ApplyResult;
///
/// assert!(ApplyResult::Changed.is_changed());
/// assert!(!ApplyResult::Deferred.is_changed());
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ApplyResult {
    /// The host was modified.
    Changed,
    /// The host already matched.
    Unchanged,
    /// The action only runs when notified and was not.
    Deferred,
}

impl ApplyResult {
    /// Whether this result fires outgoing notifications.
    #[must_use]
    pub const fn is_changed(self) -> bool {
        matches!(self, Self::Changed)
    }
}

/// Something that can bring a host in line with plan actions.
pub trait Provider {
    /// Bring the host to the state `action` describes.
    ///
    /// # Errors
    ///
    /// Returns [`ApplyError`] if the action cannot be applied.
    fn apply(&mut self, action: &ResourceAction) -> Result<ApplyResult, ApplyError>;

    /// Perform `verb` on `action` in response to a notification.
    ///
    /// # Errors
    ///
    /// Returns [`ApplyError::UnsupportedNotification`] if `verb` makes no
    /// sense for `action`, or [`ApplyError::ActionFailed`] if it fails.
    fn notify(&mut self, action: &ResourceAction, verb: NotifyVerb)
    -> Result<ApplyResult, ApplyError>;
}

/// Run state for one pass.
struct Run<'a, P: ?Sized> {
    plan: &'a ResourcePlan,
    provider: &'a mut P,
    report: ConvergeReport,
    delayed: VecDeque<(ActionId, NotifyVerb)>,
    queued: HashSet<(ActionId, NotifyVerb)>,
}

impl<P: Provider + ?Sized> Run<'_, P> {
    /// Fire the edges leaving `source`, which just changed.
    fn fire(&mut self, source: &ActionId) -> Result<(), ApplyError> {
        let plan = self.plan;
        for edge in plan.edges_from(source.as_str()) {
            match edge.timing {
                NotifyTiming::Immediate => {
                    let result = self.deliver(source, &edge.target, edge.verb, edge.timing)?;
                    if result.is_changed() {
                        self.fire(&edge.target)?;
                    }
                }
                NotifyTiming::Delayed => {
                    let key = (edge.target.clone(), edge.verb);
                    if self.queued.insert(key.clone()) {
                        tracing::debug!("queued {} {} from {source}", edge.verb, edge.target);
                        self.delayed.push_back(key);
                    }
                }
            }
        }
        Ok(())
    }

    fn deliver(
        &mut self,
        source: &ActionId,
        target: &ActionId,
        verb: NotifyVerb,
        timing: NotifyTiming,
    ) -> Result<ApplyResult, ApplyError> {
        let plan = self.plan;
        let action = plan
            .action(target.as_str())
            .ok_or_else(|| ApplyError::ActionFailed {
                action: target.to_string(),
                reason: "notified action is not part of the plan".to_string(),
            })?;
        tracing::debug!("{source} notifies {target} to {verb} ({timing})");
        let result = self.provider.notify(action, verb)?;
        self.report.notifications.push(FiredNotification {
            source: Some(source.clone()),
            target: target.clone(),
            verb,
            timing,
            result,
        });
        Ok(result)
    }

    fn flush(&mut self) -> Result<(), ApplyError> {
        while let Some((target, verb)) = self.delayed.pop_front() {
            let plan = self.plan;
            let action = plan
                .action(target.as_str())
                .ok_or_else(|| ApplyError::ActionFailed {
                    action: target.to_string(),
                    reason: "notified action is not part of the plan".to_string(),
                })?;
            tracing::debug!("delayed {verb} of {target}");
            let result = self.provider.notify(action, verb)?;
            self.report.notifications.push(FiredNotification {
                source: None,
                target: target.clone(),
                verb,
                timing: NotifyTiming::Delayed,
                result,
            });
            if result.is_changed() {
                self.fire(&target)?;
            }
        }
        Ok(())
    }
}

/// Apply `plan` through `provider`.
///
/// # Errors
///
/// Returns the first [`ApplyError`]; actions after the failing one are not
/// applied and queued notifications are dropped.
///
/// # Examples
///
/// ```
/// use rsyslog_cookbook::config::ConfigInput;
/// use rsyslog_cookbook::converge::{SimulatedHost, converge};
/// use rsyslog_cookbook::plan::build;
/// use rsyslog_cookbook::platform::PlatformProfile;
/// use rsyslog_cookbook::resolver::resolve;
///
/// let platform = PlatformProfile::new("ubuntu", "16.04").unwrap();
/// let plan = build(&resolve(&ConfigInput::default(), &platform).unwrap()).unwrap();
/// let mut host = SimulatedHost::fixture(&platform);
///
/// let first = converge(&plan, &mut host).unwrap();
/// assert!(first.changed() > 0);
/// let second = converge(&plan, &mut host).unwrap();
/// assert_eq!(second.changed(), 0);
/// ```
pub fn converge<P: Provider + ?Sized>(
    plan: &ResourcePlan,
    provider: &mut P,
) -> Result<ConvergeReport, ApplyError> {
    let mut run = Run {
        plan,
        provider,
        report: ConvergeReport::default(),
        delayed: VecDeque::new(),
        queued: HashSet::new(),
    };

    for action in &plan.actions {
        let result = run.provider.apply(action)?;
        tracing::debug!("{}: {result:?}", action.id);
        run.report.outcomes.push(ActionOutcome {
            id: action.id.clone(),
            result,
        });
        if result.is_changed() {
            run.fire(&action.id)?;
        }
    }
    run.flush()?;

    tracing::debug!("converge finished: {}", run.report.summary());
    Ok(run.report)
}

#[cfg(test)]
#[allow(clippy::expect_used, clippy::unwrap_used, clippy::indexing_slicing)]
mod tests {
    use super::*;
    use crate::plan::{ActionKind, ActionPayload, NotificationEdge};

    /// Provider that replays a fixed result per action id and records calls.
    #[derive(Debug, Default)]
    struct ScriptedProvider {
        changed: HashSet<String>,
        fail: Option<String>,
        calls: Vec<String>,
    }

    impl ScriptedProvider {
        fn changing(ids: &[&str]) -> Self {
            Self {
                changed: ids.iter().map(ToString::to_string).collect(),
                ..Self::default()
            }
        }
    }

    impl Provider for ScriptedProvider {
        fn apply(&mut self, action: &ResourceAction) -> Result<ApplyResult, ApplyError> {
            self.calls.push(format!("apply {}", action.id));
            if self.fail.as_deref() == Some(action.id.as_str()) {
                return Err(ApplyError::ActionFailed {
                    action: action.id.to_string(),
                    reason: "boom".to_string(),
                });
            }
            Ok(if self.changed.contains(action.id.as_str()) {
                ApplyResult::Changed
            } else {
                ApplyResult::Unchanged
            })
        }

        fn notify(
            &mut self,
            action: &ResourceAction,
            verb: NotifyVerb,
        ) -> Result<ApplyResult, ApplyError> {
            self.calls.push(format!("{verb} {}", action.id));
            Ok(ApplyResult::Changed)
        }
    }

    fn service(name: &str) -> ResourceAction {
        ResourceAction::new(ActionPayload::ServiceStart {
            service: name.to_string(),
        })
    }

    fn id(name: &str) -> ActionId {
        ActionId::new(ActionKind::ServiceStart, name)
    }

    fn edge(source: &str, target: &str, timing: NotifyTiming) -> NotificationEdge {
        NotificationEdge {
            source: id(source),
            target: id(target),
            verb: NotifyVerb::Restart,
            timing,
        }
    }

    fn plan(names: &[&str], edges: Vec<NotificationEdge>) -> ResourcePlan {
        ResourcePlan {
            actions: names.iter().map(|n| service(n)).collect(),
            edges,
        }
    }

    #[test]
    fn unchanged_source_fires_nothing() {
        let p = plan(&["a", "b"], vec![edge("a", "b", NotifyTiming::Delayed)]);
        let mut provider = ScriptedProvider::default();
        let report = converge(&p, &mut provider).unwrap();
        assert!(report.notifications.is_empty());
        assert_eq!(report.unchanged(), 2);
    }

    #[test]
    fn delayed_edges_fire_once_after_last_action() {
        let p = plan(
            &["a", "b", "svc"],
            vec![
                edge("a", "svc", NotifyTiming::Delayed),
                edge("b", "svc", NotifyTiming::Delayed),
            ],
        );
        let mut provider = ScriptedProvider::changing(&["service_start[a]", "service_start[b]"]);
        let report = converge(&p, &mut provider).unwrap();
        assert_eq!(
            provider.calls,
            [
                "apply service_start[a]",
                "apply service_start[b]",
                "apply service_start[svc]",
                "restart service_start[svc]",
            ]
        );
        assert_eq!(report.notifications.len(), 1);
        assert_eq!(report.notifications[0].source, None);
    }

    #[test]
    fn immediate_edges_fire_before_next_action_and_cascade() {
        let p = plan(
            &["a", "b", "c"],
            vec![
                edge("a", "b", NotifyTiming::Immediate),
                edge("b", "c", NotifyTiming::Delayed),
            ],
        );
        let mut provider = ScriptedProvider::changing(&["service_start[a]"]);
        let report = converge(&p, &mut provider).unwrap();
        assert_eq!(
            provider.calls,
            [
                "apply service_start[a]",
                "restart service_start[b]",
                "apply service_start[b]",
                "apply service_start[c]",
                "restart service_start[c]",
            ]
        );
        assert_eq!(report.notifications[0].source, Some(id("a")));
        assert_eq!(report.notifications[0].timing, NotifyTiming::Immediate);
    }

    #[test]
    fn failure_aborts_remaining_actions() {
        let p = plan(&["a", "b", "c"], vec![edge("a", "c", NotifyTiming::Delayed)]);
        let mut provider = ScriptedProvider {
            fail: Some("service_start[b]".to_string()),
            ..ScriptedProvider::changing(&["service_start[a]"])
        };
        let err = converge(&p, &mut provider).unwrap_err();
        assert!(matches!(err, ApplyError::ActionFailed { ref action, .. } if action == "service_start[b]"));
        assert_eq!(provider.calls, ["apply service_start[a]", "apply service_start[b]"]);
    }

    #[test]
    fn apply_result_changed() {
        assert!(ApplyResult::Changed.is_changed());
        assert!(!ApplyResult::Unchanged.is_changed());
        assert!(!ApplyResult::Deferred.is_changed());
    }
}

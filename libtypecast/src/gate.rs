//! Scheduling safety gate
//!
//! Every draft that reaches the publishing client passes through here first.
//! When scheduling is disabled in configuration, any schedule directive is
//! dropped and the draft is created unscheduled. The client only accepts
//! [`Approved`] payloads, and only this module can construct one.

use serde::Serialize;

use crate::config::Settings;
use crate::types::{DraftRequest, DraftUpdate, ScheduleDirective};

/// Outcome of running a directive through the gate
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct GateDecision {
    /// Directive the caller asked for
    pub requested: Option<ScheduleDirective>,
    /// Directive that will actually be sent
    pub effective: Option<ScheduleDirective>,
    /// True when a requested directive was dropped
    pub downgraded: bool,
}

/// Apply the gate to a single directive
///
/// With `enabled == true` the directive passes through untouched, otherwise
/// the effective directive is always `None`.
pub fn apply(directive: Option<ScheduleDirective>, enabled: bool) -> GateDecision {
    if enabled {
        return GateDecision {
            requested: directive.clone(),
            effective: directive,
            downgraded: false,
        };
    }

    GateDecision {
        downgraded: directive.is_some(),
        requested: directive,
        effective: None,
    }
}

/// A payload that has been through the safety gate
#[derive(Debug, Clone, PartialEq)]
pub struct Approved<T> {
    inner: T,
    decision: GateDecision,
}

impl<T> Approved<T> {
    pub fn get(&self) -> &T {
        &self.inner
    }

    pub fn decision(&self) -> &GateDecision {
        &self.decision
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SafetyGate {
    enabled: bool,
}

impl SafetyGate {
    pub fn new(scheduling_enabled: bool) -> Self {
        Self {
            enabled: scheduling_enabled,
        }
    }

    pub fn from_settings(settings: &Settings) -> Self {
        Self::new(settings.scheduling_enabled)
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    /// Evaluate a directive, logging a warning if it gets dropped
    pub fn check(&self, directive: Option<ScheduleDirective>) -> GateDecision {
        let decision = apply(directive, self.enabled);
        if decision.downgraded {
            if let Some(requested) = &decision.requested {
                tracing::warn!(
                    "Scheduling is disabled; ignoring schedule '{}' and creating an unscheduled draft",
                    requested
                );
            }
        }
        decision
    }

    /// Gate a new draft
    pub fn approve(&self, mut request: DraftRequest) -> Approved<DraftRequest> {
        let decision = self.check(request.schedule.take());
        request.schedule = decision.effective.clone();
        Approved {
            inner: request,
            decision,
        }
    }

    /// Gate an update to an existing draft
    pub fn approve_update(&self, mut update: DraftUpdate) -> Approved<DraftUpdate> {
        let decision = self.check(update.schedule.take());
        update.schedule = decision.effective.clone();
        Approved {
            inner: update,
            decision,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{Platform, PlatformContent};
    use chrono::{TimeZone, Utc};
    use std::collections::BTreeMap;

    fn at() -> ScheduleDirective {
        ScheduleDirective::At(Utc.with_ymd_and_hms(2030, 1, 1, 9, 0, 0).unwrap())
    }

    fn request(schedule: Option<ScheduleDirective>) -> DraftRequest {
        let mut platforms = BTreeMap::new();
        platforms.insert(Platform::X, PlatformContent::from_posts(&["hi".to_string()]));
        DraftRequest {
            platforms,
            title: None,
            tags: vec![],
            schedule,
            share: false,
        }
    }

    #[test]
    fn test_disabled_gate_drops_every_directive() {
        for directive in [ScheduleDirective::Now, ScheduleDirective::NextFreeSlot, at()] {
            let decision = apply(Some(directive.clone()), false);
            assert_eq!(decision.effective, None);
            assert_eq!(decision.requested, Some(directive));
            assert!(decision.downgraded);
        }
    }

    #[test]
    fn test_disabled_gate_without_directive_is_not_a_downgrade() {
        let decision = apply(None, false);
        assert_eq!(decision.effective, None);
        assert!(!decision.downgraded);
    }

    #[test]
    fn test_enabled_gate_is_identity() {
        for directive in [None, Some(ScheduleDirective::Now), Some(at())] {
            let decision = apply(directive.clone(), true);
            assert_eq!(decision.effective, directive);
            assert!(!decision.downgraded);
        }
    }

    #[test]
    fn test_approve_strips_schedule_when_disabled() {
        let approved = SafetyGate::new(false).approve(request(Some(ScheduleDirective::Now)));
        assert_eq!(approved.get().schedule, None);
        assert!(approved.decision().downgraded);

        let payload = serde_json::to_value(approved.get()).unwrap();
        assert!(payload.get("publish_at").is_none());
    }

    #[test]
    fn test_approve_keeps_schedule_when_enabled() {
        let approved = SafetyGate::new(true).approve(request(Some(at())));
        assert_eq!(approved.get().schedule, Some(at()));
        assert!(!approved.decision().downgraded);
    }

    #[test]
    fn test_approve_update_is_gated_too() {
        let update = DraftUpdate {
            schedule: Some(ScheduleDirective::NextFreeSlot),
            ..Default::default()
        };
        let approved = SafetyGate::new(false).approve_update(update);
        assert_eq!(approved.get().schedule, None);
        assert!(approved.decision().downgraded);
    }

    #[test]
    fn test_gate_from_default_settings_is_disabled() {
        assert!(!SafetyGate::from_settings(&Settings::default()).is_enabled());
    }
}

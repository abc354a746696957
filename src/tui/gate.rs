//! Tab navigation gate and the transient notification it raises.

use std::time::{Duration, Instant};

pub const DENIED_MESSAGE: &str = "Please run the pipeline first.";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Tab {
    #[default]
    Pipeline,
    Performance,
    Charts,
}

impl Tab {
    pub const ALL: [Tab; 3] = [Tab::Pipeline, Tab::Performance, Tab::Charts];

    pub fn title(self) -> &'static str {
        match self {
            Tab::Pipeline => "Pipeline",
            Tab::Performance => "Performance & AI",
            Tab::Charts => "Charts",
        }
    }

    pub fn index(self) -> usize {
        match self {
            Tab::Pipeline => 0,
            Tab::Performance => 1,
            Tab::Charts => 2,
        }
    }

    pub fn next(self) -> Tab {
        Self::ALL[(self.index() + 1) % Self::ALL.len()]
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GateDecision {
    Allow,
    Deny,
}

/// Pipeline is always reachable; the data tabs only once a run has completed.
pub fn check(completed: bool, target: Tab) -> GateDecision {
    if target == Tab::Pipeline || completed {
        GateDecision::Allow
    } else {
        GateDecision::Deny
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notification {
    pub message: String,
    pub expires_at: Instant,
}

/// Holds at most one notification; a newer one replaces the current one and
/// its deadline.
#[derive(Debug)]
pub struct Notifier {
    current: Option<Notification>,
    ttl: Duration,
}

impl Notifier {
    pub fn new(ttl: Duration) -> Self {
        Self { current: None, ttl }
    }

    pub fn notify(&mut self, message: impl Into<String>, now: Instant) {
        self.current = Some(Notification {
            message: message.into(),
            expires_at: now + self.ttl,
        });
    }

    /// Drop the notification once its deadline has passed.
    pub fn expire(&mut self, now: Instant) {
        if self
            .current
            .as_ref()
            .is_some_and(|n| now >= n.expires_at)
        {
            self.current = None;
        }
    }

    pub fn active(&self, now: Instant) -> Option<&Notification> {
        self.current.as_ref().filter(|n| now < n.expires_at)
    }
}

/// Active tab plus the gate in front of it.
#[derive(Debug)]
pub struct TabNavigator {
    active: Tab,
    notifier: Notifier,
}

impl TabNavigator {
    pub fn new(notification_ttl: Duration) -> Self {
        Self {
            active: Tab::Pipeline,
            notifier: Notifier::new(notification_ttl),
        }
    }

    pub fn active(&self) -> Tab {
        self.active
    }

    pub fn notifier(&self) -> &Notifier {
        &self.notifier
    }

    pub fn notifier_mut(&mut self) -> &mut Notifier {
        &mut self.notifier
    }

    /// Switch to `target` if the gate allows it. A denial keeps the active tab
    /// and raises the "run first" notification.
    pub fn request(&mut self, target: Tab, completed: bool, now: Instant) -> GateDecision {
        let decision = check(completed, target);
        match decision {
            GateDecision::Allow => self.active = target,
            GateDecision::Deny => {
                tracing::debug!(tab = target.title(), "navigation denied");
                self.notifier.notify(DENIED_MESSAGE, now);
            }
        }
        decision
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const TTL: Duration = Duration::from_millis(3000);

    #[test]
    fn pipeline_is_always_allowed() {
        assert_eq!(check(false, Tab::Pipeline), GateDecision::Allow);
        assert_eq!(check(true, Tab::Pipeline), GateDecision::Allow);
    }

    #[test]
    fn data_tabs_need_a_completed_run() {
        for tab in [Tab::Performance, Tab::Charts] {
            assert_eq!(check(false, tab), GateDecision::Deny);
            assert_eq!(check(true, tab), GateDecision::Allow);
        }
    }

    #[test]
    fn denial_keeps_tab_and_notifies() {
        let now = Instant::now();
        let mut nav = TabNavigator::new(TTL);
        assert_eq!(nav.request(Tab::Charts, false, now), GateDecision::Deny);
        assert_eq!(nav.active(), Tab::Pipeline);
        let n = nav.notifier().active(now).unwrap();
        assert_eq!(n.message, DENIED_MESSAGE);
        assert_eq!(n.expires_at, now + TTL);
    }

    #[test]
    fn allowed_request_switches_without_notification() {
        let now = Instant::now();
        let mut nav = TabNavigator::new(TTL);
        assert_eq!(nav.request(Tab::Performance, true, now), GateDecision::Allow);
        assert_eq!(nav.active(), Tab::Performance);
        assert!(nav.notifier().active(now).is_none());
        nav.request(Tab::Pipeline, true, now);
        assert_eq!(nav.active(), Tab::Pipeline);
    }

    #[test]
    fn notification_clears_after_ttl() {
        let t0 = Instant::now();
        let mut nav = TabNavigator::new(TTL);
        nav.request(Tab::Performance, false, t0);

        let just_before = t0 + Duration::from_millis(2999);
        nav.notifier_mut().expire(just_before);
        assert!(nav.notifier().active(just_before).is_some());

        let at_deadline = t0 + TTL;
        assert!(nav.notifier().active(at_deadline).is_none());
        nav.notifier_mut().expire(at_deadline);
        assert!(nav.notifier().active(just_before).is_none());
    }

    #[test]
    fn newer_denial_replaces_deadline() {
        let t0 = Instant::now();
        let mut nav = TabNavigator::new(TTL);
        nav.request(Tab::Performance, false, t0);
        let t1 = t0 + Duration::from_millis(2000);
        nav.request(Tab::Charts, false, t1);

        // The first deadline has passed but the replacement is still showing.
        let t2 = t0 + Duration::from_millis(3500);
        nav.notifier_mut().expire(t2);
        let n = nav.notifier().active(t2).unwrap();
        assert_eq!(n.expires_at, t1 + TTL);

        nav.notifier_mut().expire(t1 + TTL);
        assert!(nav.notifier().active(t1 + TTL).is_none());
    }

    #[test]
    fn tab_cycles_in_order() {
        assert_eq!(Tab::Pipeline.next(), Tab::Performance);
        assert_eq!(Tab::Performance.next(), Tab::Charts);
        assert_eq!(Tab::Charts.next(), Tab::Pipeline);
        assert_eq!(Tab::Performance.title(), "Performance & AI");
    }
}

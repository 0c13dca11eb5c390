use std::time::{Duration, Instant};

use tracing::{info, warn};

use crate::attention::{AttentionSignal, AttentionSource};

pub const DEFAULT_MAX_WARNINGS: u32 = 3;
pub const DEFAULT_NOTICE_DELAY: Duration = Duration::from_secs(3);

pub const NOTICE_HEADLINE: &str = "Warning! Please return to the quiz!";

/// One counted attention loss
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Violation {
    pub signal: AttentionSignal,
    pub count: u32,
    /// True only for the violation that first reaches the threshold
    pub threshold_reached: bool,
}

/// Blocking notice shown after a violation
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WarningNotice {
    pub count: u32,
    pub max_warnings: u32,
    pub raised_at: Instant,
}

impl WarningNotice {
    pub fn headline(&self) -> &'static str {
        NOTICE_HEADLINE
    }

    pub fn message(&self) -> String {
        if self.count >= self.max_warnings {
            "You have exceeded the maximum warnings. Your quiz has been submitted.".to_string()
        } else {
            format!("Warning {} of {}", self.count, self.max_warnings)
        }
    }
}

/// Whether the participant is currently looking at the quiz
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Presence {
    hidden: bool,
    focused: bool,
}

impl Presence {
    fn returned() -> Self {
        Self {
            hidden: false,
            focused: true,
        }
    }

    fn is_present(&self) -> bool {
        !self.hidden && self.focused
    }
}

/// Counts attention losses for one session.
pub struct ProctorMonitor {
    source: Box<dyn AttentionSource>,
    armed: bool,
    warning_count: u32,
    max_warnings: u32,
    notice_delay: Duration,
    presence: Presence,
    notice: Option<WarningNotice>,
}

impl ProctorMonitor {
    pub fn new(source: impl AttentionSource + 'static) -> Self {
        Self {
            source: Box::new(source),
            armed: false,
            warning_count: 0,
            max_warnings: DEFAULT_MAX_WARNINGS,
            notice_delay: DEFAULT_NOTICE_DELAY,
            presence: Presence::returned(),
            notice: None,
        }
    }

    /// Values below 1 are raised to 1.
    pub fn with_max_warnings(mut self, max_warnings: u32) -> Self {
        self.max_warnings = max_warnings.max(1);
        self
    }

    pub fn with_notice_delay(mut self, delay: Duration) -> Self {
        self.notice_delay = delay;
        self
    }

    /// Reset the count and start observing.
    pub fn arm(&mut self) -> std::io::Result<()> {
        self.source.subscribe()?;
        self.armed = true;
        self.warning_count = 0;
        self.presence = Presence::returned();
        self.notice = None;
        info!(max_warnings = self.max_warnings, "proctoring armed");
        Ok(())
    }

    /// Stop observing. Keeps the count; idempotent.
    pub fn disarm(&mut self) {
        if !self.armed {
            return;
        }
        self.armed = false;
        self.notice = None;
        if let Err(err) = self.source.unsubscribe() {
            warn!(%err, "failed to unsubscribe from attention signals");
        }
        info!(warnings = self.warning_count, "proctoring disarmed");
    }

    pub fn is_armed(&self) -> bool {
        self.armed
    }

    pub fn warning_count(&self) -> u32 {
        self.warning_count
    }

    pub fn max_warnings(&self) -> u32 {
        self.max_warnings
    }

    pub fn exceeded_threshold(&self) -> bool {
        self.warning_count >= self.max_warnings
    }

    /// Feed one signal. Returns the violation it caused, if any.
    /// Signals are ignored entirely while disarmed.
    pub fn observe(&mut self, signal: AttentionSignal, now: Instant) -> Option<Violation> {
        if !self.armed {
            return None;
        }

        match signal {
            AttentionSignal::VisibilityHidden => self.presence.hidden = true,
            AttentionSignal::VisibilityVisible => self.presence.hidden = false,
            AttentionSignal::FocusLost => self.presence.focused = false,
            AttentionSignal::FocusGained => self.presence.focused = true,
        }

        if !signal.is_loss() {
            self.refresh_notice(now);
            return None;
        }

        self.warning_count += 1;
        self.notice = Some(WarningNotice {
            count: self.warning_count,
            max_warnings: self.max_warnings,
            raised_at: now,
        });
        warn!(
            %signal,
            count = self.warning_count,
            max = self.max_warnings,
            "attention lost"
        );

        Some(Violation {
            signal,
            count: self.warning_count,
            threshold_reached: self.warning_count == self.max_warnings,
        })
    }

    /// Clear the notice once the delay has passed and the participant is back.
    pub fn refresh_notice(&mut self, now: Instant) {
        let expired = self.notice.as_ref().is_some_and(|n| {
            now.saturating_duration_since(n.raised_at) >= self.notice_delay
        });
        if expired && self.presence.is_present() {
            self.notice = None;
        }
    }

    pub fn notice(&self) -> Option<&WarningNotice> {
        self.notice.as_ref()
    }
}

impl std::fmt::Debug for ProctorMonitor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProctorMonitor")
            .field("armed", &self.armed)
            .field("warning_count", &self.warning_count)
            .field("max_warnings", &self.max_warnings)
            .field("notice", &self.notice)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::attention::ManualAttentionSource;

    fn armed_monitor() -> (ProctorMonitor, ManualAttentionSource) {
        let source = ManualAttentionSource::new();
        let mut monitor = ProctorMonitor::new(source.clone());
        monitor.arm().unwrap();
        (monitor, source)
    }

    #[test]
    fn three_hidden_signals_reach_threshold() {
        let (mut monitor, _) = armed_monitor();
        let now = Instant::now();

        let first = monitor.observe(AttentionSignal::VisibilityHidden, now).unwrap();
        let second = monitor.observe(AttentionSignal::VisibilityHidden, now).unwrap();
        assert!(!first.threshold_reached);
        assert!(!second.threshold_reached);
        assert!(!monitor.exceeded_threshold());

        let third = monitor.observe(AttentionSignal::VisibilityHidden, now).unwrap();
        assert_eq!(third.count, 3);
        assert!(third.threshold_reached);
        assert_eq!(monitor.warning_count(), 3);
        assert!(monitor.exceeded_threshold());
    }

    #[test]
    fn threshold_reached_only_once() {
        let (mut monitor, _) = armed_monitor();
        let now = Instant::now();

        let reached: Vec<bool> = (0..5)
            .filter_map(|_| monitor.observe(AttentionSignal::FocusLost, now))
            .map(|v| v.threshold_reached)
            .collect();

        assert_eq!(reached, vec![false, false, true, false, false]);
    }

    #[test]
    fn rearm_resets_count() {
        let (mut monitor, _) = armed_monitor();
        let now = Instant::now();
        for _ in 0..3 {
            monitor.observe(AttentionSignal::VisibilityHidden, now);
        }

        monitor.disarm();
        assert_eq!(monitor.warning_count(), 3);

        monitor.arm().unwrap();
        monitor.observe(AttentionSignal::VisibilityHidden, now);
        assert_eq!(monitor.warning_count(), 1);
        assert!(!monitor.exceeded_threshold());
    }

    #[test]
    fn signals_ignored_while_disarmed() {
        let source = ManualAttentionSource::new();
        let mut monitor = ProctorMonitor::new(source);
        let now = Instant::now();

        assert!(monitor.observe(AttentionSignal::FocusLost, now).is_none());
        assert_eq!(monitor.warning_count(), 0);

        monitor.arm().unwrap();
        monitor.disarm();
        assert!(monitor.observe(AttentionSignal::FocusLost, now).is_none());
        assert_eq!(monitor.warning_count(), 0);
    }

    #[test]
    fn arm_and_disarm_drive_subscription() {
        let (mut monitor, source) = armed_monitor();
        assert!(source.is_subscribed());

        monitor.disarm();
        monitor.disarm();
        assert!(!source.is_subscribed());
        assert_eq!(source.subscription_count(), 1);
    }

    #[test]
    fn return_signals_do_not_count() {
        let (mut monitor, _) = armed_monitor();
        let now = Instant::now();

        assert!(monitor.observe(AttentionSignal::FocusGained, now).is_none());
        assert!(monitor.observe(AttentionSignal::VisibilityVisible, now).is_none());
        assert_eq!(monitor.warning_count(), 0);
    }

    #[test]
    fn notice_clears_after_delay_when_participant_returned() {
        let (mut monitor, _) = armed_monitor();
        let t0 = Instant::now();

        monitor.observe(AttentionSignal::FocusLost, t0);
        monitor.observe(AttentionSignal::FocusGained, t0 + Duration::from_secs(1));
        assert!(monitor.notice().is_some());

        monitor.refresh_notice(t0 + Duration::from_secs(2));
        assert!(monitor.notice().is_some());

        monitor.refresh_notice(t0 + Duration::from_secs(3));
        assert!(monitor.notice().is_none());
    }

    #[test]
    fn notice_persists_until_participant_returns() {
        let (mut monitor, _) = armed_monitor();
        let t0 = Instant::now();

        monitor.observe(AttentionSignal::VisibilityHidden, t0);
        monitor.refresh_notice(t0 + Duration::from_secs(10));
        assert_eq!(monitor.notice().map(|n| n.count), Some(1));

        monitor.observe(AttentionSignal::VisibilityVisible, t0 + Duration::from_secs(11));
        assert!(monitor.notice().is_none());
    }

    #[test]
    fn later_violation_updates_notice() {
        let (mut monitor, _) = armed_monitor();
        let t0 = Instant::now();

        monitor.observe(AttentionSignal::FocusLost, t0);
        monitor.observe(AttentionSignal::FocusLost, t0 + Duration::from_secs(1));

        let notice = monitor.notice().unwrap();
        assert_eq!(notice.count, 2);
        assert_eq!(notice.message(), "Warning 2 of 3");
    }

    #[test]
    fn final_notice_mentions_submission() {
        let (mut monitor, _) = armed_monitor();
        let monitor_max = monitor.max_warnings();
        let now = Instant::now();
        for _ in 0..monitor_max {
            monitor.observe(AttentionSignal::FocusLost, now);
        }

        let notice = monitor.notice().unwrap();
        assert!(notice.message().contains("exceeded the maximum warnings"));
        assert_eq!(notice.headline(), NOTICE_HEADLINE);
    }

    #[test]
    fn custom_threshold() {
        let source = ManualAttentionSource::new();
        let mut monitor = ProctorMonitor::new(source).with_max_warnings(1);
        monitor.arm().unwrap();

        let v = monitor
            .observe(AttentionSignal::FocusLost, Instant::now())
            .unwrap();
        assert!(v.threshold_reached);
        assert!(monitor.exceeded_threshold());
    }
}

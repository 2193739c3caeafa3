use std::time::{Duration, Instant};

/// Cadence of the fetch-reconcile-repaint cycle while monitoring.
pub const POLL_INTERVAL: Duration = Duration::from_secs(5);

/// Lifecycle of a monitoring session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MonitorState {
    Stopped,
    /// Start requested, waiting for the backend acknowledgement.
    Starting,
    Running,
}

/// State machine governing polling and animation in lockstep with the
/// backend scan session.
///
/// Poll responses carry the epoch they were issued under. `begin_stop` bumps
/// the epoch, which invalidates everything still in flight: a response that
/// lands after the user stopped monitoring is dropped instead of applied.
/// The in-flight flag guarantees one tick fully completes before the next
/// fetch starts.
#[derive(Debug)]
pub struct MonitoringSession {
    state: MonitorState,
    poll_interval: Duration,
    next_poll_at: Option<Instant>,
    in_flight: bool,
    epoch: u64,
}

impl MonitoringSession {
    pub fn new(poll_interval: Duration) -> Self {
        Self {
            state: MonitorState::Stopped,
            poll_interval,
            next_poll_at: None,
            in_flight: false,
            epoch: 0,
        }
    }

    pub fn state(&self) -> MonitorState {
        self.state
    }

    pub fn is_running(&self) -> bool {
        self.state == MonitorState::Running
    }

    pub fn epoch(&self) -> u64 {
        self.epoch
    }

    /// User pressed start. Returns false when the session is not startable,
    /// so a double-click cannot issue two backend requests.
    pub fn begin_start(&mut self) -> bool {
        if self.state != MonitorState::Stopped {
            return false;
        }
        self.state = MonitorState::Starting;
        true
    }

    /// Backend acknowledged the start request: begin polling immediately
    /// rather than waiting out the first interval.
    pub fn confirm_start(&mut self, now: Instant) {
        if self.state == MonitorState::Starting {
            self.state = MonitorState::Running;
            self.next_poll_at = Some(now);
        }
    }

    /// The start request failed; fall back to stopped.
    pub fn fail_start(&mut self) {
        if self.state == MonitorState::Starting {
            self.state = MonitorState::Stopped;
        }
    }

    /// The backend is already scanning (page-load resume): enter RUNNING
    /// directly, skipping STARTING.
    pub fn adopt_running(&mut self, now: Instant) {
        if self.state == MonitorState::Stopped {
            self.state = MonitorState::Running;
            self.next_poll_at = Some(now);
        }
    }

    /// User pressed stop: cancel the cadence and invalidate whatever is
    /// still in flight.
    pub fn begin_stop(&mut self) {
        self.state = MonitorState::Stopped;
        self.next_poll_at = None;
        self.in_flight = false;
        self.epoch += 1;
    }

    /// True when a new poll should be issued now. Marks the poll in flight;
    /// the caller reports completion through `poll_finished`.
    pub fn poll_due(&mut self, now: Instant) -> bool {
        if self.state != MonitorState::Running || self.in_flight {
            return false;
        }
        match self.next_poll_at {
            Some(at) if now >= at => {
                self.in_flight = true;
                true
            }
            _ => false,
        }
    }

    /// A poll tick fully completed (applied or failed); schedule the next.
    pub fn poll_finished(&mut self, now: Instant) {
        self.in_flight = false;
        if self.state == MonitorState::Running {
            self.next_poll_at = Some(now + self.poll_interval);
        }
    }

    /// Whether a response tagged with `epoch` may still be applied.
    pub fn accepts(&self, epoch: u64) -> bool {
        self.state == MonitorState::Running && epoch == self.epoch
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn session() -> MonitoringSession {
        MonitoringSession::new(POLL_INTERVAL)
    }

    #[test]
    fn start_flow_polls_immediately_after_ack() {
        let now = Instant::now();
        let mut s = session();
        assert_eq!(s.state(), MonitorState::Stopped);
        assert!(!s.poll_due(now));

        assert!(s.begin_start());
        assert_eq!(s.state(), MonitorState::Starting);
        // Not yet acknowledged: no polling.
        assert!(!s.poll_due(now));

        s.confirm_start(now);
        assert!(s.is_running());
        assert!(s.poll_due(now));
    }

    #[test]
    fn double_start_is_rejected() {
        let mut s = session();
        assert!(s.begin_start());
        assert!(!s.begin_start());
        s.confirm_start(Instant::now());
        assert!(!s.begin_start());
    }

    #[test]
    fn in_flight_guard_blocks_overlapping_polls() {
        let now = Instant::now();
        let mut s = session();
        s.begin_start();
        s.confirm_start(now);

        assert!(s.poll_due(now));
        // The first fetch has not completed: nothing else may go out, even
        // past the interval.
        assert!(!s.poll_due(now + POLL_INTERVAL * 2));

        s.poll_finished(now);
        assert!(!s.poll_due(now));
        assert!(s.poll_due(now + POLL_INTERVAL));
    }

    #[test]
    fn stop_invalidates_in_flight_responses() {
        let now = Instant::now();
        let mut s = session();
        s.begin_start();
        s.confirm_start(now);
        assert!(s.poll_due(now));
        let issued_epoch = s.epoch();
        assert!(s.accepts(issued_epoch));

        s.begin_stop();
        assert_eq!(s.state(), MonitorState::Stopped);
        assert!(!s.accepts(issued_epoch));
        assert!(!s.poll_due(now + POLL_INTERVAL));
    }

    #[test]
    fn adopt_running_skips_starting() {
        let now = Instant::now();
        let mut s = session();
        s.adopt_running(now);
        assert!(s.is_running());
        assert!(s.poll_due(now));
    }

    #[test]
    fn failed_start_returns_to_stopped() {
        let mut s = session();
        s.begin_start();
        s.fail_start();
        assert_eq!(s.state(), MonitorState::Stopped);
        // Startable again after the failure.
        assert!(s.begin_start());
    }

    #[test]
    fn restart_after_stop_uses_fresh_epoch() {
        let now = Instant::now();
        let mut s = session();
        s.begin_start();
        s.confirm_start(now);
        let first_epoch = s.epoch();

        s.begin_stop();
        s.begin_start();
        s.confirm_start(now);
        assert_ne!(s.epoch(), first_epoch);
        assert!(!s.accepts(first_epoch));
        assert!(s.accepts(s.epoch()));
    }
}

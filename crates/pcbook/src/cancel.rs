use crate::{Error, Result};
use std::time::Instant;
use tokio_util::sync::CancellationToken;

/// Cooperative cancellation check for long-running calls.
///
/// Combines a [`CancellationToken`] (caller went away, or the service is
/// shutting down) with an optional deadline. Loops call [`check`] once per unit
/// of work; nothing is ever interrupted preemptively.
///
/// [`check`]: CancellationMonitor::check
#[derive(Clone, Debug, Default)]
pub struct CancellationMonitor {
    token: CancellationToken,
    deadline: Option<Instant>,
}

impl CancellationMonitor {
    pub const fn new(token: CancellationToken, deadline: Option<Instant>) -> Self {
        Self { token, deadline }
    }

    /// A monitor that never trips on its own. Cancel it through [`token`].
    ///
    /// [`token`]: CancellationMonitor::token
    pub fn unbounded() -> Self {
        Self::default()
    }

    pub const fn token(&self) -> &CancellationToken {
        &self.token
    }

    pub const fn deadline(&self) -> Option<Instant> {
        self.deadline
    }

    /// Returns [`Error::Cancelled`] or [`Error::DeadlineExceeded`] if the call
    /// should stop. Cancellation wins when both hold.
    ///
    /// # Errors
    ///
    /// See above.
    pub fn check(&self) -> Result<()> {
        if self.token.is_cancelled() {
            return Err(Error::Cancelled);
        }
        match self.deadline {
            Some(deadline) if Instant::now() >= deadline => Err(Error::DeadlineExceeded),
            _ => Ok(()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use core::time::Duration;

    #[test]
    fn unbounded_monitor_passes_until_cancelled() {
        let monitor = CancellationMonitor::unbounded();
        assert_eq!(monitor.check(), Ok(()));

        monitor.token().cancel();
        assert_eq!(monitor.check(), Err(Error::Cancelled));
    }

    #[test]
    fn past_deadline_is_reported() {
        let deadline = Instant::now().checked_sub(Duration::from_millis(1));
        let monitor = CancellationMonitor::new(CancellationToken::new(), deadline);
        assert_eq!(monitor.check(), Err(Error::DeadlineExceeded));
    }

    #[test]
    fn future_deadline_passes() {
        let deadline = Instant::now() + Duration::from_secs(60);
        let monitor = CancellationMonitor::new(CancellationToken::new(), Some(deadline));
        assert_eq!(monitor.check(), Ok(()));
    }

    #[test]
    fn cancellation_wins_over_deadline() {
        let token = CancellationToken::new();
        let deadline = Instant::now().checked_sub(Duration::from_millis(1));
        let monitor = CancellationMonitor::new(token.clone(), deadline);
        token.cancel();
        assert_eq!(monitor.check(), Err(Error::Cancelled));
    }

    #[test]
    fn child_token_observes_parent_cancellation() {
        let parent = CancellationToken::new();
        let monitor = CancellationMonitor::new(parent.child_token(), None);
        parent.cancel();
        assert_eq!(monitor.check(), Err(Error::Cancelled));
    }
}

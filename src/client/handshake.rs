//! Handshake retry throttling.

use std::time::{Duration, Instant};

/// What the relay loop should do about the handshake this iteration.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HandshakeAction {
    /// Too soon since the last attempt.
    Wait,
    /// Send attempt number `n` (1-based).
    Send(u32),
    /// Every attempt went unanswered; stop the session.
    GiveUp,
}

/// Spaces handshake attempts and bounds their number.
///
/// The give-up decision is itself throttled: it is reported one interval
/// after the last attempt, giving the final request a full interval to be
/// answered.
#[derive(Debug, Clone)]
pub struct HandshakeRetry {
    interval: Duration,
    max_attempts: u32,
    attempts: u32,
    last_attempt: Option<Instant>,
}

impl HandshakeRetry {
    /// Create a throttle allowing `max_attempts` attempts `interval` apart.
    pub fn new(interval: Duration, max_attempts: u32) -> Self {
        Self {
            interval,
            max_attempts,
            attempts: 0,
            last_attempt: None,
        }
    }

    /// Decide what to do at time `now`.
    pub fn poll(&mut self, now: Instant) -> HandshakeAction {
        if let Some(last) = self.last_attempt {
            if now.saturating_duration_since(last) < self.interval {
                return HandshakeAction::Wait;
            }
        }
        self.last_attempt = Some(now);

        if self.attempts >= self.max_attempts {
            return HandshakeAction::GiveUp;
        }
        self.attempts += 1;
        HandshakeAction::Send(self.attempts)
    }

    /// Attempts made so far.
    pub fn attempts(&self) -> u32 {
        self.attempts
    }

    /// Forget all attempts.
    pub fn reset(&mut self) {
        self.attempts = 0;
        self.last_attempt = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SECOND: Duration = Duration::from_secs(1);

    #[test]
    fn test_first_attempt_is_immediate() {
        let mut retry = HandshakeRetry::new(SECOND, 5);
        assert_eq!(retry.poll(Instant::now()), HandshakeAction::Send(1));
    }

    #[test]
    fn test_five_attempts_one_second_apart() {
        let start = Instant::now();
        let mut retry = HandshakeRetry::new(SECOND, 5);
        let mut sent_at = Vec::new();

        // Poll every 100 ms for 10 s, like a busy relay loop would.
        for tick in 0..=100u32 {
            let now = start + Duration::from_millis(100) * tick;
            match retry.poll(now) {
                HandshakeAction::Send(n) => {
                    assert_eq!(n as usize, sent_at.len() + 1);
                    sent_at.push(now);
                }
                HandshakeAction::GiveUp => {
                    assert_eq!(sent_at.len(), 5);
                    assert!(now - sent_at[4] >= SECOND);
                    for pair in sent_at.windows(2) {
                        assert!(pair[1] - pair[0] >= SECOND);
                    }
                    return;
                }
                HandshakeAction::Wait => {}
            }
        }
        panic!("never gave up");
    }

    #[test]
    fn test_give_up_is_sticky() {
        let start = Instant::now();
        let mut retry = HandshakeRetry::new(SECOND, 1);
        assert_eq!(retry.poll(start), HandshakeAction::Send(1));
        assert_eq!(retry.poll(start + SECOND / 2), HandshakeAction::Wait);
        assert_eq!(retry.poll(start + SECOND), HandshakeAction::GiveUp);
        assert_eq!(retry.poll(start + SECOND * 3), HandshakeAction::GiveUp);
        assert_eq!(retry.attempts(), 1);
    }

    #[test]
    fn test_reset() {
        let start = Instant::now();
        let mut retry = HandshakeRetry::new(SECOND, 1);
        retry.poll(start);
        retry.reset();
        assert_eq!(retry.attempts(), 0);
        assert_eq!(retry.poll(start), HandshakeAction::Send(1));
    }
}

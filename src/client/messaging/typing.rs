//! Typing indicator debouncing
//!
//! A burst of keystrokes produces one `typing` signal when it starts and one
//! `stopTyping` signal once the input has been quiet for the whole window.
//! The debouncer only keeps the deadline; the messaging client sleeps until
//! [`TypingDebouncer::deadline`] and calls [`TypingDebouncer::expire`].

use std::time::Duration;
use tokio::time::Instant;

/// Signal to forward to the other participant
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TypingSignal {
    Start,
    Stop,
}

/// Single-timer typing debouncer
#[derive(Debug, Clone)]
pub struct TypingDebouncer {
    window: Duration,
    deadline: Option<Instant>,
}

impl TypingDebouncer {
    pub fn new(window: Duration) -> Self {
        Self {
            window,
            deadline: None,
        }
    }

    pub fn window(&self) -> Duration {
        self.window
    }

    /// Pending `stopTyping` deadline, if a burst is in progress
    pub fn deadline(&self) -> Option<Instant> {
        self.deadline
    }

    pub fn is_pending(&self) -> bool {
        self.deadline.is_some()
    }

    /// Register a keystroke at `now`; re-arms the timer.
    pub fn keystroke(&mut self, now: Instant) -> Option<TypingSignal> {
        let burst_start = self.deadline.is_none();
        self.deadline = Some(now + self.window);
        burst_start.then_some(TypingSignal::Start)
    }

    /// Fire the timer if its deadline has passed
    pub fn expire(&mut self, now: Instant) -> Option<TypingSignal> {
        match self.deadline {
            Some(deadline) if deadline <= now => {
                self.deadline = None;
                Some(TypingSignal::Stop)
            }
            _ => None,
        }
    }

    /// Message sent: stop right away instead of waiting for the timer
    pub fn flush(&mut self) -> Option<TypingSignal> {
        self.deadline.take().map(|_| TypingSignal::Stop)
    }

    /// Forget the burst without signalling (conversation closed)
    pub fn cancel(&mut self) {
        self.deadline = None;
    }
}

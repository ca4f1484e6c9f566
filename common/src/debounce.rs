//! Push-button debouncer.
//!
//! A press has to read stable for the debounce window before it counts, and
//! the event fires on release, so holding the button down still yields
//! exactly one `ButtonEvent::Pressed`.

use log::{debug, trace};

use crate::types::ButtonEvent;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DebounceState {
    Idle,
    Confirming { since_ms: u64 },
    WaitingRelease,
}

#[derive(Debug, Clone)]
pub struct Debouncer {
    debounce_ms: u64,
    state: DebounceState,
}

impl Debouncer {
    pub fn new(debounce_ms: u64) -> Self {
        Self {
            debounce_ms,
            state: DebounceState::Idle,
        }
    }

    pub fn state(&self) -> DebounceState {
        self.state
    }

    /// Advances the state machine with one raw input sample.
    ///
    /// `event` is the loop's one-shot button slot: it is cleared whenever the
    /// machine sits in `Idle` and set to `Pressed` on a validated release.
    /// A press is validated once held for at least `debounce_ms` (inclusive).
    pub fn poll(&mut self, pressed: bool, now_ms: u64, event: &mut ButtonEvent) {
        match self.state {
            DebounceState::Idle => {
                *event = ButtonEvent::None;
                if pressed {
                    trace!("button down at {now_ms}ms");
                    self.state = DebounceState::Confirming { since_ms: now_ms };
                }
            }
            DebounceState::Confirming { since_ms } => {
                if !pressed {
                    trace!("button bounce rejected");
                    self.state = DebounceState::Idle;
                } else if now_ms.saturating_sub(since_ms) >= self.debounce_ms {
                    self.state = DebounceState::WaitingRelease;
                }
            }
            DebounceState::WaitingRelease => {
                if !pressed {
                    debug!("button press validated");
                    *event = ButtonEvent::Pressed;
                    self.state = DebounceState::Idle;
                }
            }
        }
    }
}

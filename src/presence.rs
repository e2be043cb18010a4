//! RFID presence tracking with duplicate suppression.
//!
//! The reader reports a tag lying still on the antenna as alternately present
//! and absent (present, read, absent, present, read, absent, ...). Plain edge
//! detection would fire on every other poll. The four states below absorb
//! that alternation:
//!
//! | State     | present   | absent  |
//! |-----------|-----------|---------|
//! | Idle      | FirstSeen | Idle    |
//! | FirstSeen | FirstSeen | Repeat1 |
//! | Repeat1   | Repeat2   | Idle    |
//! | Repeat2   | FirstSeen | Repeat1 |
//!
//! A present sample is reported when the state moves into `FirstSeen` or the
//! UID differs from the last one reported, so swapping tags without lifting
//! the first one still fires once.

use crate::reader::Uid;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PresenceState {
    Idle,
    FirstSeen,
    Repeat1,
    Repeat2,
}

impl PresenceState {
    /// Total transition function.
    pub fn next(self, present: bool) -> Self {
        use PresenceState::*;
        match (self, present) {
            (Idle, true) => FirstSeen,
            (Idle, false) => Idle,
            (FirstSeen, true) => FirstSeen,
            (FirstSeen, false) => Repeat1,
            (Repeat1, true) => Repeat2,
            (Repeat1, false) => Idle,
            (Repeat2, true) => FirstSeen,
            (Repeat2, false) => Repeat1,
        }
    }
}

pub struct PresenceTracker {
    state: PresenceState,
    last_reported: Option<Uid>,
}

impl PresenceTracker {
    pub const fn new() -> Self {
        Self {
            state: PresenceState::Idle,
            last_reported: None,
        }
    }

    pub fn state(&self) -> PresenceState {
        self.state
    }

    pub fn last_reported(&self) -> Option<&Uid> {
        self.last_reported.as_ref()
    }

    /// Forget everything, e.g. after a reader reset.
    pub fn reset(&mut self) {
        self.state = PresenceState::Idle;
        self.last_reported = None;
    }

    /// Feed one poll result. `None` means no tag (or a failed read).
    /// Returns the UID to report, if this sample is a new arrival.
    pub fn update(&mut self, sample: Option<Uid>) -> Option<Uid> {
        let previous = self.state;
        self.state = previous.next(sample.is_some());

        let uid = sample?;
        let entered_first_seen =
            self.state == PresenceState::FirstSeen && previous != PresenceState::FirstSeen;
        let changed = self.last_reported.as_ref() != Some(&uid);

        if entered_first_seen || changed {
            log::debug!("rfid: {:?} -> {:?}, reporting {:?}", previous, self.state, uid);
            self.last_reported = Some(uid);
            Some(uid)
        } else {
            None
        }
    }
}

impl Default for PresenceTracker {
    fn default() -> Self {
        Self::new()
    }
}

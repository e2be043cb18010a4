//! Lock mode: the terminal decides locally whether a tag is admitted.
//!
//! With an empty access list the first tag presented is enrolled as admin.
//! After that only listed tags are granted. Only the first four UID bytes are
//! stored, so tags with shorter UIDs can never be admitted.

use embedded_storage::Storage;

use crate::indicator::{ToneGenerator, ACCESS_GRANTED_MS, HIGH_TONE_HZ};
use crate::reader::Uid;
use crate::storage::{AccessFlags, StoreError, TerminalStore};

/// Result of presenting a tag.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AccessDecision {
    /// Listed tag. `enrolled` is set when this presentation added it.
    Granted { flags: AccessFlags, enrolled: bool },
    Denied,
}

impl AccessDecision {
    pub fn is_granted(&self) -> bool {
        matches!(self, AccessDecision::Granted { .. })
    }
}

#[derive(Debug, Default)]
pub struct AccessGate {
    granted: u16,
    denied: u16,
}

impl AccessGate {
    pub const fn new() -> Self {
        Self {
            granted: 0,
            denied: 0,
        }
    }

    /// Decisions since boot, `(granted, denied)`, both wrapping.
    pub fn stats(&self) -> (u16, u16) {
        (self.granted, self.denied)
    }

    /// Decide on `uid` without side effects beyond enrollment.
    pub fn check<S: Storage>(
        &mut self,
        store: &mut TerminalStore<S>,
        uid: &Uid,
    ) -> Result<AccessDecision, StoreError> {
        let mut enrolled = false;
        if store.access_count()? == 0 {
            match store.append_access(uid, AccessFlags::Admin) {
                Ok(()) => {
                    log::info!("access: enrolled {} as admin", uid);
                    enrolled = true;
                }
                // A short UID cannot be enrolled; keep waiting for a usable tag
                Err(StoreError::UidTooShort) => {
                    log::warn!("access: cannot enroll {}, uid too short", uid);
                }
                Err(e) => return Err(e),
            }
        }

        let decision = match store.find_access(uid)? {
            Some(record) => AccessDecision::Granted {
                flags: record.flags,
                enrolled,
            },
            None => AccessDecision::Denied,
        };

        if decision.is_granted() {
            self.granted = self.granted.wrapping_add(1);
        } else {
            self.denied = self.denied.wrapping_add(1);
        }
        Ok(decision)
    }

    /// Check `uid` and give audible feedback. Storage failures deny.
    pub fn present<S: Storage>(
        &mut self,
        store: &mut TerminalStore<S>,
        tone: &mut dyn ToneGenerator,
        uid: &Uid,
    ) -> AccessDecision {
        match self.check(store, uid) {
            Ok(decision @ AccessDecision::Granted { flags, .. }) => {
                log::info!("access: GRANTED {} ({:?})", uid, flags);
                tone.play(HIGH_TONE_HZ, ACCESS_GRANTED_MS);
                decision
            }
            Ok(AccessDecision::Denied) => {
                log::warn!("access: DENIED {}", uid);
                AccessDecision::Denied
            }
            Err(e) => {
                log::error!("store: access lookup failed: {}", e);
                AccessDecision::Denied
            }
        }
    }
}

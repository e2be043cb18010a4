//! Tests for RFID presence tracking.

use access_terminal::presence::{PresenceState, PresenceTracker};
use access_terminal::Uid;

fn uid(bytes: &[u8]) -> Option<Uid> {
    Uid::new(bytes)
}

const CARD_A: &[u8] = &[0xAA, 0xBB, 0xCC, 0xDD];
const CARD_B: &[u8] = &[0x01, 0x02, 0x03, 0x04, 0x05, 0x06, 0x07];

#[test]
fn test_transition_table() {
    use PresenceState::*;
    let table = [
        (Idle, true, FirstSeen),
        (Idle, false, Idle),
        (FirstSeen, true, FirstSeen),
        (FirstSeen, false, Repeat1),
        (Repeat1, true, Repeat2),
        (Repeat1, false, Idle),
        (Repeat2, true, FirstSeen),
        (Repeat2, false, Repeat1),
    ];
    for (from, present, to) in table {
        assert_eq!(from.next(present), to, "{:?} on {}", from, present);
    }
}

#[test]
fn test_resting_tag_reported_once() {
    let mut tracker = PresenceTracker::new();

    // A tag lying on the antenna reads present/absent alternately
    assert_eq!(tracker.update(uid(CARD_A)), uid(CARD_A));
    for _ in 0..20 {
        assert_eq!(tracker.update(None), None);
        assert_eq!(tracker.update(uid(CARD_A)), None);
    }
}

#[test]
fn test_continuous_presence_reported_once() {
    let mut tracker = PresenceTracker::new();
    assert_eq!(tracker.update(uid(CARD_A)), uid(CARD_A));
    for _ in 0..10 {
        assert_eq!(tracker.update(uid(CARD_A)), None);
    }
    assert_eq!(tracker.state(), PresenceState::FirstSeen);
}

#[test]
fn test_swapped_tag_reported() {
    let mut tracker = PresenceTracker::new();
    assert_eq!(tracker.update(uid(CARD_A)), uid(CARD_A));
    assert_eq!(tracker.update(None), None);
    assert_eq!(tracker.update(uid(CARD_B)), uid(CARD_B));
    assert_eq!(tracker.last_reported(), uid(CARD_B).as_ref());
}

#[test]
fn test_removed_and_presented_again() {
    let mut tracker = PresenceTracker::new();
    assert_eq!(tracker.update(uid(CARD_A)), uid(CARD_A));
    assert_eq!(tracker.update(None), None);
    assert_eq!(tracker.update(None), None);
    assert_eq!(tracker.state(), PresenceState::Idle);

    // Absence does not clear the last UID, but re-entering FirstSeen reports
    assert_eq!(tracker.last_reported(), uid(CARD_A).as_ref());
    assert_eq!(tracker.update(uid(CARD_A)), uid(CARD_A));
}

#[test]
fn test_reset_forgets_tag() {
    let mut tracker = PresenceTracker::new();
    tracker.update(uid(CARD_A));
    tracker.reset();
    assert_eq!(tracker.state(), PresenceState::Idle);
    assert_eq!(tracker.last_reported(), None);
    assert_eq!(tracker.update(uid(CARD_A)), uid(CARD_A));
}

#[test]
fn test_uid_equality_respects_size() {
    let short = Uid::new(&[0xAA, 0xBB, 0xCC, 0xDD]).unwrap();
    let long = Uid::new(&[0xAA, 0xBB, 0xCC, 0xDD, 0x00, 0x00, 0x00]).unwrap();
    assert_ne!(short, long);
    assert_eq!(short.to_string(), "AABBCCDD");
    assert_eq!(long.size(), 7);
    assert!(Uid::new(&[0u8; 11]).is_none());
}

//! Tests for the send-twice confirmation guard.

use access_terminal::guard::{checksum, Confirmation, ConfirmedWriteGuard};

#[test]
fn test_checksum() {
    assert_eq!(checksum(b""), 0);
    // 'a' + 0 = 0x61
    assert_eq!(checksum(b"a"), 0x61);
    // 0x61 ^ (0x62 + 1)
    assert_eq!(checksum(b"ab"), 0x61 ^ 0x63);
    // Position matters
    assert_ne!(checksum(b"ab"), checksum(b"ba"));
}

#[test]
fn test_repeat_confirms() {
    let mut guard = ConfirmedWriteGuard::new();
    assert_eq!(guard.submit(b'N', b"alice", 1), Confirmation::AwaitingRepeat);
    assert!(guard.is_pending());
    assert_eq!(guard.submit(b'N', b"alice", 2), Confirmation::Confirmed);
    assert!(!guard.is_pending());
}

#[test]
fn test_different_content_mismatches() {
    let mut guard = ConfirmedWriteGuard::new();
    assert_eq!(guard.submit(b'N', b"alice", 1), Confirmation::AwaitingRepeat);
    assert_eq!(guard.submit(b'N', b"alicf", 2), Confirmation::Mismatch);
    assert!(!guard.is_pending());

    // After a mismatch the next submission starts over
    assert_eq!(guard.submit(b'N', b"alice", 3), Confirmation::AwaitingRepeat);
}

#[test]
fn test_intervening_command_restarts() {
    let mut guard = ConfirmedWriteGuard::new();
    assert_eq!(guard.submit(b'N', b"alice", 1), Confirmation::AwaitingRepeat);
    // Command 2 was something else; command 3 repeats the name
    assert_eq!(guard.submit(b'N', b"alice", 3), Confirmation::AwaitingRepeat);
    assert_eq!(guard.submit(b'N', b"alice", 4), Confirmation::Confirmed);
}

#[test]
fn test_other_guarded_command_restarts() {
    let mut guard = ConfirmedWriteGuard::new();
    assert_eq!(guard.submit(b'N', b"9600", 1), Confirmation::AwaitingRepeat);
    assert_eq!(guard.submit(b'B', b"9600", 2), Confirmation::AwaitingRepeat);
    assert_eq!(guard.submit(b'B', b"9600", 3), Confirmation::Confirmed);
}

#[test]
fn test_command_counter_wraps() {
    let mut guard = ConfirmedWriteGuard::new();
    assert_eq!(guard.submit(b'B', b"300", u16::MAX), Confirmation::AwaitingRepeat);
    assert_eq!(guard.submit(b'B', b"300", 0), Confirmation::Confirmed);
}

#[test]
fn test_reset_forgets_pending() {
    let mut guard = ConfirmedWriteGuard::new();
    guard.submit(b'N', b"alice", 1);
    guard.reset();
    assert_eq!(guard.submit(b'N', b"alice", 2), Confirmation::AwaitingRepeat);
}

//! Tests for keypad decoding and settle-time debouncing.

use access_terminal::keypad::{decode, DebouncePhase, InputDebouncer};

const KEY_5: u8 = 0b010_0010;
const KEY_HASH: u8 = 0b100_1000;

#[test]
fn test_decode_layout() {
    let layout = [
        (0b001_0001, '1'),
        (0b010_0001, '2'),
        (0b100_0001, '3'),
        (0b001_0010, '4'),
        (0b010_0010, '5'),
        (0b100_0010, '6'),
        (0b001_0100, '7'),
        (0b010_0100, '8'),
        (0b100_0100, '9'),
        (0b001_1000, '*'),
        (0b010_1000, '0'),
        (0b100_1000, '#'),
    ];
    for (raw, key) in layout {
        assert_eq!(decode(raw), Some(key), "raw {:#04x}", raw);
    }
}

#[test]
fn test_decode_rejects_non_single_keys() {
    assert_eq!(decode(0), None);
    // Row without column, column without row
    assert_eq!(decode(0b000_0001), None);
    assert_eq!(decode(0b001_0000), None);
    // Two keys in the same column
    assert_eq!(decode(0b001_0011), None);
    // Two keys in the same row
    assert_eq!(decode(0b011_0001), None);
}

#[test]
fn test_settled_press_reported_once() {
    let mut debouncer = InputDebouncer::new(50);

    assert_eq!(debouncer.poll(KEY_5, 0), None);
    assert_eq!(debouncer.phase(), DebouncePhase::Unsettled { since: 0 });
    assert_eq!(debouncer.poll(KEY_5, 10), None);
    assert_eq!(debouncer.phase(), DebouncePhase::SettledUnreported { since: 0 });
    assert_eq!(debouncer.poll(KEY_5, 49), None);
    assert_eq!(debouncer.poll(KEY_5, 50), Some('5'));
    assert_eq!(debouncer.phase(), DebouncePhase::SettledReported);

    // Holding the key does not repeat
    assert_eq!(debouncer.poll(KEY_5, 100), None);
    assert_eq!(debouncer.poll(KEY_5, 5000), None);
}

#[test]
fn test_bounce_restarts_settle_time() {
    let mut debouncer = InputDebouncer::new(50);

    assert_eq!(debouncer.poll(KEY_HASH, 0), None);
    assert_eq!(debouncer.poll(0, 20), None);
    assert_eq!(debouncer.poll(KEY_HASH, 30), None);
    assert_eq!(debouncer.poll(KEY_HASH, 60), None);
    assert_eq!(debouncer.poll(KEY_HASH, 80), Some('#'));
}

#[test]
fn test_release_is_not_reported() {
    let mut debouncer = InputDebouncer::new(50);

    debouncer.poll(KEY_5, 0);
    assert_eq!(debouncer.poll(KEY_5, 60), Some('5'));
    assert_eq!(debouncer.poll(0, 100), None);
    assert_eq!(debouncer.poll(0, 200), None);
    assert_eq!(debouncer.phase(), DebouncePhase::SettledReported);

    // Pressing again reports again
    debouncer.poll(KEY_5, 300);
    assert_eq!(debouncer.poll(KEY_5, 350), Some('5'));
}

#[test]
fn test_idle_at_boot_reports_nothing() {
    let mut debouncer = InputDebouncer::new(50);
    for now in 0..200 {
        assert_eq!(debouncer.poll(0, now), None);
    }
}

#[test]
fn test_backwards_clock_does_not_fire() {
    let mut debouncer = InputDebouncer::new(50);
    debouncer.poll(KEY_5, 1000);
    assert_eq!(debouncer.poll(KEY_5, 10), None);
    assert_eq!(debouncer.poll(KEY_5, 1050), Some('5'));
}

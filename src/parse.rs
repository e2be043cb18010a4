//! Argument parsing and hex formatting for the command protocol.
//!
//! The parsers are deliberately forgiving: leading blanks are skipped, parsing
//! stops at the first byte that is not a digit, and the accumulator wraps.

fn is_blank(byte: u8) -> bool {
    byte == b' ' || byte == b'\t'
}

fn skip_blanks(input: &[u8]) -> &[u8] {
    let start = input.iter().position(|&b| !is_blank(b)).unwrap_or(input.len());
    &input[start..]
}

/// Value of a hex digit (either case), or `None`.
pub fn hex_digit(byte: u8) -> Option<u8> {
    match byte {
        b'0'..=b'9' => Some(byte - b'0'),
        b'a'..=b'f' => Some(byte - b'a' + 10),
        b'A'..=b'F' => Some(byte - b'A' + 10),
        _ => None,
    }
}

/// Parse a hexadecimal number. Empty or malformed input yields 0.
pub fn parse_hex(input: &[u8]) -> u16 {
    let mut result: u16 = 0;
    for &byte in skip_blanks(input) {
        let Some(nibble) = hex_digit(byte) else {
            break;
        };
        result = result.wrapping_shl(4).wrapping_add(nibble as u16);
    }
    result
}

/// Parse a decimal number. Empty or malformed input yields 0.
pub fn parse_dec(input: &[u8]) -> u16 {
    let mut result: u16 = 0;
    for &byte in skip_blanks(input) {
        if !byte.is_ascii_digit() {
            break;
        }
        result = result.wrapping_mul(10).wrapping_add((byte - b'0') as u16);
    }
    result
}

/// Upper-case hex digit for the low nibble of `value`.
pub fn to_hex(value: u8) -> u8 {
    b"0123456789ABCDEF"[(value & 0x0F) as usize]
}

/// Two hex digits for one byte.
pub fn hex_byte(value: u8) -> [u8; 2] {
    [to_hex(value >> 4), to_hex(value)]
}

//! Send-twice-to-commit protection for commands that change persistent state.
//!
//! A single garbled line must never rename the terminal or move it to a baud
//! rate the host cannot talk at. The first submission is only remembered
//! (command letter, argument checksum, command number); the write happens when
//! the very next command repeats it exactly.
//!
//! The checksum is a running XOR of `byte + position`: crude, but it catches
//! typos and line noise. It is not an integrity check against an adversary.

/// Outcome of submitting a guarded command.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Confirmation {
    /// First submission recorded; the caller asks for a repeat.
    AwaitingRepeat,
    /// Repeated identically by the next command: apply the write.
    Confirmed,
    /// The next command was the same letter with different content.
    Mismatch,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Pending {
    command: u8,
    checksum: u8,
    command_index: u16,
}

#[derive(Debug, Default)]
pub struct ConfirmedWriteGuard {
    pending: Option<Pending>,
}

/// Checksum over a command's argument bytes.
pub fn checksum(args: &[u8]) -> u8 {
    args.iter()
        .enumerate()
        .fold(0u8, |acc, (i, &b)| acc ^ b.wrapping_add(i as u8))
}

impl ConfirmedWriteGuard {
    pub const fn new() -> Self {
        Self { pending: None }
    }

    pub fn is_pending(&self) -> bool {
        self.pending.is_some()
    }

    /// Forget any recorded first submission.
    pub fn reset(&mut self) {
        self.pending = None;
    }

    /// Submit guarded command `command` with `args`, dispatched as command
    /// number `command_index`.
    pub fn submit(&mut self, command: u8, args: &[u8], command_index: u16) -> Confirmation {
        let checksum = checksum(args);

        match self.pending.take() {
            Some(p) if p.command == command && p.command_index.wrapping_add(1) == command_index => {
                if p.checksum == checksum {
                    Confirmation::Confirmed
                } else {
                    Confirmation::Mismatch
                }
            }
            _ => {
                // Gap, other command, or nothing pending: this is a new first submission
                self.pending = Some(Pending {
                    command,
                    checksum,
                    command_index,
                });
                Confirmation::AwaitingRepeat
            }
        }
    }
}

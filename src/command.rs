//! Host command protocol: single-letter commands, one reply per command.
//!
//! Upper-case letters change state, lower-case letters only read it. Every
//! reply line ends in CR LF; errors start with `E`. Commands whose capability
//! is not built in are answered like any unknown command.

use embedded_storage::Storage;

use crate::config::{Capabilities, IndicatorKind};
use crate::guard::{Confirmation, ConfirmedWriteGuard};
use crate::indicator::{
    IndicatorOutput, Leds, ToneGenerator, AUX_MASK, DEFAULT_TONE_MS, HIGH_TONE_HZ, LOW_TONE_HZ,
};
use crate::parse::{hex_byte, parse_dec, parse_hex};
use crate::presence::PresenceTracker;
use crate::reader::{CardReader, DEBUG_REGISTERS};
use crate::serial::{is_valid_baud, ReplyChannel};
use crate::storage::{RenameableIdentity, TerminalStore};

const HEADER_TEXT: &str = "Access terminal | v0.1";

/// Everything a command may touch.
pub struct CommandContext<'a, S> {
    pub link: &'a mut dyn ReplyChannel,
    pub store: &'a mut TerminalStore<S>,
    pub reader: &'a mut dyn CardReader,
    pub presence: &'a mut PresenceTracker,
    pub indicator: &'a mut dyn IndicatorOutput,
    pub tone: &'a mut dyn ToneGenerator,
}

pub struct CommandDispatcher {
    capabilities: Capabilities,
    guard: ConfirmedWriteGuard,
    commands_seen: u16,
}

impl CommandDispatcher {
    pub const fn new(capabilities: Capabilities) -> Self {
        Self {
            capabilities,
            guard: ConfirmedWriteGuard::new(),
            commands_seen: 0,
        }
    }

    /// Non-empty lines dispatched since boot (wrapping).
    pub fn commands_seen(&self) -> u16 {
        self.commands_seen
    }

    pub fn capabilities(&self) -> &Capabilities {
        &self.capabilities
    }

    /// Execute one line and send its reply. Empty lines are ignored and not
    /// counted.
    pub fn dispatch<S: Storage>(&mut self, line: &[u8], ctx: &mut CommandContext<'_, S>) {
        let Some(&command) = line.first() else {
            return;
        };
        self.commands_seen = self.commands_seen.wrapping_add(1);
        let args = &line[1..];
        log::debug!("cmd: #{} '{}' ({} arg bytes)", self.commands_seen, command as char, args.len());

        let caps = self.capabilities;
        match command {
            b'?' => self.send_help(ctx.link),

            // Commands that modify state
            b'R' => {
                ctx.reader.reset();
                ctx.reader.init();
                ctx.presence.reset();
                log::info!("rfid: reader reset by host");
                ctx.link.send_line(b"R ok");
            }
            b'M' if caps.indicator == IndicatorKind::Lcd => write_lcd(line, ctx),
            b'L' if caps.indicator == IndicatorKind::Led => {
                ctx.indicator.set_leds(Leds::from_letters(args));
                ctx.link.send_line(b"L ok");
            }
            b'S' => {
                let bits = (parse_hex(args) & AUX_MASK as u16) as u8;
                ctx.indicator.set_aux(bits);
                ctx.link.send(b"S ok 0x");
                ctx.link.send_line(&hex_byte(bits));
            }
            b'N' if caps.rename => self.receive_name(args, ctx),
            b'B' if caps.baud_change => self.receive_baud(args, ctx),
            b'T' => output_tone(line, ctx),
            b'F' => set_flag(args, ctx),

            // Read-only commands
            b'e' => ctx.link.send_line(line),
            b's' => {
                let dropped = ctx.link.dropped_byte_count();
                let _ = write!(
                    ctx.link,
                    "s commands-seen=0x{:04X}; dropped-rx-bytes=0x{:04X}",
                    self.commands_seen, dropped
                );
                ctx.link.end_line();
            }
            b'n' => match RenameableIdentity::name(&mut *ctx.store) {
                Ok(name) => {
                    ctx.link.send(b"n");
                    ctx.link.send_line(&name);
                }
                Err(e) => {
                    log::error!("store: reading name failed: {}", e);
                    ctx.link.send_line(b"E storage read failed");
                }
            },
            b'r' if caps.rfid_debug => dump_registers(ctx),
            b'a' if caps.access_list => match ctx.store.access_count() {
                Ok(count) => {
                    let _ = write!(ctx.link, "a count=0x{:02X}", count);
                    ctx.link.end_line();
                }
                Err(e) => {
                    log::error!("store: reading access count failed: {}", e);
                    ctx.link.send_line(b"E storage read failed");
                }
            },

            other => {
                log::warn!("cmd: unknown command byte {:#04x}", other);
                if (0x20..0x7F).contains(&other) {
                    let _ = write!(ctx.link, "E Unknown command '{}'", other as char);
                } else {
                    let _ = write!(ctx.link, "E Unknown command 0x{:02X}", other);
                }
                ctx.link.send_line(b"; '?' for help.");
            }
        }
    }

    fn send_help(&self, link: &mut dyn ReplyChannel) {
        let caps = &self.capabilities;
        send_header(link);
        link.send(
            b"# [Sends]\r\n\
              #\tI<num-bytes-hex> <uid-hex-str> RFID in range.\r\n\
              #\tK<char>\tPressed keypad char 0..9, '*','#'\r\n\
              #\r\n\
              # [Commands]\r\n\
              # Lower case: read state\r\n\
              #\t?\tThis help\r\n\
              #\tn\tGet persistent name.\r\n",
        );
        if caps.rfid_debug {
            link.send(b"#\tr\tShow RFID reader registers.\r\n");
        }
        if caps.access_list {
            link.send(b"#\ta\tNumber of stored access tags.\r\n");
        }
        link.send(
            b"#\ts\tShow stats.\r\n\
              #\te<msg>\tEcho back msg (testing)\r\n\
              #\r\n\
              # Upper case: modify state\r\n",
        );
        match caps.indicator {
            IndicatorKind::Lcd => link.send(b"#\tM<n><msg> Write msg on LCD-line n=0,1.\r\n"),
            IndicatorKind::Led => link.send(b"#\tL[<R|G|B>] Set (combination of) LED Red/Green/Blue.\r\n"),
        }
        link.send(
            b"#\tS<hex>\tSet auxiliary output bits (6 bits).\r\n\
              #\tT<L|H>[<ms>] Low or High tone for given time (default 250ms).\r\n\
              #\tF<K><1|0> Set flag. 'K'=Keypad click.\r\n\
              #\tR\tReset RFID reader.\r\n",
        );
        if caps.rename {
            link.send(b"#\tN<name> Set persistent name of this terminal. Send twice.\r\n");
        }
        if caps.baud_change {
            link.send(b"#\tB<baud> Set baud rate. Send twice.\r\n");
        }
        link.send_line(b"? ok");
    }

    fn receive_name<S: Storage>(&mut self, args: &[u8], ctx: &mut CommandContext<'_, S>) {
        match self.guard.submit(b'N', args, self.commands_seen) {
            Confirmation::AwaitingRepeat => {
                ctx.link.send_line(b"Name received. Send 2nd time to confirm.");
            }
            Confirmation::Mismatch => {
                log::warn!("cmd: name confirmation mismatch");
                ctx.link.send_line(b"E N mismatch! Send twice to confirm.");
            }
            Confirmation::Confirmed => match ctx.store.rename(args) {
                Ok(()) => {
                    ctx.link.send(b"Name set: ");
                    ctx.link.send_line(args);
                }
                Err(e) => {
                    log::error!("store: writing name failed: {}", e);
                    ctx.link.send_line(b"E storage write failed");
                }
            },
        }
    }

    fn receive_baud<S: Storage>(&mut self, args: &[u8], ctx: &mut CommandContext<'_, S>) {
        let baud = parse_dec(args);
        if !is_valid_baud(baud) {
            ctx.link.send_line(b"E not a valid baudrate between 300..38400");
            return;
        }

        match self.guard.submit(b'B', args, self.commands_seen) {
            Confirmation::AwaitingRepeat => {
                ctx.link.send_line(b"Baud rate received. Send 2nd time to confirm.");
            }
            Confirmation::Mismatch => {
                log::warn!("cmd: baud confirmation mismatch");
                ctx.link.send_line(b"E B mismatch! Send twice to confirm.");
            }
            Confirmation::Confirmed => match ctx.store.set_baud_rate(baud) {
                Ok(()) => {
                    let _ = write!(ctx.link, "Baud rate stored: {}", baud);
                    ctx.link.end_line();
                    // The confirmation goes out at the old rate
                    if ctx.link.baud() != baud {
                        ctx.link.set_baud(baud);
                    }
                }
                Err(e) => {
                    log::error!("store: writing baud rate failed: {}", e);
                    ctx.link.send_line(b"E storage write failed");
                }
            },
        }
    }
}

/// Banner sent at boot and at the top of the help text.
pub fn send_header(link: &mut dyn ReplyChannel) {
    link.send(b"# ");
    link.send_line(HEADER_TEXT.as_bytes());
}

/// Longest valid UTF-8 prefix; the LCD only gets text it can show.
fn text_prefix(bytes: &[u8]) -> &str {
    match core::str::from_utf8(bytes) {
        Ok(text) => text,
        Err(e) => core::str::from_utf8(&bytes[..e.valid_up_to()]).unwrap_or(""),
    }
}

fn write_lcd<S: Storage>(line: &[u8], ctx: &mut CommandContext<'_, S>) {
    let row = line.get(1).map(|b| b.wrapping_sub(b'0'));
    match row {
        Some(row) if row < 2 => {
            ctx.indicator.write(row, text_prefix(&line[2..]));
            ctx.link.send_line(b"M ok");
        }
        _ => ctx.link.send_line(b"E row number must be 0 or 1"),
    }
}

fn output_tone<S: Storage>(line: &[u8], ctx: &mut CommandContext<'_, S>) {
    let mut duration = parse_dec(line.get(2..).unwrap_or(&[]));
    if duration == 0 {
        duration = DEFAULT_TONE_MS;
    }
    let hz = match line.get(1) {
        Some(b'H') | Some(b'h') => HIGH_TONE_HZ,
        _ => LOW_TONE_HZ,
    };
    ctx.tone.play(hz, duration);
    ctx.link.send_line(b"T ok");
}

fn set_flag<S: Storage>(args: &[u8], ctx: &mut CommandContext<'_, S>) {
    match args.first() {
        Some(b'K') => {
            let enabled = args.get(1) == Some(&b'1');
            match ctx.store.set_keyboard_tone(enabled) {
                Ok(()) if enabled => ctx.link.send_line(b"F flag on"),
                Ok(()) => ctx.link.send_line(b"F flag off"),
                Err(e) => {
                    log::error!("store: writing flags failed: {}", e);
                    ctx.link.send_line(b"E storage write failed");
                }
            }
        }
        _ => ctx.link.send_line(b"E invalid flag"),
    }
}

fn dump_registers<S: Storage>(ctx: &mut CommandContext<'_, S>) {
    for &register in DEBUG_REGISTERS.iter() {
        let Some(value) = ctx.reader.read_register(register) else {
            ctx.link.send_line(b"E register access not supported");
            return;
        };
        ctx.link.send(b"#");
        ctx.link.send(&hex_byte(register));
        ctx.link.send(b" ");
        ctx.link.send_line(&hex_byte(value));
    }
    ctx.link.send_line(b"r ok");
}

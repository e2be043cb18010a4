//! The terminal main loop, one cooperative iteration at a time.
//!
//! Each `poll_once`:
//! 1. Dispatch at most one complete command line.
//! 2. If more received bytes are waiting, stop here so commands are never
//!    starved by event polling.
//! 3. Sample the keypad and report a settled key as `K<c>`.
//! 4. Poll the card reader and report a newly presented tag as
//!    `I<size> <uid>`; in lock mode also run the access gate.
//!
//! Command replies and events share the wire, so a reply line is always
//! complete before an event line starts.

use core::fmt::Write;

use embedded_storage::Storage;

use crate::access::AccessGate;
use crate::command::{send_header, CommandContext, CommandDispatcher};
use crate::config::{BuildConfig, Capabilities};
use crate::indicator::{IndicatorOutput, ToneGenerator, KEY_CLICK_HZ, KEY_CLICK_MS};
use crate::keypad::{InputDebouncer, KeypadMatrix};
use crate::line::LineAssembler;
use crate::presence::PresenceTracker;
use crate::reader::{self, CardReader};
use crate::serial::{ReplyChannel, SerialChannel, Transmitter};
use crate::storage::TerminalStore;

/// Board drivers the terminal polls and drives.
pub struct Peripherals<R, K, I, G> {
    pub reader: R,
    pub keypad: K,
    pub indicator: I,
    pub tone: G,
}

pub struct Terminal<'a, T, S, R, K, I, G, const N: usize> {
    serial: SerialChannel<'a, T, N>,
    line: LineAssembler,
    dispatcher: CommandDispatcher,
    debouncer: InputDebouncer,
    presence: PresenceTracker,
    store: TerminalStore<S>,
    access: Option<AccessGate>,
    reader: R,
    keypad: K,
    indicator: I,
    tone: G,
}

impl<'a, T, S, R, K, I, G, const N: usize> Terminal<'a, T, S, R, K, I, G, N>
where
    T: Transmitter,
    S: Storage,
    R: CardReader,
    K: KeypadMatrix,
    I: IndicatorOutput,
    G: ToneGenerator,
{
    pub fn new(
        serial: SerialChannel<'a, T, N>,
        store: TerminalStore<S>,
        peripherals: Peripherals<R, K, I, G>,
        capabilities: Capabilities,
        config: &BuildConfig,
    ) -> Self {
        let access = capabilities.access_list.then(AccessGate::new);
        Self {
            serial,
            line: LineAssembler::new(),
            dispatcher: CommandDispatcher::new(capabilities),
            debouncer: InputDebouncer::new(config.debounce_ms),
            presence: PresenceTracker::new(),
            store,
            access,
            reader: peripherals.reader,
            keypad: peripherals.keypad,
            indicator: peripherals.indicator,
            tone: peripherals.tone,
        }
    }

    /// Bring the link up at the stored baud rate, initialise the reader and
    /// greet the host.
    pub fn boot(&mut self) {
        let baud = match self.store.baud_rate() {
            Ok(baud) => baud,
            Err(e) => {
                log::error!("store: reading baud rate failed: {}", e);
                self.serial.baud()
            }
        };
        if baud != self.serial.baud() {
            ReplyChannel::set_baud(&mut self.serial, baud);
        }

        self.reader.init();

        send_header(&mut self.serial);
        self.serial.send_line(b"# Type '?<RETURN>' for help.");
        self.serial.send(b"# Name: ");
        match self.store.name() {
            Ok(name) => self.serial.send_line(&name),
            Err(e) => {
                log::error!("store: reading name failed: {}", e);
                self.serial.end_line();
            }
        }
        log::info!("terminal: up at {} baud", baud);
    }

    /// Run one main-loop iteration. `now_ms` is a monotonic millisecond clock.
    pub fn poll_once(&mut self, now_ms: u64) {
        if let Some(line) = self.line.poll(&mut self.serial) {
            let mut ctx = CommandContext {
                link: &mut self.serial,
                store: &mut self.store,
                reader: &mut self.reader,
                presence: &mut self.presence,
                indicator: &mut self.indicator,
                tone: &mut self.tone,
            };
            self.dispatcher.dispatch(line, &mut ctx);
        }

        // Process all commands before looking at the keypad or reader
        if self.serial.bytes_pending() > 0 {
            return;
        }

        self.poll_keypad(now_ms);
        self.poll_reader();
    }

    fn poll_keypad(&mut self, now_ms: u64) {
        let raw = self.keypad.sample();
        let Some(key) = self.debouncer.poll(raw, now_ms) else {
            return;
        };

        let _ = write!(self.serial, "K{}", key);
        self.serial.end_line();
        log::debug!("keypad: '{}'", key);

        match self.store.keyboard_tone() {
            Ok(true) => self.tone.play(KEY_CLICK_HZ, KEY_CLICK_MS),
            Ok(false) => {}
            Err(e) => log::error!("store: reading flags failed: {}", e),
        }
    }

    fn poll_reader(&mut self) {
        let sample = reader::sample(&mut self.reader);
        let Some(uid) = self.presence.update(sample) else {
            return;
        };

        let _ = write!(self.serial, "I{:02X} {}", uid.size(), uid);
        self.serial.end_line();
        log::info!("rfid: tag {} presented", uid);

        if let Some(gate) = self.access.as_mut() {
            gate.present(&mut self.store, &mut self.tone, &uid);
        }
    }

    pub fn serial(&self) -> &SerialChannel<'a, T, N> {
        &self.serial
    }

    pub fn serial_mut(&mut self) -> &mut SerialChannel<'a, T, N> {
        &mut self.serial
    }

    pub fn store_mut(&mut self) -> &mut TerminalStore<S> {
        &mut self.store
    }

    pub fn dispatcher(&self) -> &CommandDispatcher {
        &self.dispatcher
    }

    pub fn access_gate(&self) -> Option<&AccessGate> {
        self.access.as_ref()
    }

    pub fn reader_mut(&mut self) -> &mut R {
        &mut self.reader
    }

    pub fn keypad_mut(&mut self) -> &mut K {
        &mut self.keypad
    }

    pub fn indicator(&self) -> &I {
        &self.indicator
    }

    pub fn tone(&self) -> &G {
        &self.tone
    }

    pub fn tone_mut(&mut self) -> &mut G {
        &mut self.tone
    }
}

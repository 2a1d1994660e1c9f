//! The UI thread: owns the keyboard model and the log, and works through the
//! message queue one message at a time.

use anyhow::Result;
use std::{
    io::{self, Write},
    sync::mpsc::Receiver,
};

use crate::{
    clock::Clock,
    config::Config,
    devices::{DeviceSelector, MidiSubsystem, NO_INPUTS, NO_OUTPUTS},
    keyboard::{KeyboardState, NoteChange},
    message_log::MessageLog,
    midi::{KEYBOARD_SOURCE, MidiEvent},
    router::{Origin, Routed, Router},
    shell::{Command, HELP},
};

/// Lowest and highest key drawn by `keys`.
const KEYBOARD_RANGE: (u8, u8) = (36, 96);

#[derive(Debug)]
pub enum UiMessage {
    Midi(Routed),
    Shell(Command),
}

impl From<Routed> for UiMessage {
    fn from(routed: Routed) -> Self {
        UiMessage::Midi(routed)
    }
}

impl From<Command> for UiMessage {
    fn from(cmd: Command) -> Self {
        UiMessage::Shell(cmd)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Flow {
    Continue,
    Quit,
}

pub struct App<S: MidiSubsystem> {
    selector: DeviceSelector<S>,
    router: Router<UiMessage>,
    keyboard: KeyboardState,
    log: MessageLog,
    clock: Clock,
    channel: u8,
    velocity: u8,
}

impl<S: MidiSubsystem> App<S> {
    pub fn new(subsystem: S, router: Router<UiMessage>, clock: Clock, config: &Config) -> Self {
        let mut app = Self {
            selector: DeviceSelector::new(subsystem),
            router,
            keyboard: KeyboardState::new(),
            log: MessageLog::new(clock.now(), config.log_capacity),
            clock,
            channel: config.keyboard_channel,
            velocity: config.keyboard_velocity,
        };
        app.select_input(config.initial_input);
        app.select_output(config.initial_output);
        app
    }

    #[cfg(test)]
    pub fn log(&self) -> &MessageLog {
        &self.log
    }

    #[cfg(test)]
    pub fn keyboard(&self) -> &KeyboardState {
        &self.keyboard
    }

    /// Blocks on the queue until `quit`, echoing new log lines to `out`.
    pub fn run(&mut self, rx: &Receiver<UiMessage>, out: &mut impl Write) -> Result<()> {
        writeln!(out, "{}", self.device_report())?;
        let mut printed = self.log.total();

        while let Ok(msg) = rx.recv() {
            let flow = self.handle(msg, out)?;
            for line in self.log.since(printed) {
                writeln!(out, "{line}")?;
            }
            printed = self.log.total();
            out.flush()?;

            if flow == Flow::Quit {
                break;
            }
        }
        log::info!(
            "👋 Stopping after {} events ({} kept)",
            self.log.total(),
            self.log.len()
        );
        Ok(())
    }

    pub fn handle(&mut self, msg: UiMessage, out: &mut impl Write) -> io::Result<Flow> {
        match msg {
            UiMessage::Midi(routed) => self.on_midi(routed),
            UiMessage::Shell(cmd) => return self.on_command(cmd, out),
        }
        Ok(Flow::Continue)
    }

    fn on_midi(&mut self, Routed { event, origin }: Routed) {
        if origin == Origin::HardwareInput {
            // Keep the keyboard in sync; whatever it emits is an echo.
            for change in self.keyboard.apply(&event) {
                let echo = self.change_event(change);
                self.router.dispatch(echo, Origin::KeyboardEcho);
            }
        }
        self.log.record(&event);
    }

    fn on_command(&mut self, cmd: Command, out: &mut impl Write) -> io::Result<Flow> {
        match cmd {
            Command::SelectInput(index) => self.select_input(index),
            Command::SelectOutput(index) => self.select_output(index),
            Command::Press { note, velocity } => {
                let velocity = velocity.unwrap_or(self.velocity);
                if let Some(change) = self.keyboard.press(self.channel, note, velocity) {
                    self.play(change);
                }
            }
            Command::Release { note } => {
                if let Some(change) = self.keyboard.release(self.channel, note) {
                    self.play(change);
                }
            }
            Command::Devices => {
                if self.selector.refresh() {
                    self.router.set_output(None);
                }
                writeln!(out, "{}", self.device_report())?;
            }
            Command::Keys => {
                let (low, high) = KEYBOARD_RANGE;
                writeln!(out, "{}", self.keyboard.render(self.channel, low, high))?;
            }
            Command::Help => writeln!(out, "{HELP}")?,
            Command::Quit => return Ok(Flow::Quit),
        }
        Ok(Flow::Continue)
    }

    fn play(&mut self, change: NoteChange) {
        let event = self.change_event(change);
        self.router.dispatch(event, Origin::KeyboardUser);
    }

    fn change_event(&self, change: NoteChange) -> MidiEvent {
        let now = self.clock.now();
        match change {
            NoteChange::On {
                channel,
                note,
                velocity,
            } => MidiEvent::note_on(channel, note, velocity, now, KEYBOARD_SOURCE),
            NoteChange::Off { channel, note } => {
                MidiEvent::note_off(channel, note, now, KEYBOARD_SOURCE)
            }
        }
    }

    fn select_input(&mut self, index: usize) {
        let (router, clock) = (&self.router, self.clock);
        let selected = self
            .selector
            .select_input(index, |device| router.input_handler(&device.name, clock));
        if let Err(e) = selected {
            log::warn!("{e:#}");
        }
    }

    fn select_output(&mut self, index: usize) {
        match self.selector.select_output(index) {
            Ok(port) => self.router.set_output(port),
            Err(e) => log::warn!("{e:#}"),
        }
    }

    fn device_report(&self) -> String {
        let list = |title: &str, labels: Vec<String>, selected: usize, empty: &str| {
            let mut text = format!("{title}:");
            for (i, label) in labels.iter().enumerate() {
                let mark = if i == selected { '*' } else { ' ' };
                text.push_str(&format!("\n {mark} {i}: {label}"));
            }
            // Only "None" is listed.
            if labels.len() == 1 {
                text.push_str(&format!("\n   ({empty})"));
            }
            text
        };
        format!(
            "{}\n{}",
            list(
                "MIDI Input",
                self.selector.input_labels(),
                self.selector.input_index(),
                NO_INPUTS
            ),
            list(
                "MIDI Output",
                self.selector.output_labels(),
                self.selector.output_index(),
                NO_OUTPUTS
            ),
        )
    }
}

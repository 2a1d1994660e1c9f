//! Device enumeration and the input/output selection lists.

use anyhow::{Context, Result, anyhow, bail};
use midir::{Ignore, MidiInput, MidiInputConnection, MidiOutput, MidiOutputConnection};
use std::{
    collections::HashMap,
    sync::{Arc, Mutex},
};

/// Shown next to an empty input list.
pub const NO_INPUTS: &str = "No MIDI Inputs Enabled";
/// Shown next to an empty output list.
pub const NO_OUTPUTS: &str = "No MIDI Outputs Enabled";

/// Receives the raw bytes of every message from an input device. Runs on the
/// driver's callback thread.
pub type InputHandler = Box<dyn FnMut(&[u8]) + Send + 'static>;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeviceInfo {
    pub id: String,
    pub name: String,
}

/// An open output device. Dropping it closes the device.
pub trait OutputPort: Send {
    fn name(&self) -> &str;
    fn send(&mut self, bytes: &[u8]) -> Result<()>;
}

/// The platform MIDI layer as seen by the selector.
pub trait MidiSubsystem {
    fn list_inputs(&self) -> Vec<DeviceInfo>;
    fn list_outputs(&self) -> Vec<DeviceInfo>;
    fn is_input_enabled(&self, id: &str) -> bool;
    fn enable_input(&mut self, id: &str) -> Result<()>;
    fn register_input_callback(&mut self, id: &str, handler: InputHandler) -> Result<()>;
    fn unregister_input_callback(&mut self, id: &str);
    /// `None` when the device cannot be opened.
    fn open_output(&mut self, id: &str) -> Option<Box<dyn OutputPort>>;
}

// ─────────────────── selection ───────────────────────────────────────────────

/// Two selection lists with an implicit "None" at index 0.
pub struct DeviceSelector<S: MidiSubsystem> {
    subsystem: S,
    inputs: Vec<DeviceInfo>,
    outputs: Vec<DeviceInfo>,
    input_index: usize,
    output_index: usize,
    active_input: Option<String>, // id of the device our handler is registered on
    active_output: Option<String>, // id of the device last opened
}

impl<S: MidiSubsystem> DeviceSelector<S> {
    pub fn new(subsystem: S) -> Self {
        let mut selector = Self {
            subsystem,
            inputs: Vec::new(),
            outputs: Vec::new(),
            input_index: 0,
            output_index: 0,
            active_input: None,
            active_output: None,
        };
        selector.refresh();
        selector
    }

    /// Re-enumerates both lists. Current selections keep their device but the
    /// reported indices follow the new ordering. A selected device that is gone
    /// falls back to "None"; returns `true` when that happened to the output,
    /// whose open port the caller owns.
    pub fn refresh(&mut self) -> bool {
        self.inputs = self.subsystem.list_inputs();
        self.outputs = self.subsystem.list_outputs();
        log::debug!(
            "found {} MIDI inputs and {} MIDI outputs",
            self.inputs.len(),
            self.outputs.len()
        );

        self.input_index = 0;
        if let Some(id) = self.active_input.take() {
            match position(&self.inputs, &id) {
                Some(index) => {
                    self.input_index = index;
                    self.active_input = Some(id);
                }
                None => {
                    self.subsystem.unregister_input_callback(&id);
                    log::info!("🎹 Input {id} disappeared, selection reset to None");
                }
            }
        }

        self.output_index = 0;
        if let Some(id) = self.active_output.take() {
            match position(&self.outputs, &id) {
                Some(index) => {
                    self.output_index = index;
                    self.active_output = Some(id);
                }
                None => {
                    log::info!("🔊 Output {id} disappeared, selection reset to None");
                    return true;
                }
            }
        }
        false
    }

    pub fn input_index(&self) -> usize {
        self.input_index
    }

    pub fn output_index(&self) -> usize {
        self.output_index
    }

    pub fn input_labels(&self) -> Vec<String> {
        labels(&self.inputs)
    }

    pub fn output_labels(&self) -> Vec<String> {
        labels(&self.outputs)
    }

    /// Stops listening to the previous input and, for `index > 0`, starts
    /// listening to input `index - 1` through `make_handler`.
    pub fn select_input(
        &mut self,
        index: usize,
        make_handler: impl FnOnce(&DeviceInfo) -> InputHandler,
    ) -> Result<()> {
        if index > self.inputs.len() {
            bail!(
                "input index {index} out of range (0..={})",
                self.inputs.len()
            );
        }

        if let Some(previous) = self.active_input.take() {
            self.subsystem.unregister_input_callback(&previous);
            log::info!("🎹 Stopped listening to {previous}");
        }
        self.input_index = 0;

        if index == 0 {
            log::info!("Input selected: None");
            return Ok(());
        }

        let device = self.inputs[index - 1].clone();
        if !self.subsystem.is_input_enabled(&device.id) {
            self.subsystem
                .enable_input(&device.id)
                .with_context(|| format!("enable input {}", device.name))?;
        }
        self.subsystem
            .register_input_callback(&device.id, make_handler(&device))
            .with_context(|| format!("listen to {}", device.name))?;

        log::info!("🎹 Input selected: {}", device.name);
        self.active_input = Some(device.id);
        self.input_index = index;
        Ok(())
    }

    /// Opens output `index - 1`; index 0 yields no handle. A device that
    /// fails to open also yields no handle.
    pub fn select_output(&mut self, index: usize) -> Result<Option<Box<dyn OutputPort>>> {
        if index > self.outputs.len() {
            bail!(
                "output index {index} out of range (0..={})",
                self.outputs.len()
            );
        }
        self.output_index = 0;
        self.active_output = None;

        if index == 0 {
            log::info!("Output selected: None");
            return Ok(None);
        }

        let device = &self.outputs[index - 1];
        let port = self.subsystem.open_output(&device.id);
        match &port {
            Some(p) => {
                log::info!("🔊 Output selected: {}", p.name());
                self.output_index = index;
                self.active_output = Some(device.id.clone());
            }
            None => log::warn!("Could not open {}, output disabled", device.name),
        }
        Ok(port)
    }
}

impl<S: MidiSubsystem> Drop for DeviceSelector<S> {
    fn drop(&mut self) {
        if let Some(id) = self.active_input.take() {
            self.subsystem.unregister_input_callback(&id);
        }
    }
}

fn position(devices: &[DeviceInfo], id: &str) -> Option<usize> {
    devices.iter().position(|d| d.id == id).map(|i| i + 1)
}

fn labels(devices: &[DeviceInfo]) -> Vec<String> {
    std::iter::once("None".to_string())
        .chain(devices.iter().map(|d| d.name.clone()))
        .collect()
}

// ─────────────────── midir backend ───────────────────────────────────────────

type HandlerSlot = Arc<Mutex<Option<InputHandler>>>;

struct EnabledInput {
    _conn: MidiInputConnection<()>, // RAII – stays open while enabled
    handler: HandlerSlot,
}

/// `MidiSubsystem` on top of midir. Enabling an input opens a connection that
/// stays open; registering a callback only swaps the handler it dispatches to.
pub struct MidirSubsystem {
    client_name: String,
    enabled: HashMap<String, EnabledInput>,
}

impl MidirSubsystem {
    pub fn new(client_name: &str) -> Self {
        Self {
            client_name: client_name.to_string(),
            enabled: HashMap::new(),
        }
    }

    fn scan_name(&self) -> String {
        format!("{}-scan", self.client_name)
    }
}

impl MidiSubsystem for MidirSubsystem {
    fn list_inputs(&self) -> Vec<DeviceInfo> {
        // New client each pass so the port list is up-to-date
        let inp = match MidiInput::new(&self.scan_name()) {
            Ok(inp) => inp,
            Err(e) => {
                log::warn!("MIDI input subsystem unavailable: {e}");
                return Vec::new();
            }
        };
        inp.ports()
            .iter()
            .filter_map(|port| {
                let name = inp.port_name(port).ok()?;
                Some(DeviceInfo { id: port.id(), name })
            })
            .collect()
    }

    fn list_outputs(&self) -> Vec<DeviceInfo> {
        let out = match MidiOutput::new(&self.scan_name()) {
            Ok(out) => out,
            Err(e) => {
                log::warn!("MIDI output subsystem unavailable: {e}");
                return Vec::new();
            }
        };
        out.ports()
            .iter()
            .filter_map(|port| {
                let name = out.port_name(port).ok()?;
                Some(DeviceInfo { id: port.id(), name })
            })
            .collect()
    }

    fn is_input_enabled(&self, id: &str) -> bool {
        self.enabled.contains_key(id)
    }

    fn enable_input(&mut self, id: &str) -> Result<()> {
        if self.enabled.contains_key(id) {
            return Ok(());
        }

        let mut midi_in = MidiInput::new(&self.client_name)?;
        midi_in.ignore(Ignore::None);

        let port = midi_in
            .find_port_by_id(id.to_string())
            .with_context(|| format!("no MIDI input with id {id}"))?;
        let name = midi_in.port_name(&port)?;

        let handler: HandlerSlot = Arc::new(Mutex::new(None));
        let slot = handler.clone();
        let conn = midi_in
            .connect(
                &port,
                &self.client_name,
                move |_stamp, msg, _| {
                    if let Ok(mut guard) = slot.lock() {
                        if let Some(handler) = guard.as_mut() {
                            handler(msg);
                        }
                    }
                },
                (),
            )
            .map_err(|e| anyhow!("connect {name}: {e}"))?;

        log::info!("🎹 Connected to {name}");
        self.enabled.insert(
            id.to_string(),
            EnabledInput {
                _conn: conn,
                handler,
            },
        );
        Ok(())
    }

    fn register_input_callback(&mut self, id: &str, handler: InputHandler) -> Result<()> {
        let input = self
            .enabled
            .get(id)
            .with_context(|| format!("MIDI input {id} is not enabled"))?;
        let mut slot = input
            .handler
            .lock()
            .map_err(|_| anyhow!("handler slot for {id} poisoned"))?;
        *slot = Some(handler);
        Ok(())
    }

    fn unregister_input_callback(&mut self, id: &str) {
        if let Some(input) = self.enabled.get(id) {
            if let Ok(mut slot) = input.handler.lock() {
                *slot = None;
            }
        }
    }

    fn open_output(&mut self, id: &str) -> Option<Box<dyn OutputPort>> {
        let midi_out = match MidiOutput::new(&self.client_name) {
            Ok(out) => out,
            Err(e) => {
                log::warn!("MIDI output subsystem unavailable: {e}");
                return None;
            }
        };
        let port = midi_out.find_port_by_id(id.to_string())?;
        let name = midi_out.port_name(&port).unwrap_or_else(|_| id.to_string());

        match midi_out.connect(&port, &self.client_name) {
            Ok(conn) => Some(Box::new(MidirOutput { name, conn })),
            Err(e) => {
                log::warn!("Failed to connect to {name}: {e}");
                None
            }
        }
    }
}

struct MidirOutput {
    name: String,
    conn: MidiOutputConnection,
}

impl OutputPort for MidirOutput {
    fn name(&self) -> &str {
        &self.name
    }

    fn send(&mut self, bytes: &[u8]) -> Result<()> {
        self.conn
            .send(bytes)
            .map_err(|e| anyhow!("send to {}: {e}", self.name))
    }
}

impl Drop for MidirOutput {
    fn drop(&mut self) {
        log::info!("🔊 Closed {}", self.name);
    }
}

// ─────────────────── test double ─────────────────────────────────────────────

#[cfg(test)]
pub mod fake {
    //! A recording `MidiSubsystem` for tests.

    use super::*;

    /// Everything the fake saw, in order.
    #[derive(Debug, Clone, PartialEq, Eq)]
    pub enum Call {
        Enable(String),
        Register(String),
        Unregister(String),
        Open(String),
        Send(String, Vec<u8>),
        Close(String),
    }

    #[derive(Clone, Default)]
    pub struct Journal(Arc<Mutex<Vec<Call>>>);

    impl Journal {
        pub fn push(&self, call: Call) {
            self.0.lock().unwrap().push(call);
        }

        pub fn calls(&self) -> Vec<Call> {
            self.0.lock().unwrap().clone()
        }

        pub fn sends(&self) -> Vec<(String, Vec<u8>)> {
            self.calls()
                .into_iter()
                .filter_map(|c| match c {
                    Call::Send(dev, bytes) => Some((dev, bytes)),
                    _ => None,
                })
                .collect()
        }
    }

    pub type Handlers = Arc<Mutex<HashMap<String, InputHandler>>>;

    /// Ids hidden from enumeration, shared so tests can unplug devices
    /// after the fake has moved into a selector.
    pub type Unplugged = Arc<Mutex<Vec<String>>>;

    #[derive(Default)]
    pub struct FakeSubsystem {
        pub inputs: Vec<DeviceInfo>,
        pub outputs: Vec<DeviceInfo>,
        pub unopenable: Vec<String>,
        pub unplugged: Unplugged,
        pub journal: Journal,
        pub handlers: Handlers,
        enabled: Vec<String>,
    }

    pub fn device(id: &str) -> DeviceInfo {
        DeviceInfo {
            id: id.to_string(),
            name: format!("{id} port"),
        }
    }

    impl FakeSubsystem {
        pub fn new(inputs: &[&str], outputs: &[&str]) -> Self {
            Self {
                inputs: inputs.iter().map(|id| device(id)).collect(),
                outputs: outputs.iter().map(|id| device(id)).collect(),
                ..Default::default()
            }
        }

        fn plugged(&self, devices: &[DeviceInfo]) -> Vec<DeviceInfo> {
            let unplugged = self.unplugged.lock().unwrap();
            devices
                .iter()
                .filter(|d| !unplugged.contains(&d.id))
                .cloned()
                .collect()
        }
    }

    /// Feed bytes into the handler registered for `id`, as the driver would.
    pub fn deliver(handlers: &Handlers, id: &str, bytes: &[u8]) -> bool {
        match handlers.lock().unwrap().get_mut(id) {
            Some(handler) => {
                handler(bytes);
                true
            }
            None => false,
        }
    }

    impl MidiSubsystem for FakeSubsystem {
        fn list_inputs(&self) -> Vec<DeviceInfo> {
            self.plugged(&self.inputs)
        }

        fn list_outputs(&self) -> Vec<DeviceInfo> {
            self.plugged(&self.outputs)
        }

        fn is_input_enabled(&self, id: &str) -> bool {
            self.enabled.iter().any(|e| e == id)
        }

        fn enable_input(&mut self, id: &str) -> Result<()> {
            self.journal.push(Call::Enable(id.to_string()));
            self.enabled.push(id.to_string());
            Ok(())
        }

        fn register_input_callback(&mut self, id: &str, handler: InputHandler) -> Result<()> {
            self.journal.push(Call::Register(id.to_string()));
            self.handlers.lock().unwrap().insert(id.to_string(), handler);
            Ok(())
        }

        fn unregister_input_callback(&mut self, id: &str) {
            self.journal.push(Call::Unregister(id.to_string()));
            self.handlers.lock().unwrap().remove(id);
        }

        fn open_output(&mut self, id: &str) -> Option<Box<dyn OutputPort>> {
            self.journal.push(Call::Open(id.to_string()));
            if self.unopenable.iter().any(|u| u == id) {
                return None;
            }
            Some(Box::new(FakeOutput {
                id: id.to_string(),
                journal: self.journal.clone(),
            }))
        }
    }

    pub struct FakeOutput {
        pub id: String,
        pub journal: Journal,
    }

    impl OutputPort for FakeOutput {
        fn name(&self) -> &str {
            &self.id
        }

        fn send(&mut self, bytes: &[u8]) -> Result<()> {
            self.journal.push(Call::Send(self.id.clone(), bytes.to_vec()));
            Ok(())
        }
    }

    impl Drop for FakeOutput {
        fn drop(&mut self) {
            self.journal.push(Call::Close(self.id.clone()));
        }
    }
}

//! Forwards events to the selected output and queues them for the log.
//!
//! Every event carries an [`Origin`]. Echoes of the keyboard model mirroring
//! hardware input are dropped here, so a hardware note shows up once and is
//! sent once no matter how the keyboard reacts to it.

use anyhow::Result;
use std::sync::{
    Arc, Mutex, PoisonError,
    mpsc::{SyncSender, TrySendError},
};

use crate::clock::Clock;
use crate::devices::{InputHandler, OutputPort};
use crate::midi::MidiEvent;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Origin {
    /// Received from the selected hardware input.
    HardwareInput,
    /// Played on the on-screen keyboard.
    KeyboardUser,
    /// Emitted by the keyboard model while mirroring hardware input.
    KeyboardEcho,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Routed {
    pub event: MidiEvent,
    pub origin: Origin,
}

type SharedOutput = Arc<Mutex<Option<Box<dyn OutputPort>>>>;

/// Cheap to clone; clones share the output and the queue.
pub struct Router<M> {
    output: SharedOutput,
    queue: SyncSender<M>,
}

impl<M> Clone for Router<M> {
    fn clone(&self) -> Self {
        Self {
            output: self.output.clone(),
            queue: self.queue.clone(),
        }
    }
}

impl<M: From<Routed> + Send + 'static> Router<M> {
    pub fn new(queue: SyncSender<M>) -> Self {
        Self {
            output: Arc::new(Mutex::new(None)),
            queue,
        }
    }

    /// Replaces the output. The old port is closed before the lock is released.
    pub fn set_output(&self, port: Option<Box<dyn OutputPort>>) {
        let mut slot = self.output.lock().unwrap_or_else(PoisonError::into_inner);
        let previous = std::mem::replace(&mut *slot, port);
        drop(previous);
    }

    pub fn dispatch(&self, event: MidiEvent, origin: Origin) {
        if origin == Origin::KeyboardEcho {
            log::trace!("suppressed keyboard echo {:02X?}", event.bytes());
            return;
        }

        if let Err(e) = self.forward(&event) {
            log::warn!("{e:#}");
        }

        let routed = Routed { event, origin }.into();
        if let Err(TrySendError::Full(_)) = self.queue.try_send(routed) {
            log::warn!("event queue full, dropping event");
        }
    }

    fn forward(&self, event: &MidiEvent) -> Result<()> {
        let mut slot = self.output.lock().unwrap_or_else(PoisonError::into_inner);
        match slot.as_mut() {
            Some(port) => port.send(event.bytes()),
            None => Ok(()),
        }
    }

    /// A driver callback that stamps raw bytes and routes them as hardware input.
    pub fn input_handler(&self, source: &str, clock: Clock) -> InputHandler {
        let router = self.clone();
        let source = source.to_string();
        Box::new(move |bytes: &[u8]| {
            let event = MidiEvent::new(bytes, clock.now(), source.as_str());
            router.dispatch(event, Origin::HardwareInput);
        })
    }
}

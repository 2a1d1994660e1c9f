//! The scrolling event log.

use std::collections::VecDeque;

use crate::describe::describe;
use crate::midi::MidiEvent;

/// Entry count past which an unbounded log starts complaining.
pub const LOG_GROWTH_WARNING: usize = 10_000;

pub struct MessageLog {
    start_time: f64,
    entries: VecDeque<String>,
    capacity: Option<usize>,
    total: u64,
    warned: bool,
}

impl MessageLog {
    /// `capacity` of `None` keeps every entry.
    pub fn new(start_time: f64, capacity: Option<usize>) -> Self {
        Self {
            start_time,
            entries: VecDeque::new(),
            capacity,
            total: 0,
            warned: false,
        }
    }

    pub fn record(&mut self, event: &MidiEvent) {
        let line = format!(
            "{}  -  {} ({})",
            timecode(event.timestamp() - self.start_time),
            describe(event),
            event.source()
        );
        log::debug!("{line}");

        if let Some(cap) = self.capacity {
            while self.entries.len() >= cap {
                self.entries.pop_front();
            }
        } else if self.entries.len() >= LOG_GROWTH_WARNING && !self.warned {
            log::warn!(
                "event log holds {} entries and is unbounded; set MIDI_LOG_CAPACITY to cap it",
                self.entries.len()
            );
            self.warned = true;
        }

        self.entries.push_back(line);
        self.total += 1;
    }

    #[cfg(test)]
    pub fn entries(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Entries ever recorded, including evicted ones.
    pub fn total(&self) -> u64 {
        self.total
    }

    /// Entries recorded after the first `seen` (by `total`) that are still held.
    pub fn since(&self, seen: u64) -> impl Iterator<Item = &str> {
        let fresh = (self.total.saturating_sub(seen) as usize).min(self.entries.len());
        self.entries
            .iter()
            .skip(self.entries.len() - fresh)
            .map(String::as_str)
    }
}

/// `HH:MM:SS.mmm`, hours wrapping at 24.
pub fn timecode(elapsed: f64) -> String {
    let total_ms = (elapsed.max(0.0) * 1000.0).round() as u64;

    let hours = (total_ms / 3_600_000) % 24;
    let minutes = (total_ms / 60_000) % 60;
    let seconds = (total_ms / 1000) % 60;
    let millis = total_ms % 1000;

    format!("{hours:02}:{minutes:02}:{seconds:02}.{millis:03}")
}

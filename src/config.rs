//! Startup settings, read once from the environment.

use anyhow::{Context, Result, bail};
use std::{env, str::FromStr};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    pub client_name: String,
    pub queue_capacity: usize,
    pub log_capacity: Option<usize>,
    pub keyboard_channel: u8,
    pub keyboard_velocity: u8,
    pub initial_input: usize,
    pub initial_output: usize,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            client_name: "midi-router-log".into(),
            queue_capacity: 1024,
            log_capacity: None,
            keyboard_channel: 1,
            keyboard_velocity: 100,
            initial_input: 0,
            initial_output: 0,
        }
    }
}

impl Config {
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Same as `from_env` with an injectable variable source.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let defaults = Self::default();
        let cfg = Self {
            client_name: lookup("MIDI_CLIENT_NAME").unwrap_or(defaults.client_name),
            queue_capacity: parse(&lookup, "MIDI_QUEUE_CAPACITY")?
                .unwrap_or(defaults.queue_capacity),
            log_capacity: parse(&lookup, "MIDI_LOG_CAPACITY")?,
            keyboard_channel: parse(&lookup, "MIDI_KEYBOARD_CHANNEL")?
                .unwrap_or(defaults.keyboard_channel),
            keyboard_velocity: parse(&lookup, "MIDI_KEYBOARD_VELOCITY")?
                .unwrap_or(defaults.keyboard_velocity),
            initial_input: parse(&lookup, "MIDI_INPUT")?.unwrap_or(defaults.initial_input),
            initial_output: parse(&lookup, "MIDI_OUTPUT")?.unwrap_or(defaults.initial_output),
        };

        if cfg.queue_capacity == 0 {
            bail!("MIDI_QUEUE_CAPACITY must be at least 1");
        }
        if cfg.log_capacity == Some(0) {
            bail!("MIDI_LOG_CAPACITY must be at least 1");
        }
        if !(1..=16).contains(&cfg.keyboard_channel) {
            bail!("MIDI_KEYBOARD_CHANNEL must be 1..=16, got {}", cfg.keyboard_channel);
        }
        if !(1..=127).contains(&cfg.keyboard_velocity) {
            bail!("MIDI_KEYBOARD_VELOCITY must be 1..=127, got {}", cfg.keyboard_velocity);
        }
        Ok(cfg)
    }
}

fn parse<T>(lookup: &impl Fn(&str) -> Option<String>, key: &str) -> Result<Option<T>>
where
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    lookup(key)
        .map(|raw| {
            raw.trim()
                .parse()
                .with_context(|| format!("invalid {key} {raw:?}"))
        })
        .transpose()
}

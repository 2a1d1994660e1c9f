//! Line commands typed into the terminal, standing in for the dropdowns and
//! the clickable keyboard.

use anyhow::{Context, Result, anyhow, bail};
use std::{
    io::{self, BufRead},
    str::FromStr,
    sync::mpsc::SyncSender,
    thread,
};

pub const HELP: &str = "\
commands:
  in <n>                   select MIDI input n (0 = none)
  out <n>                  select MIDI output n (0 = none)
  press <note> [velocity]  play a note on the on-screen keyboard (alias p)
  release <note>           release a note (alias r)
  devices                  list MIDI devices (alias ls)
  keys                     show the on-screen keyboard
  help                     show this text
  quit                     exit (alias q)
notes are numbers (60) or names (C3, F#4, Db2)";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    SelectInput(usize),
    SelectOutput(usize),
    Press { note: u8, velocity: Option<u8> },
    Release { note: u8 },
    Devices,
    Keys,
    Help,
    Quit,
}

impl FromStr for Command {
    type Err = anyhow::Error;

    fn from_str(line: &str) -> Result<Self> {
        let mut words = line.split_whitespace();
        let Some(verb) = words.next() else {
            bail!("empty command");
        };
        let arg = words.next();

        let cmd = match verb.to_ascii_lowercase().as_str() {
            "in" | "input" => Command::SelectInput(index(arg)?),
            "out" | "output" => Command::SelectOutput(index(arg)?),
            "press" | "p" => Command::Press {
                note: parse_note(arg.context("missing note")?)?,
                velocity: words
                    .next()
                    .map(|v| match v.parse::<u8>() {
                        Ok(vel @ 1..=127) => Ok(vel),
                        _ => Err(anyhow!("velocity must be 1..=127, got {v:?}")),
                    })
                    .transpose()?,
            },
            "release" | "r" => Command::Release {
                note: parse_note(arg.context("missing note")?)?,
            },
            "devices" | "ls" => Command::Devices,
            "keys" => Command::Keys,
            "help" | "?" => Command::Help,
            "quit" | "q" | "exit" => Command::Quit,
            other => bail!("unknown command {other:?}, try `help`"),
        };
        Ok(cmd)
    }
}

fn index(arg: Option<&str>) -> Result<usize> {
    let arg = arg.context("missing device index")?;
    arg.parse()
        .with_context(|| format!("invalid device index {arg:?}"))
}

/// Accepts `0..=127` or a note name in the same octave numbering the log
/// prints (`C3` = 60).
pub fn parse_note(text: &str) -> Result<u8> {
    if let Ok(n) = text.parse::<u8>() {
        if n <= 127 {
            return Ok(n);
        }
        bail!("note {n} out of range");
    }

    let mut chars = text.chars();
    let letter = chars.next().context("empty note")?;
    let base: i32 = match letter.to_ascii_uppercase() {
        'C' => 0,
        'D' => 2,
        'E' => 4,
        'F' => 5,
        'G' => 7,
        'A' => 9,
        'B' => 11,
        _ => bail!("invalid note {text:?}"),
    };
    let rest = chars.as_str();
    let (shift, octave) = if let Some(o) = rest.strip_prefix('#') {
        (1, o)
    } else if let Some(o) = rest.strip_prefix('b') {
        (-1, o)
    } else {
        (0, rest)
    };
    let octave: i32 = octave
        .parse()
        .with_context(|| format!("invalid note {text:?}"))?;

    let note = (octave - (crate::describe::MIDDLE_C_OCTAVE - 5)) * 12 + base + shift;
    u8::try_from(note)
        .ok()
        .filter(|n| *n <= 127)
        .with_context(|| format!("note {text:?} out of range"))
}

/// Reads stdin on its own thread, turning each line into a message on the UI
/// queue. End of input sends `Quit`.
pub fn spawn_reader<M>(tx: SyncSender<M>) -> Result<thread::JoinHandle<()>>
where
    M: From<Command> + Send + 'static,
{
    let handle = thread::Builder::new()
        .name("stdin".into())
        .spawn(move || {
            for line in io::stdin().lock().lines() {
                let Ok(line) = line else { break };
                if line.trim().is_empty() {
                    continue;
                }
                match line.parse::<Command>() {
                    Ok(cmd) => {
                        let quit = cmd == Command::Quit;
                        if tx.send(cmd.into()).is_err() || quit {
                            return;
                        }
                    }
                    Err(e) => log::warn!("{e:#}"),
                }
            }
            tx.send(Command::Quit.into()).ok();
        })?;
    Ok(handle)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_selection_commands() {
        assert_eq!("in 2".parse::<Command>().unwrap(), Command::SelectInput(2));
        assert_eq!("OUT 0".parse::<Command>().unwrap(), Command::SelectOutput(0));
        assert!("in".parse::<Command>().is_err());
        assert!("out -1".parse::<Command>().is_err());
    }

    #[test]
    fn parses_keyboard_commands() {
        assert_eq!(
            "press C3".parse::<Command>().unwrap(),
            Command::Press {
                note: 60,
                velocity: None
            }
        );
        assert_eq!(
            "p 64 30".parse::<Command>().unwrap(),
            Command::Press {
                note: 64,
                velocity: Some(30)
            }
        );
        assert_eq!("r F#3".parse::<Command>().unwrap(), Command::Release { note: 66 });
        assert!("p 60 0".parse::<Command>().is_err());
        assert!("p 60 200".parse::<Command>().is_err());
        assert!("press".parse::<Command>().is_err());
    }

    #[test]
    fn parses_misc_commands() {
        assert_eq!("ls".parse::<Command>().unwrap(), Command::Devices);
        assert_eq!("keys".parse::<Command>().unwrap(), Command::Keys);
        assert_eq!("q".parse::<Command>().unwrap(), Command::Quit);
        assert!("dance".parse::<Command>().is_err());
        assert!("".parse::<Command>().is_err());
    }

    #[test]
    fn note_names_match_the_log_octaves() {
        assert_eq!(parse_note("C3").unwrap(), 60);
        assert_eq!(parse_note("c#3").unwrap(), 61);
        assert_eq!(parse_note("Db3").unwrap(), 61);
        assert_eq!(parse_note("C-2").unwrap(), 0);
        assert_eq!(parse_note("G8").unwrap(), 127);
        assert!(parse_note("G#8").is_err());
        assert!(parse_note("Cb-2").is_err());
        assert!(parse_note("H2").is_err());
        assert!(parse_note("128").is_err());
    }
}

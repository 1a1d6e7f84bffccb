use std::{
    collections::BTreeMap,
    io::BufRead,
    sync::mpsc::{self, Receiver, TryRecvError},
    thread,
};

use crate::Result;

/// User intent delivered to the frame loops.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Signal {
    /// Stop the current loop.
    Quit,
    /// Timestamp the next lyric during marking.
    Mark,
}

/// Non-blocking source of [`Signal`]s, drained once per frame.
pub trait InputSource {
    fn drain(&mut self) -> Vec<Signal>;
}

impl<I: InputSource + ?Sized> InputSource for &mut I {
    fn drain(&mut self) -> Vec<Signal> {
        (**self).drain()
    }
}

/// Never produces a signal.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoInput;

impl InputSource for NoInput {
    fn drain(&mut self) -> Vec<Signal> {
        Vec::new()
    }
}

/// Replays signals at fixed poll counts. The first call to
/// [`InputSource::drain`] is poll 0.
#[derive(Debug, Default, Clone)]
pub struct ScriptedInput {
    script: BTreeMap<u64, Vec<Signal>>,
    polls: u64,
}

impl ScriptedInput {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn at(mut self, poll: u64, signal: Signal) -> Self {
        self.script.entry(poll).or_default().push(signal);
        self
    }

    pub fn polls(&self) -> u64 {
        self.polls
    }
}

impl InputSource for ScriptedInput {
    fn drain(&mut self) -> Vec<Signal> {
        let signals = self.script.remove(&self.polls).unwrap_or_default();
        self.polls += 1;
        signals
    }
}

/// Reads lines from standard input on a helper thread. `q` or `quit` is
/// [`Signal::Quit`]; any other line, empty included, is [`Signal::Mark`].
/// End of input simply ends the reader.
#[derive(Debug)]
pub struct StdinInput {
    receiver: Receiver<Signal>,
    connected: bool,
}

impl StdinInput {
    pub fn spawn() -> Result<Self> {
        let (sender, receiver) = mpsc::channel();
        thread::Builder::new()
            .name("stdin-input".into())
            .spawn(move || {
                let stdin = std::io::stdin();
                for line in stdin.lock().lines() {
                    let Ok(line) = line else { break };
                    if sender.send(parse_line(&line)).is_err() {
                        break;
                    }
                }
                tracing::debug!("stdin closed");
            })?;
        Ok(Self {
            receiver,
            connected: true,
        })
    }
}

impl InputSource for StdinInput {
    fn drain(&mut self) -> Vec<Signal> {
        let mut signals = Vec::new();
        while self.connected {
            match self.receiver.try_recv() {
                Ok(signal) => signals.push(signal),
                Err(TryRecvError::Empty) => break,
                Err(TryRecvError::Disconnected) => self.connected = false,
            }
        }
        signals
    }
}

fn parse_line(line: &str) -> Signal {
    match line.trim().to_ascii_lowercase().as_str() {
        "q" | "quit" => Signal::Quit,
        _ => Signal::Mark,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn script_fires_on_its_poll() {
        let mut input = ScriptedInput::new()
            .at(1, Signal::Mark)
            .at(1, Signal::Quit)
            .at(3, Signal::Mark);
        assert!(input.drain().is_empty());
        assert_eq!(input.drain(), vec![Signal::Mark, Signal::Quit]);
        assert!(input.drain().is_empty());
        assert_eq!(input.drain(), vec![Signal::Mark]);
        assert!(input.drain().is_empty());
        assert_eq!(input.polls(), 5);
    }

    #[test]
    fn stdin_lines_map_to_signals() {
        assert_eq!(parse_line(""), Signal::Mark);
        assert_eq!(parse_line("next"), Signal::Mark);
        assert_eq!(parse_line(" Q "), Signal::Quit);
        assert_eq!(parse_line("quit"), Signal::Quit);
    }
}

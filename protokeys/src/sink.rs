//! The boundary to whatever turns keys into keystrokes.

use std::fmt::Debug;
use std::io::Write;
use log::info;
use protokeys_input::Key;
use crate::config::SinkKind;

pub trait KeySink: Debug {
    fn send(&mut self, key: Key) -> std::io::Result<()>;
}

/// Logs every key at info level.
#[derive(Debug, Default)]
pub struct LogSink {
    sent: usize,
}

impl KeySink for LogSink {
    fn send(&mut self, key: Key) -> std::io::Result<()> {
        self.sent += 1;
        info!("Key {:?} (#{})", key, self.sent);
        Ok(())
    }
}

/// Writes every key to a stream as it arrives, stdout by default.
#[derive(Debug)]
pub struct StdoutSink<W: Write + Debug = std::io::Stdout> {
    out: W,
}

impl<W: Write + Debug> StdoutSink<W> {
    pub fn new(out: W) -> Self {
        StdoutSink { out }
    }
}

impl<W: Write + Debug> KeySink for StdoutSink<W> {
    fn send(&mut self, key: Key) -> std::io::Result<()> {
        let mut buf = [0u8; 4];
        self.out.write_all(key.encode_utf8(&mut buf).as_bytes())?;
        self.out.flush()
    }
}

pub fn from_kind(kind: SinkKind) -> Box<dyn KeySink> {
    match kind {
        SinkKind::Log => Box::new(LogSink::default()),
        SinkKind::Stdout => Box::new(StdoutSink::new(std::io::stdout())),
    }
}

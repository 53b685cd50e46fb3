use anyhow::Context;
use crate::network_protocol::OracleMessage;
use std::io::{self, BufRead, BufReader, Write};
use std::net::{TcpStream, ToSocketAddrs};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

/// Shared flag used to abort a blocking receive from another thread.
/// Once cancelled it stays cancelled until `reset`.
#[derive(Debug, Clone, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn reset(&self) {
        self.0.store(false, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

/// Why a bounded receive gave up.
#[derive(Debug)]
pub enum ReceiveError {
    Cancelled,
    TimedOut,
    Closed,
    Io(io::Error),
    Malformed(serde_json::Error),
}

pub struct NetworkConnection {
    stream: TcpStream,
    reader: BufReader<TcpStream>,
}

impl NetworkConnection {
    /// Connect to a peer, giving up after `timeout`.
    pub fn connect(address: &str, timeout: Duration) -> anyhow::Result<Self> {
        tracing::debug!(%address, "connecting");
        let addr = address
            .to_socket_addrs()
            .with_context(|| format!("resolving {address}"))?
            .next()
            .with_context(|| format!("{address} did not resolve to any address"))?;
        let stream = TcpStream::connect_timeout(&addr, timeout).with_context(|| format!("connecting to {address}"))?;
        Self::from_stream(stream)
    }

    /// Wrap an accepted stream.
    pub fn from_stream(stream: TcpStream) -> anyhow::Result<Self> {
        stream.set_nodelay(true).ok();
        let reader = BufReader::new(stream.try_clone().context("cloning stream")?);
        Ok(Self { stream, reader })
    }

    /// Send a message
    pub fn send(&mut self, message: &OracleMessage) -> anyhow::Result<()> {
        let json = serde_json::to_string(message)?;
        writeln!(self.stream, "{}", json)?;
        self.stream.flush()?;
        Ok(())
    }

    /// Receive a message (blocking). Returns `None` on a clean disconnect.
    pub fn receive(&mut self) -> anyhow::Result<Option<OracleMessage>> {
        self.stream.set_read_timeout(None)?;
        let mut line = Vec::new();
        if self.reader.read_until(b'\n', &mut line)? == 0 {
            return Ok(None);
        }
        let message = serde_json::from_slice(&line).context("failed to parse incoming message")?;
        Ok(Some(message))
    }

    /// Receive a message, polling `cancel` every `poll` and giving up at
    /// `deadline`. `None` waits until cancelled or disconnected.
    pub fn receive_until(&mut self, cancel: &CancelToken, deadline: Option<Instant>, poll: Duration) -> Result<OracleMessage, ReceiveError> {
        self.stream.set_read_timeout(Some(poll)).map_err(ReceiveError::Io)?;
        // Bytes of a partially received line survive a timed-out read.
        let mut line = Vec::new();
        loop {
            if cancel.is_cancelled() {
                return Err(ReceiveError::Cancelled);
            }
            if deadline.is_some_and(|d| Instant::now() >= d) {
                return Err(ReceiveError::TimedOut);
            }
            match self.reader.read_until(b'\n', &mut line) {
                Ok(0) => return Err(ReceiveError::Closed),
                Ok(_) if line.ends_with(b"\n") => {
                    return serde_json::from_slice(&line).map_err(ReceiveError::Malformed);
                }
                // EOF in the middle of a line
                Ok(_) => return Err(ReceiveError::Closed),
                Err(e) if matches!(e.kind(), io::ErrorKind::WouldBlock | io::ErrorKind::TimedOut | io::ErrorKind::Interrupted) => {
                    continue;
                }
                Err(e) => return Err(ReceiveError::Io(e)),
            }
        }
    }
}

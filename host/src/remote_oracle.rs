// Remote oracle: delegates collapse draws to a service over TCP.
//
// The client keeps one connection open between calls and drops it after any
// failure so the next call reconnects. A call blocks until the service
// answers, the timeout elapses, or the cancel token fires; a remote queue
// can take a very long time, so callers that must stay responsive keep a
// clone of the token and cancel from another thread.
//
// `OracleServer` is the matching service side. It answers each signed
// request with one draw from an inner oracle, optionally after a fixed
// latency that stands in for queueing.

use std::net::{SocketAddr, TcpListener, TcpStream};
use std::sync::{Arc, Mutex, PoisonError};
use std::thread;
use std::time::{Duration, Instant};

use anyhow::Context;
use qfleet_core::{Bias, OracleError, Outcome, RandomOracle};

use crate::network::{CancelToken, NetworkConnection, ReceiveError};
use crate::network_protocol::{CollapseRequest, OracleMessage};

const POLL_INTERVAL: Duration = Duration::from_millis(50);
const CONNECT_TIMEOUT: Duration = Duration::from_secs(10);

pub struct RemoteOracle {
    address: String,
    api_key: Vec<u8>,
    timeout: Duration,
    cancel: CancelToken,
    connection: Mutex<Option<NetworkConnection>>,
}

impl RemoteOracle {
    pub fn new(address: impl Into<String>, api_key: impl Into<Vec<u8>>, timeout: Duration) -> Self {
        Self {
            address: address.into(),
            api_key: api_key.into(),
            timeout,
            cancel: CancelToken::new(),
            connection: Mutex::new(None),
        }
    }

    /// Token that aborts the call in flight (and every later call until it
    /// is reset).
    pub fn cancel_token(&self) -> CancelToken {
        self.cancel.clone()
    }

    pub fn address(&self) -> &str {
        &self.address
    }

    fn draw(&self, connection: &mut Option<NetworkConnection>, bias: Bias) -> Result<Outcome, OracleError> {
        if connection.is_none() {
            let conn = NetworkConnection::connect(&self.address, CONNECT_TIMEOUT.min(self.timeout))
                .map_err(|e| OracleError::Unavailable(format!("{e:#}")))?;
            *connection = Some(conn);
        }
        let Some(conn) = connection.as_mut() else {
            return Err(OracleError::Unavailable("no connection".to_string()));
        };

        let request = CollapseRequest::new(bias);
        let id = request.id;
        let signature = request.sign(&self.api_key).map_err(|e| OracleError::Unavailable(format!("{e:#}")))?;
        conn.send(&OracleMessage::Collapse { request, signature })
            .map_err(|e| OracleError::Unavailable(format!("sending request: {e:#}")))?;
        tracing::debug!(address = %self.address, %id, %bias, "collapse requested");

        // a timeout too large to represent means no deadline
        let deadline = Instant::now().checked_add(self.timeout);
        loop {
            let message = conn.receive_until(&self.cancel, deadline, POLL_INTERVAL).map_err(|e| match e {
                ReceiveError::Cancelled => OracleError::Cancelled,
                ReceiveError::TimedOut => OracleError::Timeout(self.timeout),
                ReceiveError::Closed => OracleError::Unavailable("connection closed by oracle".to_string()),
                ReceiveError::Io(e) => OracleError::Unavailable(e.to_string()),
                ReceiveError::Malformed(e) => OracleError::Protocol(e.to_string()),
            })?;
            match message {
                OracleMessage::Outcome { id: reply, outcome } if reply == id => return Ok(outcome),
                OracleMessage::Error { id: reply, message } if reply.is_none() || reply == Some(id) => {
                    return Err(OracleError::Unavailable(message));
                }
                // late reply to an earlier, abandoned request
                OracleMessage::Outcome { .. } | OracleMessage::Error { .. } => {
                    tracing::debug!(address = %self.address, "skipping stale reply");
                }
                OracleMessage::Collapse { .. } => {
                    return Err(OracleError::Protocol("unexpected collapse request from oracle".to_string()));
                }
            }
        }
    }
}

impl RandomOracle for RemoteOracle {
    fn collapse(&self, bias: Bias) -> Result<Outcome, OracleError> {
        if self.api_key.is_empty() {
            return Err(OracleError::Unavailable("missing api key".to_string()));
        }
        if self.cancel.is_cancelled() {
            return Err(OracleError::Cancelled);
        }
        let mut connection = self.connection.lock().unwrap_or_else(PoisonError::into_inner);
        let result = self.draw(&mut connection, bias);
        if let Err(err) = &result {
            tracing::warn!(address = %self.address, error = %err, "remote collapse failed");
            *connection = None;
        }
        result
    }

    fn name(&self) -> &str {
        "remote"
    }
}

pub struct OracleServer {
    listener: TcpListener,
    api_key: Arc<Vec<u8>>,
    oracle: Arc<dyn RandomOracle>,
    latency: Duration,
}

impl OracleServer {
    pub fn bind(address: &str, api_key: impl Into<Vec<u8>>, oracle: Arc<dyn RandomOracle>) -> anyhow::Result<Self> {
        let listener = TcpListener::bind(address).with_context(|| format!("binding {address}"))?;
        Ok(Self { listener, api_key: Arc::new(api_key.into()), oracle, latency: Duration::ZERO })
    }

    /// Delay every answer by `latency`.
    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = latency;
        self
    }

    pub fn local_addr(&self) -> anyhow::Result<SocketAddr> {
        Ok(self.listener.local_addr()?)
    }

    /// Accept connections forever, one thread per client.
    pub fn serve(self) -> anyhow::Result<()> {
        tracing::info!(address = %self.local_addr()?, oracle = self.oracle.name(), "oracle server listening");
        for stream in self.listener.incoming() {
            let stream = match stream {
                Ok(s) => s,
                Err(e) => {
                    tracing::warn!(error = %e, "accept failed");
                    continue;
                }
            };
            let api_key = Arc::clone(&self.api_key);
            let oracle = Arc::clone(&self.oracle);
            let latency = self.latency;
            thread::spawn(move || {
                let peer = stream.peer_addr().ok();
                if let Err(e) = handle_client(stream, &api_key, oracle.as_ref(), latency) {
                    tracing::warn!(?peer, error = %format!("{e:#}"), "client connection failed");
                }
            });
        }
        Ok(())
    }

    /// Run `serve` on a background thread and return the bound address.
    pub fn spawn(self) -> anyhow::Result<SocketAddr> {
        let addr = self.local_addr()?;
        thread::spawn(move || {
            if let Err(e) = self.serve() {
                tracing::error!(error = %format!("{e:#}"), "oracle server stopped");
            }
        });
        Ok(addr)
    }
}

fn handle_client(stream: TcpStream, api_key: &[u8], oracle: &dyn RandomOracle, latency: Duration) -> anyhow::Result<()> {
    let mut conn = NetworkConnection::from_stream(stream)?;
    while let Some(message) = conn.receive()? {
        let reply = match message {
            OracleMessage::Collapse { request, signature } => answer(&request, &signature, api_key, oracle, latency),
            other => OracleMessage::Error { id: None, message: format!("unexpected message: {other:?}") },
        };
        conn.send(&reply)?;
    }
    Ok(())
}

fn answer(request: &CollapseRequest, signature: &str, api_key: &[u8], oracle: &dyn RandomOracle, latency: Duration) -> OracleMessage {
    if !request.verify(api_key, signature) {
        tracing::warn!(id = %request.id, "rejected request with invalid signature");
        return OracleMessage::Error { id: Some(request.id), message: "unauthorized: invalid signature".to_string() };
    }
    let bias = match Bias::new(request.bias) {
        Ok(b) => b,
        Err(e) => return OracleMessage::Error { id: Some(request.id), message: e.to_string() },
    };
    if !latency.is_zero() {
        thread::sleep(latency);
    }
    match oracle.collapse(bias) {
        Ok(outcome) => OracleMessage::Outcome { id: request.id, outcome },
        Err(e) => OracleMessage::Error { id: Some(request.id), message: e.to_string() },
    }
}

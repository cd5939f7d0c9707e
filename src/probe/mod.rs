mod codec;

use async_trait::async_trait;
use log::debug;
use rand::Rng;
use serde::Serialize;
use std::fmt;
use std::net::SocketAddr;
use std::time::{Duration, Instant};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpStream;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct LivenessResult {
    pub reachable: bool,
}

#[derive(Debug)]
pub enum ProbeError {
    Resolve(std::io::Error),
    NoAddress,
    Connect(std::io::Error),
    Io(std::io::Error),
    Protocol(String),
    TokenMismatch { sent: i64, received: i64 },
    Timeout(Duration),
}

impl fmt::Display for ProbeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Resolve(e) => write!(f, "DNS lookup failed: {}", e),
            Self::NoAddress => write!(f, "Host resolved to no addresses"),
            Self::Connect(e) => write!(f, "Connection failed: {}", e),
            Self::Io(e) => write!(f, "I/O error: {}", e),
            Self::Protocol(msg) => write!(f, "Protocol error: {}", msg),
            Self::TokenMismatch { sent, received } => {
                write!(f, "Ping token mismatch, sent: {}, received: {}", sent, received)
            }
            Self::Timeout(limit) => write!(f, "Timed out after {:?}", limit),
        }
    }
}

impl std::error::Error for ProbeError {}

impl From<std::io::Error> for ProbeError {
    fn from(e: std::io::Error) -> Self {
        Self::Io(e)
    }
}

/// Reachability check against a catalog host. Never fails: every fault is
/// reported as unreachable.
#[async_trait]
pub trait LivenessProbe: Send + Sync {
    async fn probe(&self, host: &str, port: u16) -> LivenessResult;
}

/// Minecraft Java edition Server List Ping: handshake into the status state,
/// send a ping carrying a random token and expect it echoed back.
#[derive(Debug, Clone)]
pub struct JavaProber {
    timeout: Duration,
    protocol_version: i32,
}

impl JavaProber {
    pub fn new(timeout: Duration, protocol_version: i32) -> Self {
        Self {
            timeout,
            protocol_version,
        }
    }

    /// Runs resolve, connect and the ping exchange under one timeout. Returns
    /// the ping round trip.
    pub async fn ping(&self, host: &str, port: u16) -> Result<Duration, ProbeError> {
        match tokio::time::timeout(self.timeout, self.exchange(host, port)).await {
            Ok(result) => result,
            Err(_) => Err(ProbeError::Timeout(self.timeout)),
        }
    }

    async fn exchange(&self, host: &str, port: u16) -> Result<Duration, ProbeError> {
        let addr = resolve(host, port).await?;
        let mut stream = TcpStream::connect(addr).await.map_err(ProbeError::Connect)?;
        stream.set_nodelay(true)?;

        stream
            .write_all(&codec::handshake_packet(self.protocol_version, host, port)?)
            .await?;

        let token: i64 = rand::thread_rng().gen();
        let sent_at = Instant::now();
        stream.write_all(&codec::ping_packet(token)?).await?;

        let body = read_packet(&mut stream).await?;
        let rtt = sent_at.elapsed();

        let received = codec::parse_ping(&body)?;
        if received != token {
            return Err(ProbeError::TokenMismatch { sent: token, received });
        }
        Ok(rtt)
    }
}

#[async_trait]
impl LivenessProbe for JavaProber {
    async fn probe(&self, host: &str, port: u16) -> LivenessResult {
        debug!("Probing {}:{}", host, port);
        match self.ping(host, port).await {
            Ok(rtt) => {
                debug!("{}:{} answered in {:?}", host, port, rtt);
                LivenessResult { reachable: true }
            }
            Err(e) => {
                debug!("{}:{} unreachable: {}", host, port, e);
                LivenessResult { reachable: false }
            }
        }
    }
}

async fn resolve(host: &str, port: u16) -> Result<SocketAddr, ProbeError> {
    let mut addrs = tokio::net::lookup_host((host, port))
        .await
        .map_err(ProbeError::Resolve)?;
    addrs.next().ok_or(ProbeError::NoAddress)
}

async fn read_varint<R: AsyncReadExt + Unpin>(reader: &mut R) -> Result<i32, ProbeError> {
    let mut decoder = codec::VarIntDecoder::default();
    loop {
        if let Some(value) = decoder.push(reader.read_u8().await?)? {
            return Ok(value);
        }
    }
}

async fn read_packet<R: AsyncReadExt + Unpin>(reader: &mut R) -> Result<Vec<u8>, ProbeError> {
    let len = read_varint(reader).await?;
    if len <= 0 || len > codec::MAX_PACKET_LEN {
        return Err(ProbeError::Protocol(format!("invalid packet length {}", len)));
    }
    let mut body = vec![0u8; len as usize];
    reader.read_exact(&mut body).await?;
    Ok(body)
}

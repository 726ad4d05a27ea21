//! Binary trace records for the dispatch engine, with pluggable backends.
//!
//! Each record is framed HDLC-style so that a host tool (`hfspy`) can pick
//! it out of an unreliable byte stream:
//!
//! ```text
//! seq | record_type | [timestamp: u32 LE, µs] | payload... | checksum | 0x7E
//! ```
//!
//! Bytes equal to the flag (`0x7E`) or the escape (`0x7D`) are escaped by
//! emitting `0x7D` followed by the byte xor `0x20`. The checksum is the
//! bitwise complement of the 8-bit sum of all unescaped bytes before it.

use std::io::{self, Write};
use std::net::{ToSocketAddrs, UdpSocket};
use std::sync::Arc;
use std::time::{Duration, Instant};

use parking_lot::Mutex;
use thiserror::Error;

pub mod dict;
mod payload;
pub mod records;

pub use payload::PayloadBuilder;

/// HDLC frame delimiter.
pub const FLAG: u8 = 0x7E;
/// HDLC escape byte.
pub const ESC: u8 = 0x7D;
/// Value xor-ed into escaped bytes.
pub const ESC_XOR: u8 = 0x20;

const DEFAULT_MAX_RECORD_LEN: usize = 128;

/// Configuration for the tracer.
#[derive(Debug, Clone)]
pub struct TraceConfig {
    pub max_record_len: usize,
    pub include_timestamp: bool,
}

impl Default for TraceConfig {
    fn default() -> Self {
        Self {
            max_record_len: DEFAULT_MAX_RECORD_LEN,
            include_timestamp: true,
        }
    }
}

/// A single emitted trace record.
#[derive(Debug, Clone)]
pub struct TraceRecord {
    pub seq: u8,
    pub record_type: u8,
    pub timestamp: Option<Duration>,
    pub payload: Vec<u8>,
}

#[derive(Error, Debug)]
pub enum TraceError {
    #[error("payload too large: {0} bytes")]
    PayloadTooLarge(usize),
    #[error("backend error: {0}")]
    Backend(#[from] io::Error),
}

/// Sink for framed bytes.
pub trait TraceBackend: Send + Sync {
    fn write_frame(&self, frame: &[u8]) -> Result<(), TraceError>;
}

/// Closure form of a tracer handed to producers such as the dispatch engine:
/// `(record_type, payload, with_timestamp)`.
pub type TraceHook = Arc<dyn Fn(u8, &[u8], bool) -> Result<(), TraceError> + Send + Sync>;

/// Backend writing frames to any `Write` implementation.
pub struct WriterBackend<W: Write + Send + 'static> {
    writer: Mutex<W>,
}

impl<W: Write + Send + 'static> WriterBackend<W> {
    pub fn new(writer: W) -> Self {
        Self {
            writer: Mutex::new(writer),
        }
    }

    pub fn into_inner(self) -> W {
        self.writer.into_inner()
    }
}

impl<W: Write + Send + 'static> TraceBackend for WriterBackend<W> {
    fn write_frame(&self, frame: &[u8]) -> Result<(), TraceError> {
        self.writer.lock().write_all(frame).map_err(TraceError::from)
    }
}

/// Backend sending one datagram per frame.
pub struct UdpBackend {
    socket: UdpSocket,
}

impl UdpBackend {
    /// Binds an ephemeral local socket and connects it to `addr`.
    pub fn connect<A: ToSocketAddrs>(addr: A) -> io::Result<Self> {
        let socket = UdpSocket::bind("0.0.0.0:0")?;
        socket.connect(addr)?;
        Ok(Self { socket })
    }
}

impl TraceBackend for UdpBackend {
    fn write_frame(&self, frame: &[u8]) -> Result<(), TraceError> {
        self.socket
            .send(frame)
            .map(|_| ())
            .map_err(TraceError::from)
    }
}

/// Backend keeping every frame in memory. Used by tests and by tools that
/// post-process a captured session.
#[derive(Clone, Default)]
pub struct MemoryBackend {
    frames: Arc<Mutex<Vec<Vec<u8>>>>,
}

impl MemoryBackend {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn frames(&self) -> Vec<Vec<u8>> {
        self.frames.lock().clone()
    }

    /// All captured frames concatenated, as they would appear on a stream.
    pub fn bytes(&self) -> Vec<u8> {
        self.frames.lock().concat()
    }

    pub fn clear(&self) {
        self.frames.lock().clear();
    }
}

impl TraceBackend for MemoryBackend {
    fn write_frame(&self, frame: &[u8]) -> Result<(), TraceError> {
        self.frames.lock().push(frame.to_vec());
        Ok(())
    }
}

/// Record encoder owning a backend.
pub struct Tracer<B: TraceBackend> {
    backend: B,
    cfg: TraceConfig,
    seq: u8,
    epoch: Instant,
}

impl<B: TraceBackend> Tracer<B> {
    pub fn new(cfg: TraceConfig, backend: B) -> Self {
        Self {
            backend,
            cfg,
            seq: 0,
            epoch: Instant::now(),
        }
    }

    pub fn into_handle(self) -> TracerHandle<B> {
        TracerHandle {
            inner: Arc::new(Mutex::new(self)),
        }
    }

    pub fn record(
        &mut self,
        record_type: u8,
        payload: &[u8],
        with_timestamp: bool,
    ) -> Result<TraceRecord, TraceError> {
        if payload.len() > self.cfg.max_record_len {
            return Err(TraceError::PayloadTooLarge(payload.len()));
        }

        let timestamp =
            (self.cfg.include_timestamp && with_timestamp).then(|| self.epoch.elapsed());

        self.seq = self.seq.wrapping_add(1);
        let record = TraceRecord {
            seq: self.seq,
            record_type,
            timestamp,
            payload: payload.to_vec(),
        };

        self.backend.write_frame(&encode_frame(&record))?;
        Ok(record)
    }
}

/// Encodes one record into an HDLC frame, flag included.
pub fn encode_frame(record: &TraceRecord) -> Vec<u8> {
    let mut encoder = FrameEncoder::with_capacity(record.payload.len() + 10);
    encoder.push(record.seq);
    encoder.push(record.record_type);
    if let Some(ts) = record.timestamp {
        let micros = u32::try_from(ts.as_micros()).unwrap_or(u32::MAX);
        encoder.extend(&micros.to_le_bytes());
    }
    encoder.extend(&record.payload);
    encoder.finish()
}

struct FrameEncoder {
    bytes: Vec<u8>,
    sum: u8,
}

impl FrameEncoder {
    fn with_capacity(capacity: usize) -> Self {
        Self {
            bytes: Vec::with_capacity(capacity),
            sum: 0,
        }
    }

    fn push(&mut self, byte: u8) {
        self.sum = self.sum.wrapping_add(byte);
        self.push_escaped(byte);
    }

    fn extend(&mut self, bytes: &[u8]) {
        for &byte in bytes {
            self.push(byte);
        }
    }

    fn push_escaped(&mut self, byte: u8) {
        if byte == FLAG || byte == ESC {
            self.bytes.push(ESC);
            self.bytes.push(byte ^ ESC_XOR);
        } else {
            self.bytes.push(byte);
        }
    }

    fn finish(mut self) -> Vec<u8> {
        let checksum = !self.sum;
        self.push_escaped(checksum);
        self.bytes.push(FLAG);
        self.bytes
    }
}

/// Shareable tracer.
pub struct TracerHandle<B: TraceBackend> {
    inner: Arc<Mutex<Tracer<B>>>,
}

impl<B: TraceBackend> Clone for TracerHandle<B> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<B: TraceBackend + 'static> TracerHandle<B> {
    /// Emits an untimestamped record, as dictionaries are.
    pub fn emit(&self, record_type: u8, payload: &[u8]) -> Result<TraceRecord, TraceError> {
        self.inner.lock().record(record_type, payload, false)
    }

    pub fn hook(&self) -> TraceHook {
        let inner = Arc::clone(&self.inner);
        Arc::new(move |record_type, payload, with_timestamp| {
            inner
                .lock()
                .record(record_type, payload, with_timestamp)
                .map(|_| ())
        })
    }
}

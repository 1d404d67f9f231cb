//! In-memory stand-ins for every boundary, shared by the unit tests.

use alloc::collections::VecDeque;
use alloc::format;
use alloc::rc::Rc;
use alloc::string::String;
use alloc::vec;
use alloc::vec::Vec;
use core::cell::RefCell;

use embassy_time::Duration;
use embedded_graphics::pixelcolor::Rgb565;

use crate::config::{ConfigStorage, StorageError};
use crate::display::{DisplayError, Palette, TextSurface};
use crate::provisioning::{
    CaptivePortal, PortalError, PortalParameter, PortalValues, ProvisioningTrigger,
};
use crate::reporter::{Connector, HttpConnection, ReportError};
use crate::sensors::{ClimateSensor, SensorError};

/// Boundary call seen by a shared [`EventLog`].
#[derive(Debug, Clone, PartialEq)]
pub enum Event {
    Connect,
    Print(String),
}

/// Ordered record of calls across several mocks.
pub type EventLog = Rc<RefCell<Vec<Event>>>;

fn log_event(log: &Option<EventLog>, event: Event) {
    if let Some(log) = log {
        log.borrow_mut().push(event);
    }
}

/// Config storage holding at most one record in memory.
#[derive(Debug)]
pub struct MemoryStorage {
    pub record: Option<Vec<u8>>,
    pub mounted: bool,
    pub writable: bool,
}

impl Default for MemoryStorage {
    fn default() -> Self {
        Self {
            record: None,
            mounted: true,
            writable: true,
        }
    }
}

impl ConfigStorage for MemoryStorage {
    fn read(&mut self, buf: &mut [u8]) -> Result<Option<usize>, StorageError> {
        if !self.mounted {
            return Err(StorageError::Unavailable);
        }
        let Some(record) = &self.record else {
            return Ok(None);
        };
        if record.len() > buf.len() {
            return Err(StorageError::TooLarge {
                size: record.len(),
                limit: buf.len(),
            });
        }
        buf[..record.len()].copy_from_slice(record);
        Ok(Some(record.len()))
    }

    fn write(&mut self, bytes: &[u8]) -> Result<(), StorageError> {
        if !self.mounted {
            return Err(StorageError::Unavailable);
        }
        if !self.writable {
            return Err(StorageError::Io { operation: "open" });
        }
        self.record = Some(bytes.to_vec());
        Ok(())
    }
}

/// Sensor that plays back queued events, then repeats a constant pair.
pub struct ScriptedSensor {
    queue: VecDeque<(f32, f32)>,
    steady: (f32, f32),
    current: (f32, f32),
    fail_temperature: usize,
    /// Number of temperature events requested
    pub reads: usize,
}

impl ScriptedSensor {
    pub fn constant(temperature: f32, humidity: f32) -> Self {
        Self {
            queue: VecDeque::new(),
            steady: (temperature, humidity),
            current: (temperature, humidity),
            fail_temperature: 0,
            reads: 0,
        }
    }

    /// Queue one event pair to be returned before the steady values.
    pub fn push(&mut self, temperature: f32, humidity: f32) {
        self.queue.push_back((temperature, humidity));
    }

    pub fn fail_temperature_once(&mut self) {
        self.fail_temperature += 1;
    }
}

impl ClimateSensor for ScriptedSensor {
    fn name(&self) -> &'static str {
        "scripted"
    }

    async fn temperature_event(&mut self) -> Result<f32, SensorError> {
        self.reads += 1;
        self.current = self.queue.pop_front().unwrap_or(self.steady);
        if self.fail_temperature > 0 {
            self.fail_temperature -= 1;
            return Err(SensorError::ReadFailed {
                sensor: "scripted",
                operation: "read temperature",
                details: "scripted failure",
            });
        }
        Ok(self.current.0)
    }

    async fn humidity_event(&mut self) -> Result<f32, SensorError> {
        Ok(self.current.1)
    }

    fn min_delay(&self) -> Duration {
        Duration::from_secs(2)
    }
}

/// One call made on a [`RecordingSurface`].
#[derive(Debug, Clone, PartialEq)]
pub enum SurfaceOp {
    Init(Palette, u8),
    Cursor(i32, i32),
    Color(Rgb565),
    Print(String),
}

/// Text surface that records every call.
#[derive(Debug, Default)]
pub struct RecordingSurface {
    pub ops: Vec<SurfaceOp>,
    /// Number of upcoming prints that fail
    pub fail_prints: usize,
    pub events: Option<EventLog>,
}

impl TextSurface for RecordingSurface {
    fn init(&mut self, palette: Palette, text_size: u8) -> Result<(), DisplayError> {
        self.ops.push(SurfaceOp::Init(palette, text_size));
        Ok(())
    }

    fn set_cursor(&mut self, x: i32, y: i32) -> Result<(), DisplayError> {
        self.ops.push(SurfaceOp::Cursor(x, y));
        Ok(())
    }

    fn set_text_color(&mut self, color: Rgb565) -> Result<(), DisplayError> {
        self.ops.push(SurfaceOp::Color(color));
        Ok(())
    }

    fn print(&mut self, text: &str) -> Result<(), DisplayError> {
        if self.fail_prints > 0 {
            self.fail_prints -= 1;
            return Err(DisplayError::DriverFault { operation: "print" });
        }
        self.ops.push(SurfaceOp::Print(String::from(text)));
        log_event(&self.events, Event::Print(String::from(text)));
        Ok(())
    }
}

/// Connection that returns scripted response chunks and records writes.
#[derive(Debug, Default)]
pub struct ScriptedConnection {
    chunks: VecDeque<Vec<u8>>,
    pub written: Vec<u8>,
    pub closed: bool,
}

impl ScriptedConnection {
    pub fn responding(chunks: &[&[u8]]) -> Self {
        Self {
            chunks: chunks.iter().map(|chunk| chunk.to_vec()).collect(),
            ..Self::default()
        }
    }
}

fn fill_from(chunk: Option<Vec<u8>>, buf: &mut [u8]) -> usize {
    let Some(chunk) = chunk else {
        return 0;
    };
    let n = chunk.len().min(buf.len());
    buf[..n].copy_from_slice(&chunk[..n]);
    n
}

impl HttpConnection for ScriptedConnection {
    async fn write_all(&mut self, bytes: &[u8]) -> Result<(), ReportError> {
        self.written.extend_from_slice(bytes);
        Ok(())
    }

    async fn read(&mut self, buf: &mut [u8]) -> Result<usize, ReportError> {
        Ok(fill_from(self.chunks.pop_front(), buf))
    }

    async fn close(&mut self) {
        self.closed = true;
    }
}

/// Connector that records every connection attempt.
#[derive(Debug)]
pub struct MockConnector {
    pub reachable: bool,
    /// Response chunks served on every connection
    pub response: Vec<Vec<u8>>,
    /// Connection attempts, including failed ones
    pub connects: usize,
    pub targets: Vec<(String, u16)>,
    pub closed: usize,
    pub events: Option<EventLog>,
    requests: Vec<Vec<u8>>,
}

impl MockConnector {
    pub fn answering(status: u16) -> Self {
        Self {
            reachable: true,
            response: vec![format!("HTTP/1.1 {status} OK\r\n\r\n").into_bytes()],
            connects: 0,
            targets: Vec::new(),
            closed: 0,
            events: None,
            requests: Vec::new(),
        }
    }

    pub fn unreachable() -> Self {
        Self {
            reachable: false,
            ..Self::answering(200)
        }
    }

    /// Everything written on the most recent connection.
    pub fn last_request(&self) -> String {
        self.requests
            .last()
            .map(|bytes| String::from_utf8_lossy(bytes).into_owned())
            .unwrap_or_default()
    }
}

pub struct MockConnection<'a> {
    connector: &'a mut MockConnector,
    chunks: VecDeque<Vec<u8>>,
}

impl HttpConnection for MockConnection<'_> {
    async fn write_all(&mut self, bytes: &[u8]) -> Result<(), ReportError> {
        if let Some(request) = self.connector.requests.last_mut() {
            request.extend_from_slice(bytes);
        }
        Ok(())
    }

    async fn read(&mut self, buf: &mut [u8]) -> Result<usize, ReportError> {
        Ok(fill_from(self.chunks.pop_front(), buf))
    }

    async fn close(&mut self) {
        self.connector.closed += 1;
    }
}

impl Connector for MockConnector {
    type Connection<'a> = MockConnection<'a>;

    async fn connect(&mut self, host: &str, port: u16) -> Result<MockConnection<'_>, ReportError> {
        self.connects += 1;
        log_event(&self.events, Event::Connect);
        if !self.reachable {
            return Err(ReportError::Connect);
        }
        self.targets.push((String::from(host), port));
        self.requests.push(Vec::new());
        let chunks = self.response.iter().cloned().collect();
        Ok(MockConnection {
            connector: self,
            chunks,
        })
    }
}

/// Portal that immediately "submits" fixed values.
#[derive(Debug, Default)]
pub struct MockPortal {
    submission: Option<(String, String)>,
    pub ap_name: Option<String>,
    pub asked: Vec<PortalParameter>,
    pub runs: usize,
}

impl MockPortal {
    pub fn submitting(host: &str, port: &str) -> Self {
        Self {
            submission: Some((String::from(host), String::from(port))),
            ..Self::default()
        }
    }

    pub fn failing() -> Self {
        Self::default()
    }
}

impl CaptivePortal for MockPortal {
    async fn collect(
        &mut self,
        ap_name: &str,
        parameters: &[PortalParameter],
    ) -> Result<PortalValues, PortalError> {
        self.runs += 1;
        self.ap_name = Some(String::from(ap_name));
        self.asked = parameters.to_vec();

        let (host, port) = self.submission.clone().ok_or(PortalError::Abandoned)?;
        let mut values = PortalValues::new();
        values.insert("server", host);
        values.insert("port", port);
        Ok(values)
    }
}

#[derive(Debug, Default)]
pub struct MockTrigger {
    pub asserted: bool,
}

impl ProvisioningTrigger for MockTrigger {
    fn is_asserted(&mut self) -> bool {
        self.asserted
    }
}

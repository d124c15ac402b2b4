//! Channel-fed packet source used by the tests.
//!
//! Tests push packets (or receive errors) through a [`MockFeed`]; the source
//! blocks in `recv` until something arrives, like a real capture handle.
//! Dropping the feed makes `recv` fail fatally.

use crate::error::{CaptureError, RecvError, StartupError};
use crate::network::core::handle::HandleConfig;
use crate::network::core::packet_data::{Direction, PacketData};
use crate::network::core::source::{PacketSource, SourceOpener};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::mpsc::{self, Receiver, Sender};
use std::sync::{Arc, Mutex};

type MockEvent = Result<PacketData<Vec<u8>>, RecvError>;

struct MockShared {
    events: Mutex<Receiver<MockEvent>>,
    reinjected: Mutex<Vec<PacketData<Vec<u8>>>>,
    open_error: Mutex<Option<StartupError>>,
    stop_after: Mutex<Option<(usize, Arc<AtomicBool>)>>,
    fail_reinject: AtomicBool,
    closed: AtomicBool,
    close_calls: AtomicUsize,
    opens: AtomicUsize,
    delivered: AtomicUsize,
}

/// Sending half of a mock capture.
#[derive(Clone)]
pub struct MockFeed {
    sender: Sender<MockEvent>,
}

impl MockFeed {
    pub fn packet(&self, length: usize, direction: Direction) {
        let _ = self
            .sender
            .send(Ok(PacketData::from_bytes(vec![0xAB; length], direction)));
    }

    pub fn error(&self, error: RecvError) {
        let _ = self.sender.send(Err(error));
    }
}

/// Read access to what the source did, for assertions.
#[derive(Clone)]
pub struct MockRecorder {
    shared: Arc<MockShared>,
}

impl MockRecorder {
    pub fn reinjected(&self) -> Vec<(u32, Direction)> {
        self.shared
            .reinjected
            .lock()
            .unwrap()
            .iter()
            .map(|p| (p.length, p.direction))
            .collect()
    }

    pub fn reinjected_payloads(&self) -> Vec<Vec<u8>> {
        self.shared
            .reinjected
            .lock()
            .unwrap()
            .iter()
            .map(|p| p.payload.clone())
            .collect()
    }

    pub fn is_closed(&self) -> bool {
        self.shared.closed.load(Ordering::SeqCst)
    }

    pub fn close_calls(&self) -> usize {
        self.shared.close_calls.load(Ordering::SeqCst)
    }

    pub fn opens(&self) -> usize {
        self.shared.opens.load(Ordering::SeqCst)
    }
}

#[derive(Clone)]
pub struct MockOpener {
    shared: Arc<MockShared>,
}

impl MockOpener {
    pub fn new() -> (Self, MockFeed) {
        let (sender, receiver) = mpsc::channel();
        let shared = Arc::new(MockShared {
            events: Mutex::new(receiver),
            reinjected: Mutex::new(Vec::new()),
            open_error: Mutex::new(None),
            stop_after: Mutex::new(None),
            fail_reinject: AtomicBool::new(false),
            closed: AtomicBool::new(false),
            close_calls: AtomicUsize::new(0),
            opens: AtomicUsize::new(0),
            delivered: AtomicUsize::new(0),
        });
        (Self { shared }, MockFeed { sender })
    }

    /// Makes every `open` fail with `error`.
    pub fn fail_open(self, error: StartupError) -> Self {
        *self.shared.open_error.lock().unwrap() = Some(error);
        self
    }

    /// Makes every `reinject` fail.
    pub fn fail_reinject(self) -> Self {
        self.shared.fail_reinject.store(true, Ordering::SeqCst);
        self
    }

    /// Clears `running` right after the `count`-th packet is delivered,
    /// simulating a stop request racing with a receive.
    pub fn stop_after(self, count: usize, running: Arc<AtomicBool>) -> Self {
        *self.shared.stop_after.lock().unwrap() = Some((count, running));
        self
    }

    pub fn recorder(&self) -> MockRecorder {
        MockRecorder {
            shared: self.shared.clone(),
        }
    }
}

pub struct MockSource {
    shared: Arc<MockShared>,
}

impl SourceOpener for MockOpener {
    type Source = MockSource;

    fn open(&self, _config: &HandleConfig) -> Result<MockSource, StartupError> {
        if let Some(error) = self.shared.open_error.lock().unwrap().clone() {
            return Err(error);
        }
        self.shared.opens.fetch_add(1, Ordering::SeqCst);
        self.shared.closed.store(false, Ordering::SeqCst);
        Ok(MockSource {
            shared: self.shared.clone(),
        })
    }
}

impl PacketSource for MockSource {
    type Payload = Vec<u8>;

    fn recv(&mut self, _max_buffer_bytes: usize) -> Result<PacketData<Vec<u8>>, RecvError> {
        let event = self
            .shared
            .events
            .lock()
            .unwrap()
            .recv()
            .map_err(|_| RecvError::Fatal("capture feed closed".to_string()))?;

        if event.is_ok() {
            let delivered = self.shared.delivered.fetch_add(1, Ordering::SeqCst) + 1;
            if let Some((count, running)) = self.shared.stop_after.lock().unwrap().as_ref() {
                if delivered == *count {
                    running.store(false, Ordering::SeqCst);
                }
            }
        }
        event
    }

    fn reinject(&mut self, packet: PacketData<Vec<u8>>) -> Result<(), CaptureError> {
        if self.shared.fail_reinject.load(Ordering::SeqCst) {
            return Err(CaptureError::Reinject("injection refused".to_string()));
        }
        self.shared.reinjected.lock().unwrap().push(packet);
        Ok(())
    }

    fn close(&mut self) -> Result<(), CaptureError> {
        self.shared.close_calls.fetch_add(1, Ordering::SeqCst);
        self.shared.closed.store(true, Ordering::SeqCst);
        Ok(())
    }
}

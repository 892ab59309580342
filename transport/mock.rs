// Scripted in-memory stream for unit tests
use crate::config::Timeout;
use crate::traits::{Closer, Stream};
use std::collections::VecDeque;
use std::io::{self, Result};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

/// Outcome of one underlying write call
#[derive(Debug, Clone, Copy)]
pub(crate) enum WriteStep {
    /// Accept at most this many bytes
    Accept(usize),
    /// Accept nothing, report no error
    Stall,
    /// Fail with this OS error code
    Fail(i32),
}

/// Outcome of one underlying read call
#[derive(Debug, Clone)]
pub(crate) enum ReadStep {
    Data(Vec<u8>),
    Stall,
    Fail(i32),
}

/// Everything the test can observe after handing the stream to a Transport
#[derive(Default)]
pub(crate) struct MockState {
    writes: Mutex<VecDeque<WriteStep>>,
    reads: Mutex<VecDeque<ReadStep>>,
    written: Mutex<Vec<u8>>,
    timeout: Mutex<Option<Timeout>>,
    closed: AtomicBool,
    write_calls: AtomicUsize,
    read_calls: AtomicUsize,
    line_calls: AtomicUsize,
    timeout_calls: AtomicUsize,
    close_calls: AtomicUsize,
}

impl MockState {
    pub fn written(&self) -> Vec<u8> {
        self.written.lock().unwrap().clone()
    }

    pub fn timeout(&self) -> Option<Timeout> {
        *self.timeout.lock().unwrap()
    }

    /// Kill the connection without going through the closer
    pub fn drop_connection(&self) {
        self.closed.store(true, Ordering::SeqCst);
    }

    /// Read steps not consumed yet
    pub fn pending_reads(&self) -> usize {
        self.reads.lock().unwrap().len()
    }

    pub fn write_calls(&self) -> usize {
        self.write_calls.load(Ordering::SeqCst)
    }

    pub fn read_calls(&self) -> usize {
        self.read_calls.load(Ordering::SeqCst)
    }

    pub fn line_calls(&self) -> usize {
        self.line_calls.load(Ordering::SeqCst)
    }

    pub fn timeout_calls(&self) -> usize {
        self.timeout_calls.load(Ordering::SeqCst)
    }

    pub fn close_calls(&self) -> usize {
        self.close_calls.load(Ordering::SeqCst)
    }
}

pub(crate) struct MockStream {
    state: Arc<MockState>,
}

impl MockStream {
    pub fn new() -> Self {
        MockStream {
            state: Arc::new(MockState::default()),
        }
    }

    /// A handle that was never connected
    pub fn dead() -> Self {
        let mock = MockStream::new();
        mock.state.closed.store(true, Ordering::SeqCst);
        mock
    }

    pub fn state(&self) -> Arc<MockState> {
        Arc::clone(&self.state)
    }

    pub fn write_step(self, step: WriteStep) -> Self {
        self.state.writes.lock().unwrap().push_back(step);
        self
    }

    pub fn write_steps(self, step: WriteStep, times: usize) -> Self {
        (0..times).fold(self, |mock, _| mock.write_step(step))
    }

    pub fn read_step(self, step: ReadStep) -> Self {
        self.state.reads.lock().unwrap().push_back(step);
        self
    }

    pub fn incoming(self, data: &[u8]) -> Self {
        self.read_step(ReadStep::Data(data.to_vec()))
    }
}

impl Stream for MockStream {
    type Closer = MockCloser;

    fn write(&mut self, data: &[u8]) -> Result<usize> {
        self.state.write_calls.fetch_add(1, Ordering::SeqCst);
        let step = self
            .state
            .writes
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or(WriteStep::Accept(usize::MAX));
        match step {
            WriteStep::Accept(n) => {
                let n = n.min(data.len());
                self.state
                    .written
                    .lock()
                    .unwrap()
                    .extend_from_slice(&data[..n]);
                Ok(n)
            }
            WriteStep::Stall => Ok(0),
            WriteStep::Fail(code) => Err(io::Error::from_raw_os_error(code)),
        }
    }

    fn read(&mut self, buf: &mut [u8]) -> Result<usize> {
        self.state.read_calls.fetch_add(1, Ordering::SeqCst);
        let mut reads = self.state.reads.lock().unwrap();
        match reads.pop_front() {
            Some(ReadStep::Data(mut data)) => {
                let n = data.len().min(buf.len());
                buf[..n].copy_from_slice(&data[..n]);
                if n < data.len() {
                    reads.push_front(ReadStep::Data(data.split_off(n)));
                }
                Ok(n)
            }
            Some(ReadStep::Stall) => Ok(0),
            Some(ReadStep::Fail(code)) => Err(io::Error::from_raw_os_error(code)),
            // an exhausted script would otherwise stall forever
            None => Err(io::Error::new(io::ErrorKind::UnexpectedEof, "script exhausted")),
        }
    }

    fn read_line(&mut self, buf: &mut Vec<u8>, limit: usize) -> Result<usize> {
        self.state.line_calls.fetch_add(1, Ordering::SeqCst);
        let mut reads = self.state.reads.lock().unwrap();
        match reads.pop_front() {
            Some(ReadStep::Data(mut data)) => {
                let end = data
                    .iter()
                    .position(|&b| b == b'\n')
                    .map_or(data.len(), |i| i + 1)
                    .min(limit);
                let rest = data.split_off(end);
                if !rest.is_empty() {
                    reads.push_front(ReadStep::Data(rest));
                }
                buf.extend_from_slice(&data);
                Ok(data.len())
            }
            Some(ReadStep::Stall) | None => Ok(0),
            Some(ReadStep::Fail(code)) => Err(io::Error::from_raw_os_error(code)),
        }
    }

    fn set_timeout(&mut self, timeout: Timeout) -> Result<()> {
        self.state.timeout_calls.fetch_add(1, Ordering::SeqCst);
        *self.state.timeout.lock().unwrap() = Some(timeout);
        Ok(())
    }

    fn is_open(&self) -> bool {
        !self.state.closed.load(Ordering::SeqCst)
    }

    fn closer(&self) -> Result<MockCloser> {
        Ok(MockCloser {
            state: Arc::clone(&self.state),
        })
    }
}

pub(crate) struct MockCloser {
    state: Arc<MockState>,
}

impl Closer for MockCloser {
    fn close(&self) -> Result<()> {
        self.state.close_calls.fetch_add(1, Ordering::SeqCst);
        self.state.closed.store(true, Ordering::SeqCst);
        Ok(())
    }
}

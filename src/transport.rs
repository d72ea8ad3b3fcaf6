//! Word-exchange transport seam.
//!
//! The driver core never touches bus electrical details; it depends only on
//! the [`Transport`] trait. A real implementation wraps the board's serial
//! bus (chip-select sequencing, framing, ack/nak handling). [`MockTransport`]
//! provides a scripted in-memory implementation for testing without physical
//! hardware.
//!
//! The model is synchronous and half-duplex: every exchange blocks the
//! calling thread until the transfer completes or times out, and at most one
//! transaction is in flight per device.

use std::collections::VecDeque;
use std::time::Duration;

use crate::error::{LtcError, Result};

/// Fixed-width word exchange with a single device.
pub trait Transport {
    /// Exchange one frame: shift out `tx` while latching the same number of
    /// bytes into `rx`.
    ///
    /// `rx.len()` always equals `tx.len()`; a short or failed transfer is a
    /// transport error, never a partial fill.
    fn write_read(&mut self, tx: &[u8], rx: &mut [u8]) -> Result<()>;

    /// Block until the device signals ready, up to `timeout`.
    ///
    /// Returns `Ok(true)` once ready, `Ok(false)` if the budget elapsed
    /// first. Transport faults while polling are errors.
    fn poll_ready(&mut self, timeout: Duration) -> Result<bool>;
}

/// Scripted in-memory transport for tests.
///
/// Behavior per exchange, in order of precedence:
///
/// 1. a queued response from [`push_response`](Self::push_response) is
///    returned;
/// 2. with [`echo_previous`](Self::set_echo_previous) enabled, the previous
///    transmitted frame is returned (all zeros on the first exchange),
///    emulating the one-deep command pipeline of write-echoing DACs;
/// 3. otherwise the receive buffer is left as zeros.
///
/// Every transmitted frame is recorded and can be inspected through
/// [`sent`](Self::sent).
#[derive(Debug, Default)]
pub struct MockTransport {
    sent: Vec<Vec<u8>>,
    responses: VecDeque<Vec<u8>>,
    echo_previous: bool,
    last_frame: Vec<u8>,
    ready: bool,
    polls: usize,
    fail_next: Option<String>,
}

impl MockTransport {
    /// Create a mock that answers every exchange with zeros and reports
    /// ready immediately.
    pub fn new() -> Self {
        Self {
            ready: true,
            ..Self::default()
        }
    }

    /// Create a mock that echoes the previously transmitted frame on each
    /// exchange, like the SoftSpan DAC's pipelined readback.
    pub fn echoing() -> Self {
        let mut mock = Self::new();
        mock.echo_previous = true;
        mock
    }

    /// Queue a response frame; queued frames take precedence over echoing.
    pub fn push_response(&mut self, frame: Vec<u8>) {
        self.responses.push_back(frame);
    }

    /// Enable or disable echo-previous-frame mode.
    pub fn set_echo_previous(&mut self, enabled: bool) {
        self.echo_previous = enabled;
    }

    /// Control what `poll_ready` reports.
    pub fn set_ready(&mut self, ready: bool) {
        self.ready = ready;
    }

    /// Fail the next exchange with the given transport error message.
    pub fn fail_next(&mut self, message: impl Into<String>) {
        self.fail_next = Some(message.into());
    }

    /// All frames transmitted so far, oldest first.
    pub fn sent(&self) -> &[Vec<u8>] {
        &self.sent
    }

    /// Number of `poll_ready` calls observed.
    pub fn polls(&self) -> usize {
        self.polls
    }
}

impl Transport for MockTransport {
    fn write_read(&mut self, tx: &[u8], rx: &mut [u8]) -> Result<()> {
        if let Some(message) = self.fail_next.take() {
            return Err(LtcError::Transport(message));
        }

        rx.fill(0);
        if let Some(frame) = self.responses.pop_front() {
            let n = frame.len().min(rx.len());
            rx[..n].copy_from_slice(&frame[..n]);
        } else if self.echo_previous {
            let n = self.last_frame.len().min(rx.len());
            rx[..n].copy_from_slice(&self.last_frame[..n]);
        }

        self.last_frame = tx.to_vec();
        self.sent.push(tx.to_vec());
        Ok(())
    }

    fn poll_ready(&mut self, _timeout: Duration) -> Result<bool> {
        self.polls += 1;
        Ok(self.ready)
    }
}

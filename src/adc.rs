//! Two-channel interleaved delta-sigma ADC reader (LTC2422 class).
//!
//! The converter continuously alternates which of its two channels a
//! completed conversion belongs to, flagged by an identity bit in the
//! returned word. Each exchange returns one completed 24-bit word and
//! triggers the next conversion, so a pair read fetches two words and
//! assigns them to channel slots by the first word's identity bit.
//!
//! Word layout, MSB-first bytes:
//!
//! ```text
//! byte 0: s s C d d d d d   (C = channel-identity bit, clear = channel A)
//! byte 1: d d d d d d d d
//! byte 2: d d d d d d d d
//! ```
//!
//! The low 22 bits are an offset-binary code with zero scale at
//! `0x20_0000`; one LSB is `vref / (2^20 - 1)` volts.

use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{LtcError, Result};
use crate::transport::Transport;

/// Offset-binary zero-scale code.
const ZERO_CODE: i32 = 0x0020_0000;
/// Full-scale count for the LSB weight: 2^20 - 1.
const FULL_SCALE_COUNTS: f64 = 1_048_575.0;
/// Channel-identity bit in byte 0 of the conversion word.
const CHANNEL_BIT: u8 = 0x40;
/// Code bits carried in byte 0.
const CODE_MASK_HIGH: u8 = 0x3F;

/// Default budget for the conversion-ready poll. A conversion takes about
/// 137 ms in 60 Hz rejection mode.
pub const DEFAULT_POLL_TIMEOUT: Duration = Duration::from_millis(200);

/// Which physical input a conversion belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum AdcChannel {
    /// Channel A (identity bit clear).
    A,
    /// Channel B (identity bit set).
    B,
}

/// One decoded conversion result. Produced per read call, not retained.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AdcSample {
    /// The channel this conversion belongs to.
    pub channel: AdcChannel,
    /// Raw offset-binary code.
    pub code: i32,
    /// The code converted through the current reference LSB weight.
    pub volts: f64,
}

/// Both channels' samples from one [`InterleavedAdc::read_pair`] call.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AdcPair {
    /// Channel A's sample.
    pub a: AdcSample,
    /// Channel B's sample.
    pub b: AdcSample,
}

/// Driver state for one interleaved two-channel ADC.
#[derive(Debug)]
pub struct InterleavedAdc<T> {
    transport: T,
    lsb: f64,
    poll_timeout: Duration,
}

impl<T: Transport> InterleavedAdc<T> {
    /// Create a reader with the LSB weight derived from `vref` and the
    /// default poll budget.
    pub fn new(transport: T, vref: f64) -> Self {
        Self {
            transport,
            lsb: vref / FULL_SCALE_COUNTS,
            poll_timeout: DEFAULT_POLL_TIMEOUT,
        }
    }

    /// Replace the conversion-ready poll budget.
    pub fn with_poll_timeout(mut self, timeout: Duration) -> Self {
        self.poll_timeout = timeout;
        self
    }

    /// Recompute the LSB weight from a new reference voltage.
    pub fn set_reference(&mut self, vref: f64) {
        self.lsb = vref / FULL_SCALE_COUNTS;
    }

    /// Convert a raw offset-binary code to volts.
    pub fn code_to_volts(&self, code: i32) -> f64 {
        (code - ZERO_CODE) as f64 * self.lsb
    }

    fn fetch_word(&mut self) -> Result<(AdcChannel, i32)> {
        let tx = [0u8; 3];
        let mut rx = [0u8; 3];
        self.transport.write_read(&tx, &mut rx)?;
        let channel = if rx[0] & CHANNEL_BIT == 0 {
            AdcChannel::A
        } else {
            AdcChannel::B
        };
        let code = ((rx[0] & CODE_MASK_HIGH) as i32) << 16 | (rx[1] as i32) << 8 | rx[2] as i32;
        Ok((channel, code))
    }

    fn sample(&self, channel: AdcChannel, code: i32) -> AdcSample {
        AdcSample {
            channel,
            code,
            volts: self.code_to_volts(code),
        }
    }

    /// Read one fresh conversion per channel.
    ///
    /// Waits for conversion-ready within the poll budget
    /// ([`LtcError::ConversionTimeout`] if exceeded), fetches the completed
    /// word, then fetches the other channel's word latched from the previous
    /// cycle. The first word's identity bit decides the slot assignment; the
    /// second word belongs to the opposite channel. Never returns a stale
    /// code without fetching fresh data.
    pub fn read_pair(&mut self) -> Result<AdcPair> {
        if !self.transport.poll_ready(self.poll_timeout)? {
            return Err(LtcError::ConversionTimeout(self.poll_timeout));
        }

        let (first_channel, first_code) = self.fetch_word()?;
        let (_, second_code) = self.fetch_word()?;
        debug!(?first_channel, first_code, second_code, "adc pair read");

        let (code_a, code_b) = match first_channel {
            AdcChannel::A => (first_code, second_code),
            AdcChannel::B => (second_code, first_code),
        };
        Ok(AdcPair {
            a: self.sample(AdcChannel::A, code_a),
            b: self.sample(AdcChannel::B, code_b),
        })
    }

    /// Access the underlying transport (primarily for tests).
    pub fn transport(&self) -> &T {
        &self.transport
    }

    /// Mutable access to the underlying transport (primarily for tests).
    pub fn transport_mut(&mut self) -> &mut T {
        &mut self.transport
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorClass;
    use crate::transport::MockTransport;

    const VREF: f64 = 5.0;

    /// Encode a conversion word for the given voltage and identity bit.
    fn word(channel_b: bool, volts: f64) -> Vec<u8> {
        let code = (volts / (VREF / FULL_SCALE_COUNTS)).round() as i32 + ZERO_CODE;
        let mut b0 = ((code >> 16) & 0x3F) as u8;
        if channel_b {
            b0 |= CHANNEL_BIT;
        }
        vec![b0, (code >> 8) as u8, code as u8]
    }

    #[test]
    fn test_read_pair_first_word_channel_a() {
        let mut mock = MockTransport::new();
        mock.push_response(word(false, 1.0));
        mock.push_response(word(true, 2.0));
        let mut adc = InterleavedAdc::new(mock, VREF);

        let pair = adc.read_pair().unwrap();
        assert_eq!(pair.a.channel, AdcChannel::A);
        assert_eq!(pair.b.channel, AdcChannel::B);
        assert!((pair.a.volts - 1.0).abs() < 1e-4);
        assert!((pair.b.volts - 2.0).abs() < 1e-4);
    }

    #[test]
    fn test_read_pair_first_word_channel_b() {
        let mut mock = MockTransport::new();
        mock.push_response(word(true, 2.0));
        mock.push_response(word(false, 1.0));
        let mut adc = InterleavedAdc::new(mock, VREF);

        // Word 2's code goes to the opposite channel of word 1.
        let pair = adc.read_pair().unwrap();
        assert!((pair.a.volts - 1.0).abs() < 1e-4);
        assert!((pair.b.volts - 2.0).abs() < 1e-4);
    }

    #[test]
    fn test_timeout_without_state_mutation() {
        let mut mock = MockTransport::new();
        mock.set_ready(false);
        let mut adc = InterleavedAdc::new(mock, VREF).with_poll_timeout(Duration::from_millis(50));

        let err = adc.read_pair().unwrap_err();
        assert!(matches!(
            err,
            LtcError::ConversionTimeout(t) if t == Duration::from_millis(50)
        ));
        assert_eq!(err.class(), ErrorClass::DeviceCommunication);
        // No exchange happened: nothing was fetched, nothing recorded.
        assert!(adc.transport().sent().is_empty());
    }

    #[test]
    fn test_zero_scale_and_lsb() {
        let adc = InterleavedAdc::new(MockTransport::new(), VREF);
        assert!((adc.code_to_volts(ZERO_CODE)).abs() < 1e-12);
        assert!((adc.code_to_volts(ZERO_CODE + 1) - VREF / FULL_SCALE_COUNTS).abs() < 1e-15);
    }

    #[test]
    fn test_set_reference_rescales() {
        let mut adc = InterleavedAdc::new(MockTransport::new(), VREF);
        adc.set_reference(2.5);
        assert!((adc.code_to_volts(ZERO_CODE + 1000) - 2.5 / FULL_SCALE_COUNTS * 1000.0).abs() < 1e-9);
    }
}

//! DAC device drivers.
//!
//! Two device families share the conversion core:
//!
//! - [`dual::DualDac`]: a dual-channel 16-bit rail-to-rail DAC addressed
//!   per channel or as a pair, calibrated with per-channel linear scales.
//! - [`softspan::SoftSpanDac`]: a 16-channel 16-bit DAC with a selectable
//!   output span per channel and a pipelined command-echo readback.

pub mod dual;
pub mod softspan;

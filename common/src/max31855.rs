//! MAX31855 thermocouple-to-digital frame decoding.
//!
//! The chip shifts out a 32-bit big-endian frame:
//!
//! | Bits  | Meaning                                          |
//! |-------|--------------------------------------------------|
//! | 31-18 | thermocouple temperature, 14-bit signed, 0.25 °C |
//! | 16    | fault flag                                       |
//! | 15-4  | cold-junction temperature, 12-bit signed, 0.0625 °C |
//! | 2     | short to VCC                                     |
//! | 1     | short to GND                                     |
//! | 0     | open circuit                                     |

use crate::error::SensorFault;

const FAULT_FLAG: u32 = 1 << 16;
const FAULT_SHORT_VCC: u32 = 1 << 2;
const FAULT_SHORT_GND: u32 = 1 << 1;
const FAULT_OPEN: u32 = 1 << 0;

pub fn frame_from_bytes(bytes: [u8; 4]) -> u32 {
    u32::from_be_bytes(bytes)
}

/// Thermocouple temperature in °C, or the reported wiring fault.
pub fn decode(frame: u32) -> Result<f32, SensorFault> {
    if frame & FAULT_FLAG != 0 {
        return Err(fault_from_bits(frame));
    }
    let raw = (frame as i32) >> 18;
    Ok(raw as f32 * 0.25)
}

/// Cold-junction (die) temperature in °C. Valid even when a fault is set.
pub fn cold_junction_celsius(frame: u32) -> f32 {
    let raw = ((frame << 16) as i32) >> 20;
    raw as f32 * 0.0625
}

fn fault_from_bits(frame: u32) -> SensorFault {
    if frame & FAULT_OPEN != 0 {
        SensorFault::Open
    } else if frame & FAULT_SHORT_GND != 0 {
        SensorFault::ShortToGround
    } else if frame & FAULT_SHORT_VCC != 0 {
        SensorFault::ShortToSupply
    } else {
        // Fault flag without a cause bit; treat it as a broken probe.
        SensorFault::Open
    }
}

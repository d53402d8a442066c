use serde::{Deserialize, Serialize};

use crate::input::InputSnapshot;

/// Leading tag byte of each response frame.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[repr(u8)]
pub enum ResponseId {
    ReadHidStatus = 0x10,
    ReadCalibrationData = 0x11,
}

/// Length of a status report.
pub const HID_STATUS_SIZE: usize = 6;

/// Battery level reported by the device; the emulated battery is always full.
pub const BATTERY_FULL: u8 = 0x1F;

/// Largest value of a 12-bit stick field.
pub const C_STICK_MAX: u16 = 0xFFF;

/// Mapping from analog readings to raw 12-bit stick values.
///
/// The radius has not been measured on hardware; the default assumes the
/// axis spans the whole 12-bit range.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct StickCalibration {
    pub center: u16,
    pub radius: u16,
}

impl Default for StickCalibration {
    fn default() -> Self {
        Self {
            center: 0x800,
            radius: 0x7FF,
        }
    }
}

impl StickCalibration {
    /// Encode one axis reading: `floor(center + radius * v + 0.5)`, clamped to
    /// 12 bits. Non-finite readings encode as the center.
    pub fn encode_axis(&self, v: f32) -> u16 {
        if !v.is_finite() {
            return self.center.min(C_STICK_MAX);
        }
        let raw = (self.center as f64 + self.radius as f64 * v as f64 + 0.5).floor();
        raw.clamp(0.0, C_STICK_MAX as f64) as u16
    }
}

/// Field view of the 6-byte status report.
///
/// Layout, least significant bit first:
/// - bytes 0-3 (LE u32): header in bits 0-7, C-stick X in bits 8-19, C-stick Y
///   in bits 20-31
/// - byte 4: battery in bits 0-4, ZL in bit 5, ZR in bit 6, R in bit 7
/// - byte 5: unknown, always zero
///
/// Button bits are set when the button is *not* pressed.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct HidStatus {
    pub header: u8,
    pub c_stick_x: u16,
    pub c_stick_y: u16,
    pub battery: u8,
    pub zl_released: bool,
    pub zr_released: bool,
    pub r: bool,
    pub unknown: u8,
}

impl HidStatus {
    pub fn from_input(input: &InputSnapshot, stick: &StickCalibration) -> Self {
        let (x, y) = input.c_stick;
        Self {
            header: ResponseId::ReadHidStatus as u8,
            c_stick_x: stick.encode_axis(x),
            c_stick_y: stick.encode_axis(y),
            battery: BATTERY_FULL,
            zl_released: !input.zl,
            zr_released: !input.zr,
            r: true,
            unknown: 0,
        }
    }

    pub fn zl_pressed(&self) -> bool {
        !self.zl_released
    }

    pub fn zr_pressed(&self) -> bool {
        !self.zr_released
    }

    pub fn encode(&self) -> [u8; HID_STATUS_SIZE] {
        let c_stick = self.header as u32
            | ((self.c_stick_x as u32 & 0xFFF) << 8)
            | ((self.c_stick_y as u32 & 0xFFF) << 20);
        let buttons = (self.battery & 0x1F)
            | ((self.zl_released as u8) << 5)
            | ((self.zr_released as u8) << 6)
            | ((self.r as u8) << 7);

        let mut out = [0u8; HID_STATUS_SIZE];
        out[..4].copy_from_slice(&c_stick.to_le_bytes());
        out[4] = buttons;
        out[5] = self.unknown;
        out
    }

    /// Inverse of [`HidStatus::encode`]. Returns `None` unless `bytes` is
    /// exactly one status report.
    pub fn decode(bytes: &[u8]) -> Option<Self> {
        let bytes: &[u8; HID_STATUS_SIZE] = bytes.try_into().ok()?;
        let c_stick = u32::from_le_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]);
        let buttons = bytes[4];
        Some(Self {
            header: (c_stick & 0xFF) as u8,
            c_stick_x: ((c_stick >> 8) & 0xFFF) as u16,
            c_stick_y: ((c_stick >> 20) & 0xFFF) as u16,
            battery: buttons & 0x1F,
            zl_released: buttons & 0x20 != 0,
            zr_released: buttons & 0x40 != 0,
            r: buttons & 0x80 != 0,
            unknown: bytes[5],
        })
    }
}

/// Build a calibration reply: tag, the request's offset and size as sent, then
/// the aligned data.
pub fn encode_calibration_response(offset: u16, size: u16, data: &[u8]) -> Vec<u8> {
    let mut response = Vec::with_capacity(5 + data.len());
    response.push(ResponseId::ReadCalibrationData as u8);
    response.extend_from_slice(&offset.to_le_bytes());
    response.extend_from_slice(&size.to_le_bytes());
    response.extend_from_slice(data);
    response
}

use crate::request::RequestError;

/// Size of the calibration memory in bytes.
pub const CALIBRATION_DATA_SIZE: usize = 0x40;

/// Reads are served in pages of this many bytes.
pub const CALIBRATION_ALIGNMENT: u16 = 16;

/// Calibration data retrieved from a New 3DS.
pub const DEFAULT_CALIBRATION_DATA: [u8; CALIBRATION_DATA_SIZE] = [
    // 0x00
    0x00, 0x00, 0x08, 0x80, 0x85, 0xEB, 0x11, 0x3F, //
    // 0x08
    0x85, 0xEB, 0x11, 0x3F, 0xFF, 0xFF, 0xFF, 0xF5, //
    // 0x10
    0xFF, 0x00, 0x08, 0x80, 0x85, 0xEB, 0x11, 0x3F, //
    // 0x18
    0x85, 0xEB, 0x11, 0x3F, 0xFF, 0xFF, 0xFF, 0x65, //
    // 0x20
    0xFF, 0x00, 0x08, 0x80, 0x85, 0xEB, 0x11, 0x3F, //
    // 0x28
    0x85, 0xEB, 0x11, 0x3F, 0xFF, 0xFF, 0xFF, 0x65, //
    // 0x30
    0xFF, 0x00, 0x08, 0x80, 0x85, 0xEB, 0x11, 0x3F, //
    // 0x38
    0x85, 0xEB, 0x11, 0x3F, 0xFF, 0xFF, 0xFF, 0x65, //
];

/// Round `value` down to a multiple of `alignment` (a power of two).
#[inline]
pub const fn align_down(value: u16, alignment: u16) -> u16 {
    value & !(alignment - 1)
}

/// Immutable calibration memory of the device.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CalibrationData {
    bytes: [u8; CALIBRATION_DATA_SIZE],
}

impl CalibrationData {
    pub const fn new(bytes: [u8; CALIBRATION_DATA_SIZE]) -> Self {
        Self { bytes }
    }

    pub fn as_bytes(&self) -> &[u8; CALIBRATION_DATA_SIZE] {
        &self.bytes
    }

    /// Read an aligned range.
    ///
    /// `offset` and `size` are both rounded down to the page size before the
    /// bounds check, so unaligned requests get a smaller, earlier range.
    pub fn read(&self, offset: u16, size: u16) -> Result<&[u8], RequestError> {
        let start = align_down(offset, CALIBRATION_ALIGNMENT) as usize;
        let len = align_down(size, CALIBRATION_ALIGNMENT) as usize;
        let end = start + len;
        if end > self.bytes.len() {
            return Err(RequestError::OutOfRange { offset, size });
        }
        Ok(&self.bytes[start..end])
    }
}

impl Default for CalibrationData {
    fn default() -> Self {
        Self::new(DEFAULT_CALIBRATION_DATA)
    }
}

use thiserror::Error;

/// Request identifiers understood by the device.
///
/// Hardware also knows ids 3, 4 and 5; they are reported as unknown here.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[repr(u8)]
pub enum RequestId {
    ReadHidStatus = 1,
    ReadCalibrationData = 2,
}

impl RequestId {
    /// Exact frame length required for this request.
    pub const fn frame_len(self) -> usize {
        match self {
            RequestId::ReadHidStatus => 3,
            RequestId::ReadCalibrationData => 6,
        }
    }
}

impl TryFrom<u8> for RequestId {
    type Error = RequestError;

    fn try_from(id: u8) -> Result<Self, Self::Error> {
        match id {
            1 => Ok(RequestId::ReadHidStatus),
            2 => Ok(RequestId::ReadCalibrationData),
            other => Err(RequestError::UnknownRequest(other)),
        }
    }
}

/// Reasons a request is dropped without a response.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum RequestError {
    #[error("empty request")]
    EmptyFrame,

    #[error("wrong request size ({actual}) for request {id:#04x}, expected {expected}")]
    MalformedLength {
        id: u8,
        expected: usize,
        actual: usize,
    },

    #[error("unknown request {0:#04x}")]
    UnknownRequest(u8),

    #[error("read beyond the end of calibration data (offset={offset}, size={size})")]
    OutOfRange { offset: u16, size: u16 },
}

/// A validated request frame.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Request {
    /// Start (or restart) periodic status reports every `period_ms`.
    ReadHidStatus { period_ms: u8 },
    /// Read calibration memory. Values are as sent, before alignment.
    ReadCalibrationData { offset: u16, size: u16 },
}

impl Request {
    pub fn parse(data: &[u8]) -> Result<Self, RequestError> {
        let &id = data.first().ok_or(RequestError::EmptyFrame)?;
        let kind = RequestId::try_from(id)?;
        if data.len() != kind.frame_len() {
            return Err(RequestError::MalformedLength {
                id,
                expected: kind.frame_len(),
                actual: data.len(),
            });
        }

        Ok(match kind {
            RequestId::ReadHidStatus => Request::ReadHidStatus { period_ms: data[1] },
            RequestId::ReadCalibrationData => Request::ReadCalibrationData {
                offset: u16::from_le_bytes([data[2], data[3]]),
                size: u16::from_le_bytes([data[4], data[5]]),
            },
        })
    }
}

use serde::{Deserialize, Serialize};

use crate::input::InputSettings;
use crate::response::StickCalibration;

/// Persisted settings of one Extra HID device.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DeviceConfig {
    pub stick: StickCalibration,
    pub input: InputSettings,
}

use std::fmt::Write;

use log::error;

use crate::request::RequestError;

/// Receives every request the device drops.
pub trait DiagnosticSink: Send {
    fn dropped(&mut self, error: &RequestError, frame: &[u8]);
}

/// Default sink: reports drops through the `log` facade.
#[derive(Clone, Copy, Debug, Default)]
pub struct LogDiagnostics;

impl DiagnosticSink for LogDiagnostics {
    fn dropped(&mut self, error: &RequestError, frame: &[u8]) {
        error!(target: "extra_hid", "{error}: [{}]", hex_string(frame));
    }
}

/// Format bytes as space separated upper-case hex, e.g. `01 0A FF`.
pub fn hex_string(bytes: &[u8]) -> String {
    let mut out = String::with_capacity(bytes.len() * 3);
    for (i, byte) in bytes.iter().enumerate() {
        if i > 0 {
            out.push(' ');
        }
        let _ = write!(out, "{byte:02X}");
    }
    out
}

#[cfg(test)]
mod tests {
    use super::hex_string;

    #[test]
    fn hex_string_formats_bytes() {
        assert_eq!(hex_string(&[]), "");
        assert_eq!(hex_string(&[0x01]), "01");
        assert_eq!(hex_string(&[0x01, 0x0A, 0xFF]), "01 0A FF");
    }
}

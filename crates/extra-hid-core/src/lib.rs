//! Emulation of the Extra HID infrared peripheral (a Circle Pad Pro style
//! add-on that provides ZL, ZR and a second analog stick).
//!
//! This crate contains the platform-agnostic device logic: request parsing,
//! response encoding, the calibration memory and the self-rescheduling status
//! timer. Frontends own the transport and the clock and drive the device via
//! the [`extra_hid`] facade.

/// Fixed calibration memory served in aligned chunks.
pub mod calibration;

/// Serializable device configuration.
pub mod config;

/// Reporting of dropped requests.
pub mod diagnostics;

/// The Extra HID device itself.
pub mod extra_hid;

/// Button/analog providers and the reloadable input binding.
pub mod input;

/// Generic IR device interface.
pub mod ir;

/// Request frame parsing and validation.
pub mod request;

/// Response frame encoding (and decoding, for hosts and tests).
pub mod response;

/// Periodic status timer state machine.
pub mod scheduler;

/// Event scheduling facility and host clock conversions.
pub mod timing;

use std::sync::{Arc, Mutex, PoisonError, RwLock};

use extra_hid_core::config::DeviceConfig;
use extra_hid_core::extra_hid::ExtraHid;
use extra_hid_core::input::{FixedInputFactory, SettingsLoader, SharedInputSettings};
use extra_hid_core::ir::IrDevice;
use extra_hid_core::timing::{BASE_CLOCK_RATE_ARM11, CoreTiming, ms_to_cycles};
use log::{debug, info};

use crate::script::{BindTarget, Command};

/// One frame the device sent, stamped with the clock at send time.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SentFrame {
    pub at: u64,
    pub bytes: Vec<u8>,
}

impl SentFrame {
    pub fn at_ms(&self) -> f64 {
        self.at as f64 * 1000.0 / BASE_CLOCK_RATE_ARM11 as f64
    }
}

/// Headless IR port: owns the clock and one Extra HID device and runs script
/// commands against them.
pub struct Host {
    timing: CoreTiming,
    device: ExtraHid,
    settings: SharedInputSettings,
    tick: u64,
    out: Arc<Mutex<Vec<SentFrame>>>,
}

impl Host {
    /// `tick_ms` is the granularity the clock advances in; coarser ticks make
    /// status reports fire later and exercise the lateness compensation.
    pub fn new(config: &DeviceConfig, tick_ms: u64) -> Self {
        let timing = CoreTiming::new();
        let settings = Arc::new(RwLock::new(config.input.clone()));
        let out = Arc::new(Mutex::new(Vec::new()));

        let clock = timing.clone();
        let sink = Arc::clone(&out);
        let send = Box::new(move |bytes: &[u8]| {
            sink.lock()
                .unwrap_or_else(PoisonError::into_inner)
                .push(SentFrame {
                    at: clock.now(),
                    bytes: bytes.to_vec(),
                });
        });

        let loader = SettingsLoader::new(Box::new(FixedInputFactory), Arc::clone(&settings));
        let mut device =
            ExtraHid::new_with_config(send, Box::new(timing.clone()), Box::new(loader), config);
        device.connect();

        Self {
            timing,
            device,
            settings,
            tick: ms_to_cycles(tick_ms).max(1),
            out,
        }
    }

    pub fn now(&self) -> u64 {
        self.timing.now()
    }

    pub fn device(&self) -> &ExtraHid {
        &self.device
    }

    pub fn execute(&mut self, command: &Command) {
        match command {
            Command::Send(frame) => self.device.receive(frame),
            Command::Advance(ms) => self.advance(ms_to_cycles(*ms)),
            Command::Bind { target, params } => {
                {
                    let mut settings = self
                        .settings
                        .write()
                        .unwrap_or_else(PoisonError::into_inner);
                    let slot = match target {
                        BindTarget::Zl => &mut settings.zl,
                        BindTarget::Zr => &mut settings.zr,
                        BindTarget::CStick => &mut settings.c_stick,
                    };
                    *slot = params.clone();
                }
                info!("Bound {target:?} to '{params}'");
                self.device.reload_input_devices();
            }
            Command::Reload => self.device.reload_input_devices(),
            Command::Disconnect => self.device.disconnect(),
        }
    }

    /// Drain frames sent since the last call.
    pub fn take_output(&mut self) -> Vec<SentFrame> {
        std::mem::take(&mut *self.out.lock().unwrap_or_else(PoisonError::into_inner))
    }

    fn advance(&mut self, cycles: u64) {
        let mut remaining = cycles;
        while remaining > 0 {
            let slice = remaining.min(self.tick);
            self.timing.add_ticks(slice);
            remaining -= slice;

            while let Some(event) = self.timing.pop_due() {
                if !self.device.handle_event(event) {
                    debug!("Ignoring event {:?} with no owner", event.handle);
                }
            }
        }
    }
}

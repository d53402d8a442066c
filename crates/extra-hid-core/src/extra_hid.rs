use log::{debug, trace};

use crate::calibration::CalibrationData;
use crate::config::DeviceConfig;
use crate::diagnostics::{DiagnosticSink, LogDiagnostics};
use crate::input::{InputBinding, InputLoader, ReloadSignal};
use crate::ir::{IrDevice, SendFunc};
use crate::request::{Request, RequestError};
use crate::response::{HidStatus, StickCalibration, encode_calibration_response};
use crate::scheduler::{SchedulerState, StatusScheduler};
use crate::timing::{EventScheduler, FiredEvent};

/// The Extra HID peripheral.
///
/// Answers calibration reads directly and, once the console sends a status
/// request, pushes a status report every configured period. Reports are
/// driven by timers on the injected [`EventScheduler`]; the host forwards
/// fired events through [`ExtraHid::handle_event`].
pub struct ExtraHid {
    send: SendFunc,
    timing: Box<dyn EventScheduler>,
    diagnostics: Box<dyn DiagnosticSink>,
    loader: Box<dyn InputLoader>,
    inputs: InputBinding,
    reload: ReloadSignal,
    scheduler: StatusScheduler,
    calibration: CalibrationData,
    stick: StickCalibration,
}

impl ExtraHid {
    pub fn new(
        send: SendFunc,
        timing: Box<dyn EventScheduler>,
        loader: Box<dyn InputLoader>,
    ) -> Self {
        let inputs = loader.load();
        Self {
            send,
            timing,
            diagnostics: Box::new(LogDiagnostics),
            loader,
            inputs,
            reload: ReloadSignal::new(),
            scheduler: StatusScheduler::new(),
            calibration: CalibrationData::default(),
            stick: StickCalibration::default(),
        }
    }

    pub fn new_with_config(
        send: SendFunc,
        timing: Box<dyn EventScheduler>,
        loader: Box<dyn InputLoader>,
        config: &DeviceConfig,
    ) -> Self {
        let mut device = Self::new(send, timing, loader);
        device.stick = config.stick;
        device
    }

    pub fn set_diagnostic_sink(&mut self, sink: Box<dyn DiagnosticSink>) {
        self.diagnostics = sink;
    }

    /// Handle other threads can use to request an input reload.
    pub fn reload_signal(&self) -> ReloadSignal {
        self.reload.clone()
    }

    /// Reload the input devices before the next status report.
    pub fn reload_input_devices(&self) {
        self.reload.request();
    }

    pub fn period_ms(&self) -> Option<u8> {
        self.scheduler.period_ms()
    }

    pub fn scheduler_state(&self) -> SchedulerState {
        self.scheduler.state()
    }

    /// Deliver a fired timer. Returns `false` (and does nothing) if the event
    /// belongs to someone else.
    pub fn handle_event(&mut self, event: FiredEvent) -> bool {
        if !self.scheduler.fire(event) {
            return false;
        }
        self.send_hid_status(event.lateness);
        true
    }

    fn send_hid_status(&mut self, lateness: u64) {
        if self.reload.take() {
            debug!(target: "extra_hid", "Reloading input devices");
            self.inputs = self.loader.load();
        }

        let status = HidStatus::from_input(&self.inputs.sample(), &self.stick);
        (self.send)(&status.encode());

        if let Some(delay) = self.scheduler.rearm(lateness, self.timing.as_mut()) {
            trace!(target: "extra_hid", "Next status in {delay} cycles (late by {lateness})");
        }
    }

    fn handle_read_hid_status(&mut self, period_ms: u8) {
        debug!(target: "extra_hid", "Status period set to {period_ms} ms");
        self.scheduler.configure(period_ms, self.timing.as_mut());
    }

    fn handle_read_calibration_data(
        &mut self,
        offset: u16,
        size: u16,
    ) -> Result<(), RequestError> {
        let data = self.calibration.read(offset, size)?;
        let response = encode_calibration_response(offset, size, data);
        (self.send)(&response);
        Ok(())
    }

    fn dispatch(&mut self, data: &[u8]) -> Result<(), RequestError> {
        match Request::parse(data)? {
            Request::ReadHidStatus { period_ms } => {
                self.handle_read_hid_status(period_ms);
                Ok(())
            }
            Request::ReadCalibrationData { offset, size } => {
                self.handle_read_calibration_data(offset, size)
            }
        }
    }
}

impl IrDevice for ExtraHid {
    fn connect(&mut self) {}

    fn disconnect(&mut self) {
        self.scheduler.cancel(self.timing.as_mut());
    }

    fn receive(&mut self, data: &[u8]) {
        if let Err(err) = self.dispatch(data) {
            self.diagnostics.dropped(&err, data);
        }
    }
}

impl Drop for ExtraHid {
    fn drop(&mut self) {
        self.disconnect();
    }
}

#[cfg(test)]
mod tests {
    use std::sync::{Arc, Mutex};

    use super::ExtraHid;
    use crate::calibration::DEFAULT_CALIBRATION_DATA;
    use crate::config::DeviceConfig;
    use crate::input::{FixedAnalog, FixedButton, InputBinding};
    use crate::ir::IrDevice;
    use crate::response::{HidStatus, StickCalibration};
    use crate::scheduler::SchedulerState;
    use crate::timing::{CoreTiming, ms_to_cycles};

    fn idle_binding() -> InputBinding {
        InputBinding {
            zl: Box::new(FixedButton(false)),
            zr: Box::new(FixedButton(false)),
            c_stick: Box::new(FixedAnalog::default()),
        }
    }

    fn device(timing: &CoreTiming) -> (ExtraHid, Arc<Mutex<Vec<Vec<u8>>>>) {
        let sent = Arc::new(Mutex::new(Vec::new()));
        let out = Arc::clone(&sent);
        let hid = ExtraHid::new(
            Box::new(move |frame: &[u8]| out.lock().unwrap().push(frame.to_vec())),
            Box::new(timing.clone()),
            Box::new(idle_binding),
        );
        (hid, sent)
    }

    #[test]
    fn status_request_arms_without_replying() {
        let timing = CoreTiming::new();
        let (mut hid, sent) = device(&timing);

        assert_eq!(hid.scheduler_state(), SchedulerState::Idle);
        hid.receive(&[0x01, 0x08, 0x00]);

        assert!(matches!(hid.scheduler_state(), SchedulerState::Armed(_)));
        assert_eq!(hid.period_ms(), Some(8));
        assert!(sent.lock().unwrap().is_empty());
        assert_eq!(timing.next_deadline(), Some(ms_to_cycles(8)));
    }

    #[test]
    fn firing_sends_status_and_rearms() {
        let timing = CoreTiming::new();
        let (mut hid, sent) = device(&timing);
        hid.receive(&[0x01, 0x08, 0x00]);

        timing.add_ticks(ms_to_cycles(8));
        let event = timing.pop_due().unwrap();
        assert!(hid.handle_event(event));

        let frames = sent.lock().unwrap();
        assert_eq!(frames.len(), 1);
        assert_eq!(frames[0], vec![0x10u8, 0x00, 0x08, 0x80, 0xFF, 0x00]);
        assert_eq!(timing.pending_count(), 1);
    }

    #[test]
    fn stick_calibration_comes_from_config() {
        let timing = CoreTiming::new();
        let sent = Arc::new(Mutex::new(Vec::new()));
        let out = Arc::clone(&sent);
        let config = DeviceConfig {
            stick: StickCalibration {
                center: 0x400,
                radius: 0x100,
            },
            ..DeviceConfig::default()
        };
        let mut hid = ExtraHid::new_with_config(
            Box::new(move |frame: &[u8]| out.lock().unwrap().push(frame.to_vec())),
            Box::new(timing.clone()),
            Box::new(idle_binding),
            &config,
        );
        hid.receive(&[0x01, 0x08, 0x00]);
        hid.receive(&[0x02, 0x00, 0x00, 0x00, 0x10, 0x00]);

        timing.add_ticks(ms_to_cycles(8));
        let event = timing.pop_due().unwrap();
        assert!(hid.handle_event(event));

        let frames = sent.lock().unwrap();
        assert_eq!(frames.len(), 2);
        // Calibration memory is the built-in blob regardless of config.
        assert_eq!(&frames[0][5..], &DEFAULT_CALIBRATION_DATA[..16]);
        let status = HidStatus::decode(&frames[1]).unwrap();
        assert_eq!((status.c_stick_x, status.c_stick_y), (0x400, 0x400));
    }

    #[test]
    fn drop_cancels_pending_timer() {
        let timing = CoreTiming::new();
        let (mut hid, _sent) = device(&timing);
        hid.receive(&[0x01, 0x08, 0x00]);
        assert_eq!(timing.pending_count(), 1);

        drop(hid);
        assert_eq!(timing.pending_count(), 0);
    }
}

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, PoisonError, RwLock};

use log::warn;
use serde::{Deserialize, Serialize};

/// A digital input such as ZL or ZR.
pub trait ButtonDevice: Send {
    fn is_pressed(&self) -> bool;
}

/// A two-axis analog input. Each axis is in `[-1.0, 1.0]`.
pub trait AnalogDevice: Send {
    fn status(&self) -> (f32, f32);
}

/// Input state captured at one status report.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct InputSnapshot {
    pub zl: bool,
    pub zr: bool,
    pub c_stick: (f32, f32),
}

/// The providers currently feeding the device. Replaced as a whole on reload.
pub struct InputBinding {
    pub zl: Box<dyn ButtonDevice>,
    pub zr: Box<dyn ButtonDevice>,
    pub c_stick: Box<dyn AnalogDevice>,
}

impl InputBinding {
    /// Build a binding from the param strings in `settings`.
    pub fn load(factory: &dyn InputFactory, settings: &InputSettings) -> Self {
        Self {
            zl: factory.create_button(&ParamPackage::parse(&settings.zl)),
            zr: factory.create_button(&ParamPackage::parse(&settings.zr)),
            c_stick: factory.create_analog(&ParamPackage::parse(&settings.c_stick)),
        }
    }

    pub fn sample(&self) -> InputSnapshot {
        InputSnapshot {
            zl: self.zl.is_pressed(),
            zr: self.zr.is_pressed(),
            c_stick: self.c_stick.status(),
        }
    }
}

/// Which physical input feeds ZL, ZR and the C-stick, as param packages.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct InputSettings {
    pub zl: String,
    pub zr: String,
    pub c_stick: String,
}

impl Default for InputSettings {
    fn default() -> Self {
        Self {
            zl: "engine:fixed,pressed:0".to_string(),
            zr: "engine:fixed,pressed:0".to_string(),
            c_stick: "engine:fixed,x:0,y:0".to_string(),
        }
    }
}

/// Settings shared between the frontend (which edits them) and the device
/// (which reads them when it reloads).
pub type SharedInputSettings = Arc<RwLock<InputSettings>>;

/// `key:value` pairs describing one input device, e.g.
/// `engine:fixed,x:0.5,y:-1`.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ParamPackage {
    entries: BTreeMap<String, String>,
}

impl ParamPackage {
    pub fn parse(text: &str) -> Self {
        let mut entries = BTreeMap::new();
        for part in text.split(',') {
            let part = part.trim();
            if part.is_empty() {
                continue;
            }
            let Some((key, value)) = part.split_once(':') else {
                warn!("Ignoring param '{part}' in '{text}' (expected key:value)");
                continue;
            };
            entries.insert(key.trim().to_string(), value.trim().to_string());
        }
        Self { entries }
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.entries.get(key).map(String::as_str)
    }

    pub fn get_f32(&self, key: &str, default: f32) -> f32 {
        match self.get(key) {
            Some(value) => value.parse().unwrap_or_else(|_| {
                warn!("Param '{key}' has non-numeric value '{value}'");
                default
            }),
            None => default,
        }
    }

    pub fn get_bool(&self, key: &str, default: bool) -> bool {
        match self.get(key) {
            Some("1" | "true") => true,
            Some("0" | "false") => false,
            Some(value) => {
                warn!("Param '{key}' has non-boolean value '{value}'");
                default
            }
            None => default,
        }
    }
}

/// Creates input devices from param packages.
pub trait InputFactory: Send + Sync {
    fn create_button(&self, params: &ParamPackage) -> Box<dyn ButtonDevice>;
    fn create_analog(&self, params: &ParamPackage) -> Box<dyn AnalogDevice>;
}

/// Button with a constant state.
#[derive(Clone, Copy, Debug, Default)]
pub struct FixedButton(pub bool);

impl ButtonDevice for FixedButton {
    fn is_pressed(&self) -> bool {
        self.0
    }
}

/// Analog stick held at a constant position.
#[derive(Clone, Copy, Debug, Default)]
pub struct FixedAnalog {
    pub x: f32,
    pub y: f32,
}

impl AnalogDevice for FixedAnalog {
    fn status(&self) -> (f32, f32) {
        (self.x, self.y)
    }
}

/// Factory for the `fixed` engine: `pressed:1` for buttons, `x:..,y:..` for
/// sticks. Other engines resolve to a released button / centered stick.
#[derive(Clone, Copy, Debug, Default)]
pub struct FixedInputFactory;

impl FixedInputFactory {
    fn check_engine(params: &ParamPackage) -> bool {
        match params.get("engine") {
            Some("fixed") => true,
            other => {
                warn!("Unsupported input engine {other:?}; using an idle device");
                false
            }
        }
    }
}

impl InputFactory for FixedInputFactory {
    fn create_button(&self, params: &ParamPackage) -> Box<dyn ButtonDevice> {
        if !Self::check_engine(params) {
            return Box::new(FixedButton(false));
        }
        Box::new(FixedButton(params.get_bool("pressed", false)))
    }

    fn create_analog(&self, params: &ParamPackage) -> Box<dyn AnalogDevice> {
        if !Self::check_engine(params) {
            return Box::new(FixedAnalog::default());
        }
        Box::new(FixedAnalog {
            x: params.get_f32("x", 0.0).clamp(-1.0, 1.0),
            y: params.get_f32("y", 0.0).clamp(-1.0, 1.0),
        })
    }
}

/// Produces a fresh binding at construction and on every reload.
pub trait InputLoader: Send {
    fn load(&self) -> InputBinding;
}

impl<F> InputLoader for F
where
    F: Fn() -> InputBinding + Send,
{
    fn load(&self) -> InputBinding {
        self()
    }
}

/// Loader that resolves the current [`InputSettings`] through a factory.
pub struct SettingsLoader {
    factory: Box<dyn InputFactory>,
    settings: SharedInputSettings,
}

impl SettingsLoader {
    pub fn new(factory: Box<dyn InputFactory>, settings: SharedInputSettings) -> Self {
        Self { factory, settings }
    }
}

impl InputLoader for SettingsLoader {
    fn load(&self) -> InputBinding {
        let settings = self.settings.read().unwrap_or_else(PoisonError::into_inner);
        InputBinding::load(self.factory.as_ref(), &settings)
    }
}

/// One-slot "reload requested" cell.
///
/// Any thread may call [`ReloadSignal::request`]; the device drains it with
/// [`ReloadSignal::take`] at its next status report. Several requests before
/// that collapse into a single reload.
#[derive(Clone, Debug, Default)]
pub struct ReloadSignal {
    pending: Arc<AtomicBool>,
}

impl ReloadSignal {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn request(&self) {
        self.pending.store(true, Ordering::Release);
    }

    pub fn is_pending(&self) -> bool {
        self.pending.load(Ordering::Acquire)
    }

    /// Clear the flag, returning whether it was set.
    pub fn take(&self) -> bool {
        self.pending
            .compare_exchange(true, false, Ordering::AcqRel, Ordering::Acquire)
            .is_ok()
    }
}

#[cfg(test)]
mod tests {
    use std::sync::{Arc, RwLock};

    use super::{
        FixedInputFactory, InputBinding, InputLoader, InputSettings, ParamPackage, ReloadSignal,
        SettingsLoader,
    };

    #[test]
    fn param_package_parses_pairs() {
        let params = ParamPackage::parse("engine:fixed, x:0.5 ,y:-1,bogus");
        assert_eq!(params.get("engine"), Some("fixed"));
        assert_eq!(params.get_f32("x", 0.0), 0.5);
        assert_eq!(params.get_f32("y", 0.0), -1.0);
        assert_eq!(params.get("bogus"), None);
        assert_eq!(params.get_f32("z", 0.25), 0.25);
    }

    #[test]
    fn param_package_bool_values() {
        let params = ParamPackage::parse("a:1,b:false,c:maybe");
        assert!(params.get_bool("a", false));
        assert!(!params.get_bool("b", true));
        assert!(params.get_bool("c", true));
        assert!(!params.get_bool("missing", false));
    }

    #[test]
    fn fixed_factory_builds_binding() {
        let settings = InputSettings {
            zl: "engine:fixed,pressed:1".into(),
            zr: "engine:fixed,pressed:0".into(),
            c_stick: "engine:fixed,x:2.0,y:-0.5".into(),
        };
        let snapshot = InputBinding::load(&FixedInputFactory, &settings).sample();
        assert!(snapshot.zl);
        assert!(!snapshot.zr);
        // Out-of-range axes are clamped.
        assert_eq!(snapshot.c_stick, (1.0, -0.5));
    }

    #[test]
    fn unknown_engine_yields_idle_devices() {
        let settings = InputSettings {
            zl: "engine:sdl,pressed:1".into(),
            zr: String::new(),
            c_stick: "engine:keyboard,x:1".into(),
        };
        let snapshot = InputBinding::load(&FixedInputFactory, &settings).sample();
        assert!(!snapshot.zl);
        assert!(!snapshot.zr);
        assert_eq!(snapshot.c_stick, (0.0, 0.0));
    }

    #[test]
    fn settings_loader_sees_updated_settings() {
        let settings = Arc::new(RwLock::new(InputSettings::default()));
        let loader = SettingsLoader::new(Box::new(FixedInputFactory), Arc::clone(&settings));
        assert!(!loader.load().sample().zr);

        settings.write().unwrap().zr = "engine:fixed,pressed:1".into();
        assert!(loader.load().sample().zr);
    }

    #[test]
    fn reload_signal_is_consumed_once() {
        let signal = ReloadSignal::new();
        assert!(!signal.take());

        let remote = signal.clone();
        remote.request();
        remote.request();
        assert!(signal.is_pending());
        assert!(signal.take());
        assert!(!signal.take());
        assert!(!remote.is_pending());
    }

    #[test]
    fn reload_signal_can_be_set_from_another_thread() {
        let signal = ReloadSignal::new();
        let remote = signal.clone();
        std::thread::spawn(move || remote.request())
            .join()
            .unwrap();
        assert!(signal.take());
    }
}

//! Uniform measurement-device contract consumed by the host.

use crate::config::{ConfigText, DeviceName};
use crate::error::VocError;

/// Number of values produced per measurement.
pub const PARAMETER_COUNT: usize = 7;

/// Parameter names, in measurement vector order.
pub const PARAMETERS: [&str; PARAMETER_COUNT] = [
    "AQI",
    "TVOC",
    "eCO2",
    "Temperature",
    "Humidity",
    "Pressure",
    "Altitude",
];

/// Units, in measurement vector order.
pub const UNITS: [&str; PARAMETER_COUNT] = ["level", "ppb", "ppm", "C", "%RH", "hPa", "m"];

/// Device type reported in the description.
pub const DEVICE_TYPE: &str = "Multi Function Environmental Module";

/// Identity and parameter metadata of a measurement device.
#[derive(Debug, Clone, PartialEq)]
pub struct Description {
    pub name: DeviceName,
    pub kind: &'static str,
    pub parameters: &'static [&'static str],
    pub units: &'static [&'static str],
}

impl Description {
    pub fn parameter_quantity(&self) -> usize {
        self.parameters.len()
    }
}

/// Lifecycle of a device instance.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum DeviceState {
    /// Constructed, `begin` not yet run.
    Uninitialized,
    /// `begin` succeeded; measurements may be taken.
    Ready,
    /// `begin` failed; measurements are refused.
    Failed,
}

/// A measurement device as seen by the host system.
///
/// `values()` holds the last successful measurement in `parameters` order.
pub trait Sensor {
    fn description(&self) -> &Description;

    fn values(&self) -> &[f32];

    /// Brings the device up. Returns `true` on success.
    fn begin(&mut self) -> bool;

    /// Takes one measurement. Returns `true` if `values()` was updated.
    fn take_measurement(&mut self) -> bool;

    /// Current configuration as text.
    fn get_config(&self) -> Result<ConfigText, VocError>;

    /// Applies configuration text, persisting it when `save` is set.
    fn set_config(&mut self, config: &str, save: bool) -> bool;
}

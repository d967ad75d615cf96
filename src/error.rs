//! Error types for the chip drivers and the combined device.

use crate::device::DeviceState;
use crate::ens160::Readiness;
use crate::ports::StoreError;

/// Errors raised by the BME280 driver.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Bme280Error<E> {
    /// I2C bus error.
    I2CError(E),
    /// The chip answered with an unexpected id (expected `0x60`).
    InvalidChipId(u8),
    /// The NVM calibration copy did not finish after reset.
    CalibrationTimeout,
    /// A measurement was requested before `initialize`.
    NotInitialized,
}

/// Errors raised by the ENS160 driver.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Ens160Error<E> {
    /// I2C bus error.
    I2CError(E),
    /// The chip answered with an unexpected part id (expected `0x0160`).
    InvalidPartId(u16),
    /// A register access was requested before `initialize`.
    NotInitialized,
}

/// Result alias for the BME280 driver.
pub type Bme280Result<T, E> = core::result::Result<T, Bme280Error<E>>;

/// Result alias for the ENS160 driver.
pub type Ens160Result<T, E> = core::result::Result<T, Ens160Error<E>>;

/// Which of the two chips an error belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Chip {
    /// ENS160 gas sensor.
    Ens160,
    /// BME280 temperature, humidity and pressure sensor.
    Bme280,
}

impl Chip {
    pub const fn as_str(&self) -> &'static str {
        match self {
            Chip::Ens160 => "ENS160",
            Chip::Bme280 => "BME280",
        }
    }
}

/// Errors surfaced by [`VocSensor`](crate::VocSensor).
///
/// Errors returned from `try_begin` are fatal for the device instance and
/// latch [`DeviceState::Failed`]. Errors from `try_measure` only fail the
/// current sample.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum VocError {
    /// Configuration text was malformed. The current configuration is unchanged.
    ConfigParse,
    /// The configuration store failed to read or write.
    ConfigIo(StoreError),
    /// Serialized configuration does not fit the text buffer.
    ConfigTooLarge,
    /// The shared bus could not be started.
    BusStart,
    /// A chip failed to respond or initialize.
    HardwareInit(Chip),
    /// The gas sensor is warming up, burning in or reporting an error.
    SensorNotReady(Readiness),
    /// A register read failed in the middle of a measurement cycle.
    Read(Chip),
    /// The device has not completed `begin`.
    NotStarted(DeviceState),
}

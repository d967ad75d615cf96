//! Trait seams between the orchestrator and the outside world.
//!
//! [`VocSensor`](crate::VocSensor) only talks to hardware and storage through
//! these traits, so the chip drivers, the bus and the storage backend can be
//! swapped (or faked in tests) independently.

use core::fmt::Debug;

use embedded_hal::delay::DelayNs;

use crate::ens160::{OperatingMode, Readiness};

/// Optional SDA/SCL pin pair used to start the shared bus.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct BusPins {
    pub sda: u8,
    pub scl: u8,
}

/// Lifecycle control of the shared bus.
///
/// The bus is owned by the host; the device only starts it.
pub trait BusControl {
    type Error: Debug;

    /// Starts the bus on `pins`, or on the bus defaults when `None`.
    ///
    /// Starting an already running bus must succeed.
    fn start(&mut self, pins: Option<BusPins>) -> Result<(), Self::Error>;
}

/// Temperature, humidity and pressure chip.
pub trait EnvironmentalSensor {
    type Error: Debug;

    /// Resets the chip and brings it into measuring state.
    ///
    /// Safe to call again after a failed or successful attempt.
    fn initialize(&mut self, delay: &mut impl DelayNs) -> Result<(), Self::Error>;

    /// Fresh temperature read in degrees Celsius.
    fn read_temperature_c(&mut self) -> Result<f32, Self::Error>;

    /// Fresh relative humidity read in percent.
    fn read_humidity_percent(&mut self) -> Result<f32, Self::Error>;

    /// Fresh pressure read in Pascal.
    fn read_pressure_pa(&mut self) -> Result<u32, Self::Error>;
}

/// Gas chip whose algorithm is compensated with ambient temperature and humidity.
pub trait GasSensor {
    type Error: Debug;

    fn initialize(&mut self, delay: &mut impl DelayNs) -> Result<(), Self::Error>;

    fn set_operating_mode(
        &mut self,
        mode: OperatingMode,
        delay: &mut impl DelayNs,
    ) -> Result<(), Self::Error>;

    /// Readiness of the pollutant outputs. Must be checked before every read.
    fn status(&mut self) -> Result<Readiness, Self::Error>;

    /// Feeds ambient conditions into the gas algorithm.
    ///
    /// Has to be called with a fresh sample before the pollutant reads of the
    /// same cycle; stale values degrade accuracy without any error.
    fn set_compensation(
        &mut self,
        temperature_c: f32,
        humidity_percent: f32,
    ) -> Result<(), Self::Error>;

    /// Air quality index, 1 (excellent) to 5 (unhealthy).
    fn read_air_quality_index(&mut self) -> Result<u8, Self::Error>;

    /// Total volatile organic compounds in ppb.
    fn read_tvoc(&mut self) -> Result<f32, Self::Error>;

    /// Equivalent CO2 in ppm.
    fn read_co2_equivalent(&mut self) -> Result<f32, Self::Error>;
}

/// Storage errors reported by a [`ConfigStore`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum StoreError {
    /// Nothing is stored at the path.
    NotFound,
    /// The backend failed.
    Io,
    /// The stored content is larger than the read buffer.
    BufferTooSmall,
}

/// Persistent storage for the device configuration, treated as opaque bytes.
pub trait ConfigStore {
    fn exists(&mut self, path: &str) -> bool;

    /// Reads the content at `path` into `buf`, returning the number of bytes.
    fn read(&mut self, path: &str, buf: &mut [u8]) -> Result<usize, StoreError>;

    fn write(&mut self, path: &str, data: &[u8]) -> Result<(), StoreError>;
}

#![cfg_attr(not(test), no_std)]

//! # ENS160 + BME280 Environmental Sensor
//!
//! A `no_std` driver for the combined ENS160 gas sensor and Bosch BME280
//! environmental sensor sitting on one I2C bus.
//!
//! The ENS160 calculates its outputs from ambient temperature and humidity.
//! [`VocSensor`] reads both from the BME280 at the start of every
//! measurement and writes them into the ENS160 before reading the pollutant
//! outputs.
//!
//! ## Features
//! - **Staged startup**: configuration, bus, BME280, ENS160, standard mode.
//! - **Readiness gating**: no values are published while the gas sensor is
//!   warming up or in initial burn-in.
//! - **Persistent configuration**: device name and sea-level pressure as JSON
//!   through a pluggable [`ConfigStore`].
//!
//! ## Measurement vector
//! | Index | Parameter   | Unit  |
//! |-------|-------------|-------|
//! | 0     | AQI         | level |
//! | 1     | TVOC        | ppb   |
//! | 2     | eCO2        | ppm   |
//! | 3     | Temperature | C     |
//! | 4     | Humidity    | %RH   |
//! | 5     | Pressure    | hPa   |
//! | 6     | Altitude    | m     |
//!
//! ## Usage
//! ```ignore
//! let bus = RefCell::new(my_bus);
//! let mut sensor = VocSensorBuilder::new("Air").build(&bus, my_store, delay)?;
//! if sensor.begin() && sensor.take_measurement() {
//!     let tvoc = sensor.values()[1];
//! }
//! ```

pub mod bme280;
pub mod config;
pub mod device;
pub mod ens160;
pub mod error;
pub mod ports;
pub mod voc;

pub use config::RuntimeConfig;
pub use device::{Description, DeviceState, Sensor};
pub use error::{Chip, VocError};
pub use ports::{BusControl, BusPins, ConfigStore, EnvironmentalSensor, GasSensor, StoreError};
pub use voc::{Ens160Bme280, Reading, VocSensor, VocSensorBuilder};

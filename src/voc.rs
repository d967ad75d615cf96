//! Combined ENS160 + BME280 device.
//!
//! [`VocSensor`] sequences the startup of both chips and runs the
//! compensation cycle: every measurement reads a fresh temperature and
//! humidity from the environmental chip, writes them into the gas chip, and
//! only then reads the pollutant outputs.

use core::cell::RefCell;
use core::fmt::Debug;

use embedded_hal::{delay::DelayNs, i2c::I2c};
use embedded_hal_bus::i2c::RefCellDevice;
use log::{debug, error, info, warn};

use crate::bme280::{self, altitude_from_pressure, Bme280};
use crate::config::{self, ConfigPath, ConfigText, DeviceName, RuntimeConfig, CONFIG_TEXT_CAPACITY};
use crate::device::{Description, DeviceState, Sensor, DEVICE_TYPE, PARAMETERS, PARAMETER_COUNT, UNITS};
use crate::ens160::{self, Ens160, OperatingMode, Readiness};
use crate::error::{Chip, VocError};
use crate::ports::{BusControl, BusPins, ConfigStore, EnvironmentalSensor, GasSensor, StoreError};

/// One complete measurement cycle.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Reading {
    pub aqi: u8,
    pub tvoc_ppb: f32,
    pub eco2_ppm: f32,
    pub temperature_c: f32,
    pub humidity_percent: f32,
    pub pressure_hpa: f32,
    pub altitude_m: f32,
}

impl Reading {
    /// Values in [`PARAMETERS`] order.
    pub fn to_values(&self) -> [f32; PARAMETER_COUNT] {
        [
            self.aqi as f32,
            self.tvoc_ppb,
            self.eco2_ppm,
            self.temperature_c,
            self.humidity_percent,
            self.pressure_hpa,
            self.altitude_m,
        ]
    }
}

/// ENS160 and BME280 composed into one environmental sensor.
///
/// Both chip drivers share one externally owned bus. The device starts the
/// bus but does not own it. All bus traffic is blocking and serial; the type
/// is `!Sync`, so hosts with concurrent callers must put the whole device
/// behind a mutex.
pub struct VocSensor<'a, B, G, V, S, D> {
    description: Description,
    bus: &'a RefCell<B>,
    pins: Option<BusPins>,
    gas: G,
    env: V,
    store: S,
    delay: D,
    config: RuntimeConfig,
    config_path: ConfigPath,
    state: DeviceState,
    values: [f32; PARAMETER_COUNT],
}

/// [`VocSensor`] with the bundled chip drivers on a `RefCell` shared bus.
pub type Ens160Bme280<'a, B, S, D> =
    VocSensor<'a, B, Ens160<RefCellDevice<'a, B>>, Bme280<RefCellDevice<'a, B>>, S, D>;

/// Construction parameters. Fixed once the device is built.
pub struct VocSensorBuilder<'n> {
    name: &'n str,
    ens160_address: u8,
    bme280_address: u8,
    pins: Option<BusPins>,
    config_file: &'n str,
    bme280_config: bme280::Config,
}

impl<'n> VocSensorBuilder<'n> {
    pub fn new(name: &'n str) -> Self {
        Self {
            name,
            ens160_address: ens160::DEFAULT_ADDRESS,
            bme280_address: bme280::DEFAULT_ADDRESS,
            pins: None,
            config_file: config::DEFAULT_CONFIG_FILE,
            bme280_config: bme280::Config::default(),
        }
    }

    pub fn ens160_address(mut self, address: u8) -> Self {
        self.ens160_address = address;
        self
    }

    pub fn bme280_address(mut self, address: u8) -> Self {
        self.bme280_address = address;
        self
    }

    /// Starts the bus on an explicit SDA/SCL pair instead of the bus defaults.
    pub fn pins(mut self, sda: u8, scl: u8) -> Self {
        self.pins = Some(BusPins { sda, scl });
        self
    }

    pub fn config_file(mut self, file_name: &'n str) -> Self {
        self.config_file = file_name;
        self
    }

    pub fn bme280_config(mut self, config: bme280::Config) -> Self {
        self.bme280_config = config;
        self
    }

    /// Builds the device with the bundled ENS160 and BME280 drivers.
    ///
    /// # Errors
    /// [`VocError::ConfigTooLarge`] if the name or the config path do not fit.
    pub fn build<'a, B, S, D>(
        self,
        bus: &'a RefCell<B>,
        store: S,
        delay: D,
    ) -> Result<Ens160Bme280<'a, B, S, D>, VocError>
    where
        B: I2c + BusControl,
        S: ConfigStore,
        D: DelayNs,
    {
        let gas = Ens160::new(RefCellDevice::new(bus), self.ens160_address);
        let env = Bme280::with_config(RefCellDevice::new(bus), self.bme280_address, self.bme280_config);
        self.build_with(bus, gas, env, store, delay)
    }

    /// Builds the device around caller supplied drivers.
    pub fn build_with<'a, B, G, V, S, D>(
        self,
        bus: &'a RefCell<B>,
        gas: G,
        env: V,
        store: S,
        delay: D,
    ) -> Result<VocSensor<'a, B, G, V, S, D>, VocError> {
        let mut name = DeviceName::new();
        name.push_str(self.name).map_err(|_| VocError::ConfigTooLarge)?;
        let config_path = config::config_path(self.config_file).ok_or(VocError::ConfigTooLarge)?;

        Ok(VocSensor {
            description: Description {
                name,
                kind: DEVICE_TYPE,
                parameters: &PARAMETERS,
                units: &UNITS,
            },
            bus,
            pins: self.pins,
            gas,
            env,
            store,
            delay,
            config: RuntimeConfig::default(),
            config_path,
            state: DeviceState::Uninitialized,
            values: [0.0; PARAMETER_COUNT],
        })
    }
}

impl<'a, B, G, V, S, D> VocSensor<'a, B, G, V, S, D>
where
    B: BusControl,
    G: GasSensor,
    V: EnvironmentalSensor,
    S: ConfigStore,
    D: DelayNs,
{
    pub fn state(&self) -> DeviceState {
        self.state
    }

    pub fn runtime_config(&self) -> &RuntimeConfig {
        &self.config
    }

    pub fn config_path(&self) -> &str {
        &self.config_path
    }

    pub fn gas_sensor(&self) -> &G {
        &self.gas
    }

    pub fn gas_sensor_mut(&mut self) -> &mut G {
        &mut self.gas
    }

    pub fn environmental_sensor(&self) -> &V {
        &self.env
    }

    pub fn environmental_sensor_mut(&mut self) -> &mut V {
        &mut self.env
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn store_mut(&mut self) -> &mut S {
        &mut self.store
    }

    /// Runs the staged startup: configuration, bus, BME280, ENS160.
    ///
    /// Any failure latches [`DeviceState::Failed`]. Calling it again reruns
    /// the whole sequence.
    pub fn try_begin(&mut self) -> Result<(), VocError> {
        let result = self.start_up();
        match result {
            Ok(()) => {
                self.state = DeviceState::Ready;
                info!("{}: ready", self.description.name);
            }
            Err(e) => {
                self.state = DeviceState::Failed;
                error!("{}: startup failed: {:?}", self.description.name, e);
            }
        }
        result
    }

    fn start_up(&mut self) -> Result<(), VocError> {
        self.load_or_create_config()?;
        self.start_bus()?;

        if let Err(e) = self.env.initialize(&mut self.delay) {
            return Err(self.init_failed(Chip::Bme280, e));
        }
        if let Err(e) = self.gas.initialize(&mut self.delay) {
            return Err(self.init_failed(Chip::Ens160, e));
        }
        if let Err(e) = self.gas.set_operating_mode(OperatingMode::Standard, &mut self.delay) {
            return Err(self.init_failed(Chip::Ens160, e));
        }
        Ok(())
    }

    fn load_or_create_config(&mut self) -> Result<(), VocError> {
        if !self.store.exists(&self.config_path) {
            info!(
                "{}: no configuration at {}, writing defaults",
                self.description.name, self.config_path
            );
            let defaults = self.get_config_text()?;
            return self.apply_config(&defaults, true);
        }

        let mut buffer = [0u8; CONFIG_TEXT_CAPACITY];
        let len = self.store.read(&self.config_path, &mut buffer).map_err(|e| {
            error!(
                "{}: failed to read {}: {:?}",
                self.description.name, self.config_path, e
            );
            VocError::ConfigIo(e)
        })?;
        let content = buffer.get(..len).ok_or_else(|| {
            error!(
                "{}: store reported {} bytes for {}, buffer holds {}",
                self.description.name,
                len,
                self.config_path,
                CONFIG_TEXT_CAPACITY
            );
            VocError::ConfigIo(StoreError::BufferTooSmall)
        })?;
        let text = core::str::from_utf8(content).map_err(|_| {
            error!("{}: {} is not valid UTF-8", self.description.name, self.config_path);
            VocError::ConfigParse
        })?;
        self.apply_config(text, false)
    }

    fn start_bus(&mut self) -> Result<(), VocError> {
        let mut bus = self.bus.try_borrow_mut().map_err(|_| {
            error!("{}: bus is already borrowed", self.description.name);
            VocError::BusStart
        })?;
        bus.start(self.pins).map_err(|e| {
            error!("{}: failed to start bus on {:?}: {:?}", self.description.name, self.pins, e);
            VocError::BusStart
        })
    }

    fn init_failed(&self, chip: Chip, e: impl Debug) -> VocError {
        error!(
            "{}: {} initialization failed: {:?}",
            self.description.name,
            chip.as_str(),
            e
        );
        VocError::HardwareInit(chip)
    }

    fn read_failed(&self, chip: Chip, what: &str, e: impl Debug) -> VocError {
        error!(
            "{}: {} {} read failed: {:?}",
            self.description.name,
            chip.as_str(),
            what,
            e
        );
        VocError::Read(chip)
    }

    /// Runs one compensation cycle and publishes the result.
    ///
    /// The published values only change when the whole cycle succeeds.
    pub fn try_measure(&mut self) -> Result<Reading, VocError> {
        if self.state != DeviceState::Ready {
            warn!(
                "{}: measurement refused in state {:?}",
                self.description.name, self.state
            );
            return Err(VocError::NotStarted(self.state));
        }

        let readiness = self
            .gas
            .status()
            .map_err(|e| self.read_failed(Chip::Ens160, "status", e))?;
        match readiness {
            Readiness::Ready => {}
            Readiness::WarmingUp => {
                warn!(
                    "{}: sensor still warming up. Wait up to 3 minutes from power on and try again.",
                    self.description.name
                );
                return Err(VocError::SensorNotReady(readiness));
            }
            Readiness::BurnIn => {
                warn!(
                    "{}: initial sensor burn-in. Leave the sensor powered for one hour to complete first-use burn-in.",
                    self.description.name
                );
                return Err(VocError::SensorNotReady(readiness));
            }
            Readiness::Error => {
                error!(
                    "{}: ENS160 reports invalid output. Check power and wiring, then restart the device.",
                    self.description.name
                );
                return Err(VocError::SensorNotReady(readiness));
            }
        }

        let temperature_c = self
            .env
            .read_temperature_c()
            .map_err(|e| self.read_failed(Chip::Bme280, "temperature", e))?;
        let humidity_percent = self
            .env
            .read_humidity_percent()
            .map_err(|e| self.read_failed(Chip::Bme280, "humidity", e))?;

        self.gas
            .set_compensation(temperature_c, humidity_percent)
            .map_err(|e| self.read_failed(Chip::Ens160, "compensation", e))?;

        let aqi = self
            .gas
            .read_air_quality_index()
            .map_err(|e| self.read_failed(Chip::Ens160, "AQI", e))?;
        let tvoc_ppb = self
            .gas
            .read_tvoc()
            .map_err(|e| self.read_failed(Chip::Ens160, "TVOC", e))?;
        let eco2_ppm = self
            .gas
            .read_co2_equivalent()
            .map_err(|e| self.read_failed(Chip::Ens160, "eCO2", e))?;
        let pressure_pa = self
            .env
            .read_pressure_pa()
            .map_err(|e| self.read_failed(Chip::Bme280, "pressure", e))?;

        let reading = Reading {
            aqi,
            tvoc_ppb,
            eco2_ppm,
            temperature_c,
            humidity_percent,
            pressure_hpa: (pressure_pa as f64 / 100.0) as f32,
            altitude_m: altitude_from_pressure(self.config.pressure_sea_level, pressure_pa),
        };

        self.values = reading.to_values();
        debug!("{}: {:?}", self.description.name, reading);
        Ok(reading)
    }

    /// Serializes the name and the sea-level reference.
    pub fn get_config_text(&self) -> Result<ConfigText, VocError> {
        config::serialize(&self.description.name, &self.config).ok_or_else(|| {
            error!("{}: configuration does not fit the text buffer", self.description.name);
            VocError::ConfigTooLarge
        })
    }

    /// Parses and applies configuration text, persisting it when `save` is set.
    ///
    /// Malformed text leaves the configuration untouched. A failed write is
    /// reported, but the new configuration stays applied in memory.
    pub fn apply_config(&mut self, text: &str, save: bool) -> Result<(), VocError> {
        let parsed = config::parse(text).map_err(|e| {
            error!("{}: deserialization failed: {:?}", self.description.name, e);
            VocError::ConfigParse
        })?;

        self.description.name = parsed.name;
        self.config = parsed.runtime;

        if save {
            self.store
                .write(&self.config_path, text.as_bytes())
                .map_err(|e| {
                    error!(
                        "{}: failed to write {}: {:?}",
                        self.description.name, self.config_path, e
                    );
                    VocError::ConfigIo(e)
                })?;
        }
        Ok(())
    }
}

impl<'a, B, G, V, S, D> Sensor for VocSensor<'a, B, G, V, S, D>
where
    B: BusControl,
    G: GasSensor,
    V: EnvironmentalSensor,
    S: ConfigStore,
    D: DelayNs,
{
    fn description(&self) -> &Description {
        &self.description
    }

    fn values(&self) -> &[f32] {
        &self.values
    }

    fn begin(&mut self) -> bool {
        self.try_begin().is_ok()
    }

    fn take_measurement(&mut self) -> bool {
        self.try_measure().is_ok()
    }

    fn get_config(&self) -> Result<ConfigText, VocError> {
        self.get_config_text()
    }

    fn set_config(&mut self, config: &str, save: bool) -> bool {
        self.apply_config(config, save).is_ok()
    }
}

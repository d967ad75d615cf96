//! # BME280 Environmental Sensor Driver
//!
//! Blocking driver for the Bosch BME280 over `embedded-hal` I2C.
//! The chip runs in normal mode; every read performs a fresh burst read of
//! the ADC registers and applies the factory calibration.
//!
//! ## Units
//! - **Temperature**: degrees Celsius
//! - **Humidity**: percent relative humidity
//! - **Pressure**: Pascal (101325 Pa = 1013.25 hPa)

mod calc;
pub mod settings;

use embedded_hal::{delay::DelayNs, i2c};

pub use calc::altitude_from_pressure;
pub use settings::{Bme280Builder, Config, IIRFilter, Oversampling, OversamplingConfig, StandbyTime};

use crate::error::{Bme280Error, Bme280Result};
use crate::ports::EnvironmentalSensor;

/// Default I2C address (SDO pin low).
pub const DEFAULT_ADDRESS: u8 = 0x76;

/// Expected value of the `id` register.
pub const CHIP_ID: u8 = 0x60;

/// Register map.
mod regs {
    pub const ID: u8 = 0xD0;
    pub const RESET: u8 = 0xE0;
    pub const CTRL_HUM: u8 = 0xF2;
    pub const STATUS: u8 = 0xF3;
    pub const CTRL_MEAS: u8 = 0xF4;
    pub const CONFIG: u8 = 0xF5;

    pub const SOFT_RESET: u8 = 0xB6;
    /// `status` bit 0, NVM data is being copied to the image registers.
    pub const STATUS_IM_UPDATE: u8 = 0x01;
}

/// Memory addresses and sizes of the calibration registers.
mod calib_mem {
    pub const ADDR: [u8; 2] = [0x88, 0xE1];
    pub const SIZE_1: usize = 26;
    pub const SIZE_2: usize = 7;
}

/// Memory address and size of the measurement data registers.
mod raw_data_mem {
    pub const ADDR: u8 = 0xF7;
    pub const SIZE: usize = 8;
}

/// Number of `status` polls while waiting for the NVM copy after reset.
const NVM_POLL_ATTEMPTS: u8 = 10;

/// Factory calibration coefficients, unique to every chip.
#[derive(Debug, Default, Copy, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct CalibData {
    pub dig_t1: u16,
    pub dig_t2: i16,
    pub dig_t3: i16,
    pub dig_p1: u16,
    pub dig_p2: i16,
    pub dig_p3: i16,
    pub dig_p4: i16,
    pub dig_p5: i16,
    pub dig_p6: i16,
    pub dig_p7: i16,
    pub dig_p8: i16,
    pub dig_p9: i16,
    pub dig_h1: u8,
    pub dig_h2: i16,
    pub dig_h3: u8,
    pub dig_h4: i16,
    pub dig_h5: i16,
    pub dig_h6: i8,
}

/// Uncompensated ADC output of one burst read.
#[derive(Debug, Copy, Clone)]
pub struct RawData {
    pub(crate) press_adc: u32,
    pub(crate) temp_adc: u32,
    pub(crate) hum_adc: u16,
}

impl RawData {
    fn from_registers(buffer: &[u8; raw_data_mem::SIZE]) -> Self {
        // 20 bit pressure and temperature, 16 bit humidity
        let press_adc =
            ((buffer[0] as u32) << 12) | ((buffer[1] as u32) << 4) | ((buffer[2] as u32) >> 4);
        let temp_adc =
            ((buffer[3] as u32) << 12) | ((buffer[4] as u32) << 4) | ((buffer[5] as u32) >> 4);
        let hum_adc = ((buffer[6] as u16) << 8) | buffer[7] as u16;

        RawData {
            press_adc,
            temp_adc,
            hum_adc,
        }
    }
}

/// Intermediate temperature values.
///
/// `temp_fine` is required by the pressure and humidity formulas.
#[derive(Debug, Copy, Clone, Default)]
pub struct CalcTempData {
    pub(crate) temp_fine: i32,
    pub(crate) temp_comp: i32,
}

/// Compensated measurement of all three channels from a single burst read.
#[derive(Debug, Copy, Clone, Default, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Measurement {
    pub temperature_c: f32,
    pub humidity_percent: f32,
    pub pressure_pa: u32,
}

/// The BME280 driver.
#[derive(Debug)]
pub struct Bme280<I2C> {
    i2c: I2C,
    address: u8,
    config: Config,
    calib_data: Option<CalibData>,
}

impl<I2C, E> Bme280<I2C>
where
    I2C: i2c::I2c<Error = E>,
{
    /// Creates a driver with the default [`Config`]. Does not talk to the chip yet.
    pub fn new(i2c: I2C, address: u8) -> Self {
        Self::with_config(i2c, address, Config::default())
    }

    pub fn with_config(i2c: I2C, address: u8, config: Config) -> Self {
        Bme280 {
            i2c,
            address,
            config,
            calib_data: None,
        }
    }

    pub fn address(&self) -> u8 {
        self.address
    }

    /// Calibration read during the last successful init.
    pub fn calib_data(&self) -> Option<&CalibData> {
        self.calib_data.as_ref()
    }

    /// Releases the underlying bus handle.
    pub fn release(self) -> I2C {
        self.i2c
    }

    /// Verifies the chip id, soft-resets the chip, loads the calibration and
    /// applies the configuration.
    ///
    /// # Errors
    /// Returns an error if the chip id does not match, the NVM copy does not
    /// finish, or the bus fails. The driver stays uninitialized on error.
    pub fn init(&mut self, delay: &mut impl DelayNs) -> Bme280Result<(), E> {
        self.calib_data = None;

        let chip_id = self.read_chip_id()?;
        if chip_id != CHIP_ID {
            return Err(Bme280Error::InvalidChipId(chip_id));
        }

        self.reset(delay)?;
        self.wait_for_nvm_copy(delay)?;

        let calib_data = self.get_calib_data()?;
        self.configure()?;

        self.calib_data = Some(calib_data);
        Ok(())
    }

    /// Reads the chip id (expected value: `0x60`).
    pub fn read_chip_id(&mut self) -> Bme280Result<u8, E> {
        self.read_reg_byte(regs::ID)
    }

    /// Reads and compensates all three channels from one burst.
    pub fn read_measurement(&mut self) -> Bme280Result<Measurement, E> {
        let calib = self.calibration()?;
        let raw = self.get_raw_data()?;
        let temp = calib.calc_temp(raw.temp_adc);

        Ok(Measurement {
            temperature_c: temp.temp_comp as f32 / 100.0,
            humidity_percent: calib.calc_hum(temp.temp_fine, raw.hum_adc) as f32 / 1024.0,
            pressure_pa: calib.calc_pres(temp.temp_fine, raw.press_adc) >> 8,
        })
    }

    fn calibration(&self) -> Bme280Result<CalibData, E> {
        self.calib_data.ok_or(Bme280Error::NotInitialized)
    }

    /// Performs a soft-reset. The chip needs 2 ms before it answers again.
    fn reset(&mut self, delay: &mut impl DelayNs) -> Bme280Result<(), E> {
        self.write_reg(&[regs::RESET, regs::SOFT_RESET])?;
        delay.delay_ms(2);
        Ok(())
    }

    fn wait_for_nvm_copy(&mut self, delay: &mut impl DelayNs) -> Bme280Result<(), E> {
        for _ in 0..NVM_POLL_ATTEMPTS {
            if self.read_reg_byte(regs::STATUS)? & regs::STATUS_IM_UPDATE == 0 {
                return Ok(());
            }
            delay.delay_ms(1);
        }
        Err(Bme280Error::CalibrationTimeout)
    }

    fn get_calib_data(&mut self) -> Bme280Result<CalibData, E> {
        let mut block_1 = [0u8; calib_mem::SIZE_1];
        let mut block_2 = [0u8; calib_mem::SIZE_2];

        self.read_into(calib_mem::ADDR[0], &mut block_1)?;
        self.read_into(calib_mem::ADDR[1], &mut block_2)?;

        Ok(CalibData::from_registers(&block_1, &block_2))
    }

    /// Writes `ctrl_hum`, `config`, then `ctrl_meas`.
    ///
    /// `ctrl_hum` only takes effect after the `ctrl_meas` write, and `config`
    /// writes may be ignored once normal mode is running.
    fn configure(&mut self) -> Bme280Result<(), E> {
        self.write_reg(&[regs::CTRL_HUM, self.config.ctrl_hum()])?;
        self.write_reg(&[regs::CONFIG, self.config.config_reg()])?;
        self.write_reg(&[regs::CTRL_MEAS, self.config.ctrl_meas()])?;
        Ok(())
    }

    fn get_raw_data(&mut self) -> Bme280Result<RawData, E> {
        let mut buffer = [0u8; raw_data_mem::SIZE];
        self.read_into(raw_data_mem::ADDR, &mut buffer)?;
        Ok(RawData::from_registers(&buffer))
    }

    fn read_into(&mut self, reg_address: u8, buffer: &mut [u8]) -> Bme280Result<(), E> {
        self.i2c
            .write_read(self.address, &[reg_address], buffer)
            .map_err(Bme280Error::I2CError)
    }

    fn read_reg_byte(&mut self, reg_address: u8) -> Bme280Result<u8, E> {
        let mut buffer = [0];
        self.read_into(reg_address, &mut buffer)?;
        Ok(buffer[0])
    }

    fn write_reg(&mut self, data: &[u8]) -> Bme280Result<(), E> {
        self.i2c
            .write(self.address, data)
            .map_err(Bme280Error::I2CError)
    }
}

impl<I2C, E> EnvironmentalSensor for Bme280<I2C>
where
    I2C: i2c::I2c<Error = E>,
    E: core::fmt::Debug,
{
    type Error = Bme280Error<E>;

    fn initialize(&mut self, delay: &mut impl DelayNs) -> Result<(), Self::Error> {
        self.init(delay)
    }

    // Each channel read is its own burst
    fn read_temperature_c(&mut self) -> Result<f32, Self::Error> {
        Ok(self.read_measurement()?.temperature_c)
    }

    fn read_humidity_percent(&mut self) -> Result<f32, Self::Error> {
        Ok(self.read_measurement()?.humidity_percent)
    }

    fn read_pressure_pa(&mut self) -> Result<u32, Self::Error> {
        Ok(self.read_measurement()?.pressure_pa)
    }
}

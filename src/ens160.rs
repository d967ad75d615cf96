//! # ENS160 Gas Sensor Driver
//!
//! Register level driver for the ScioSense ENS160 metal oxide gas sensor.
//! The chip reports an air quality index, TVOC and equivalent CO2. Its
//! algorithm expects the ambient temperature and humidity to be written
//! into `TEMP_IN`/`RH_IN` before each evaluation.
//!
//! ## Units
//! - **AQI**: UBA level 1 (excellent) to 5 (unhealthy)
//! - **TVOC**: ppb
//! - **eCO2**: ppm

use embedded_hal::{delay::DelayNs, i2c};

use crate::error::{Ens160Error, Ens160Result};
use crate::ports::GasSensor;

/// Default I2C address (ADDR pin high).
pub const DEFAULT_ADDRESS: u8 = 0x53;

/// Expected value of the `PART_ID` register.
pub const PART_ID: u16 = 0x0160;

/// Register map.
mod regs {
    pub const PART_ID: u8 = 0x00;
    pub const OPMODE: u8 = 0x10;
    pub const COMMAND: u8 = 0x12;
    pub const TEMP_IN: u8 = 0x13;
    pub const DEVICE_STATUS: u8 = 0x20;
    pub const DATA_AQI: u8 = 0x21;
    pub const DATA_TVOC: u8 = 0x22;
    pub const DATA_ECO2: u8 = 0x24;

    pub const OPMODE_RESET: u8 = 0xF0;
    pub const CMD_NOP: u8 = 0x00;
    pub const CMD_CLRGPR: u8 = 0xCC;

    /// `DEVICE_STATUS` bit 6, error detected.
    pub const STATUS_STATER: u8 = 1 << 6;
}

/// Time the chip needs to settle after an `OPMODE` or `COMMAND` write.
const MODE_SETTLE_MS: u32 = 10;

/// Operating modes written to `OPMODE`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[repr(u8)]
pub enum OperatingMode {
    /// Low power standby.
    DeepSleep = 0x00,
    /// Low power, register access only.
    Idle = 0x01,
    /// Continuous gas sensing.
    Standard = 0x02,
}

/// Readiness of the pollutant outputs, decoded from `DEVICE_STATUS`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Readiness {
    /// Outputs are valid.
    Ready,
    /// Warm-up after power on, up to 3 minutes.
    WarmingUp,
    /// Initial start-up of a new sensor, about one hour.
    BurnIn,
    /// Invalid output or an error flagged by the chip.
    Error,
}

impl Readiness {
    /// Decodes the `DEVICE_STATUS` register.
    ///
    /// Bits 3:2 hold the validity flag, bit 6 the error flag.
    pub fn from_status(status: u8) -> Self {
        if status & regs::STATUS_STATER != 0 {
            return Readiness::Error;
        }
        match (status >> 2) & 0x03 {
            0 => Readiness::Ready,
            1 => Readiness::WarmingUp,
            2 => Readiness::BurnIn,
            _ => Readiness::Error,
        }
    }
}

/// The ENS160 driver.
#[derive(Debug)]
pub struct Ens160<I2C> {
    i2c: I2C,
    address: u8,
    initialized: bool,
}

impl<I2C, E> Ens160<I2C>
where
    I2C: i2c::I2c<Error = E>,
{
    /// Creates a driver instance. Does not talk to the chip yet.
    pub fn new(i2c: I2C, address: u8) -> Self {
        Self {
            i2c,
            address,
            initialized: false,
        }
    }

    pub fn address(&self) -> u8 {
        self.address
    }

    /// Releases the underlying bus handle.
    pub fn release(self) -> I2C {
        self.i2c
    }

    /// Reads the two byte part id (expected `0x0160`).
    pub fn read_part_id(&mut self) -> Ens160Result<u16, E> {
        self.read_u16(regs::PART_ID)
    }

    /// Verifies the part id, resets the chip and leaves it in `Idle`.
    pub fn init(&mut self, delay: &mut impl DelayNs) -> Ens160Result<(), E> {
        self.initialized = false;

        let part_id = self.read_part_id()?;
        if part_id != PART_ID {
            return Err(Ens160Error::InvalidPartId(part_id));
        }

        self.write_reg(&[regs::OPMODE, regs::OPMODE_RESET])?;
        delay.delay_ms(MODE_SETTLE_MS);
        self.write_reg(&[regs::OPMODE, OperatingMode::Idle as u8])?;
        delay.delay_ms(MODE_SETTLE_MS);

        // Clear the general purpose read registers
        self.write_reg(&[regs::COMMAND, regs::CMD_NOP])?;
        self.write_reg(&[regs::COMMAND, regs::CMD_CLRGPR])?;
        delay.delay_ms(MODE_SETTLE_MS);

        self.initialized = true;
        Ok(())
    }

    pub fn set_mode(&mut self, mode: OperatingMode, delay: &mut impl DelayNs) -> Ens160Result<(), E> {
        self.ensure_initialized()?;
        self.write_reg(&[regs::OPMODE, mode as u8])?;
        delay.delay_ms(MODE_SETTLE_MS);
        Ok(())
    }

    pub fn read_status(&mut self) -> Ens160Result<Readiness, E> {
        self.ensure_initialized()?;
        let status = self.read_reg_byte(regs::DEVICE_STATUS)?;
        Ok(Readiness::from_status(status))
    }

    /// Writes `TEMP_IN` and `RH_IN` in a single burst.
    ///
    /// `TEMP_IN` is Kelvin * 64, `RH_IN` is %RH * 512, both little endian.
    pub fn write_compensation(&mut self, temperature_c: f32, humidity_percent: f32) -> Ens160Result<(), E> {
        self.ensure_initialized()?;
        let [t_lo, t_hi] = encode_temperature(temperature_c).to_le_bytes();
        let [h_lo, h_hi] = encode_humidity(humidity_percent).to_le_bytes();
        self.write_reg(&[regs::TEMP_IN, t_lo, t_hi, h_lo, h_hi])
    }

    pub fn read_aqi(&mut self) -> Ens160Result<u8, E> {
        self.ensure_initialized()?;
        Ok(self.read_reg_byte(regs::DATA_AQI)? & 0x07)
    }

    /// TVOC in ppb.
    pub fn read_tvoc_ppb(&mut self) -> Ens160Result<u16, E> {
        self.ensure_initialized()?;
        self.read_u16(regs::DATA_TVOC)
    }

    /// Equivalent CO2 in ppm.
    pub fn read_eco2_ppm(&mut self) -> Ens160Result<u16, E> {
        self.ensure_initialized()?;
        self.read_u16(regs::DATA_ECO2)
    }

    fn ensure_initialized(&self) -> Ens160Result<(), E> {
        if self.initialized {
            Ok(())
        } else {
            Err(Ens160Error::NotInitialized)
        }
    }

    fn read_into(&mut self, reg_address: u8, buffer: &mut [u8]) -> Ens160Result<(), E> {
        self.i2c
            .write_read(self.address, &[reg_address], buffer)
            .map_err(Ens160Error::I2CError)
    }

    fn read_reg_byte(&mut self, reg_address: u8) -> Ens160Result<u8, E> {
        let mut buffer = [0];
        self.read_into(reg_address, &mut buffer)?;
        Ok(buffer[0])
    }

    fn read_u16(&mut self, reg_address: u8) -> Ens160Result<u16, E> {
        let mut buffer = [0u8; 2];
        self.read_into(reg_address, &mut buffer)?;
        Ok(u16::from_le_bytes(buffer))
    }

    fn write_reg(&mut self, data: &[u8]) -> Ens160Result<(), E> {
        self.i2c
            .write(self.address, data)
            .map_err(Ens160Error::I2CError)
    }
}

// Float to integer casts saturate, so out of range inputs clamp to the register limits.
fn encode_temperature(temperature_c: f32) -> u16 {
    ((temperature_c + 273.15) * 64.0) as u16
}

fn encode_humidity(humidity_percent: f32) -> u16 {
    (humidity_percent.clamp(0.0, 100.0) * 512.0) as u16
}

impl<I2C, E> GasSensor for Ens160<I2C>
where
    I2C: i2c::I2c<Error = E>,
    E: core::fmt::Debug,
{
    type Error = Ens160Error<E>;

    fn initialize(&mut self, delay: &mut impl DelayNs) -> Result<(), Self::Error> {
        self.init(delay)
    }

    fn set_operating_mode(
        &mut self,
        mode: OperatingMode,
        delay: &mut impl DelayNs,
    ) -> Result<(), Self::Error> {
        self.set_mode(mode, delay)
    }

    fn status(&mut self) -> Result<Readiness, Self::Error> {
        self.read_status()
    }

    fn set_compensation(
        &mut self,
        temperature_c: f32,
        humidity_percent: f32,
    ) -> Result<(), Self::Error> {
        self.write_compensation(temperature_c, humidity_percent)
    }

    fn read_air_quality_index(&mut self) -> Result<u8, Self::Error> {
        self.read_aqi()
    }

    fn read_tvoc(&mut self) -> Result<f32, Self::Error> {
        Ok(self.read_tvoc_ppb()? as f32)
    }

    fn read_co2_equivalent(&mut self) -> Result<f32, Self::Error> {
        Ok(self.read_eco2_ppm()? as f32)
    }
}

/// Oversampling settings for temperature, pressure and humidity.
///
/// Higher oversampling reduces noise by averaging in hardware, at the cost of
/// a longer measurement and more current per cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[repr(u8)]
pub enum Oversampling {
    /// No measurement. Disables the channel; its output register reads as reset value.
    Skipped = 0,
    /// 1x oversampling.
    #[default]
    X1 = 1,
    X2 = 2,
    X4 = 3,
    X8 = 4,
    /// 16x oversampling. Best precision, longest conversion.
    X16 = 5,
}

/// Grouped oversampling configuration for the three channels.
#[derive(Default, Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct OversamplingConfig {
    pub temp_osrs: Oversampling,
    pub hum_osrs: Oversampling,
    pub pres_osrs: Oversampling,
}

/// IIR filter coefficient.
///
/// Smooths short disturbances (a slammed door, a draught) in pressure and
/// temperature. Humidity is not filtered.
#[derive(Default, Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[repr(u8)]
pub enum IIRFilter {
    #[default]
    Off = 0,
    X2 = 1,
    X4 = 2,
    X8 = 3,
    X16 = 4,
}

/// Inactive time between two conversions in normal mode.
#[derive(Default, Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[repr(u8)]
pub enum StandbyTime {
    Ms0_5 = 0,
    Ms62_5 = 1,
    Ms125 = 2,
    Ms250 = 3,
    Ms500 = 4,
    #[default]
    Ms1000 = 5,
    Ms10 = 6,
    Ms20 = 7,
}

/// Complete BME280 configuration applied during initialization.
///
/// The chip always runs in normal mode so each read sees the latest conversion.
#[derive(Default, Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Config {
    pub osrs_config: OversamplingConfig,
    pub iir_filter: IIRFilter,
    pub standby: StandbyTime,
}

impl Config {
    /// Value of `ctrl_hum` (0xF2).
    pub(crate) fn ctrl_hum(&self) -> u8 {
        self.osrs_config.hum_osrs as u8
    }

    /// Value of `config` (0xF5), SPI 3-wire disabled.
    pub(crate) fn config_reg(&self) -> u8 {
        ((self.standby as u8) << 5) | ((self.iir_filter as u8) << 2)
    }

    /// Value of `ctrl_meas` (0xF4) with normal mode selected.
    pub(crate) fn ctrl_meas(&self) -> u8 {
        ((self.osrs_config.temp_osrs as u8) << 5) | ((self.osrs_config.pres_osrs as u8) << 2) | 0b11
    }
}

/// Builder for [`Config`].
#[derive(Default)]
pub struct Bme280Builder {
    config: Config,
}

impl Bme280Builder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn temp_oversampling(mut self, os: Oversampling) -> Self {
        self.config.osrs_config.temp_osrs = os;
        self
    }

    pub fn hum_oversampling(mut self, os: Oversampling) -> Self {
        self.config.osrs_config.hum_osrs = os;
        self
    }

    pub fn pres_oversampling(mut self, os: Oversampling) -> Self {
        self.config.osrs_config.pres_osrs = os;
        self
    }

    pub fn iir_filter(mut self, filter: IIRFilter) -> Self {
        self.config.iir_filter = filter;
        self
    }

    pub fn standby(mut self, standby: StandbyTime) -> Self {
        self.config.standby = standby;
        self
    }

    pub fn build(self) -> Config {
        self.config
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_register_values() {
        let config = Config::default();
        assert_eq!(config.ctrl_hum(), 0x01);
        assert_eq!(config.config_reg(), 0xA0);
        assert_eq!(config.ctrl_meas(), 0x27);
    }

    #[test]
    fn builder_sets_fields() {
        let config = Bme280Builder::new()
            .temp_oversampling(Oversampling::X2)
            .pres_oversampling(Oversampling::X16)
            .hum_oversampling(Oversampling::Skipped)
            .iir_filter(IIRFilter::X4)
            .standby(StandbyTime::Ms125)
            .build();

        assert_eq!(config.ctrl_hum(), 0x00);
        assert_eq!(config.config_reg(), (2 << 5) | (2 << 2));
        assert_eq!(config.ctrl_meas(), (2 << 5) | (5 << 2) | 0b11);
    }
}

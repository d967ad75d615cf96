use super::{CalcTempData, CalibData};

/// Exponent of the international barometric formula.
const BAROMETRIC_EXPONENT: f32 = 0.1903;

/// Altitude in meters at which the formula's pressure reaches zero.
const BAROMETRIC_SCALE_M: f32 = 44330.0;

impl CalibData {
    /// Maps the two calibration blocks to compensation parameters.
    ///
    /// `block_1` is `0x88..=0xA1`, `block_2` is `0xE1..=0xE7`.
    /// See BME280 datasheet, section 4.2.2.
    pub(crate) fn from_registers(block_1: &[u8; 26], block_2: &[u8; 7]) -> Self {
        let u16_at = |i: usize| u16::from_le_bytes([block_1[i], block_1[i + 1]]);
        let i16_at = |i: usize| i16::from_le_bytes([block_1[i], block_1[i + 1]]);

        CalibData {
            dig_t1: u16_at(0),
            dig_t2: i16_at(2),
            dig_t3: i16_at(4),
            dig_p1: u16_at(6),
            dig_p2: i16_at(8),
            dig_p3: i16_at(10),
            dig_p4: i16_at(12),
            dig_p5: i16_at(14),
            dig_p6: i16_at(16),
            dig_p7: i16_at(18),
            dig_p8: i16_at(20),
            dig_p9: i16_at(22),
            // 0xA0 (index 24) is unused
            dig_h1: block_1[25],
            dig_h2: i16::from_le_bytes([block_2[0], block_2[1]]),
            dig_h3: block_2[2],
            // H4 and H5 are 12 bit signed values sharing the nibbles of 0xE5
            dig_h4: ((block_2[3] as i8 as i16) << 4) | (block_2[4] & 0x0F) as i16,
            dig_h5: ((block_2[5] as i8 as i16) << 4) | (block_2[4] >> 4) as i16,
            dig_h6: block_2[6] as i8,
        }
    }

    /// Temperature compensation (Bosch 32 bit integer formula).
    ///
    /// `temp_comp` is in centigrade (2508 = 25.08 °C); `temp_fine` feeds the
    /// pressure and humidity formulas.
    pub(crate) fn calc_temp(&self, temp_adc: u32) -> CalcTempData {
        let adc = temp_adc as i32;
        let t1 = self.dig_t1 as i32;

        let var1 = (((adc >> 3) - (t1 << 1)) * self.dig_t2 as i32) >> 11;
        let var2 = (((((adc >> 4) - t1) * ((adc >> 4) - t1)) >> 12) * self.dig_t3 as i32) >> 14;
        let temp_fine = var1 + var2;

        CalcTempData {
            temp_fine,
            temp_comp: (temp_fine * 5 + 128) >> 8,
        }
    }

    /// Pressure compensation (Bosch 64 bit integer formula).
    ///
    /// Returns Pascal in Q24.8 format (25767233 = 100653.25 Pa).
    pub(crate) fn calc_pres(&self, temp_fine: i32, press_adc: u32) -> u32 {
        let mut var1 = temp_fine as i64 - 128000;
        let mut var2 = var1 * var1 * self.dig_p6 as i64;
        var2 += (var1 * self.dig_p5 as i64) << 17;
        var2 += (self.dig_p4 as i64) << 35;
        var1 = ((var1 * var1 * self.dig_p3 as i64) >> 8) + ((var1 * self.dig_p2 as i64) << 12);
        var1 = (((1i64 << 47) + var1) * self.dig_p1 as i64) >> 33;

        if var1 == 0 {
            // Avoid division by zero on an uncalibrated chip
            return 0;
        }

        let mut p = 1048576 - press_adc as i64;
        p = (((p << 31) - var2) * 3125) / var1;
        var1 = (self.dig_p9 as i64 * (p >> 13) * (p >> 13)) >> 25;
        var2 = (self.dig_p8 as i64 * p) >> 19;
        p = ((p + var1 + var2) >> 8) + ((self.dig_p7 as i64) << 4);

        p.clamp(0, u32::MAX as i64) as u32
    }

    /// Humidity compensation (Bosch 32 bit integer formula).
    ///
    /// Returns %RH in Q22.10 format (47445 = 46.333 %RH), clamped to 0..=100 %.
    pub(crate) fn calc_hum(&self, temp_fine: i32, hum_adc: u16) -> u32 {
        let adc = hum_adc as i32;
        let mut x = temp_fine - 76800;

        x = ((((adc << 14) - ((self.dig_h4 as i32) << 20) - (self.dig_h5 as i32 * x)) + 16384) >> 15)
            * (((((((x * self.dig_h6 as i32) >> 10)
                * (((x * self.dig_h3 as i32) >> 11) + 32768))
                >> 10)
                + 2097152)
                * self.dig_h2 as i32
                + 8192)
                >> 14);
        x -= ((((x >> 15) * (x >> 15)) >> 7) * self.dig_h1 as i32) >> 4;
        x = x.clamp(0, 419430400);

        (x >> 12) as u32
    }
}

/// Converts a pressure sample into an altitude estimate.
///
/// Applies `44330 * (1 - (p / p0)^0.1903)` with `p0 = sea_level_hpa`.
/// The power is evaluated through `expm1`/`log1p` so ratios close to 1 keep
/// their precision. A reference that is zero, negative or not finite yields
/// `NaN`.
pub fn altitude_from_pressure(sea_level_hpa: f32, sample_pa: u32) -> f32 {
    if !sea_level_hpa.is_finite() || sea_level_hpa <= 0.0 {
        return f32::NAN;
    }

    let sample_hpa = sample_pa as f32 / 100.0;
    let relative = (sample_hpa - sea_level_hpa) / sea_level_hpa;

    -BAROMETRIC_SCALE_M * libm::expm1f(BAROMETRIC_EXPONENT * libm::log1pf(relative))
}

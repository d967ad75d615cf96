//! Typed device configuration and its JSON text form.
//!
//! The text form is a flat object with exactly two keys:
//!
//! ```json
//! {"Name":"Air","pressureSeaLevel":1013.25}
//! ```

use heapless::String;
use serde::{Deserialize, Serialize};

/// Capacity of the device name.
pub const NAME_CAPACITY: usize = 32;

/// Capacity of the configuration text. Large enough for a fully escaped name.
pub const CONFIG_TEXT_CAPACITY: usize = 256;

/// Capacity of the full store path.
pub const PATH_CAPACITY: usize = 64;

/// Directory prefix of persisted device configurations.
pub const CONFIG_DIR: &str = "/settings/sen/";

/// Default configuration file name.
pub const DEFAULT_CONFIG_FILE: &str = "DFVOC.json";

/// Standard atmosphere at sea level in hPa.
pub const DEFAULT_PRESSURE_SEA_LEVEL: f32 = 1013.25;

pub type DeviceName = String<NAME_CAPACITY>;
pub type ConfigText = String<CONFIG_TEXT_CAPACITY>;
pub type ConfigPath = String<PATH_CAPACITY>;

/// Runtime settings owned by the orchestrator.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct RuntimeConfig {
    /// Sea-level reference pressure in hPa, used for the altitude estimate.
    pub pressure_sea_level: f32,
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            pressure_sea_level: DEFAULT_PRESSURE_SEA_LEVEL,
        }
    }
}

/// Wire form of the configuration.
#[derive(Debug, Serialize, Deserialize, PartialEq)]
pub struct ConfigDocument<'a> {
    #[serde(rename = "Name")]
    pub name: &'a str,
    #[serde(rename = "pressureSeaLevel")]
    pub pressure_sea_level: f32,
}

/// Why a configuration text was rejected.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum ParseError {
    /// Not valid JSON, a key missing or of the wrong type.
    Malformed,
    /// Trailing content after the object.
    TrailingCharacters,
    /// The name does not fit [`NAME_CAPACITY`].
    NameTooLong,
}

/// A fully validated configuration update.
#[derive(Debug, Clone, PartialEq)]
pub struct ParsedConfig {
    pub name: DeviceName,
    pub runtime: RuntimeConfig,
}

/// Parses configuration text. Nothing is applied here, so the caller can
/// update its state in one step or not at all.
pub fn parse(text: &str) -> Result<ParsedConfig, ParseError> {
    let (document, _): (ConfigDocument<'_>, usize) =
        serde_json_core::from_str(text).map_err(|e| match e {
            serde_json_core::de::Error::TrailingCharacters => ParseError::TrailingCharacters,
            _ => ParseError::Malformed,
        })?;

    Ok(ParsedConfig {
        name: unescape_name(document.name)?,
        runtime: RuntimeConfig {
            pressure_sea_level: document.pressure_sea_level,
        },
    })
}

/// Decodes the JSON escapes of a borrowed string.
///
/// `serde_json_core` hands borrowed strings back exactly as they appear
/// between the quotes.
fn unescape_name(raw: &str) -> Result<DeviceName, ParseError> {
    let mut name = DeviceName::new();
    let mut chars = raw.chars();

    while let Some(c) = chars.next() {
        let decoded = if c == '\\' {
            match chars.next().ok_or(ParseError::Malformed)? {
                '"' => '"',
                '\\' => '\\',
                '/' => '/',
                'b' => '\u{8}',
                'f' => '\u{c}',
                'n' => '\n',
                'r' => '\r',
                't' => '\t',
                'u' => unicode_escape(&mut chars)?,
                _ => return Err(ParseError::Malformed),
            }
        } else {
            c
        };
        name.push(decoded).map_err(|_| ParseError::NameTooLong)?;
    }
    Ok(name)
}

/// Decodes the `XXXX` of a `\uXXXX` escape, including UTF-16 surrogate pairs.
fn unicode_escape(chars: &mut core::str::Chars<'_>) -> Result<char, ParseError> {
    let high = hex4(chars)?;
    let code = match high {
        0xD800..=0xDBFF => {
            if chars.next() != Some('\\') || chars.next() != Some('u') {
                return Err(ParseError::Malformed);
            }
            let low = hex4(chars)?;
            if !(0xDC00..=0xDFFF).contains(&low) {
                return Err(ParseError::Malformed);
            }
            0x10000 + ((high as u32 - 0xD800) << 10) + (low as u32 - 0xDC00)
        }
        0xDC00..=0xDFFF => return Err(ParseError::Malformed),
        _ => high as u32,
    };
    char::from_u32(code).ok_or(ParseError::Malformed)
}

fn hex4(chars: &mut core::str::Chars<'_>) -> Result<u16, ParseError> {
    let mut value = 0u16;
    for _ in 0..4 {
        let digit = chars
            .next()
            .and_then(|c| c.to_digit(16))
            .ok_or(ParseError::Malformed)?;
        value = (value << 4) | digit as u16;
    }
    Ok(value)
}

/// Serializes the name and runtime settings.
///
/// Returns `None` if the text does not fit [`CONFIG_TEXT_CAPACITY`].
pub fn serialize(name: &str, runtime: &RuntimeConfig) -> Option<ConfigText> {
    let document = ConfigDocument {
        name,
        pressure_sea_level: runtime.pressure_sea_level,
    };
    serde_json_core::to_string::<_, CONFIG_TEXT_CAPACITY>(&document).ok()
}

/// Builds `/settings/sen/<file_name>`.
///
/// Returns `None` if the path does not fit [`PATH_CAPACITY`].
pub fn config_path(file_name: &str) -> Option<ConfigPath> {
    let mut path = ConfigPath::new();
    path.push_str(CONFIG_DIR).ok()?;
    path.push_str(file_name).ok()?;
    Some(path)
}

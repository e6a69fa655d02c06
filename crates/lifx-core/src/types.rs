//! Payload field types

use serde::{Deserialize, Serialize};

/// Maximum label length in bytes
pub const LABEL_SIZE: usize = 32;

/// Size of the echo payload in bytes
pub const ECHO_SIZE: usize = 64;

/// Power level meaning "on"
pub const POWER_ON: u16 = 65535;

/// Power level meaning "off"
pub const POWER_OFF: u16 = 0;

/// Lowest colour temperature accepted in requests
pub const KELVIN_MIN: u16 = 1500;

/// Highest colour temperature accepted in requests
pub const KELVIN_MAX: u16 = 9000;

/// Hue, saturation, brightness, kelvin
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Hsbk {
    pub hue: u16,
    pub saturation: u16,
    pub brightness: u16,
    pub kelvin: u16,
}

impl Hsbk {
    pub const fn new(hue: u16, saturation: u16, brightness: u16, kelvin: u16) -> Self {
        Self {
            hue,
            saturation,
            brightness,
            kelvin,
        }
    }
}

impl Default for Hsbk {
    /// Full-brightness neutral white
    fn default() -> Self {
        Self::new(0, 0, 65535, 3500)
    }
}

/// Waveform shapes for `LightSetWaveform`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[repr(u8)]
pub enum Waveform {
    #[default]
    Saw = 0,
    Sine = 1,
    HalfSine = 2,
    Triangle = 3,
    Pulse = 4,
}

impl Waveform {
    pub fn from_u8(val: u8) -> Option<Self> {
        match val {
            0 => Some(Waveform::Saw),
            1 => Some(Waveform::Sine),
            2 => Some(Waveform::HalfSine),
            3 => Some(Waveform::Triangle),
            4 => Some(Waveform::Pulse),
            _ => None,
        }
    }
}

/// Parameters of a `LightSetWaveform` request.
///
/// Pass only the fields you need and take the rest from [`Default`]:
/// ```
/// use lifx_core::{Hsbk, WaveformOptions};
///
/// let pulse = WaveformOptions {
///     transient: true,
///     color: Hsbk::new(0, 65535, 65535, 3500),
///     period: 1000,
///     cycles: 3.0,
///     ..Default::default()
/// };
/// assert_eq!(pulse.skew_ratio, 0);
/// ```
///
/// Defaults: not transient, [`Hsbk::default`], 1000 ms period, one cycle,
/// skew ratio 0 (an even duty cycle), [`Waveform::Saw`].
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WaveformOptions {
    /// Return to the original colour when the effect ends
    pub transient: bool,
    pub color: Hsbk,
    /// Duration of one cycle in milliseconds
    pub period: u32,
    pub cycles: f32,
    /// Time spent on the original colour, -32768..=32767 maps to 0..1
    pub skew_ratio: i16,
    pub waveform: Waveform,
}

impl Default for WaveformOptions {
    fn default() -> Self {
        Self {
            transient: false,
            color: Hsbk::default(),
            period: 1000,
            cycles: 1.0,
            skew_ratio: 0,
            waveform: Waveform::Saw,
        }
    }
}

/// Parameters of a `LightSetWaveformOptional` request: a waveform that only
/// touches the selected colour components. All components are selected by
/// default.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WaveformOptionalOptions {
    #[serde(flatten)]
    pub waveform: WaveformOptions,
    pub set_hue: bool,
    pub set_saturation: bool,
    pub set_brightness: bool,
    pub set_kelvin: bool,
}

impl Default for WaveformOptionalOptions {
    fn default() -> Self {
        Self {
            waveform: WaveformOptions::default(),
            set_hue: true,
            set_saturation: true,
            set_brightness: true,
            set_kelvin: true,
        }
    }
}

/// Radio statistics from `StateHostInfo` / `StateWifiInfo`
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct SignalInfo {
    /// Signal strength in milliwatts
    pub signal: f32,
    /// Bytes sent since power on
    pub tx: u32,
    /// Bytes received since power on
    pub rx: u32,
}

/// Firmware description from `StateHostFirmware` / `StateWifiFirmware`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct FirmwareInfo {
    /// Build timestamp in nanoseconds since the epoch
    pub build: u64,
    /// Major version in the upper 16 bits, minor in the lower 16
    pub version: u32,
}

impl FirmwareInfo {
    pub fn major(&self) -> u16 {
        (self.version >> 16) as u16
    }

    pub fn minor(&self) -> u16 {
        (self.version & 0xffff) as u16
    }
}

/// Location or group membership
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Membership {
    /// Opaque 16-byte identifier shared by all members
    pub id: [u8; 16],
    pub label: String,
    /// Last change in nanoseconds since the epoch
    pub updated_at: u64,
}

/// Full light state from `LightState`
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct LightStatus {
    pub color: Hsbk,
    pub power: u16,
    pub label: String,
}

/// Zones carried by one `MultiZoneStateMultiZone` message
pub const ZONES_PER_MESSAGE: usize = 8;

/// Whether a `MultiZoneSetColorZones` change takes effect now
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[repr(u8)]
pub enum ZoneApply {
    /// Buffer the change until a later request applies it
    NoApply = 0,
    /// Apply this and any buffered changes
    #[default]
    Apply = 1,
    /// Apply buffered changes, ignoring this request's colour
    ApplyOnly = 2,
}

impl ZoneApply {
    pub fn from_u8(val: u8) -> Option<Self> {
        match val {
            0 => Some(ZoneApply::NoApply),
            1 => Some(ZoneApply::Apply),
            2 => Some(ZoneApply::ApplyOnly),
            _ => None,
        }
    }
}

/// Paint zones `start_index..=end_index` of a strip with one colour
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ColorZones {
    pub start_index: u8,
    pub end_index: u8,
    pub color: Hsbk,
    /// Transition time in milliseconds
    pub duration: u32,
    pub apply: ZoneApply,
}

/// One zone reported by `MultiZoneStateZone`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ZoneColor {
    /// Total zones on the device
    pub count: u8,
    pub index: u8,
    pub color: Hsbk,
}

/// Up to eight consecutive zones reported by `MultiZoneStateMultiZone`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct MultiZoneColors {
    /// Total zones on the device
    pub count: u8,
    /// Zone of `colors[0]`
    pub index: u8,
    pub colors: [Hsbk; ZONES_PER_MESSAGE],
}

impl MultiZoneColors {
    /// `(zone, colour)` pairs that exist on the device; slots past `count`
    /// are padding
    pub fn zones(&self) -> impl Iterator<Item = (u8, Hsbk)> + '_ {
        let count = usize::from(self.count);
        let start = usize::from(self.index);
        self.colors
            .iter()
            .enumerate()
            .map(move |(i, color)| (start + i, *color))
            .take_while(move |(zone, _)| *zone < count)
            .map(|(zone, color)| (zone as u8, color))
    }
}

/// Decode a NUL-padded label field
pub fn label_from_bytes(raw: &[u8]) -> String {
    let end = raw.iter().position(|&b| b == 0).unwrap_or(raw.len());
    String::from_utf8_lossy(&raw[..end]).into_owned()
}

/// Shorten a label to at most [`LABEL_SIZE`] bytes on a character boundary
pub fn truncate_label(label: &str) -> &str {
    if label.len() <= LABEL_SIZE {
        return label;
    }
    let mut end = LABEL_SIZE;
    while !label.is_char_boundary(end) {
        end -= 1;
    }
    &label[..end]
}

/// Convert a nanosecond duration reported by a device to hours
pub fn nanos_to_hours(ns: u64) -> f64 {
    ns as f64 / (1_000_000_000.0 * 60.0 * 60.0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_waveform_defaults() {
        let opts = WaveformOptions::default();
        assert!(!opts.transient);
        assert_eq!(opts.period, 1000);
        assert_eq!(opts.cycles, 1.0);
        assert_eq!(opts.waveform, Waveform::Saw);

        let optional = WaveformOptionalOptions::default();
        assert!(optional.set_hue && optional.set_saturation);
        assert!(optional.set_brightness && optional.set_kelvin);
    }

    #[test]
    fn test_waveform_from_u8() {
        assert_eq!(Waveform::from_u8(4), Some(Waveform::Pulse));
        assert_eq!(Waveform::from_u8(5), None);
    }

    #[test]
    fn test_label_helpers() {
        let mut raw = [0u8; LABEL_SIZE];
        raw[..7].copy_from_slice(b"Kitchen");
        assert_eq!(label_from_bytes(&raw), "Kitchen");

        let long = "é".repeat(20);
        let short = truncate_label(&long);
        assert!(short.len() <= LABEL_SIZE);
        assert_eq!(short.chars().count(), 16);
    }

    #[test]
    fn test_multizone_padding_skipped() {
        let mut colors = [Hsbk::default(); ZONES_PER_MESSAGE];
        colors[0].hue = 100;
        colors[1].hue = 200;
        let block = MultiZoneColors {
            count: 10,
            index: 8,
            colors,
        };
        let zones: Vec<(u8, u16)> = block.zones().map(|(z, c)| (z, c.hue)).collect();
        assert_eq!(zones, vec![(8, 100), (9, 200)]);

        let past_end = MultiZoneColors {
            count: 4,
            index: 8,
            colors,
        };
        assert_eq!(past_end.zones().count(), 0);
    }

    #[test]
    fn test_zone_apply_codes() {
        assert_eq!(ZoneApply::default(), ZoneApply::Apply);
        assert_eq!(ZoneApply::from_u8(2), Some(ZoneApply::ApplyOnly));
        assert_eq!(ZoneApply::from_u8(3), None);
    }

    #[test]
    fn test_firmware_version_parts() {
        let fw = FirmwareInfo {
            build: 0,
            version: (3 << 16) | 70,
        };
        assert_eq!(fw.major(), 3);
        assert_eq!(fw.minor(), 70);
    }

    #[test]
    fn test_waveform_options_partial_json() {
        let opts: WaveformOptions =
            serde_json::from_str(r#"{"transient": true, "cycles": 3.0}"#).unwrap();
        assert!(opts.transient);
        assert_eq!(opts.cycles, 3.0);
        assert_eq!(opts.period, 1000);
    }
}

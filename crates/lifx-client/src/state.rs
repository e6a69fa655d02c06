//! Cached device state

use lifx_core::{products, FirmwareInfo, Hsbk, Membership, Message, Product, SignalInfo};
use serde::Serialize;

/// Product identification from `StateVersion`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ProductVersion {
    pub vendor: u32,
    pub product: u32,
    pub version: u32,
}

impl ProductVersion {
    /// Name and capabilities, if the product is a known LIFX model
    pub fn product(&self) -> Option<&'static Product> {
        products::lookup(self.vendor, self.product)
    }
}

/// Clock and uptime from `StateInfo`, all in nanoseconds
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct UptimeInfo {
    pub time: u64,
    pub uptime: u64,
    pub downtime: u64,
}

/// Last known values reported by a device.
///
/// Fields stay `None` until the device has reported them.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct DeviceState {
    pub label: Option<String>,
    pub power: Option<u16>,
    pub color: Option<Hsbk>,
    pub infrared: Option<u16>,
    pub location: Option<Membership>,
    pub group: Option<Membership>,
    pub version: Option<ProductVersion>,
    pub host_firmware: Option<FirmwareInfo>,
    pub wifi_firmware: Option<FirmwareInfo>,
    pub host_info: Option<SignalInfo>,
    pub wifi_info: Option<SignalInfo>,
    pub info: Option<UptimeInfo>,
    /// Per-zone colours of a multizone device, indexed by zone. A zone is
    /// `None` until a report covering it arrives.
    pub color_zones: Option<Vec<Option<Hsbk>>>,
}

impl DeviceState {
    /// Fold a message into the cache. Returns true if anything changed.
    pub fn apply(&mut self, message: &Message) -> bool {
        let before = self.clone();
        match message {
            Message::StateLabel { label } => self.label = Some(label.clone()),
            Message::StatePower { level } | Message::LightStatePower { level } => {
                self.power = Some(*level)
            }
            Message::LightState(status) => {
                self.color = Some(status.color);
                self.power = Some(status.power);
                self.label = Some(status.label.clone());
            }
            Message::LightStateInfrared { brightness } => self.infrared = Some(*brightness),
            Message::StateLocation(m) => self.location = Some(m.clone()),
            Message::StateGroup(m) => self.group = Some(m.clone()),
            Message::StateVersion {
                vendor,
                product,
                version,
            } => {
                self.version = Some(ProductVersion {
                    vendor: *vendor,
                    product: *product,
                    version: *version,
                })
            }
            Message::StateHostFirmware(fw) => self.host_firmware = Some(*fw),
            Message::StateWifiFirmware(fw) => self.wifi_firmware = Some(*fw),
            Message::StateHostInfo(info) => self.host_info = Some(*info),
            Message::StateWifiInfo(info) => self.wifi_info = Some(*info),
            Message::StateInfo {
                time,
                uptime,
                downtime,
            } => {
                self.info = Some(UptimeInfo {
                    time: *time,
                    uptime: *uptime,
                    downtime: *downtime,
                })
            }
            Message::MultiZoneStateZone(zone) => {
                self.fill_zones(zone.count, zone.index, std::iter::once(zone.color))
            }
            Message::MultiZoneStateMultiZone(block) => {
                self.fill_zones(block.count, block.index, block.colors.iter().copied())
            }
            _ => return false,
        }
        *self != before
    }

    /// Write colours starting at `index`, resizing to `count` zones first.
    /// Colours past the end of the strip are dropped.
    fn fill_zones(&mut self, count: u8, index: u8, colors: impl Iterator<Item = Hsbk>) {
        let zones = self.color_zones.get_or_insert_with(Vec::new);
        zones.resize(count as usize, None);
        let start = index as usize;
        for (slot, color) in zones.iter_mut().skip(start).zip(colors) {
            *slot = Some(color);
        }
    }

    /// True if the last reported power level is non-zero
    pub fn is_on(&self) -> Option<bool> {
        self.power.map(|level| level > 0)
    }
}

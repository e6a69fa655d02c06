//! Product capability table
//!
//! Maps the `product` id reported in `StateVersion` to a model name and the
//! features that model supports. Only LIFX-branded products (vendor 1) are
//! listed; anything else looks up as `None`.

use serde::Serialize;

/// Vendor id reported by LIFX-branded hardware
pub const VENDOR_LIFX: u32 = 1;

/// What a product can do
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Features {
    pub color: bool,
    pub infrared: bool,
    pub multizone: bool,
    pub extended_multizone: bool,
    pub matrix: bool,
    pub chain: bool,
    pub hev: bool,
    pub buttons: bool,
    pub relays: bool,
    pub min_kelvin: u16,
    pub max_kelvin: u16,
}

impl Features {
    const fn white(min_kelvin: u16, max_kelvin: u16) -> Self {
        Self {
            color: false,
            infrared: false,
            multizone: false,
            extended_multizone: false,
            matrix: false,
            chain: false,
            hev: false,
            buttons: false,
            relays: false,
            min_kelvin,
            max_kelvin,
        }
    }

    const fn color(min_kelvin: u16) -> Self {
        let mut features = Self::white(min_kelvin, 9000);
        features.color = true;
        features
    }

    const fn infrared(self) -> Self {
        let mut features = self;
        features.infrared = true;
        features
    }

    const fn multizone(self, extended: bool) -> Self {
        let mut features = self;
        features.multizone = true;
        features.extended_multizone = extended;
        features
    }

    const fn matrix(self, chain: bool) -> Self {
        let mut features = self;
        features.matrix = true;
        features.chain = chain;
        features
    }

    const fn hev(self) -> Self {
        let mut features = self;
        features.hev = true;
        features
    }

    const fn switch() -> Self {
        let mut features = Self::white(0, 0);
        features.buttons = true;
        features.relays = true;
        features
    }
}

/// One row of the table
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Product {
    pub id: u32,
    pub name: &'static str,
    pub features: Features,
}

const fn product(id: u32, name: &'static str, features: Features) -> Product {
    Product { id, name, features }
}

const OLD_COLOR: Features = Features::color(2500);
const NEW_COLOR: Features = Features::color(1500);
const OLD_WHITE: Features = Features::white(2700, 6500);
const NEW_WHITE: Features = Features::white(1500, 9000);

static PRODUCTS: &[Product] = &[
    product(1, "LIFX Original 1000", OLD_COLOR),
    product(3, "LIFX Color 650", OLD_COLOR),
    product(10, "LIFX White 800 (Low Voltage)", OLD_WHITE),
    product(11, "LIFX White 800 (High Voltage)", OLD_WHITE),
    product(15, "LIFX Color 1000", OLD_COLOR),
    product(18, "LIFX White 900 BR30 (Low Voltage)", OLD_WHITE),
    product(19, "LIFX White 900 BR30 (High Voltage)", OLD_WHITE),
    product(20, "LIFX Color 1000 BR30", OLD_COLOR),
    product(22, "LIFX Color 1000", OLD_COLOR),
    product(27, "LIFX A19", OLD_COLOR),
    product(28, "LIFX BR30", OLD_COLOR),
    product(29, "LIFX A19 Night Vision", OLD_COLOR.infrared()),
    product(30, "LIFX BR30 Night Vision", OLD_COLOR.infrared()),
    product(31, "LIFX Z", OLD_COLOR.multizone(false)),
    product(32, "LIFX Z", OLD_COLOR.multizone(true)),
    product(36, "LIFX Downlight", OLD_COLOR),
    product(37, "LIFX Downlight", OLD_COLOR),
    product(38, "LIFX Beam", OLD_COLOR.multizone(true)),
    product(43, "LIFX A19", OLD_COLOR),
    product(44, "LIFX BR30", OLD_COLOR),
    product(45, "LIFX A19 Night Vision", OLD_COLOR.infrared()),
    product(46, "LIFX BR30 Night Vision", OLD_COLOR.infrared()),
    product(49, "LIFX Mini Color", NEW_COLOR),
    product(50, "LIFX Mini White to Warm", Features::white(1500, 4000)),
    product(51, "LIFX Mini White", Features::white(2700, 2700)),
    product(52, "LIFX GU10", NEW_COLOR),
    product(53, "LIFX GU10", NEW_COLOR),
    product(55, "LIFX Tile", OLD_COLOR.matrix(true)),
    product(57, "LIFX Candle", NEW_COLOR.matrix(false)),
    product(59, "LIFX Mini Color", NEW_COLOR),
    product(60, "LIFX Mini White to Warm", Features::white(1500, 4000)),
    product(61, "LIFX Mini White", Features::white(2700, 2700)),
    product(62, "LIFX A19", NEW_COLOR),
    product(63, "LIFX BR30", NEW_COLOR),
    product(64, "LIFX A19 Night Vision", NEW_COLOR.infrared()),
    product(65, "LIFX BR30 Night Vision", NEW_COLOR.infrared()),
    product(66, "LIFX Mini White", Features::white(2700, 2700)),
    product(68, "LIFX Candle", NEW_COLOR.matrix(false)),
    product(70, "LIFX Switch", Features::switch()),
    product(71, "LIFX Switch", Features::switch()),
    product(81, "LIFX Candle White to Warm", Features::white(2200, 6500)),
    product(82, "LIFX Filament Clear", Features::white(2100, 2100)),
    product(85, "LIFX Filament Amber", Features::white(2000, 2000)),
    product(90, "LIFX Clean", NEW_COLOR.hev()),
    product(91, "LIFX Color", NEW_COLOR),
    product(92, "LIFX Color", NEW_COLOR),
    product(93, "LIFX A19 US", NEW_COLOR),
    product(94, "LIFX BR30", NEW_COLOR),
    product(96, "LIFX Candle White to Warm", Features::white(2200, 6500)),
    product(97, "LIFX A19", NEW_COLOR),
    product(98, "LIFX BR30", NEW_COLOR),
    product(99, "LIFX Clean", NEW_COLOR.hev()),
    product(117, "LIFX Z", NEW_COLOR.multizone(true)),
    product(118, "LIFX Z", NEW_COLOR.multizone(true)),
    product(119, "LIFX Beam", NEW_COLOR.multizone(true)),
    product(120, "LIFX Beam", NEW_COLOR.multizone(true)),
    product(123, "LIFX Color", NEW_COLOR),
    product(124, "LIFX Color", NEW_COLOR),
    product(125, "LIFX White to Warm", NEW_WHITE),
    product(126, "LIFX White to Warm", NEW_WHITE),
];

/// Look up a product by the vendor and product ids from `StateVersion`
pub fn lookup(vendor: u32, product: u32) -> Option<&'static Product> {
    if vendor != VENDOR_LIFX {
        return None;
    }
    PRODUCTS.iter().find(|p| p.id == product)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lookup_known_products() {
        let a19 = lookup(VENDOR_LIFX, 27).unwrap();
        assert_eq!(a19.name, "LIFX A19");
        assert!(a19.features.color);
        assert!(!a19.features.multizone);

        let strip = lookup(VENDOR_LIFX, 32).unwrap();
        assert!(strip.features.multizone);
        assert!(strip.features.extended_multizone);

        let night = lookup(VENDOR_LIFX, 29).unwrap();
        assert!(night.features.infrared);

        let switch = lookup(VENDOR_LIFX, 70).unwrap();
        assert!(switch.features.relays);
        assert!(!switch.features.color);
    }

    #[test]
    fn test_unknown_products() {
        assert_eq!(lookup(VENDOR_LIFX, 9999), None);
        assert_eq!(lookup(2, 27), None);
    }

    #[test]
    fn test_ids_are_unique() {
        for (i, a) in PRODUCTS.iter().enumerate() {
            assert!(
                PRODUCTS[i + 1..].iter().all(|b| b.id != a.id),
                "duplicate product id {}",
                a.id
            );
        }
    }
}

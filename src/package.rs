//! Package records and the random demo-package generator.
//!
//! Generated packages are drawn from a small catalog of courier box sizes with
//! random weight, priority, delivery order, fragility and colors. They exist to
//! exercise the planner; nothing about them is deterministic.

use rand::Rng;
use rand::seq::SliceRandom;
use serde::{Deserialize, Serialize};

/// Delivery priority.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Priority {
    Low,
    Medium,
    High,
}

impl Priority {
    pub const ALL: [Priority; 3] = [Priority::Low, Priority::Medium, Priority::High];
}

/// Handling class.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Fragility {
    Fragile,
    #[serde(rename = "Not Fragile")]
    NotFragile,
}

impl Fragility {
    pub const ALL: [Fragility; 2] = [Fragility::Fragile, Fragility::NotFragile];
}

/// One package as shown on the shelf and sent to the planner.
///
/// Dimensions are meters, weight is kilograms. Colors are `0xRRGGBB`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Package {
    pub id: String,
    pub name: String,
    pub length: f32,
    pub width: f32,
    pub height: f32,
    pub volume: f32,
    pub weight: f32,
    pub priority: Priority,
    pub delivery_order: u32,
    pub fragility: Fragility,
    pub color: u32,
    pub tape_color: u32,
}

impl Package {
    /// Largest of the three dimensions.
    #[inline]
    pub fn max_dimension(&self) -> f32 {
        self.length.max(self.width).max(self.height)
    }
}

/// A catalog box size (l x w x h, meters).
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct BoxSize {
    pub name: &'static str,
    pub length: f32,
    pub width: f32,
    pub height: f32,
}

pub const BOX_CATALOG: [BoxSize; 4] = [
    BoxSize {
        name: "Small",
        length: 0.305,
        width: 0.229,
        height: 0.152,
    },
    BoxSize {
        name: "Medium",
        length: 0.457,
        width: 0.305,
        height: 0.152,
    },
    BoxSize {
        name: "Large",
        length: 0.457,
        width: 0.305,
        height: 0.305,
    },
    BoxSize {
        name: "XL",
        length: 0.559,
        width: 0.356,
        height: 0.356,
    },
];

pub const WEIGHT_RANGE_KG: (f32, f32) = (2.0, 12.0);
pub const DELIVERY_ORDER_RANGE: (u32, u32) = (1, 30);

pub const CARDBOARD_COLOR: u32 = 0xdeb887;
pub const TAPE_PALETTE: [u32; 5] = [0x3b82f6, 0xf87171, 0x22c55e, 0xfacc15, 0xf59e42];

#[inline]
fn round_to(value: f32, decimals: i32) -> f32 {
    let k = 10f32.powi(decimals);
    (value * k).round() / k
}

/// Cardboard tan with a small per-channel jitter.
pub fn cardboard_color<R: Rng + ?Sized>(rng: &mut R) -> u32 {
    let [_, r, g, b] = CARDBOARD_COLOR.to_be_bytes();
    let jitter = |rng: &mut R, base: u8, lo: i32, hi: i32| -> u32 {
        (base as i32 + rng.gen_range(lo..hi)).clamp(0, 255) as u32
    };
    let r = jitter(&mut *rng, r, -6, 6);
    let g = jitter(&mut *rng, g, -10, 10);
    let b = jitter(&mut *rng, b, -10, 10);
    (r << 16) | (g << 8) | b
}

/// One of the fixed tape accent colors.
pub fn tape_color<R: Rng + ?Sized>(rng: &mut R) -> u32 {
    *TAPE_PALETTE.choose(rng).unwrap_or(&TAPE_PALETTE[0])
}

/// Draw one random package from `rng`.
pub fn generate_package<R: Rng + ?Sized>(rng: &mut R) -> Package {
    let size = BOX_CATALOG[rng.gen_range(0..BOX_CATALOG.len())];
    let (w_lo, w_hi) = WEIGHT_RANGE_KG;
    let (o_lo, o_hi) = DELIVERY_ORDER_RANGE;

    Package {
        id: format!("PKG-{}", rng.gen_range(0..10_000)),
        name: size.name.to_string(),
        length: size.length,
        width: size.width,
        height: size.height,
        volume: round_to(size.length * size.width * size.height, 3),
        weight: round_to(rng.gen_range(w_lo..w_hi), 2),
        priority: Priority::ALL[rng.gen_range(0..Priority::ALL.len())],
        delivery_order: rng.gen_range(o_lo..=o_hi),
        fragility: Fragility::ALL[rng.gen_range(0..Fragility::ALL.len())],
        color: cardboard_color(rng),
        tape_color: tape_color(rng),
    }
}

/// [`generate_package`] using the thread-local RNG.
pub fn random_package() -> Package {
    generate_package(&mut rand::thread_rng())
}

#[cfg(test)]
mod tests {
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    use super::*;

    #[test]
    fn generated_packages_are_structurally_valid() {
        let mut rng = StdRng::seed_from_u64(7);
        for _ in 0..2_000 {
            let p = generate_package(&mut rng);
            assert!(p.length > 0.0 && p.width > 0.0 && p.height > 0.0);
            assert!((2.0..=12.0).contains(&p.weight), "weight {}", p.weight);
            assert!((1..=30).contains(&p.delivery_order));
            assert!(Priority::ALL.contains(&p.priority));
            assert!(Fragility::ALL.contains(&p.fragility));
            assert!(p.id.starts_with("PKG-"));
            assert!(TAPE_PALETTE.contains(&p.tape_color));
            assert!(BOX_CATALOG.iter().any(|b| b.name == p.name
                && b.length == p.length
                && b.width == p.width
                && b.height == p.height));
        }
    }

    #[test]
    fn volume_is_rounded_product() {
        let mut rng = StdRng::seed_from_u64(11);
        for _ in 0..100 {
            let p = generate_package(&mut rng);
            assert!((p.volume - p.length * p.width * p.height).abs() <= 0.0005 + 1e-6);
        }
    }

    #[test]
    fn cardboard_jitter_stays_near_tan() {
        let mut rng = StdRng::seed_from_u64(3);
        for _ in 0..500 {
            let [_, r, g, b] = cardboard_color(&mut rng).to_be_bytes();
            assert!((216..=227).contains(&r), "r = {r}");
            assert!((174..=193).contains(&g), "g = {g}");
            assert!((125..=144).contains(&b), "b = {b}");
        }
    }

    #[test]
    fn every_priority_and_fragility_shows_up() {
        let mut rng = StdRng::seed_from_u64(5);
        let samples: Vec<_> = (0..300).map(|_| generate_package(&mut rng)).collect();
        for pr in Priority::ALL {
            assert!(samples.iter().any(|p| p.priority == pr));
        }
        for fr in Fragility::ALL {
            assert!(samples.iter().any(|p| p.fragility == fr));
        }
    }

    #[test]
    fn serializes_with_wire_names() {
        let p = Package {
            id: "PKG-1".into(),
            name: "Small".into(),
            length: 0.305,
            width: 0.229,
            height: 0.152,
            volume: 0.011,
            weight: 4.5,
            priority: Priority::High,
            delivery_order: 3,
            fragility: Fragility::NotFragile,
            color: CARDBOARD_COLOR,
            tape_color: TAPE_PALETTE[1],
        };
        let json = serde_json::to_value(&p).unwrap();
        assert_eq!(json["deliveryOrder"], 3);
        assert_eq!(json["tapeColor"], 0xf87171);
        assert_eq!(json["priority"], "High");
        assert_eq!(json["fragility"], "Not Fragile");
        assert_eq!(json["color"], 0xdeb887);
    }
}

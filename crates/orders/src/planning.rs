//! Load-planning heuristics: totals, vehicle suggestion, stow alerts.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use wareflow_catalog::{Brand, Product};

/// Vehicle classes the fleet is made of.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum VehicleClass {
    Van,
    Pickup,
    #[serde(rename = "TRUCK_3_5T")]
    Truck3_5T,
    Torton,
}

impl VehicleClass {
    /// Usable cargo volume in m³ for efficiency reporting.
    ///
    /// Pickups have no dedicated figure and use the van default.
    pub fn capacity_m3(&self) -> f64 {
        match self {
            VehicleClass::Van => 10.0,
            VehicleClass::Truck3_5T => 20.0,
            VehicleClass::Torton => 40.0,
            VehicleClass::Pickup => 10.0,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            VehicleClass::Van => "VAN",
            VehicleClass::Pickup => "PICKUP",
            VehicleClass::Truck3_5T => "TRUCK_3_5T",
            VehicleClass::Torton => "TORTON",
        }
    }
}

/// Volume-banded suggestion: [0, 10) VAN, [10, 20) TRUCK_3_5T, [20, ∞) TORTON.
pub fn suggest_vehicle(total_volume_m3: f64) -> VehicleClass {
    if total_volume_m3 < 10.0 {
        VehicleClass::Van
    } else if total_volume_m3 < 20.0 {
        VehicleClass::Truck3_5T
    } else {
        VehicleClass::Torton
    }
}

/// Percentage of the vehicle's volume the load fills, capped at 100.
pub fn loading_efficiency(total_volume_m3: f64, class: VehicleClass) -> f64 {
    (total_volume_m3 / class.capacity_m3() * 100.0).min(100.0)
}

/// Stowage warning attached to an order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum LoadingAlert {
    /// Fragile and heavy items travel together.
    StowWarning,
    /// Fragile items only.
    FragileCaution,
}

impl LoadingAlert {
    pub fn from_flags(has_fragile: bool, has_heavy: bool) -> Option<Self> {
        match (has_fragile, has_heavy) {
            (true, true) => Some(LoadingAlert::StowWarning),
            (true, false) => Some(LoadingAlert::FragileCaution),
            _ => None,
        }
    }

    pub fn message(&self) -> &'static str {
        match self {
            LoadingAlert::StowWarning => {
                "WARNING: Take care when stowing. Do not place heavy items on top of fragile ones."
            }
            LoadingAlert::FragileCaution => {
                "CAUTION: The order contains fragile items. Handle with care."
            }
        }
    }
}

impl core::fmt::Display for LoadingAlert {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.message())
    }
}

/// Running totals over the lines of an order.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct LoadPlan {
    pub total_weight_kg: f64,
    pub total_volume_m3: f64,
    /// Smallest currency unit.
    pub total_cost: u64,
    pub has_fragile: bool,
    pub has_heavy: bool,
    pub brands: BTreeSet<Brand>,
}

impl LoadPlan {
    /// Fold one line in. A product counts as heavy when its unit weight
    /// exceeds `heavy_threshold_kg`.
    pub fn add(&mut self, product: &Product, quantity: i64, heavy_threshold_kg: f64) -> u64 {
        let qty = quantity.max(0);
        let subtotal = product.unit_price.saturating_mul(qty as u64);
        self.total_weight_kg += product.weight_kg * qty as f64;
        self.total_volume_m3 += product.volume_m3() * qty as f64;
        self.total_cost = self.total_cost.saturating_add(subtotal);
        self.has_fragile |= product.is_fragile;
        self.has_heavy |= product.is_heavy(heavy_threshold_kg);
        self.brands.insert(product.brand.clone());
        subtotal
    }

    pub fn brands_mixed(&self) -> bool {
        self.brands.len() > 1
    }

    pub fn suggested_vehicle(&self) -> VehicleClass {
        suggest_vehicle(self.total_volume_m3)
    }

    pub fn loading_alert(&self) -> Option<LoadingAlert> {
        LoadingAlert::from_flags(self.has_fragile, self.has_heavy)
    }

    pub fn loading_efficiency(&self) -> f64 {
        loading_efficiency(self.total_volume_m3, self.suggested_vehicle())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use proptest::prelude::*;
    use wareflow_catalog::{Dimensions, NewProduct, ProductId};

    fn product(brand: &str, side_cm: f64, weight_kg: f64, fragile: bool) -> Product {
        Product::register(
            ProductId::generate(),
            NewProduct {
                sku: format!("{brand}-{side_cm}"),
                name: "item".into(),
                brand: Brand::new(brand).unwrap(),
                category: "general".into(),
                barcode: None,
                dimensions: Dimensions::new(side_cm, side_cm, side_cm).unwrap(),
                weight_kg,
                is_fragile: fragile,
                unit_price: 1_000,
            },
            Utc::now(),
        )
        .unwrap()
    }

    #[test]
    fn band_edges() {
        assert_eq!(suggest_vehicle(9.99), VehicleClass::Van);
        assert_eq!(suggest_vehicle(10.0), VehicleClass::Truck3_5T);
        assert_eq!(suggest_vehicle(19.99), VehicleClass::Truck3_5T);
        assert_eq!(suggest_vehicle(20.0), VehicleClass::Torton);
    }

    #[test]
    fn efficiency_is_clamped() {
        assert_eq!(loading_efficiency(500.0, VehicleClass::Torton), 100.0);
        assert!((loading_efficiency(5.0, VehicleClass::Van) - 50.0).abs() < 1e-9);
        assert!((loading_efficiency(5.0, VehicleClass::Pickup) - 50.0).abs() < 1e-9);
    }

    #[test]
    fn alert_follows_flags() {
        assert_eq!(LoadingAlert::from_flags(true, true), Some(LoadingAlert::StowWarning));
        assert_eq!(LoadingAlert::from_flags(true, false), Some(LoadingAlert::FragileCaution));
        assert_eq!(LoadingAlert::from_flags(false, true), None);
        assert_eq!(LoadingAlert::from_flags(false, false), None);
    }

    #[test]
    fn plan_accumulates_lines_and_brands() {
        let mut plan = LoadPlan::default();
        // 100 cm cube = 1 m³
        let crate_a = product("jumex", 100.0, 12.0, false);
        let glass_b = product("la costena", 10.0, 0.5, true);

        assert_eq!(plan.add(&crate_a, 3, 10.0), 3_000);
        plan.add(&glass_b, 10, 10.0);

        assert!((plan.total_volume_m3 - 3.01).abs() < 1e-9);
        assert!((plan.total_weight_kg - 41.0).abs() < 1e-9);
        assert_eq!(plan.total_cost, 13_000);
        assert!(plan.has_heavy && plan.has_fragile);
        assert!(plan.brands_mixed());
        assert_eq!(plan.loading_alert(), Some(LoadingAlert::StowWarning));
        assert_eq!(plan.suggested_vehicle(), VehicleClass::Van);
    }

    #[test]
    fn vehicle_class_uses_wire_names() {
        let json = serde_json::to_string(&VehicleClass::Truck3_5T).unwrap();
        assert_eq!(json, format!("\"{}\"", VehicleClass::Truck3_5T.as_str()));
    }

    proptest! {
        #![proptest_config(ProptestConfig {
            cases: 512,
            ..ProptestConfig::default()
        })]

        /// Property: efficiency always lies in [0, 100].
        #[test]
        fn efficiency_in_range(volume in 0.0f64..10_000.0) {
            let class = suggest_vehicle(volume);
            let eff = loading_efficiency(volume, class);
            prop_assert!((0.0..=100.0).contains(&eff));
        }

        /// Property: the suggested class never shrinks as volume grows.
        #[test]
        fn banding_is_monotonic(a in 0.0f64..100.0, b in 0.0f64..100.0) {
            let rank = |c: VehicleClass| match c {
                VehicleClass::Van | VehicleClass::Pickup => 0,
                VehicleClass::Truck3_5T => 1,
                VehicleClass::Torton => 2,
            };
            let (lo, hi) = if a <= b { (a, b) } else { (b, a) };
            prop_assert!(rank(suggest_vehicle(lo)) <= rank(suggest_vehicle(hi)));
        }
    }
}

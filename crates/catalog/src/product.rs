use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use wareflow_core::{DomainError, DomainResult, Entity, ValueObject};

wareflow_core::typed_id!(
    /// Product identifier.
    ProductId
);

/// Brand a product (or supplier) belongs to.
///
/// Stored upper-cased and trimmed so that `"jumex "` and `"JUMEX"` compare equal.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Brand(String);

impl Brand {
    pub fn new(name: impl AsRef<str>) -> DomainResult<Self> {
        let normalized = name.as_ref().trim().to_uppercase();
        if normalized.is_empty() {
            return Err(DomainError::validation("brand cannot be empty"));
        }
        Ok(Self(normalized))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl core::fmt::Display for Brand {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Physical envelope of one sellable unit, in centimetres.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Dimensions {
    pub length_cm: f64,
    pub width_cm: f64,
    pub height_cm: f64,
}

impl ValueObject for Dimensions {}

impl Dimensions {
    pub fn new(length_cm: f64, width_cm: f64, height_cm: f64) -> DomainResult<Self> {
        for (label, value) in [
            ("length_cm", length_cm),
            ("width_cm", width_cm),
            ("height_cm", height_cm),
        ] {
            if !value.is_finite() || value < 0.0 {
                return Err(DomainError::validation(format!(
                    "{label} must be a non-negative number"
                )));
            }
        }
        Ok(Self {
            length_cm,
            width_cm,
            height_cm,
        })
    }

    /// Volume in cubic metres (L×W×H / 1,000,000).
    pub fn volume_m3(&self) -> f64 {
        (self.length_cm * self.width_cm * self.height_cm) / 1_000_000.0
    }
}

/// Input for registering a product in the catalog.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewProduct {
    pub sku: String,
    pub name: String,
    pub brand: Brand,
    pub category: String,
    pub barcode: Option<String>,
    pub dimensions: Dimensions,
    pub weight_kg: f64,
    pub is_fragile: bool,
    /// Price in smallest currency unit (e.g., cents).
    pub unit_price: u64,
}

/// Catalog product.
///
/// Immutable once referenced by an order line, except for the soft `active`
/// toggle.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Product {
    pub id: ProductId,
    pub sku: String,
    pub name: String,
    pub brand: Brand,
    pub category: String,
    pub barcode: Option<String>,
    pub dimensions: Dimensions,
    pub weight_kg: f64,
    pub is_fragile: bool,
    pub unit_price: u64,
    pub active: bool,
    pub created_at: DateTime<Utc>,
}

impl Product {
    pub fn register(
        id: ProductId,
        input: NewProduct,
        occurred_at: DateTime<Utc>,
    ) -> DomainResult<Self> {
        if input.sku.trim().is_empty() {
            return Err(DomainError::validation("sku cannot be empty"));
        }
        if input.name.trim().is_empty() {
            return Err(DomainError::validation("name cannot be empty"));
        }
        if !input.weight_kg.is_finite() || input.weight_kg < 0.0 {
            return Err(DomainError::validation(
                "weight_kg must be a non-negative number",
            ));
        }
        // serde can build `Dimensions` without going through `new`.
        let dimensions = Dimensions::new(
            input.dimensions.length_cm,
            input.dimensions.width_cm,
            input.dimensions.height_cm,
        )?;

        Ok(Self {
            id,
            sku: input.sku.trim().to_string(),
            name: input.name.trim().to_string(),
            brand: input.brand,
            category: input.category,
            barcode: input.barcode,
            dimensions,
            weight_kg: input.weight_kg,
            is_fragile: input.is_fragile,
            unit_price: input.unit_price,
            active: true,
            created_at: occurred_at,
        })
    }

    pub fn volume_m3(&self) -> f64 {
        self.dimensions.volume_m3()
    }

    /// Units heavier than `threshold_kg` need bottom-row stowage.
    pub fn is_heavy(&self, threshold_kg: f64) -> bool {
        self.weight_kg > threshold_kg
    }

    pub fn deactivate(&mut self) {
        self.active = false;
    }

    pub fn activate(&mut self) {
        self.active = true;
    }
}

impl Entity for Product {
    type Id = ProductId;

    fn id(&self) -> &Self::Id {
        &self.id
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn sample(weight_kg: f64) -> NewProduct {
        NewProduct {
            sku: " JUM-001 ".to_string(),
            name: "Jugo de mango 1L".to_string(),
            brand: Brand::new("jumex").unwrap(),
            category: "bebidas".to_string(),
            barcode: None,
            dimensions: Dimensions::new(50.0, 40.0, 30.0).unwrap(),
            weight_kg,
            is_fragile: false,
            unit_price: 2_450,
        }
    }

    #[test]
    fn volume_is_cubic_centimetres_over_a_million() {
        let dims = Dimensions::new(50.0, 40.0, 30.0).unwrap();
        assert!((dims.volume_m3() - 0.06).abs() < 1e-12);
    }

    #[test]
    fn brand_is_normalized() {
        assert_eq!(Brand::new(" la_costena ").unwrap().as_str(), "LA_COSTENA");
        assert!(Brand::new("   ").is_err());
    }

    #[test]
    fn register_trims_and_activates() {
        let product = Product::register(ProductId::generate(), sample(1.0), Utc::now()).unwrap();
        assert_eq!(product.sku, "JUM-001");
        assert!(product.active);
    }

    #[test]
    fn register_rejects_negative_dimensions() {
        let mut input = sample(1.0);
        input.dimensions.height_cm = -1.0;
        let err = Product::register(ProductId::generate(), input, Utc::now()).unwrap_err();
        assert!(matches!(err, DomainError::Validation(msg) if msg.contains("height_cm")));
    }

    #[test]
    fn heavy_threshold_is_strict() {
        let at_limit = Product::register(ProductId::generate(), sample(10.0), Utc::now()).unwrap();
        let above = Product::register(ProductId::generate(), sample(10.5), Utc::now()).unwrap();
        assert!(!at_limit.is_heavy(10.0));
        assert!(above.is_heavy(10.0));
    }

    proptest! {
        #![proptest_config(ProptestConfig {
            cases: 256,
            ..ProptestConfig::default()
        })]

        /// Property: volume is never negative and doubles with any one side.
        #[test]
        fn volume_scales_linearly(
            l in 0.0f64..500.0,
            w in 0.0f64..500.0,
            h in 0.0f64..500.0,
        ) {
            let single = Dimensions::new(l, w, h).unwrap().volume_m3();
            let doubled = Dimensions::new(l * 2.0, w, h).unwrap().volume_m3();
            prop_assert!(single >= 0.0);
            prop_assert!((doubled - 2.0 * single).abs() <= 1e-9 * doubled.max(1.0));
        }
    }
}

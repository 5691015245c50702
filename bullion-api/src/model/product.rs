//! Product definitions and the in-memory catalog used to resolve them.
//!
//! A product is tradeable only where it carries listing terms; the premium
//! charged on top of spot is part of those terms.

use std::collections::HashMap;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::position::LocationType;
use super::trade::TradeSide;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum MetalType {
    Gold,
    Silver,
    Platinum,
    Palladium,
}

/// How the premium over spot is computed for one listing.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum PremiumRule {
    /// Fixed dollar amount per troy ounce.
    FlatPerOz(Decimal),
    /// Fraction of the spot price, e.g. `0.05` for 5%.
    PercentOfSpot(Decimal),
}

impl PremiumRule {
    /// Premium per troy ounce given the quoted spot price.
    pub fn premium_per_oz(&self, spot_per_oz: Decimal) -> Decimal {
        match self {
            PremiumRule::FlatPerOz(amount) => *amount,
            PremiumRule::PercentOfSpot(fraction) => spot_per_oz * *fraction,
        }
    }
}

/// Terms under which a product trades at one location and side.
///
/// A listing with no premium rule is visible but not priceable; quoting it
/// is a configuration error surfaced by the orchestrator.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ListingTerms {
    pub location: LocationType,
    pub side: TradeSide,
    pub premium: Option<PremiumRule>,
}

/// A physical product the desk deals in (coin, bar, round).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Product {
    pub id: Uuid,
    pub sku: String,
    pub name: String,
    pub metal: MetalType,
    /// Fine weight in troy ounces per unit.
    pub weight_oz: Decimal,
    pub listings: Vec<ListingTerms>,
}

impl Product {
    pub fn listing(&self, location: LocationType, side: TradeSide) -> Option<&ListingTerms> {
        self.listings
            .iter()
            .find(|l| l.location == location && l.side == side)
    }

    pub fn is_tradeable(&self, location: LocationType, side: TradeSide) -> bool {
        self.listing(location, side).is_some()
    }
}

/// In-memory catalog for resolving products by SKU or id.
///
/// Persistence is handled by the runtime; the catalog only answers lookups.
#[derive(Debug, Default)]
pub struct ProductCatalog {
    by_id: HashMap<Uuid, Product>,
    by_sku: HashMap<String, Uuid>,
}

impl ProductCatalog {
    pub fn new(products: Vec<Product>) -> Self {
        let mut catalog = Self::default();
        for product in products {
            catalog.insert(product);
        }
        catalog
    }

    /// Adds or replaces a product.
    pub fn insert(&mut self, product: Product) {
        self.by_sku.insert(product.sku.clone(), product.id);
        self.by_id.insert(product.id, product);
    }

    pub fn by_sku(&self, sku: &str) -> Option<&Product> {
        self.by_sku.get(sku).and_then(|id| self.by_id.get(id))
    }

    pub fn by_id(&self, id: Uuid) -> Option<&Product> {
        self.by_id.get(&id)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Product> {
        self.by_id.values()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn eagle() -> Product {
        Product {
            id: Uuid::new_v4(),
            sku: "AGE-1OZ".into(),
            name: "American Gold Eagle 1oz".into(),
            metal: MetalType::Gold,
            weight_oz: dec!(1),
            listings: vec![
                ListingTerms {
                    location: LocationType::NewYork,
                    side: TradeSide::Buy,
                    premium: Some(PremiumRule::FlatPerOz(dec!(55))),
                },
                ListingTerms {
                    location: LocationType::NewYork,
                    side: TradeSide::Sell,
                    premium: Some(PremiumRule::PercentOfSpot(dec!(0.02))),
                },
            ],
        }
    }

    #[test]
    fn test_premium_rules() {
        assert_eq!(
            PremiumRule::FlatPerOz(dec!(55)).premium_per_oz(dec!(2000)),
            dec!(55)
        );
        assert_eq!(
            PremiumRule::PercentOfSpot(dec!(0.02)).premium_per_oz(dec!(2000)),
            dec!(40.00)
        );
    }

    #[test]
    fn test_catalog_resolution_and_tradability() {
        let product = eagle();
        let id = product.id;
        let catalog = ProductCatalog::new(vec![product]);

        let found = catalog.by_sku("AGE-1OZ").expect("sku resolves");
        assert_eq!(found.id, id);
        assert!(found.is_tradeable(LocationType::NewYork, TradeSide::Buy));
        assert!(!found.is_tradeable(LocationType::London, TradeSide::Buy));
        assert!(catalog.by_sku("UNKNOWN").is_none());
    }
}

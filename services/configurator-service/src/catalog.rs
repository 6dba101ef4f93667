// =============================================================================
// CATALOG MODULE
// =============================================================================
// Read-only access to the product catalog.
//
// - `ProductCatalog` is the query interface the selection engine depends on
// - `CatalogSnapshot` is an immutable in-memory catalog, loaded once per
//   calculation request so the engine always sees one consistent view
// - Row ingestion (`TryFrom<ProductRow>`) parses tags and rejects bad rows
// - `CatalogSearch` drives the public catalog browse endpoint
// =============================================================================

use std::cmp::Ordering;
use std::str::FromStr;

use rust_decimal::Decimal;
use serde::Deserialize;
use thiserror::Error;

use crate::models::{AccessoryKind, Product, ProductCategory, ProductRow, TechnologyTag};

// =============================================================================
// QUERY INTERFACE
// =============================================================================

/// Read-only product lookups.
///
/// Implementations must return `query` results ordered by price ascending,
/// keeping catalog order for equal prices.
pub trait ProductCatalog {
    /// Products of `category` accepted by `filter`, cheapest first.
    fn query(&self, category: ProductCategory, filter: &dyn Fn(&Product) -> bool)
        -> Vec<Product>;

    /// Every product of `category`, in catalog order.
    fn all(&self, category: ProductCategory) -> Vec<Product>;

    /// The cheapest product of `category` accepted by `filter`.
    fn cheapest(
        &self,
        category: ProductCategory,
        filter: &dyn Fn(&Product) -> bool,
    ) -> Option<Product> {
        self.query(category, filter).into_iter().next()
    }
}

// =============================================================================
// CATALOG SNAPSHOT
// =============================================================================

/// Immutable catalog held in memory.
#[derive(Debug, Clone, Default)]
pub struct CatalogSnapshot {
    products: Vec<Product>,
}

impl CatalogSnapshot {
    pub fn new(products: Vec<Product>) -> Self {
        Self { products }
    }

    /// Build a snapshot from raw rows, skipping rows that fail validation.
    pub fn from_rows(rows: Vec<ProductRow>) -> Self {
        let mut products = Vec::with_capacity(rows.len());
        for row in rows {
            let id = row.id;
            match Product::try_from(row) {
                Ok(product) => products.push(product),
                Err(e) => {
                    tracing::warn!(product_id = %id, error = %e, "Skipping invalid catalog row")
                }
            }
        }
        Self { products }
    }

    pub fn products(&self) -> &[Product] {
        &self.products
    }

    pub fn len(&self) -> usize {
        self.products.len()
    }

    pub fn is_empty(&self) -> bool {
        self.products.is_empty()
    }

    /// Filter and sort the catalog for browsing.
    pub fn search(&self, search: &CatalogSearch) -> Vec<Product> {
        let needle = search
            .query
            .as_deref()
            .map(str::trim)
            .filter(|q| !q.is_empty())
            .map(str::to_lowercase);

        let mut found: Vec<Product> = self
            .products
            .iter()
            .filter(|p| search.category.map_or(true, |c| p.category == c))
            .filter(|p| match &needle {
                Some(q) => text_matches(p, q),
                None => true,
            })
            .filter(|p| search.min_price.map_or(true, |min| p.price >= min))
            .filter(|p| search.max_price.map_or(true, |max| p.price <= max))
            .filter(|p| {
                search
                    .min_resolution
                    .map_or(true, |min| p.resolution_mp.is_some_and(|r| r >= min))
            })
            .filter(|p| !search.outdoor_only || p.is_outdoor())
            .cloned()
            .collect();

        match search.sort {
            CatalogSort::NameAsc => found.sort_by(|a, b| a.name.cmp(&b.name)),
            CatalogSort::NameDesc => found.sort_by(|a, b| b.name.cmp(&a.name)),
            CatalogSort::PriceAsc => found.sort_by(|a, b| a.price.cmp(&b.price)),
            CatalogSort::PriceDesc => found.sort_by(|a, b| b.price.cmp(&a.price)),
        }

        found
    }
}

fn text_matches(product: &Product, needle: &str) -> bool {
    let contains = |field: Option<&str>| field.is_some_and(|v| v.to_lowercase().contains(needle));
    contains(Some(product.name.as_str()))
        || contains(product.brand.as_deref())
        || contains(product.model.as_deref())
}

impl ProductCatalog for CatalogSnapshot {
    fn query(
        &self,
        category: ProductCategory,
        filter: &dyn Fn(&Product) -> bool,
    ) -> Vec<Product> {
        let mut matches: Vec<Product> = self
            .products
            .iter()
            .filter(|p| p.category == category && filter(p))
            .cloned()
            .collect();

        // sort_by is stable: equal prices keep catalog order
        matches.sort_by(|a, b| a.price.cmp(&b.price));
        matches
    }

    fn all(&self, category: ProductCategory) -> Vec<Product> {
        self.products
            .iter()
            .filter(|p| p.category == category)
            .cloned()
            .collect()
    }
}

// =============================================================================
// CATALOG BROWSE
// =============================================================================

/// Sort order for catalog browsing
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CatalogSort {
    #[default]
    NameAsc,
    NameDesc,
    PriceAsc,
    PriceDesc,
}

/// Catalog browse filters
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct CatalogSearch {
    pub category: Option<ProductCategory>,
    /// Case-insensitive match on name, brand or model
    pub query: Option<String>,
    pub min_price: Option<Decimal>,
    pub max_price: Option<Decimal>,
    pub min_resolution: Option<u32>,
    pub outdoor_only: bool,
    pub sort: CatalogSort,
}

// =============================================================================
// INGESTION
// =============================================================================

/// Reasons a catalog row is rejected during ingestion.
#[derive(Debug, Error, PartialEq)]
pub enum CatalogError {
    #[error("unknown category '{0}'")]
    UnknownCategory(String),

    #[error("unknown technology tag '{0}'")]
    UnknownTechnology(String),

    #[error("unknown accessory kind '{0}'")]
    UnknownAccessoryKind(String),

    #[error("negative price {0}")]
    NegativePrice(Decimal),

    #[error("attribute {field} must not be negative (got {value})")]
    NegativeAttribute { field: &'static str, value: i64 },

    #[error("accessory kind set on a {0} product")]
    AccessoryKindOnNonAccessory(ProductCategory),
}

fn non_negative(field: &'static str, value: Option<i32>) -> Result<Option<u32>, CatalogError> {
    value
        .map(|v| {
            u32::try_from(v).map_err(|_| CatalogError::NegativeAttribute {
                field,
                value: i64::from(v),
            })
        })
        .transpose()
}

impl TryFrom<ProductRow> for Product {
    type Error = CatalogError;

    fn try_from(row: ProductRow) -> Result<Self, Self::Error> {
        let category = ProductCategory::from_str(row.category.trim())
            .map_err(|_| CatalogError::UnknownCategory(row.category.clone()))?;
        let technology = TechnologyTag::from_str(row.technology.trim())
            .map_err(|_| CatalogError::UnknownTechnology(row.technology.clone()))?;
        let accessory_kind = row
            .accessory_kind
            .as_deref()
            .map(|k| {
                AccessoryKind::from_str(k.trim())
                    .map_err(|_| CatalogError::UnknownAccessoryKind(k.to_string()))
            })
            .transpose()?;

        if accessory_kind.is_some() && category != ProductCategory::Accessory {
            return Err(CatalogError::AccessoryKindOnNonAccessory(category));
        }
        if row.price < Decimal::ZERO {
            return Err(CatalogError::NegativePrice(row.price));
        }
        if let Some(tb) = row.storage_tb {
            if tb < 0.0 {
                return Err(CatalogError::NegativeAttribute {
                    field: "storage_tb",
                    value: tb as i64,
                });
            }
        }

        Ok(Product {
            id: row.id,
            name: row.name,
            brand: row.brand,
            model: row.model,
            category,
            technology,
            price: row.price,
            short_description: row.short_description,
            description: row.description,
            resolution_mp: non_negative("resolution_mp", row.resolution_mp)?,
            ir_range_m: non_negative("ir_range_m", row.ir_range_m)?,
            outdoor: row.outdoor,
            smart_detection: row.smart_detection,
            poe_budget_w: non_negative("poe_budget_w", row.poe_budget_w)?,
            channels: non_negative("channels", row.channels)?,
            max_bandwidth_mbps: non_negative("max_bandwidth_mbps", row.max_bandwidth_mbps)?,
            disk_bays: non_negative("disk_bays", row.disk_bays)?,
            ports: non_negative("ports", row.ports)?,
            storage_tb: row.storage_tb,
            roll_length_m: non_negative("roll_length_m", row.roll_length_m)?,
            ups_va: non_negative("ups_va", row.ups_va)?,
            accessory_kind,
        })
    }
}

/// Total order over optional capacities, `None` lowest.
pub(crate) fn cmp_capacity(a: Option<f64>, b: Option<f64>) -> Ordering {
    a.unwrap_or(0.0)
        .partial_cmp(&b.unwrap_or(0.0))
        .unwrap_or(Ordering::Equal)
}

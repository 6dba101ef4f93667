// =============================================================================
// MODELS MODULE
// =============================================================================
// Data structures shared by the engine, the database layer and the HTTP API:
// - Catalog entities (Product and its classification tags)
// - The questionnaire (ConfiguratorInput)
// - The bill of materials (ConfigurationResult, LineItem)
// - API request/response bodies
// =============================================================================

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use strum::{AsRefStr, Display, EnumString};
use uuid::Uuid;

// =============================================================================
// CATALOG TAGS
// =============================================================================
// Tags are stored as snake_case TEXT in PostgreSQL and parsed with strum when
// rows are ingested into a catalog snapshot (see catalog.rs).

/// Product category in the catalog.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display, EnumString, AsRefStr,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum ProductCategory {
    Camera,
    Recorder,
    Switch,
    Cable,
    Disk,
    Ups,
    Accessory,
}

/// Which camera technology a product is compatible with.
///
/// `Universal` marks items that work with any technology (disks, most
/// monitors, some recorders and cables).
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display, EnumString, AsRefStr,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum TechnologyTag {
    IpPoe,
    Wifi,
    Analog,
    Universal,
}

/// Sub-classification for `ProductCategory::Accessory` items.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display, EnumString, AsRefStr,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum AccessoryKind {
    /// Junction boxes, brackets, adapters (one per camera)
    Mount,
    /// Dedicated CCTV monitor
    Monitor,
    /// Television used as a display over HDMI
    Tv,
    /// Generic screen, acceptable for either display method
    Screen,
    /// Cable trays for surface installation (sold per meter)
    Tray,
    /// Screws and wall plugs (sold per pack)
    Fixings,
}

// =============================================================================
// PRODUCT
// =============================================================================
// A validated catalog entry. The engine only ever sees this type; raw database
// rows go through `ProductRow` -> `Product` conversion first.
// -----------------------------------------------------------------------------
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Product {
    pub id: Uuid,
    pub name: String,
    pub brand: Option<String>,
    pub model: Option<String>,
    pub category: ProductCategory,
    pub technology: TechnologyTag,

    /// Unit price (PLN)
    pub price: Decimal,

    pub short_description: Option<String>,
    pub description: Option<String>,

    // ----- Camera attributes -----
    pub resolution_mp: Option<u32>,
    pub ir_range_m: Option<u32>,
    pub outdoor: Option<bool>,
    /// Camera supports AI / smart detection (people, vehicles)
    #[serde(default)]
    pub smart_detection: bool,

    /// Camera: power draw. Switch: total PoE budget.
    pub poe_budget_w: Option<u32>,

    // ----- Recorder attributes -----
    pub channels: Option<u32>,
    pub max_bandwidth_mbps: Option<u32>,
    pub disk_bays: Option<u32>,

    // ----- Switch attributes -----
    pub ports: Option<u32>,

    // ----- Disk / cable / UPS attributes -----
    pub storage_tb: Option<f64>,
    pub roll_length_m: Option<u32>,
    pub ups_va: Option<u32>,

    pub accessory_kind: Option<AccessoryKind>,
}

impl Product {
    /// Create a product with only the mandatory fields set.
    ///
    /// Technical attributes can be filled in with struct update syntax:
    /// ```ignore
    /// let disk = Product {
    ///     storage_tb: Some(4.0),
    ///     ..Product::new("WD Purple 4TB", ProductCategory::Disk, TechnologyTag::Universal, price)
    /// };
    /// ```
    pub fn new(
        name: impl Into<String>,
        category: ProductCategory,
        technology: TechnologyTag,
        price: Decimal,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            name: name.into(),
            brand: None,
            model: None,
            category,
            technology,
            price,
            short_description: None,
            description: None,
            resolution_mp: None,
            ir_range_m: None,
            outdoor: None,
            smart_detection: false,
            poe_budget_w: None,
            channels: None,
            max_bandwidth_mbps: None,
            disk_bays: None,
            ports: None,
            storage_tb: None,
            roll_length_m: None,
            ups_va: None,
            accessory_kind: None,
        }
    }

    pub fn is_outdoor(&self) -> bool {
        self.outdoor == Some(true)
    }
}

// -----------------------------------------------------------------------------
// PRODUCT ROW
// -----------------------------------------------------------------------------
/// Raw `products` table row, before tag parsing and attribute validation.
#[derive(Debug, Clone, FromRow)]
pub struct ProductRow {
    pub id: Uuid,
    pub name: String,
    pub brand: Option<String>,
    pub model: Option<String>,
    pub category: String,
    pub technology: String,
    pub price: Decimal,
    pub short_description: Option<String>,
    pub description: Option<String>,
    pub resolution_mp: Option<i32>,
    pub ir_range_m: Option<i32>,
    pub outdoor: Option<bool>,
    pub smart_detection: bool,
    pub poe_budget_w: Option<i32>,
    pub channels: Option<i32>,
    pub max_bandwidth_mbps: Option<i32>,
    pub disk_bays: Option<i32>,
    pub ports: Option<i32>,
    pub storage_tb: Option<f64>,
    pub roll_length_m: Option<i32>,
    pub ups_va: Option<i32>,
    pub accessory_kind: Option<String>,
}

// =============================================================================
// QUESTIONNAIRE
// =============================================================================

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BuildingType {
    #[default]
    Home,
    Office,
    Warehouse,
    Parking,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InstallationType {
    /// Cables run in trays on the wall
    #[default]
    Surface,
    /// Cables hidden in the wall
    Flush,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CameraTechnology {
    #[default]
    IpPoe,
    Wifi,
    Analog,
}

impl CameraTechnology {
    /// The catalog tag a product must carry to match this technology.
    pub fn tag(self) -> TechnologyTag {
        match self {
            CameraTechnology::IpPoe => TechnologyTag::IpPoe,
            CameraTechnology::Wifi => TechnologyTag::Wifi,
            CameraTechnology::Analog => TechnologyTag::Analog,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DetectionType {
    /// Plain motion detection
    #[default]
    Basic,
    /// People / vehicle classification
    Ai,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DisplayType {
    #[default]
    AppOnly,
    Monitor,
    Tv,
}

// -----------------------------------------------------------------------------
// CONFIGURATOR INPUT
// -----------------------------------------------------------------------------
/// Questionnaire answers for one calculation.
///
/// Missing JSON fields fall back to the questionnaire defaults, so a client
/// can post only the answers the user changed.
///
/// # Example JSON
/// ```json
/// {
///   "building": "office",
///   "tech": "ip_poe",
///   "outdoor_cam_count": 4,
///   "indoor_cam_count": 2,
///   "recording_days": 30,
///   "need_ups": true
/// }
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ConfiguratorInput {
    pub building: BuildingType,
    /// Floor area in square meters
    pub area_m2: f64,
    pub install_type: InstallationType,
    pub tech: CameraTechnology,
    pub outdoor_cam_count: u32,
    pub indoor_cam_count: u32,
    /// Minimum acceptable camera resolution
    pub resolution_mp: u32,
    /// Minimum acceptable IR range
    pub night_vision_m: u32,
    pub detection: DetectionType,
    /// Retention window for storage sizing
    pub recording_days: u32,
    pub display_method: DisplayType,
    pub need_cabling: bool,
    pub need_ups: bool,
    pub need_assembly: bool,
    pub ups_runtime_minutes: u32,
    /// Overrides the estimated cable length when set and positive
    pub custom_cable_meters: Option<u32>,
}

impl Default for ConfiguratorInput {
    fn default() -> Self {
        Self {
            building: BuildingType::Home,
            area_m2: 150.0,
            install_type: InstallationType::Surface,
            tech: CameraTechnology::IpPoe,
            outdoor_cam_count: 4,
            indoor_cam_count: 2,
            resolution_mp: 4,
            night_vision_m: 30,
            detection: DetectionType::Basic,
            recording_days: 14,
            display_method: DisplayType::AppOnly,
            need_cabling: true,
            need_ups: false,
            need_assembly: false,
            ups_runtime_minutes: 15,
            custom_cable_meters: None,
        }
    }
}

impl ConfiguratorInput {
    pub fn total_cameras(&self) -> u32 {
        self.outdoor_cam_count.saturating_add(self.indoor_cam_count)
    }
}

// =============================================================================
// CONFIGURATION RESULT
// =============================================================================

/// Bill-of-materials line categories, in quote order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Display, AsRefStr)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum LineKind {
    OutdoorCamera,
    IndoorCamera,
    Recorder,
    Disk,
    Switch,
    Cable,
    Mount,
    Fixings,
    Tray,
    Monitor,
    Ups,
}

impl LineKind {
    /// Human-readable label used in quotes
    pub fn title(self) -> &'static str {
        match self {
            LineKind::OutdoorCamera => "Outdoor camera",
            LineKind::IndoorCamera => "Indoor camera",
            LineKind::Recorder => "Recorder",
            LineKind::Disk => "Hard disk",
            LineKind::Switch => "PoE switch",
            LineKind::Cable => "Cable",
            LineKind::Mount => "Mounting box",
            LineKind::Fixings => "Screws and plugs",
            LineKind::Tray => "Cable tray (m)",
            LineKind::Monitor => "Display",
            LineKind::Ups => "UPS",
        }
    }
}

// -----------------------------------------------------------------------------
// LINE ITEM
// -----------------------------------------------------------------------------
/// One selected product and how many units of it the configuration needs.
///
/// The constructors keep product and quantity together: a line has both a
/// product and a positive quantity, or neither.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LineItem {
    pub product: Option<Product>,
    pub quantity: u32,
}

impl LineItem {
    pub fn empty() -> Self {
        Self::default()
    }

    /// Attach a product; an absent product or a zero quantity yields an
    /// empty line.
    pub fn select(product: Option<Product>, quantity: u32) -> Self {
        match product {
            Some(product) if quantity > 0 => Self {
                product: Some(product),
                quantity,
            },
            _ => Self::empty(),
        }
    }

    pub fn is_selected(&self) -> bool {
        self.product.is_some() && self.quantity > 0
    }

    pub fn unit_price(&self) -> Decimal {
        self.product
            .as_ref()
            .map(|p| p.price)
            .unwrap_or(Decimal::ZERO)
    }

    pub fn subtotal(&self) -> Decimal {
        self.unit_price() * Decimal::from(self.quantity)
    }
}

// -----------------------------------------------------------------------------
// RESULT ACCUMULATOR
// -----------------------------------------------------------------------------
/// The engine's output: selected products, quantities and derived metrics.
///
/// Built fresh for every calculation and only ever persisted as JSON. The
/// input is echoed so a saved result can re-populate the questionnaire.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConfigurationResult {
    pub input: ConfiguratorInput,

    pub outdoor_camera: LineItem,
    pub indoor_camera: LineItem,
    pub recorder: LineItem,
    pub disk: LineItem,
    pub switch: LineItem,
    pub cable: LineItem,
    pub mount: LineItem,
    pub fixings: LineItem,
    pub tray: LineItem,
    pub monitor: LineItem,
    pub ups: LineItem,

    pub assembly_cost: Decimal,

    pub estimated_bandwidth_mbps: f64,
    pub estimated_storage_tb: f64,
    pub estimated_power_w: u32,
    pub estimated_cable_meters: u32,
}

impl ConfigurationResult {
    pub fn new(input: ConfiguratorInput) -> Self {
        Self {
            input,
            outdoor_camera: LineItem::empty(),
            indoor_camera: LineItem::empty(),
            recorder: LineItem::empty(),
            disk: LineItem::empty(),
            switch: LineItem::empty(),
            cable: LineItem::empty(),
            mount: LineItem::empty(),
            fixings: LineItem::empty(),
            tray: LineItem::empty(),
            monitor: LineItem::empty(),
            ups: LineItem::empty(),
            assembly_cost: Decimal::ZERO,
            estimated_bandwidth_mbps: 0.0,
            estimated_storage_tb: 0.0,
            estimated_power_w: 0,
            estimated_cable_meters: 0,
        }
    }

    /// All line items in quote order, including empty ones.
    pub fn line_items(&self) -> [(LineKind, &LineItem); 11] {
        [
            (LineKind::OutdoorCamera, &self.outdoor_camera),
            (LineKind::IndoorCamera, &self.indoor_camera),
            (LineKind::Recorder, &self.recorder),
            (LineKind::Disk, &self.disk),
            (LineKind::Switch, &self.switch),
            (LineKind::Cable, &self.cable),
            (LineKind::Mount, &self.mount),
            (LineKind::Fixings, &self.fixings),
            (LineKind::Tray, &self.tray),
            (LineKind::Monitor, &self.monitor),
            (LineKind::Ups, &self.ups),
        ]
    }

    /// Whether the questionnaire asks for this line at all.
    pub fn is_requested(&self, kind: LineKind) -> bool {
        let input = &self.input;
        match kind {
            LineKind::OutdoorCamera => input.outdoor_cam_count > 0,
            LineKind::IndoorCamera => input.indoor_cam_count > 0,
            LineKind::Recorder | LineKind::Disk | LineKind::Mount | LineKind::Fixings => true,
            LineKind::Switch => input.tech == CameraTechnology::IpPoe,
            LineKind::Cable => input.need_cabling && self.estimated_cable_meters > 0,
            LineKind::Tray => {
                input.install_type == InstallationType::Surface && self.estimated_cable_meters > 0
            }
            LineKind::Monitor => input.display_method != DisplayType::AppOnly,
            LineKind::Ups => input.need_ups,
        }
    }

    /// Requested lines the catalog could not fill.
    pub fn unmatched_lines(&self) -> Vec<LineKind> {
        self.line_items()
            .into_iter()
            .filter(|(kind, line)| line.product.is_none() && self.is_requested(*kind))
            .map(|(kind, _)| kind)
            .collect()
    }

    /// Sum of price x quantity over all lines plus assembly cost.
    pub fn total_price(&self) -> Decimal {
        self.line_items()
            .iter()
            .map(|(_, line)| line.subtotal())
            .sum::<Decimal>()
            + self.assembly_cost
    }
}

// =============================================================================
// ORDER CONVERSION
// =============================================================================

/// A priced order line derived from a configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrderLine {
    pub product_id: Uuid,
    pub name: String,
    pub quantity: u32,
    pub unit_price: Decimal,
    pub line_total: Decimal,
}

/// Order draft handed to the order-management side.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrderDraft {
    pub configuration_id: Uuid,
    pub lines: Vec<OrderLine>,
    pub assembly_cost: Decimal,
    pub total_amount: Decimal,
}

// =============================================================================
// API REQUEST/RESPONSE STRUCTURES
// =============================================================================

/// Response for `POST /api/v1/configurator/calculate`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CalculationResponse {
    /// Present when the result was persisted
    pub configuration_id: Option<Uuid>,
    pub total_price: Decimal,
    pub result: ConfigurationResult,
}

/// A persisted configuration document
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SavedConfiguration {
    pub id: Uuid,
    pub created_at: DateTime<Utc>,
    pub total_price: Decimal,
    pub result: ConfigurationResult,
}

/// Row of the saved configuration listing
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct ConfigurationSummary {
    pub id: Uuid,
    pub created_at: DateTime<Utc>,
    pub total_cameras: i32,
    pub total_price: Decimal,
}

/// Product list with pagination metadata
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProductListResponse {
    pub items: Vec<Product>,
    pub total: usize,
    pub page: usize,
    pub per_page: usize,
}

// =============================================================================
// HEALTH CHECK RESPONSES
// =============================================================================

/// Simple health check response
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub service: String,
    pub version: String,
}

/// Detailed readiness check response
#[derive(Debug, Serialize)]
pub struct ReadinessResponse {
    pub status: String,
    pub checks: ReadinessChecks,
}

/// Individual dependency health checks
#[derive(Debug, Serialize)]
pub struct ReadinessChecks {
    pub database: bool,
    pub redis: bool,
}

// =============================================================================
// ERROR RESPONSES
// =============================================================================

/// API error response body
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    /// Error type/code
    pub error: String,

    /// Human-readable error message
    pub message: String,

    /// Optional additional details
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<String>,
}

impl ErrorResponse {
    pub fn new(error: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            error: error.into(),
            message: message.into(),
            details: None,
        }
    }

    pub fn with_details(
        error: impl Into<String>,
        message: impl Into<String>,
        details: impl Into<String>,
    ) -> Self {
        Self {
            error: error.into(),
            message: message.into(),
            details: Some(details.into()),
        }
    }
}

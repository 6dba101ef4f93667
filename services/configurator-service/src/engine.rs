// =============================================================================
// SELECTION ENGINE
// =============================================================================
// Maps a questionnaire (ConfiguratorInput) onto a priced bill of materials.
//
// The engine is a synchronous pure function over three inputs:
// - the questionnaire answers
// - a read-only product catalog (one consistent snapshot per call)
// - EngineSettings (fallback wattages, labor rates, UPS policy)
//
// STEPS (in order):
//  1. Cameras (outdoor / indoor)       8. Cabling
//  2. Bandwidth estimate               9. Mounts + fixings
//  3. Power budget (PoE only)         10. Display
//  4. Storage estimate                11. UPS
//  5. Recorder                        12. Assembly cost
//  6. Disks                           13. Cable trays (surface install)
//  7. PoE switch
//
// A step that finds no matching product leaves its line empty. The only hard
// failure is an input without cameras, reported before any catalog access.
// =============================================================================

use rust_decimal::Decimal;
use strum::{Display, EnumString};

use crate::catalog::{cmp_capacity, ProductCatalog};
use crate::error::ValidationError;
use crate::models::{
    AccessoryKind, BuildingType, CameraTechnology, ConfigurationResult, ConfiguratorInput,
    DetectionType, DisplayType, InstallationType, LineItem, LineKind, Product, ProductCategory,
    TechnologyTag,
};

// =============================================================================
// CONSTANTS
// =============================================================================

/// Stream bitrate per camera for each megapixel of resolution
const BITRATE_MBPS_PER_MP: f64 = 1.5;

/// Share of the day recorded regardless of motion
const BASELINE_RECORDING_SHARE: f64 = 0.3;

/// Share of the day with recording-worthy motion
const WAREHOUSE_MOTION_FACTOR: f64 = 0.2;
const DEFAULT_MOTION_FACTOR: f64 = 0.45;

const SECONDS_PER_DAY: f64 = 86_400.0;

/// Cable roll length assumed when a cable has none recorded
const DEFAULT_ROLL_LENGTH_M: u32 = 100;

/// Perimeter heuristic: meters of cable per camera per sqrt(m²) of floor
const CABLE_METERS_PER_SIDE: f64 = 2.0;

const SCREWS_PER_CAMERA: u32 = 4;
const SCREWS_PER_PACK: u32 = 50;

/// UPS power factor used by the runtime-scaled sizing policy
const UPS_POWER_FACTOR: f64 = 0.6;

// =============================================================================
// SETTINGS
// =============================================================================

/// How the UPS is sized against the estimated load.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Display, EnumString)]
#[strum(serialize_all = "kebab-case")]
pub enum UpsSizingPolicy {
    /// Cheapest UPS whose VA rating is strictly above the load in watts
    #[default]
    FixedMargin,
    /// VA target scaled by power factor and requested runtime
    RuntimeScaled,
}

/// Tunable constants of the engine.
///
/// Loaded from the environment by `Config` (see config.rs); tests build
/// their own values.
#[derive(Debug, Clone, PartialEq)]
pub struct EngineSettings {
    /// Assumed draw of an outdoor camera without a recorded wattage
    pub default_outdoor_camera_w: u32,
    /// Assumed draw of an indoor camera without a recorded wattage
    pub default_indoor_camera_w: u32,
    /// Fixed recorder load added when sizing the UPS
    pub recorder_overhead_w: u32,
    /// Assembly labor per camera
    pub assembly_labor_rate: Decimal,
    /// Assembly call-out fee
    pub assembly_base_fee: Decimal,
    /// Extra assembly charge for flush (in-wall) installation
    pub flush_install_surcharge: Decimal,
    pub ups_sizing: UpsSizingPolicy,
}

impl Default for EngineSettings {
    fn default() -> Self {
        Self {
            default_outdoor_camera_w: 10,
            default_indoor_camera_w: 5,
            recorder_overhead_w: 40,
            assembly_labor_rate: Decimal::from(250),
            assembly_base_fee: Decimal::from(300),
            flush_install_surcharge: Decimal::from(500),
            ups_sizing: UpsSizingPolicy::FixedMargin,
        }
    }
}

// =============================================================================
// ENTRY POINT
// =============================================================================

/// Run a full calculation.
///
/// # Errors
/// `ValidationError::NoCameras` when the questionnaire asks for no cameras.
/// The catalog is not touched in that case.
pub fn calculate<C>(
    input: &ConfiguratorInput,
    catalog: &C,
    settings: &EngineSettings,
) -> Result<ConfigurationResult, ValidationError>
where
    C: ProductCatalog + ?Sized,
{
    validate(input)?;
    let total = input.total_cameras();

    let mut result = ConfigurationResult::new(input.clone());

    // 1. Cameras
    let (outdoor, indoor) = select_cameras(input, catalog);
    result.outdoor_camera = outdoor;
    result.indoor_camera = indoor;

    // 2-4. Derived quantities
    let bitrate = bitrate_per_camera(input.resolution_mp);
    result.estimated_bandwidth_mbps = round2(bitrate * f64::from(total));
    result.estimated_power_w = estimate_power_w(input, &result, settings);
    result.estimated_storage_tb = estimate_storage_tb(input, bitrate);
    result.estimated_cable_meters = cable_meters(input);

    // 5. Recorder
    result.recorder = select_recorder(input, catalog, result.estimated_bandwidth_mbps);

    // 6. Disks
    result.disk = select_disk(
        catalog,
        result.estimated_storage_tb,
        result.recorder.product.as_ref(),
    );

    // 7. Switch
    if input.tech == CameraTechnology::IpPoe {
        result.switch = select_switch(catalog, total, result.estimated_power_w);
    }

    // 8. Cabling
    if input.need_cabling {
        result.cable = select_cable(input.tech, catalog, result.estimated_cable_meters);
    }

    // 9. Mounts and fixings
    result.mount = LineItem::select(
        pick(LineKind::Mount, accessory(catalog, &[AccessoryKind::Mount])),
        total,
    );
    result.fixings = LineItem::select(
        pick(LineKind::Fixings, accessory(catalog, &[AccessoryKind::Fixings])),
        total.saturating_mul(SCREWS_PER_CAMERA).div_ceil(SCREWS_PER_PACK),
    );

    // 10. Display
    if let Some(kinds) = display_kinds(input.display_method) {
        result.monitor = LineItem::select(pick(LineKind::Monitor, accessory(catalog, kinds)), 1);
    }

    // 11. UPS
    if input.need_ups {
        result.ups = select_ups(input, catalog, result.estimated_power_w, settings);
    }

    // 12. Assembly
    if input.need_assembly {
        result.assembly_cost = assembly_cost(input, settings);
    }

    // 13. Cable trays
    if input.install_type == InstallationType::Surface {
        result.tray = LineItem::select(
            pick(LineKind::Tray, accessory(catalog, &[AccessoryKind::Tray])),
            result.estimated_cable_meters,
        );
    }

    tracing::debug!(
        total_cameras = total,
        bandwidth_mbps = result.estimated_bandwidth_mbps,
        storage_tb = result.estimated_storage_tb,
        power_w = result.estimated_power_w,
        total_price = %result.total_price(),
        "Configuration calculated"
    );

    Ok(result)
}

/// Reject questionnaires the engine cannot compute.
///
/// Needs no catalog, so callers can run it before loading one.
pub fn validate(input: &ConfiguratorInput) -> Result<(), ValidationError> {
    if input.total_cameras() == 0 {
        return Err(ValidationError::NoCameras);
    }
    Ok(())
}

// =============================================================================
// SELECTION STEPS
// =============================================================================

/// Log a missing match and pass the selection through.
fn pick(line: LineKind, product: Option<Product>) -> Option<Product> {
    if product.is_none() {
        tracing::debug!(line = %line, "No catalog product matches");
    }
    product
}

fn select_cameras<C: ProductCatalog + ?Sized>(
    input: &ConfiguratorInput,
    catalog: &C,
) -> (LineItem, LineItem) {
    let tag = input.tech.tag();
    let eligible = |p: &Product| {
        p.technology == tag
            && p.resolution_mp.is_some_and(|r| r >= input.resolution_mp)
            && p.ir_range_m.map_or(true, |ir| ir >= input.night_vision_m)
            && (input.detection != DetectionType::Ai || p.smart_detection)
    };

    let outdoor = if input.outdoor_cam_count > 0 {
        let camera = catalog.cheapest(ProductCategory::Camera, &|p| eligible(p) && p.is_outdoor());
        LineItem::select(pick(LineKind::OutdoorCamera, camera), input.outdoor_cam_count)
    } else {
        LineItem::empty()
    };

    // Outdoor-rated cameras are fine indoors too
    let indoor = if input.indoor_cam_count > 0 {
        let camera = catalog.cheapest(ProductCategory::Camera, &eligible);
        LineItem::select(pick(LineKind::IndoorCamera, camera), input.indoor_cam_count)
    } else {
        LineItem::empty()
    };

    (outdoor, indoor)
}

fn select_recorder<C: ProductCatalog + ?Sized>(
    input: &ConfiguratorInput,
    catalog: &C,
    bandwidth_mbps: f64,
) -> LineItem {
    let tag = input.tech.tag();
    let total = input.total_cameras();
    let analog = input.tech == CameraTechnology::Analog;

    let recorder = catalog.cheapest(ProductCategory::Recorder, &|p| {
        (p.technology == tag || p.technology == TechnologyTag::Universal)
            && p.channels.is_some_and(|c| c >= total)
            && (analog || p.max_bandwidth_mbps.is_some_and(|b| f64::from(b) >= bandwidth_mbps))
    });

    LineItem::select(pick(LineKind::Recorder, recorder), 1)
}

/// Perfect fit first; otherwise as many of the largest disk as the recorder
/// has bays for.
fn select_disk<C: ProductCatalog + ?Sized>(
    catalog: &C,
    storage_tb: f64,
    recorder: Option<&Product>,
) -> LineItem {
    let perfect_fit = catalog.cheapest(ProductCategory::Disk, &|p| {
        p.technology == TechnologyTag::Universal && p.storage_tb.is_some_and(|c| c >= storage_tb)
    });
    if let Some(disk) = perfect_fit {
        return LineItem::select(Some(disk), 1);
    }

    // First of the largest in catalog order
    let largest = catalog
        .all(ProductCategory::Disk)
        .into_iter()
        .filter(|p| p.technology == TechnologyTag::Universal && p.storage_tb.is_some_and(|c| c > 0.0))
        .reduce(|best, p| {
            if cmp_capacity(p.storage_tb, best.storage_tb).is_gt() {
                p
            } else {
                best
            }
        });

    let Some(disk) = pick(LineKind::Disk, largest) else {
        return LineItem::empty();
    };

    let capacity = disk.storage_tb.unwrap_or(1.0);
    let needed = (storage_tb / capacity).ceil() as u32;
    let bays = recorder
        .and_then(|r| r.disk_bays)
        .filter(|b| *b > 0)
        .unwrap_or(1);

    LineItem::select(Some(disk), needed.min(bays))
}

fn select_switch<C: ProductCatalog + ?Sized>(catalog: &C, total: u32, power_w: u32) -> LineItem {
    let switch = catalog.cheapest(ProductCategory::Switch, &|p| {
        p.ports.is_some_and(|ports| ports >= total)
            && p.poe_budget_w.is_some_and(|budget| budget >= power_w)
    });
    LineItem::select(pick(LineKind::Switch, switch), 1)
}

fn select_cable<C: ProductCatalog + ?Sized>(
    tech: CameraTechnology,
    catalog: &C,
    meters: u32,
) -> LineItem {
    let tag = tech.tag();
    let cable = catalog.cheapest(ProductCategory::Cable, &|p| {
        p.technology == tag || p.technology == TechnologyTag::Universal
    });

    let Some(cable) = pick(LineKind::Cable, cable) else {
        return LineItem::empty();
    };
    let roll = cable
        .roll_length_m
        .filter(|r| *r > 0)
        .unwrap_or(DEFAULT_ROLL_LENGTH_M);

    LineItem::select(Some(cable), meters.div_ceil(roll))
}

fn accessory<C: ProductCatalog + ?Sized>(catalog: &C, kinds: &[AccessoryKind]) -> Option<Product> {
    catalog.cheapest(ProductCategory::Accessory, &|p| {
        p.accessory_kind.is_some_and(|k| kinds.contains(&k))
    })
}

const MONITOR_KINDS: &[AccessoryKind] = &[AccessoryKind::Monitor, AccessoryKind::Screen];
const TV_KINDS: &[AccessoryKind] = &[AccessoryKind::Tv, AccessoryKind::Screen];

fn display_kinds(method: DisplayType) -> Option<&'static [AccessoryKind]> {
    match method {
        DisplayType::AppOnly => None,
        DisplayType::Monitor => Some(MONITOR_KINDS),
        DisplayType::Tv => Some(TV_KINDS),
    }
}

fn select_ups<C: ProductCatalog + ?Sized>(
    input: &ConfiguratorInput,
    catalog: &C,
    power_w: u32,
    settings: &EngineSettings,
) -> LineItem {
    let load_w = power_w.saturating_add(settings.recorder_overhead_w);

    let ups = match settings.ups_sizing {
        UpsSizingPolicy::FixedMargin => {
            catalog.cheapest(ProductCategory::Ups, &|p| p.ups_va.is_some_and(|va| va > load_w))
        }
        UpsSizingPolicy::RuntimeScaled => {
            let needed_va = runtime_scaled_va(load_w, input.ups_runtime_minutes);
            catalog.cheapest(ProductCategory::Ups, &|p| {
                p.ups_va.is_some_and(|va| va >= needed_va)
            })
        }
    };

    LineItem::select(pick(LineKind::Ups, ups), 1)
}

// =============================================================================
// DERIVED QUANTITIES
// =============================================================================

fn bitrate_per_camera(resolution_mp: u32) -> f64 {
    f64::from(resolution_mp) * BITRATE_MBPS_PER_MP
}

/// PoE draw of all cameras; zero for non-PoE technologies.
fn estimate_power_w(
    input: &ConfiguratorInput,
    result: &ConfigurationResult,
    settings: &EngineSettings,
) -> u32 {
    if input.tech != CameraTechnology::IpPoe {
        return 0;
    }

    let outdoor_w = camera_watts(&result.outdoor_camera, settings.default_outdoor_camera_w);
    let indoor_w = camera_watts(&result.indoor_camera, settings.default_indoor_camera_w);

    input
        .outdoor_cam_count
        .saturating_mul(outdoor_w)
        .saturating_add(input.indoor_cam_count.saturating_mul(indoor_w))
}

fn camera_watts(line: &LineItem, fallback: u32) -> u32 {
    line.product
        .as_ref()
        .and_then(|p| p.poe_budget_w)
        .unwrap_or(fallback)
}

fn estimate_storage_tb(input: &ConfiguratorInput, bitrate_mbps: f64) -> f64 {
    let daily_gb = (bitrate_mbps / 8.0) * SECONDS_PER_DAY / 1024.0;
    let motion_factor = match input.building {
        BuildingType::Warehouse => WAREHOUSE_MOTION_FACTOR,
        _ => DEFAULT_MOTION_FACTOR,
    };
    let effective_daily_gb = daily_gb * (BASELINE_RECORDING_SHARE + motion_factor);

    round2(
        effective_daily_gb * f64::from(input.recording_days) * f64::from(input.total_cameras())
            / 1024.0,
    )
}

/// User-supplied length when positive, otherwise the perimeter estimate.
fn cable_meters(input: &ConfiguratorInput) -> u32 {
    if let Some(meters) = input.custom_cable_meters.filter(|m| *m > 0) {
        return meters;
    }
    let side = input.area_m2.max(0.0).sqrt();
    (side * CABLE_METERS_PER_SIDE * f64::from(input.total_cameras())).ceil() as u32
}

fn runtime_scaled_va(load_w: u32, runtime_minutes: u32) -> u32 {
    let time_factor = if runtime_minutes <= 15 {
        1.5
    } else {
        f64::from(runtime_minutes) / 10.0
    };
    ((f64::from(load_w) / UPS_POWER_FACTOR) * time_factor) as u32
}

fn assembly_cost(input: &ConfiguratorInput, settings: &EngineSettings) -> Decimal {
    let surcharge = match input.install_type {
        InstallationType::Flush => settings.flush_install_surcharge,
        InstallationType::Surface => Decimal::ZERO,
    };
    Decimal::from(input.total_cameras()) * settings.assembly_labor_rate
        + settings.assembly_base_fee
        + surcharge
}

/// Round to two decimals, ties to even.
fn round2(value: f64) -> f64 {
    (value * 100.0).round_ties_even() / 100.0
}

// =============================================================================
// TESTS
// =============================================================================
#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::CatalogSnapshot;
    use proptest::prelude::*;
    use std::cell::Cell;

    // -------------------------------------------------------------------------
    // FIXTURES
    // -------------------------------------------------------------------------

    fn product(name: &str, category: ProductCategory, tech: TechnologyTag, price: i64) -> Product {
        Product::new(name, category, tech, Decimal::from(price))
    }

    fn ip_camera(name: &str, price: i64, mp: u32, outdoor: bool) -> Product {
        Product {
            resolution_mp: Some(mp),
            ir_range_m: Some(30),
            outdoor: Some(outdoor),
            poe_budget_w: Some(6),
            ..product(name, ProductCategory::Camera, TechnologyTag::IpPoe, price)
        }
    }

    fn nvr(name: &str, price: i64, channels: u32, bandwidth: u32, bays: u32) -> Product {
        Product {
            channels: Some(channels),
            max_bandwidth_mbps: Some(bandwidth),
            disk_bays: Some(bays),
            ..product(name, ProductCategory::Recorder, TechnologyTag::IpPoe, price)
        }
    }

    fn disk(tb: f64, price: i64) -> Product {
        Product {
            storage_tb: Some(tb),
            ..product(
                &format!("Disk {tb}TB"),
                ProductCategory::Disk,
                TechnologyTag::Universal,
                price,
            )
        }
    }

    fn kit(name: &str, kind: AccessoryKind, price: i64) -> Product {
        Product {
            accessory_kind: Some(kind),
            ..product(name, ProductCategory::Accessory, TechnologyTag::Universal, price)
        }
    }

    fn ups(va: u32, price: i64) -> Product {
        Product {
            ups_va: Some(va),
            ..product(&format!("UPS {va}VA"), ProductCategory::Ups, TechnologyTag::Universal, price)
        }
    }

    /// A small but complete IP/PoE catalog.
    fn sample_catalog() -> CatalogSnapshot {
        CatalogSnapshot::new(vec![
            ip_camera("Bullet 4MP", 320, 4, true),
            ip_camera("Dome 4MP", 260, 4, false),
            ip_camera("Bullet 8MP", 690, 8, true),
            nvr("NVR 8ch", 540, 8, 80, 1),
            nvr("NVR 16ch", 890, 16, 160, 2),
            Product {
                ports: Some(8),
                poe_budget_w: Some(96),
                ..product("PoE switch 8p", ProductCategory::Switch, TechnologyTag::IpPoe, 420)
            },
            disk(2.0, 310),
            disk(4.0, 480),
            Product {
                roll_length_m: Some(305),
                ..product("UTP Cat6 305m", ProductCategory::Cable, TechnologyTag::IpPoe, 450)
            },
            kit("Junction box", AccessoryKind::Mount, 35),
            kit("Screws 50 pcs", AccessoryKind::Fixings, 15),
            kit("Cable tray 1m", AccessoryKind::Tray, 4),
            kit("Monitor 22\"", AccessoryKind::Monitor, 520),
            ups(650, 380),
            ups(1000, 560),
        ])
    }

    /// Counts catalog accesses.
    #[derive(Default)]
    struct CountingCatalog {
        calls: Cell<usize>,
    }

    impl ProductCatalog for CountingCatalog {
        fn query(&self, _: ProductCategory, _: &dyn Fn(&Product) -> bool) -> Vec<Product> {
            self.calls.set(self.calls.get() + 1);
            Vec::new()
        }

        fn all(&self, _: ProductCategory) -> Vec<Product> {
            self.calls.set(self.calls.get() + 1);
            Vec::new()
        }
    }

    fn run(input: &ConfiguratorInput, catalog: &CatalogSnapshot) -> ConfigurationResult {
        calculate(input, catalog, &EngineSettings::default()).expect("valid input")
    }

    // -------------------------------------------------------------------------
    // VALIDATION
    // -------------------------------------------------------------------------

    #[test]
    fn test_no_cameras_fails_before_catalog_access() {
        let catalog = CountingCatalog::default();
        let input = ConfiguratorInput {
            outdoor_cam_count: 0,
            indoor_cam_count: 0,
            ..Default::default()
        };

        let err = calculate(&input, &catalog, &EngineSettings::default()).unwrap_err();
        assert_eq!(err, ValidationError::NoCameras);
        assert_eq!(catalog.calls.get(), 0);
    }

    #[test]
    fn test_validate_needs_only_the_questionnaire() {
        let none = ConfiguratorInput {
            outdoor_cam_count: 0,
            indoor_cam_count: 0,
            ..Default::default()
        };
        assert_eq!(validate(&none), Err(ValidationError::NoCameras));

        let one_indoor = ConfiguratorInput {
            outdoor_cam_count: 0,
            indoor_cam_count: 1,
            ..Default::default()
        };
        assert_eq!(validate(&one_indoor), Ok(()));
    }

    #[test]
    fn test_empty_catalog_still_completes() {
        let catalog = CountingCatalog::default();
        let input = ConfiguratorInput {
            need_ups: true,
            display_method: DisplayType::Tv,
            ..Default::default()
        };

        let result = calculate(&input, &catalog, &EngineSettings::default()).unwrap();
        assert!(catalog.calls.get() > 0);
        for (_, line) in result.line_items() {
            assert!(line.product.is_none());
            assert_eq!(line.quantity, 0);
        }
        assert_eq!(result.total_price(), Decimal::ZERO);
    }

    // -------------------------------------------------------------------------
    // CAMERAS
    // -------------------------------------------------------------------------

    #[test]
    fn test_outdoor_needs_outdoor_rating_indoor_takes_cheapest() {
        let result = run(&ConfiguratorInput::default(), &sample_catalog());

        let outdoor = result.outdoor_camera.product.as_ref().unwrap();
        assert_eq!(outdoor.name, "Bullet 4MP");
        assert_eq!(result.outdoor_camera.quantity, 4);

        let indoor = result.indoor_camera.product.as_ref().unwrap();
        assert_eq!(indoor.name, "Dome 4MP");
        assert_eq!(result.indoor_camera.quantity, 2);
    }

    #[test]
    fn test_outdoor_camera_is_eligible_indoors() {
        let catalog = CatalogSnapshot::new(vec![
            ip_camera("Dome 4MP", 400, 4, false),
            ip_camera("Bullet 4MP", 300, 4, true),
        ]);
        let result = run(&ConfiguratorInput::default(), &catalog);
        assert_eq!(
            result.indoor_camera.product.map(|p| p.name),
            Some("Bullet 4MP".to_string())
        );
    }

    #[test]
    fn test_camera_filters_resolution_ir_and_technology() {
        let mut short_ir = ip_camera("Short IR", 100, 4, true);
        short_ir.ir_range_m = Some(20);
        let mut no_ir = ip_camera("No IR data", 150, 4, true);
        no_ir.ir_range_m = None;
        let mut wifi = ip_camera("Wi-Fi cam", 90, 4, true);
        wifi.technology = TechnologyTag::Wifi;
        let catalog = CatalogSnapshot::new(vec![
            ip_camera("2MP", 80, 2, true),
            short_ir,
            wifi,
            no_ir,
        ]);

        let result = run(&ConfiguratorInput::default(), &catalog);
        assert_eq!(
            result.outdoor_camera.product.map(|p| p.name),
            Some("No IR data".to_string())
        );
    }

    #[test]
    fn test_ai_detection_requires_smart_camera() {
        let mut smart = ip_camera("AcuSense", 450, 4, true);
        smart.smart_detection = true;
        let mut catalog = sample_catalog().products().to_vec();
        catalog.push(smart);
        let catalog = CatalogSnapshot::new(catalog);

        let input = ConfiguratorInput {
            detection: DetectionType::Ai,
            ..Default::default()
        };
        let result = run(&input, &catalog);
        assert_eq!(
            result.outdoor_camera.product.as_ref().map(|p| p.name.as_str()),
            Some("AcuSense")
        );
        assert_eq!(
            result.indoor_camera.product.as_ref().map(|p| p.name.as_str()),
            Some("AcuSense")
        );
    }

    #[test]
    fn test_zero_count_side_is_not_selected() {
        let input = ConfiguratorInput {
            outdoor_cam_count: 0,
            indoor_cam_count: 3,
            ..Default::default()
        };
        let result = run(&input, &sample_catalog());
        assert!(result.outdoor_camera.product.is_none());
        assert_eq!(result.indoor_camera.quantity, 3);
    }

    #[test]
    fn test_price_ties_pick_first_in_catalog_order() {
        let catalog = CatalogSnapshot::new(vec![
            ip_camera("First", 300, 4, true),
            ip_camera("Second", 300, 4, true),
        ]);
        let result = run(&ConfiguratorInput::default(), &catalog);
        assert_eq!(
            result.outdoor_camera.product.map(|p| p.name),
            Some("First".to_string())
        );
    }

    // -------------------------------------------------------------------------
    // DERIVED QUANTITIES
    // -------------------------------------------------------------------------

    #[test]
    fn test_bandwidth_and_storage_for_home() {
        // 4 MP -> 6 Mbps/cam; 63.28 GB/day; x0.75 -> 47.46 GB/day
        // 47.46 * 14 days * 6 cameras / 1024 = 3.89 TB
        let input = ConfiguratorInput {
            resolution_mp: 4,
            outdoor_cam_count: 4,
            indoor_cam_count: 2,
            recording_days: 14,
            building: BuildingType::Home,
            ..Default::default()
        };
        let result = run(&input, &sample_catalog());

        assert_eq!(result.estimated_bandwidth_mbps, 36.0);
        assert_eq!(result.estimated_storage_tb, 3.89);
    }

    #[test]
    fn test_warehouse_uses_lower_motion_factor() {
        // 47.46 GB/day at 0.75 becomes 31.64 GB/day at 0.5
        let input = ConfiguratorInput {
            building: BuildingType::Warehouse,
            ..Default::default()
        };
        let result = run(&input, &sample_catalog());
        assert_eq!(result.estimated_storage_tb, 2.6);
    }

    #[test]
    fn test_power_uses_camera_wattage_or_defaults() {
        let result = run(&ConfiguratorInput::default(), &sample_catalog());
        // 6 W per selected camera
        assert_eq!(result.estimated_power_w, 36);

        let no_cameras = CatalogSnapshot::default();
        let result = run(&ConfiguratorInput::default(), &no_cameras);
        // 4 x 10 W + 2 x 5 W
        assert_eq!(result.estimated_power_w, 50);
    }

    #[test]
    fn test_power_is_zero_without_poe() {
        let input = ConfiguratorInput {
            tech: CameraTechnology::Wifi,
            ..Default::default()
        };
        let result = run(&input, &sample_catalog());
        assert_eq!(result.estimated_power_w, 0);
    }

    // -------------------------------------------------------------------------
    // RECORDER / DISK / SWITCH
    // -------------------------------------------------------------------------

    #[test]
    fn test_recorder_needs_channels_and_bandwidth() {
        let input = ConfiguratorInput {
            outdoor_cam_count: 6,
            indoor_cam_count: 2,
            resolution_mp: 8,
            ..Default::default()
        };
        // 8 cameras at 12 Mbps = 96 Mbps: the 8ch NVR only handles 80
        let result = run(&input, &sample_catalog());
        assert_eq!(
            result.recorder.product.map(|p| p.name),
            Some("NVR 16ch".to_string())
        );
        assert_eq!(result.recorder.quantity, 1);
    }

    #[test]
    fn test_analog_recorder_ignores_bandwidth_and_accepts_universal() {
        let dvr = Product {
            channels: Some(8),
            max_bandwidth_mbps: None,
            ..product("XVR 8ch", ProductCategory::Recorder, TechnologyTag::Universal, 390)
        };
        let catalog = CatalogSnapshot::new(vec![dvr, nvr("NVR 8ch", 300, 8, 80, 1)]);
        let input = ConfiguratorInput {
            tech: CameraTechnology::Analog,
            ..Default::default()
        };
        let result = run(&input, &catalog);
        assert_eq!(
            result.recorder.product.map(|p| p.name),
            Some("XVR 8ch".to_string())
        );
    }

    #[test]
    fn test_disk_perfect_fit_preferred() {
        let catalog = CatalogSnapshot::new(vec![disk(4.0, 450), disk(8.0, 900)]);
        let recorder = nvr("NVR", 500, 8, 80, 2);

        let line = select_disk(&catalog, 6.0, Some(&recorder));
        assert_eq!(line.product.and_then(|p| p.storage_tb), Some(8.0));
        assert_eq!(line.quantity, 1);
    }

    #[test]
    fn test_disk_fallback_multiplies_largest_up_to_bays() {
        let catalog = CatalogSnapshot::new(vec![disk(4.0, 450), disk(8.0, 900)]);
        let recorder = nvr("NVR", 500, 8, 80, 2);

        // 20 TB needs three 8 TB disks, the recorder has two bays
        let line = select_disk(&catalog, 20.0, Some(&recorder));
        assert_eq!(line.product.as_ref().and_then(|p| p.storage_tb), Some(8.0));
        assert_eq!(line.quantity, 2);

        // Without a recorder only one bay is assumed
        let line = select_disk(&catalog, 20.0, None);
        assert_eq!(line.quantity, 1);
    }

    #[test]
    fn test_disk_requires_universal_tag() {
        let mut tagged = disk(10.0, 100);
        tagged.technology = TechnologyTag::IpPoe;
        let catalog = CatalogSnapshot::new(vec![tagged]);
        assert_eq!(select_disk(&catalog, 2.0, None), LineItem::empty());
    }

    #[test]
    fn test_switch_selected_for_poe() {
        let result = run(&ConfiguratorInput::default(), &sample_catalog());
        assert_eq!(
            result.switch.product.map(|p| p.name),
            Some("PoE switch 8p".to_string())
        );
        assert_eq!(result.switch.quantity, 1);
    }

    #[test]
    fn test_switch_omitted_without_poe() {
        for tech in [CameraTechnology::Wifi, CameraTechnology::Analog] {
            let input = ConfiguratorInput {
                tech,
                outdoor_cam_count: 2,
                indoor_cam_count: 1,
                ..Default::default()
            };
            let result = run(&input, &sample_catalog());
            assert!(result.switch.product.is_none());
            assert_eq!(result.switch.quantity, 0);
        }
    }

    // -------------------------------------------------------------------------
    // CABLING / ACCESSORIES
    // -------------------------------------------------------------------------

    #[test]
    fn test_custom_cable_meters_override_estimate() {
        let catalog = CatalogSnapshot::new(vec![Product {
            roll_length_m: Some(50),
            ..product("UTP 50m", ProductCategory::Cable, TechnologyTag::IpPoe, 120)
        }]);
        let input = ConfiguratorInput {
            custom_cable_meters: Some(120),
            ..Default::default()
        };
        let result = run(&input, &catalog);
        assert_eq!(result.estimated_cable_meters, 120);
        assert_eq!(result.cable.quantity, 3);
    }

    #[test]
    fn test_cable_estimate_from_area() {
        // sqrt(100) * 2 * 6 = 120 m -> two rolls of the default 100 m
        let catalog = CatalogSnapshot::new(vec![product(
            "Coax RG59",
            ProductCategory::Cable,
            TechnologyTag::Universal,
            90,
        )]);
        let input = ConfiguratorInput {
            area_m2: 100.0,
            custom_cable_meters: Some(0),
            ..Default::default()
        };
        let result = run(&input, &catalog);
        assert_eq!(result.estimated_cable_meters, 120);
        assert_eq!(result.cable.quantity, 2);
    }

    #[test]
    fn test_cable_skipped_when_not_needed() {
        let input = ConfiguratorInput {
            need_cabling: false,
            ..Default::default()
        };
        let result = run(&input, &sample_catalog());
        assert_eq!(result.cable, LineItem::empty());
        assert!(result.estimated_cable_meters > 0);
    }

    #[test]
    fn test_zero_cable_length_leaves_cable_and_tray_empty() {
        let input = ConfiguratorInput {
            area_m2: 0.0,
            ..Default::default()
        };
        let result = run(&input, &sample_catalog());

        assert_eq!(result.estimated_cable_meters, 0);
        assert_eq!(result.cable, LineItem::empty());
        assert_eq!(result.tray, LineItem::empty());
        let unmatched = result.unmatched_lines();
        assert!(!unmatched.contains(&LineKind::Cable));
        assert!(!unmatched.contains(&LineKind::Tray));
    }

    #[test]
    fn test_mounts_fixings_and_trays() {
        let result = run(&ConfiguratorInput::default(), &sample_catalog());
        assert_eq!(result.mount.quantity, 6);
        // 24 screws -> one pack of 50
        assert_eq!(result.fixings.quantity, 1);
        assert_eq!(result.tray.quantity, result.estimated_cable_meters);

        let flush = ConfiguratorInput {
            install_type: InstallationType::Flush,
            ..Default::default()
        };
        let result = run(&flush, &sample_catalog());
        assert!(result.tray.product.is_none());
    }

    #[test]
    fn test_display_follows_method() {
        let input = ConfiguratorInput {
            display_method: DisplayType::Monitor,
            ..Default::default()
        };
        let result = run(&input, &sample_catalog());
        assert_eq!(result.monitor.quantity, 1);

        // No TV or generic screen in the sample catalog
        let input = ConfiguratorInput {
            display_method: DisplayType::Tv,
            ..Default::default()
        };
        assert!(run(&input, &sample_catalog()).monitor.product.is_none());

        let app_only = run(&ConfiguratorInput::default(), &sample_catalog());
        assert!(app_only.monitor.product.is_none());
    }

    // -------------------------------------------------------------------------
    // UPS / ASSEMBLY
    // -------------------------------------------------------------------------

    #[test]
    fn test_ups_only_when_requested() {
        let result = run(&ConfiguratorInput::default(), &sample_catalog());
        assert!(result.ups.product.is_none());

        let input = ConfiguratorInput {
            need_ups: true,
            ..Default::default()
        };
        let result = run(&input, &sample_catalog());
        // 36 W + 40 W overhead
        assert_eq!(result.ups.product.and_then(|p| p.ups_va), Some(650));
        assert_eq!(result.ups.quantity, 1);
    }

    #[test]
    fn test_ups_margin_is_strict_and_missing_ups_is_not_an_error() {
        // Load is exactly 76 W; a 76 VA unit does not qualify
        let catalog = CatalogSnapshot::new(vec![
            ip_camera("Bullet", 300, 4, true),
            ip_camera("Dome", 200, 4, false),
            ups(76, 100),
        ]);
        let input = ConfiguratorInput {
            need_ups: true,
            ..Default::default()
        };
        let result = calculate(&input, &catalog, &EngineSettings::default()).unwrap();
        assert_eq!(result.estimated_power_w, 36);
        assert!(result.ups.product.is_none());
        assert_eq!(result.ups.quantity, 0);
    }

    #[test]
    fn test_runtime_scaled_ups_policy() {
        // 76 W / 0.6 * (30 / 10) = 380 VA
        assert_eq!(runtime_scaled_va(76, 30), 380);
        // Short runtimes use a 1.5 factor
        assert_eq!(runtime_scaled_va(60, 10), 150);

        let catalog = CatalogSnapshot::new(vec![
            ip_camera("Bullet", 300, 4, true),
            ip_camera("Dome", 200, 4, false),
            ups(300, 250),
            ups(400, 320),
        ]);
        let input = ConfiguratorInput {
            need_ups: true,
            ups_runtime_minutes: 30,
            ..Default::default()
        };
        let settings = EngineSettings {
            ups_sizing: UpsSizingPolicy::RuntimeScaled,
            ..Default::default()
        };
        let result = calculate(&input, &catalog, &settings).unwrap();
        assert_eq!(result.ups.product.and_then(|p| p.ups_va), Some(400));
    }

    #[test]
    fn test_assembly_cost_with_flush_surcharge() {
        let input = ConfiguratorInput {
            need_assembly: true,
            install_type: InstallationType::Flush,
            ..Default::default()
        };
        let result = run(&input, &sample_catalog());
        // 6 x 250 + 300 + 500
        assert_eq!(result.assembly_cost, Decimal::from(2300));

        let settings = EngineSettings {
            assembly_labor_rate: Decimal::from(100),
            assembly_base_fee: Decimal::ZERO,
            flush_install_surcharge: Decimal::ZERO,
            ..Default::default()
        };
        let result = calculate(&input, &sample_catalog(), &settings).unwrap();
        assert_eq!(result.assembly_cost, Decimal::from(600));
    }

    #[test]
    fn test_assembly_is_free_when_not_requested() {
        let result = run(&ConfiguratorInput::default(), &sample_catalog());
        assert_eq!(result.assembly_cost, Decimal::ZERO);
    }

    #[test]
    fn test_ups_policy_parses_from_kebab_case() {
        use std::str::FromStr;
        assert_eq!(
            UpsSizingPolicy::from_str("runtime-scaled").unwrap(),
            UpsSizingPolicy::RuntimeScaled
        );
        assert_eq!(UpsSizingPolicy::FixedMargin.to_string(), "fixed-margin");
    }

    // -------------------------------------------------------------------------
    // WHOLE-RESULT PROPERTIES
    // -------------------------------------------------------------------------

    #[test]
    fn test_calculation_is_idempotent() {
        let catalog = sample_catalog();
        let input = ConfiguratorInput {
            need_ups: true,
            need_assembly: true,
            display_method: DisplayType::Monitor,
            ..Default::default()
        };
        let first = run(&input, &catalog);
        let second = run(&input, &catalog);

        assert_eq!(first, second);
        assert_eq!(
            serde_json::to_string(&first).unwrap(),
            serde_json::to_string(&second).unwrap()
        );
    }

    fn input_strategy() -> impl Strategy<Value = ConfiguratorInput> {
        (
            0u32..20,
            0u32..20,
            prop_oneof![Just(2u32), Just(4), Just(8)],
            1u32..90,
            prop_oneof![
                Just(CameraTechnology::IpPoe),
                Just(CameraTechnology::Wifi),
                Just(CameraTechnology::Analog)
            ],
            any::<bool>(),
            any::<bool>(),
            any::<bool>(),
            10.0f64..5000.0,
        )
            .prop_map(
                |(outdoor, indoor, mp, days, tech, ups, assembly, cabling, area)| {
                    ConfiguratorInput {
                        outdoor_cam_count: outdoor,
                        indoor_cam_count: indoor,
                        resolution_mp: mp,
                        recording_days: days,
                        tech,
                        need_ups: ups,
                        need_assembly: assembly,
                        need_cabling: cabling,
                        area_m2: area,
                        display_method: DisplayType::Monitor,
                        ..Default::default()
                    }
                },
            )
    }

    proptest! {
        /// Total is the sum of line subtotals plus assembly, and empty lines
        /// never carry a quantity.
        #[test]
        fn total_price_matches_line_items(input in input_strategy()) {
            let catalog = sample_catalog();
            match calculate(&input, &catalog, &EngineSettings::default()) {
                Ok(result) => {
                    let mut expected = result.assembly_cost;
                    for (_, line) in result.line_items() {
                        if line.product.is_none() {
                            prop_assert_eq!(line.quantity, 0);
                        }
                        expected += line.unit_price() * Decimal::from(line.quantity);
                    }
                    prop_assert_eq!(result.total_price(), expected);
                }
                Err(e) => {
                    prop_assert_eq!(input.total_cameras(), 0);
                    prop_assert_eq!(e, ValidationError::NoCameras);
                }
            }
        }
    }
}

// =============================================================================
// QUOTE MODULE
// =============================================================================
// Turns a calculated configuration into documents for people and for the
// order system:
// - render_quote(): plain-text quote, one row per selected product
// - order_draft(): priced order lines for the order-management side
// =============================================================================

use std::fmt::Write;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use uuid::Uuid;

use crate::models::{
    BuildingType, CameraTechnology, ConfigurationResult, DisplayType, OrderDraft, OrderLine,
};

const RULE_WIDTH: usize = 78;

// =============================================================================
// QUOTE DOCUMENT
// =============================================================================

/// Render a human-readable quote.
///
/// Lines without a selected product are listed as "not available" so the
/// customer can see which part of the system still needs sourcing.
pub fn render_quote(
    configuration_id: Uuid,
    generated_at: DateTime<Utc>,
    result: &ConfigurationResult,
) -> String {
    let input = &result.input;
    let mut out = String::new();
    let rule = "=".repeat(RULE_WIDTH);
    let thin = "-".repeat(RULE_WIDTH);

    // writeln! into a String cannot fail
    let _ = writeln!(out, "{rule}");
    let _ = writeln!(out, "CCTV SYSTEM QUOTE");
    let _ = writeln!(out, "Configuration: {configuration_id}");
    let _ = writeln!(out, "Generated:     {}", generated_at.format("%Y-%m-%d %H:%M UTC"));
    let _ = writeln!(out, "{rule}");

    // ----- Questionnaire summary -----
    let _ = writeln!(
        out,
        "Building: {} ({} m2)   Technology: {}   Cameras: {} outdoor / {} indoor",
        building_label(input.building),
        input.area_m2,
        technology_label(input.tech),
        input.outdoor_cam_count,
        input.indoor_cam_count,
    );
    let _ = writeln!(
        out,
        "Resolution: >= {} MP   IR: >= {} m   Retention: {} days   Display: {}",
        input.resolution_mp,
        input.night_vision_m,
        input.recording_days,
        display_label(input.display_method),
    );
    let _ = writeln!(out, "{thin}");

    // ----- Bill of materials -----
    let _ = writeln!(
        out,
        "{:<18} {:<34} {:>5} {:>8} {:>9}",
        "Item", "Product", "Qty", "Unit", "Subtotal"
    );
    for (kind, line) in result.line_items() {
        if !result.is_requested(kind) {
            continue;
        }
        match &line.product {
            Some(product) if line.quantity > 0 => {
                let _ = writeln!(
                    out,
                    "{:<18} {:<34} {:>5} {:>8} {:>9}",
                    kind.title(),
                    truncate(&product.name, 34),
                    line.quantity,
                    money(product.price),
                    money(line.subtotal()),
                );
            }
            _ => {
                let _ = writeln!(out, "{:<18} {:<34}", kind.title(), "not available");
            }
        }
    }
    if result.assembly_cost > Decimal::ZERO {
        let _ = writeln!(
            out,
            "{:<18} {:<34} {:>5} {:>8} {:>9}",
            "Assembly",
            "Installation service",
            1,
            money(result.assembly_cost),
            money(result.assembly_cost),
        );
    }
    let _ = writeln!(out, "{thin}");
    let _ = writeln!(out, "{:>66} {:>11}", "TOTAL (PLN)", money(result.total_price()));
    let _ = writeln!(out, "{thin}");

    // ----- Technical estimates -----
    let _ = writeln!(out, "Estimated bandwidth: {:.2} Mbps", result.estimated_bandwidth_mbps);
    let _ = writeln!(out, "Estimated storage:   {:.2} TB", result.estimated_storage_tb);
    if input.tech == CameraTechnology::IpPoe {
        let _ = writeln!(out, "Estimated PoE load:  {} W", result.estimated_power_w);
    }
    let _ = writeln!(out, "Estimated cabling:   {} m", result.estimated_cable_meters);
    let _ = writeln!(out, "{rule}");

    out
}

fn money(value: Decimal) -> String {
    format!("{:.2}", value.round_dp(2))
}

fn truncate(text: &str, max: usize) -> String {
    if text.chars().count() <= max {
        return text.to_string();
    }
    let mut cut: String = text.chars().take(max.saturating_sub(1)).collect();
    cut.push('~');
    cut
}

fn building_label(building: BuildingType) -> &'static str {
    match building {
        BuildingType::Home => "house",
        BuildingType::Office => "office / shop",
        BuildingType::Warehouse => "warehouse / hall",
        BuildingType::Parking => "parking / yard",
    }
}

fn technology_label(tech: CameraTechnology) -> &'static str {
    match tech {
        CameraTechnology::IpPoe => "IP (PoE)",
        CameraTechnology::Wifi => "Wi-Fi",
        CameraTechnology::Analog => "analog (CVI/TVI/AHD)",
    }
}

fn display_label(display: DisplayType) -> &'static str {
    match display {
        DisplayType::AppOnly => "app only",
        DisplayType::Monitor => "monitor",
        DisplayType::Tv => "TV (HDMI)",
    }
}

// =============================================================================
// ORDER CONVERSION
// =============================================================================

/// Convert a configuration into order lines.
///
/// Only lines with a product and a positive quantity become order lines.
/// The total carries assembly cost, so it always equals the quote total.
pub fn order_draft(configuration_id: Uuid, result: &ConfigurationResult) -> OrderDraft {
    let lines: Vec<OrderLine> = result
        .line_items()
        .into_iter()
        .filter_map(|(_, line)| {
            if !line.is_selected() {
                return None;
            }
            let product = line.product.as_ref()?;
            Some(OrderLine {
                product_id: product.id,
                name: product.name.clone(),
                quantity: line.quantity,
                unit_price: product.price,
                line_total: line.subtotal(),
            })
        })
        .collect();

    let total_amount =
        lines.iter().map(|l| l.line_total).sum::<Decimal>() + result.assembly_cost;

    OrderDraft {
        configuration_id,
        lines,
        assembly_cost: result.assembly_cost,
        total_amount,
    }
}

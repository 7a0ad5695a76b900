//! Presentation-ready projections of a [`Lookup`]
//!
//! Numbers are rounded and formatted here so templates stay logic-free.

use serde::Serialize;

use crate::models::{PropertyType, ScoredComparable};
use crate::services::Lookup;

#[derive(Debug, Clone, Serialize)]
pub struct DashboardView {
    pub address: String,
    pub postcode: String,
    pub latitude: f64,
    pub longitude: f64,
    pub radius_m: u32,
    pub reliability: BadgeView,
    pub sale_count: usize,
    pub estimate: Option<EstimateView>,
    pub comparison: Option<ComparisonView>,
    pub stats: StatsView,
    pub rows: Vec<RowView>,
}

#[derive(Debug, Clone, Serialize)]
pub struct BadgeView {
    pub label: &'static str,
    pub css_class: &'static str,
    pub icon: &'static str,
}

#[derive(Debug, Clone, Serialize)]
pub struct EstimateView {
    pub price: String,
    pub min: String,
    pub max: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct ComparisonView {
    pub above: bool,
    pub abs_pct: i64,
    pub verdict: &'static str,
}

#[derive(Debug, Clone, Serialize)]
pub struct StatsView {
    pub p25: i64,
    pub median: i64,
    pub p75: i64,
    pub dispersion: Option<String>,
    pub homogeneity: Option<&'static str>,
    pub tension: &'static str,
    pub recent_sales: usize,
}

#[derive(Debug, Clone, Serialize)]
pub struct RowView {
    pub type_label: &'static str,
    pub badge_class: &'static str,
    pub marker_color: &'static str,
    pub surface: String,
    pub price: String,
    pub price_m2: String,
    pub deviation: Option<String>,
    pub above_market: bool,
    pub distance_m: u32,
    pub date: String,
    pub score: u8,
    pub latitude: f64,
    pub longitude: f64,
}

/// Rounds and groups digits the French way: `312 000`
pub fn format_amount(value: f64) -> String {
    let rounded = value.round() as i64;
    let digits = rounded.unsigned_abs().to_string();

    let mut grouped = String::with_capacity(digits.len() + digits.len() / 3 * 3);
    for (i, c) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            grouped.push('\u{202f}');
        }
        grouped.push(c);
    }

    if rounded < 0 {
        format!("-{}", grouped)
    } else {
        grouped
    }
}

fn format_surface(value: f64) -> String {
    if value.fract() == 0.0 {
        format!("{}", value as i64)
    } else {
        format!("{:.1}", value)
    }
}

fn row_view(comparable: &ScoredComparable) -> RowView {
    let t = &comparable.transaction;
    let is_house = t.property_type == PropertyType::House;

    RowView {
        type_label: t.property_type.as_str(),
        badge_class: if is_house { "maison" } else { "appart" },
        marker_color: if is_house { "#10b981" } else { "#3b82f6" },
        surface: format_surface(t.surface_m2),
        price: format_amount(t.price),
        price_m2: format_amount(t.price_per_m2),
        deviation: comparable.market_deviation_pct.map(|pct| {
            let pct = pct.round() as i64;
            if pct > 0 {
                format!("+{}", pct)
            } else {
                pct.to_string()
            }
        }),
        above_market: comparable.market_deviation_pct.unwrap_or(0.0) > 0.0,
        distance_m: comparable.distance_m,
        date: t
            .sale_date
            .map(|d| d.to_string())
            .unwrap_or_else(|| "—".to_string()),
        score: comparable.score,
        latitude: t.location.latitude(),
        longitude: t.location.longitude(),
    }
}

pub fn dashboard_view(lookup: &Lookup) -> DashboardView {
    let analysis = &lookup.analysis;
    let summary = &analysis.summary;

    DashboardView {
        address: lookup.address.label.clone(),
        postcode: lookup.address.postcode.clone(),
        latitude: lookup.address.location.latitude(),
        longitude: lookup.address.location.longitude(),
        radius_m: analysis.radius_m.round() as u32,
        reliability: BadgeView {
            label: summary.reliability.label(),
            css_class: summary.reliability.css_class(),
            icon: summary.reliability.icon(),
        },
        sale_count: summary.sample_size,
        estimate: analysis.estimate.map(|e| EstimateView {
            price: format_amount(e.price),
            min: format_amount(e.min),
            max: format_amount(e.max),
        }),
        comparison: analysis.comparison.map(|c| ComparisonView {
            above: c.deviation_pct > 0.0,
            abs_pct: c.deviation_pct.abs().round() as i64,
            verdict: c.verdict.label(),
        }),
        stats: StatsView {
            p25: summary.p25.round() as i64,
            median: summary.median.round() as i64,
            p75: summary.p75.round() as i64,
            dispersion: summary.dispersion_pct.map(|pct| format!("{:.1}", pct)),
            homogeneity: summary.homogeneity.map(|h| h.label()),
            tension: summary.tension.label(),
            recent_sales: summary.recent_sales,
        },
        rows: analysis.comparables.iter().map(row_view).collect(),
    }
}

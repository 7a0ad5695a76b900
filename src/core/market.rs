//! Qualitative market labels and target-vs-market comparison

use chrono::{Months, NaiveDate};
use std::collections::HashMap;

use crate::core::stats::{dispersion, percentile, quartiles, Quartiles};
use crate::models::{
    Estimate, Homogeneity, MarketSummary, MarketThresholds, Reliability, TargetComparison,
    Tension, Transaction, Verdict, VerdictBands,
};

pub fn classify_reliability(sample_size: usize, thresholds: &MarketThresholds) -> Reliability {
    if sample_size >= thresholds.reliability_high {
        Reliability::High
    } else if sample_size >= thresholds.reliability_medium {
        Reliability::Medium
    } else {
        Reliability::Low
    }
}

pub fn classify_tension(recent_sales: usize, thresholds: &MarketThresholds) -> Tension {
    if recent_sales >= thresholds.tension_high {
        Tension::High
    } else if recent_sales >= thresholds.tension_balanced {
        Tension::Balanced
    } else {
        Tension::Low
    }
}

pub fn classify_homogeneity(dispersion_pct: f64, thresholds: &MarketThresholds) -> Homogeneity {
    if dispersion_pct < thresholds.homogeneous_below_pct {
        Homogeneity::Homogeneous
    } else {
        Homogeneity::Heterogeneous
    }
}

pub fn classify_deviation(deviation_pct: f64, bands: &VerdictBands) -> Verdict {
    if deviation_pct <= bands.good_deal_max {
        Verdict::GoodDeal
    } else if deviation_pct <= bands.fair_max {
        Verdict::Fair
    } else if deviation_pct <= bands.slightly_expensive_max {
        Verdict::SlightlyExpensive
    } else {
        Verdict::Overpriced
    }
}

/// Sales dated within `(as_of - months, as_of]`
pub fn recent_sales_count(transactions: &[Transaction], as_of: NaiveDate, months: u32) -> usize {
    let since = as_of
        .checked_sub_months(Months::new(months))
        .unwrap_or(NaiveDate::MIN);

    transactions
        .iter()
        .filter_map(|t| t.sale_date)
        .filter(|date| *date > since && *date <= as_of)
        .count()
}

/// Position of a target price against the market median
///
/// `None` when an input is not finite or the median or the area is not positive.
pub fn compare_to_market(
    price: f64,
    area_m2: f64,
    median_price_m2: f64,
    bands: &VerdictBands,
) -> Option<TargetComparison> {
    if ![price, area_m2, median_price_m2].iter().all(|v| v.is_finite()) {
        return None;
    }
    if median_price_m2 <= 0.0 || area_m2 <= 0.0 {
        return None;
    }

    let price_per_m2 = price / area_m2;
    let deviation_pct = (price_per_m2 - median_price_m2) / median_price_m2 * 100.0;

    Some(TargetComparison {
        price_per_m2,
        deviation_pct,
        verdict: classify_deviation(deviation_pct, bands),
    })
}

/// Market value of `area_m2` at the median, with the interquartile range
pub fn estimate(area_m2: f64, quartiles: &Quartiles) -> Option<Estimate> {
    if !area_m2.is_finite() || area_m2 <= 0.0 || quartiles.median <= 0.0 {
        return None;
    }

    Some(Estimate {
        price: quartiles.median * area_m2,
        min: quartiles.p25 * area_m2,
        max: quartiles.p75 * area_m2,
    })
}

/// Median price per m² of every cadastral section present in `transactions`
pub fn section_medians(transactions: &[Transaction]) -> HashMap<String, f64> {
    let mut by_section: HashMap<String, Vec<f64>> = HashMap::new();
    for t in transactions {
        if let Some(section) = &t.section {
            by_section
                .entry(section.clone())
                .or_default()
                .push(t.price_per_m2);
        }
    }

    by_section
        .into_iter()
        .map(|(section, prices)| (section, percentile(&prices, 0.5)))
        .collect()
}

/// Aggregate statistics and labels over a market sample
pub fn summarize(
    sample: &[Transaction],
    as_of: NaiveDate,
    thresholds: &MarketThresholds,
) -> MarketSummary {
    let prices: Vec<f64> = sample.iter().map(|t| t.price_per_m2).collect();
    let q = quartiles(&prices);
    let d = dispersion(&prices);
    let recent_sales = recent_sales_count(sample, as_of, thresholds.tension_window_months);

    MarketSummary {
        sample_size: sample.len(),
        p25: q.p25,
        median: q.median,
        p75: q.p75,
        mean: d.mean,
        std_dev: d.std_dev,
        dispersion_pct: d.dispersion_pct,
        homogeneity: d
            .dispersion_pct
            .map(|pct| classify_homogeneity(pct, thresholds)),
        reliability: classify_reliability(sample.len(), thresholds),
        recent_sales,
        tension: classify_tension(recent_sales, thresholds),
    }
}

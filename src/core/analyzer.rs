use chrono::NaiveDate;
use serde::Deserialize;
use thiserror::Error;

use crate::core::{
    distance::distance_m,
    filters::{is_usable, is_within_radius, matches_property_type},
    market::{compare_to_market, estimate, section_medians, summarize},
    scoring::score_comparable,
    stats::Quartiles,
};
use crate::models::{
    Estimate, MarketSummary, MarketThresholds, ScoredComparable, ScoringConfig, SearchProfile,
    TargetComparison, Transaction, VerdictBands,
};

#[derive(Debug, Clone, PartialEq, Error)]
pub enum AnalysisError {
    #[error("no sale within {radius_m} m ({candidates_seen} candidates examined)")]
    NoComparables {
        radius_m: f64,
        candidates_seen: usize,
    },
}

/// Result of analysing the candidates around a target
#[derive(Debug, Clone)]
pub struct MarketAnalysis {
    pub summary: MarketSummary,
    /// Ranked by score, best first
    pub comparables: Vec<ScoredComparable>,
    pub estimate: Option<Estimate>,
    pub comparison: Option<TargetComparison>,
    pub radius_m: f64,
    pub total_candidates: usize,
}

/// Tunables of the analysis pipeline
#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
#[serde(default)]
pub struct AnalyzerConfig {
    pub default_radius_m: f64,
    pub max_radius_m: f64,
    /// Size of the market sample, nearest sales first
    pub max_comparables: usize,
    pub scoring: ScoringConfig,
    pub thresholds: MarketThresholds,
    pub verdict_bands: VerdictBands,
}

impl Default for AnalyzerConfig {
    fn default() -> Self {
        Self {
            default_radius_m: 500.0,
            max_radius_m: 5000.0,
            max_comparables: 25,
            scoring: ScoringConfig::default(),
            thresholds: MarketThresholds::default(),
            verdict_bands: VerdictBands::default(),
        }
    }
}

/// Comparable-sales pipeline over an already fetched candidate set
///
/// # Pipeline Stages
/// 1. Usability, property type and radius filter
/// 2. Nearest-first market sample
/// 3. Market summary and classification
/// 4. Scoring and ranking
/// 5. Estimate and target comparison
#[derive(Debug, Clone)]
pub struct Analyzer {
    config: AnalyzerConfig,
}

impl Analyzer {
    pub fn new(config: AnalyzerConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &AnalyzerConfig {
        &self.config
    }

    /// Radius actually searched for a profile
    pub fn effective_radius_m(&self, profile: &SearchProfile) -> f64 {
        profile
            .radius_m
            .filter(|r| *r > 0.0)
            .unwrap_or(self.config.default_radius_m)
            .min(self.config.max_radius_m)
    }

    pub fn analyze(
        &self,
        profile: &SearchProfile,
        candidates: Vec<Transaction>,
        as_of: NaiveDate,
    ) -> Result<MarketAnalysis, AnalysisError> {
        let total_candidates = candidates.len();
        let radius_m = self.effective_radius_m(profile);

        // Section medians use every usable row, not only the sample
        let usable: Vec<Transaction> = candidates.into_iter().filter(is_usable).collect();
        let medians = section_medians(&usable);

        let mut nearby: Vec<(u32, Transaction)> = usable
            .into_iter()
            .filter(|t| matches_property_type(t, profile.property_type))
            .map(|t| (distance_m(&profile.location, &t.location), t))
            .filter(|(d, _)| is_within_radius(*d, radius_m))
            .collect();

        nearby.sort_by_key(|(d, _)| *d);
        nearby.truncate(self.config.max_comparables);

        if nearby.is_empty() {
            return Err(AnalysisError::NoComparables {
                radius_m,
                candidates_seen: total_candidates,
            });
        }

        let sample: Vec<Transaction> = nearby.iter().map(|(_, t)| t.clone()).collect();
        let summary = summarize(&sample, as_of, &self.config.thresholds);
        let market_median = Some(summary.median).filter(|m| *m > 0.0);
        let scoring = self.config.scoring.for_radius(radius_m);

        let mut comparables: Vec<ScoredComparable> = nearby
            .into_iter()
            .map(|(distance_m, transaction)| {
                let reference = transaction
                    .section_median_price_m2
                    .or_else(|| {
                        transaction
                            .section
                            .as_ref()
                            .and_then(|s| medians.get(s).copied())
                    })
                    .or(market_median);

                let score = score_comparable(
                    &transaction,
                    distance_m as f64 / 1000.0,
                    Some(profile),
                    reference,
                    &scoring,
                );

                let market_deviation_pct = market_median
                    .map(|median| (transaction.price_per_m2 - median) / median * 100.0);

                ScoredComparable {
                    transaction,
                    distance_m,
                    score,
                    market_deviation_pct,
                }
            })
            .collect();

        // Sort by score (descending) and then by distance (ascending)
        comparables.sort_by(|a, b| {
            b.score
                .cmp(&a.score)
                .then_with(|| a.distance_m.cmp(&b.distance_m))
        });

        let quartiles = Quartiles {
            p25: summary.p25,
            median: summary.median,
            p75: summary.p75,
        };
        let estimate = profile.area_m2.and_then(|area| estimate(area, &quartiles));
        let comparison = match (profile.price, profile.area_m2) {
            (Some(price), Some(area)) => {
                compare_to_market(price, area, summary.median, &self.config.verdict_bands)
            }
            _ => None,
        };

        Ok(MarketAnalysis {
            summary,
            comparables,
            estimate,
            comparison,
            radius_m,
            total_candidates,
        })
    }
}

impl Default for Analyzer {
    fn default() -> Self {
        Self::new(AnalyzerConfig::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Coordinate, DistanceDecay, PropertyType, Reliability, ScoringConfig};

    const METERS_PER_DEGREE: f64 = 111_194.93;
    const ORIGIN: (f64, f64) = (50.6292, 3.0573);

    fn as_of() -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, 3, 1).unwrap()
    }

    fn sale_north(meters: f64, property_type: PropertyType, price_per_m2: f64) -> Transaction {
        Transaction {
            property_type,
            surface_m2: 60.0,
            price: 60.0 * price_per_m2,
            price_per_m2,
            rooms: Some(3),
            sale_date: NaiveDate::from_ymd_opt(2024, 10, 1),
            location: Coordinate::new(ORIGIN.0 + meters / METERS_PER_DEGREE, ORIGIN.1).unwrap(),
            section: None,
            section_median_price_m2: None,
        }
    }

    fn profile() -> SearchProfile {
        SearchProfile::at(Coordinate::new(ORIGIN.0, ORIGIN.1).unwrap())
    }

    #[test]
    fn test_radius_filter_and_ranking() {
        let analyzer = Analyzer::default();
        let candidates = vec![
            sale_north(100.0, PropertyType::Apartment, 3000.0),
            sale_north(200.0, PropertyType::Apartment, 3000.0),
            sale_north(300.0, PropertyType::Apartment, 3000.0),
            sale_north(5000.0, PropertyType::Apartment, 3000.0),
            sale_north(50.0, PropertyType::Apartment, 3000.0),
        ];

        let result = analyzer.analyze(&profile(), candidates, as_of()).unwrap();

        assert_eq!(result.total_candidates, 5);
        let distances: Vec<u32> = result.comparables.iter().map(|c| c.distance_m).collect();
        assert_eq!(distances, vec![50, 100, 200, 300]);
        assert_eq!(result.summary.reliability, Reliability::Low);
    }

    #[test]
    fn test_type_filter() {
        let mut p = profile();
        p.property_type = Some(PropertyType::House);
        let candidates = vec![
            sale_north(100.0, PropertyType::Apartment, 3000.0),
            sale_north(120.0, PropertyType::House, 2500.0),
        ];

        let result = Analyzer::default().analyze(&p, candidates, as_of()).unwrap();
        assert_eq!(result.comparables.len(), 1);
        assert_eq!(result.comparables[0].transaction.property_type, PropertyType::House);
    }

    #[test]
    fn test_sample_capped_nearest_first() {
        let config = AnalyzerConfig {
            max_comparables: 3,
            ..AnalyzerConfig::default()
        };
        let candidates = (1..=6)
            .map(|i| sale_north(i as f64 * 60.0, PropertyType::Apartment, 3000.0))
            .rev()
            .collect();

        let result = Analyzer::new(config).analyze(&profile(), candidates, as_of()).unwrap();
        assert_eq!(result.summary.sample_size, 3);
        assert!(result.comparables.iter().all(|c| c.distance_m <= 180));
    }

    #[test]
    fn test_empty_perimeter() {
        let candidates = vec![sale_north(900.0, PropertyType::Apartment, 3000.0)];
        let err = Analyzer::default()
            .analyze(&profile(), candidates, as_of())
            .unwrap_err();
        assert_eq!(
            err,
            AnalysisError::NoComparables {
                radius_m: 500.0,
                candidates_seen: 1
            }
        );
    }

    #[test]
    fn test_radius_override_capped() {
        let analyzer = Analyzer::default();
        let mut p = profile();
        p.radius_m = Some(20_000.0);
        assert_eq!(analyzer.effective_radius_m(&p), 5000.0);
        p.radius_m = Some(800.0);
        assert_eq!(analyzer.effective_radius_m(&p), 800.0);
    }

    #[test]
    fn test_estimate_and_comparison() {
        let mut p = profile();
        p.area_m2 = Some(100.0);
        p.price = Some(300_000.0);
        let candidates = vec![
            sale_north(50.0, PropertyType::Apartment, 2800.0),
            sale_north(60.0, PropertyType::Apartment, 3000.0),
            sale_north(70.0, PropertyType::Apartment, 3200.0),
        ];

        let result = Analyzer::default().analyze(&p, candidates, as_of()).unwrap();
        let estimate = result.estimate.unwrap();
        assert_eq!(estimate.price, 300_000.0);
        let comparison = result.comparison.unwrap();
        assert_eq!(comparison.deviation_pct, 0.0);
    }

    #[test]
    fn test_cheaper_sale_ranks_first_at_equal_distance() {
        let candidates = vec![
            sale_north(100.0, PropertyType::Apartment, 3300.0),
            sale_north(100.0, PropertyType::Apartment, 2700.0),
            sale_north(100.0, PropertyType::Apartment, 3000.0),
        ];

        let result = Analyzer::default().analyze(&profile(), candidates, as_of()).unwrap();
        assert_eq!(result.comparables[0].transaction.price_per_m2, 2700.0);
        let deviation = result.comparables[0].market_deviation_pct.unwrap();
        assert!((deviation + 10.0).abs() < 1e-9);
    }

    fn in_section(mut sale: Transaction, section: &str, precomputed: Option<f64>) -> Transaction {
        sale.section = Some(section.to_string());
        sale.section_median_price_m2 = precomputed;
        sale
    }

    fn score_at_100m(candidates: Vec<Transaction>) -> u8 {
        let result = Analyzer::default().analyze(&profile(), candidates, as_of()).unwrap();
        result
            .comparables
            .iter()
            .find(|c| c.distance_m == 100)
            .map(|c| c.score)
            .unwrap()
    }

    #[test]
    fn test_discount_reference_precedence() {
        // 32 distance points + 25 area + 20 rooms, discount varies
        let target = || sale_north(100.0, PropertyType::Apartment, 3000.0);
        // Outside the radius: feeds the section median only
        let far_same_section =
            || in_section(sale_north(900.0, PropertyType::Apartment, 4500.0), "AB", None);

        // Market median is the target's own price
        assert_eq!(score_at_100m(vec![target()]), 77);

        // Section median (3000 + 4500) / 2 = 3750, 20% discount
        assert_eq!(
            score_at_100m(vec![in_section(target(), "AB", None), far_same_section()]),
            92
        );

        // Precomputed 3300 wins over the fetched section median
        assert_eq!(
            score_at_100m(vec![in_section(target(), "AB", Some(3300.0)), far_same_section()]),
            84
        );
    }

    #[test]
    fn test_search_radius_decay_follows_radius() {
        let mut p = profile();
        p.radius_m = Some(2000.0);
        let candidates = || vec![sale_north(1000.0, PropertyType::Apartment, 3000.0)];

        let fixed = Analyzer::default().analyze(&p, candidates(), as_of()).unwrap();
        assert_eq!(fixed.comparables[0].score, 45);

        let config = AnalyzerConfig {
            scoring: ScoringConfig {
                decay: DistanceDecay::SearchRadius,
                ..ScoringConfig::default()
            },
            ..AnalyzerConfig::default()
        };
        let relative = Analyzer::new(config).analyze(&p, candidates(), as_of()).unwrap();
        assert_eq!(relative.comparables[0].score, 65);
    }
}

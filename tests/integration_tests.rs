// Integration tests for DVF Comps

use chrono::NaiveDate;
use dvf_comps::core::{AnalysisError, Analyzer, AnalyzerConfig};
use dvf_comps::models::{
    ComparablesQuery, Coordinate, Homogeneity, PropertyType, Reliability, SearchProfile, Tension,
    Transaction, Verdict,
};
use dvf_comps::services::{
    ComparablesService, GeoplateformeClient, LookupError, SupabaseClient,
};
use mockito::Matcher;
use std::sync::Arc;
use std::time::Duration;

// 1° of latitude on a 6371 km sphere
const METERS_PER_DEGREE: f64 = 111_194.93;

const CENTER_LAT: f64 = 44.8378;
const CENTER_LON: f64 = -0.5792;

fn north_of_center(meters: f64) -> f64 {
    CENTER_LAT + meters / METERS_PER_DEGREE
}

fn create_test_sale(meters: f64, property_type: PropertyType, price_per_m2: f64) -> Transaction {
    Transaction {
        property_type,
        surface_m2: 60.0,
        price: 60.0 * price_per_m2,
        price_per_m2,
        rooms: Some(3),
        sale_date: NaiveDate::from_ymd_opt(2024, 5, 2),
        location: Coordinate::new(north_of_center(meters), CENTER_LON).unwrap(),
        section: None,
        section_median_price_m2: None,
    }
}

fn center() -> Coordinate {
    Coordinate::new(CENTER_LAT, CENTER_LON).unwrap()
}

fn as_of() -> NaiveDate {
    NaiveDate::from_ymd_opt(2024, 12, 31).unwrap()
}

#[test]
fn test_integration_end_to_end_analysis() {
    let analyzer = Analyzer::default();
    let profile = SearchProfile::at(center());

    let candidates = vec![
        create_test_sale(100.0, PropertyType::Apartment, 4800.0),
        create_test_sale(200.0, PropertyType::Apartment, 4800.0),
        create_test_sale(300.0, PropertyType::Apartment, 4800.0),
        create_test_sale(5000.0, PropertyType::Apartment, 4800.0), // Too far
        create_test_sale(50.0, PropertyType::Apartment, 4800.0),
    ];

    let analysis = analyzer.analyze(&profile, candidates, as_of()).unwrap();

    assert_eq!(analysis.total_candidates, 5);
    assert_eq!(analysis.summary.sample_size, 4);

    let distances: Vec<u32> = analysis.comparables.iter().map(|c| c.distance_m).collect();
    assert_eq!(distances, vec![50, 100, 200, 300]);

    // Same price everywhere: score only varies with distance
    for pair in analysis.comparables.windows(2) {
        assert!(pair[0].score >= pair[1].score);
    }

    assert_eq!(analysis.summary.median, 4800.0);
    assert_eq!(analysis.summary.reliability, Reliability::Low);
    assert_eq!(analysis.summary.homogeneity, Some(Homogeneity::Homogeneous));
    assert!(analysis.estimate.is_none());
    assert!(analysis.comparison.is_none());
}

#[test]
fn test_integration_property_type_filter() {
    let analyzer = Analyzer::default();
    let mut profile = SearchProfile::at(center());
    profile.property_type = Some(PropertyType::House);

    let candidates = vec![
        create_test_sale(100.0, PropertyType::House, 3900.0),
        create_test_sale(150.0, PropertyType::Apartment, 5200.0),
        create_test_sale(250.0, PropertyType::House, 4100.0),
    ];

    let analysis = analyzer.analyze(&profile, candidates, as_of()).unwrap();

    assert_eq!(analysis.comparables.len(), 2);
    assert!(analysis
        .comparables
        .iter()
        .all(|c| c.transaction.property_type == PropertyType::House));
    assert_eq!(analysis.summary.median, 4000.0);
}

#[test]
fn test_integration_sample_is_nearest_sales() {
    let analyzer = Analyzer::new(AnalyzerConfig {
        max_comparables: 3,
        ..AnalyzerConfig::default()
    });
    let profile = SearchProfile::at(center());

    let candidates = (1..=8)
        .map(|i| create_test_sale(i as f64 * 50.0, PropertyType::Apartment, 4000.0 + i as f64 * 100.0))
        .collect();

    let analysis = analyzer.analyze(&profile, candidates, as_of()).unwrap();

    assert_eq!(analysis.summary.sample_size, 3);
    assert_eq!(analysis.summary.median, 4200.0);
    assert!(analysis.comparables.iter().all(|c| c.distance_m <= 150));
}

#[test]
fn test_integration_radius_override_is_capped() {
    let analyzer = Analyzer::default();
    let mut profile = SearchProfile::at(center());
    profile.radius_m = Some(20_000.0);

    assert_eq!(analyzer.effective_radius_m(&profile), 5000.0);

    let candidates = vec![
        create_test_sale(4000.0, PropertyType::Apartment, 3500.0),
        create_test_sale(6000.0, PropertyType::Apartment, 3500.0),
    ];
    let analysis = analyzer.analyze(&profile, candidates, as_of()).unwrap();
    assert_eq!(analysis.comparables.len(), 1);
    assert_eq!(analysis.radius_m, 5000.0);
}

#[test]
fn test_integration_no_comparables() {
    let analyzer = Analyzer::default();
    let profile = SearchProfile::at(center());

    let result = analyzer.analyze(
        &profile,
        vec![create_test_sale(900.0, PropertyType::Apartment, 4000.0)],
        as_of(),
    );

    assert_eq!(
        result.unwrap_err(),
        AnalysisError::NoComparables {
            radius_m: 500.0,
            candidates_seen: 1,
        }
    );
}

fn store_row(
    meters: f64,
    surface: f64,
    price_per_m2: f64,
    rooms: u32,
    date: &str,
    section: &str,
) -> serde_json::Value {
    serde_json::json!({
        "type_bien": "Appartement",
        "surface": surface,
        "valeur_fonciere": surface * price_per_m2,
        "prix_m2": price_per_m2,
        "nb_pieces": rooms,
        "latitude": north_of_center(meters),
        "longitude": CENTER_LON,
        "date_mutation": date,
        "section": section,
    })
}

async fn mock_geocoder(server: &mut mockito::ServerGuard) -> mockito::Mock {
    server
        .mock("GET", "/geocodage/search")
        .match_query(Matcher::Any)
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(
            serde_json::json!({
                "type": "FeatureCollection",
                "features": [{
                    "type": "Feature",
                    "geometry": { "type": "Point", "coordinates": [CENTER_LON, CENTER_LAT] },
                    "properties": {
                        "label": "12 Cours de l'Intendance 33000 Bordeaux",
                        "postcode": "33000"
                    }
                }]
            })
            .to_string(),
        )
        .create_async()
        .await
}

fn service(server_url: &str) -> ComparablesService {
    let geocoder = GeoplateformeClient::new(
        format!("{}/geocodage/search", server_url),
        Duration::from_secs(5),
    )
    .unwrap();
    let store = SupabaseClient::new(
        server_url.to_string(),
        "anon-key".to_string(),
        "transactions".to_string(),
        Duration::from_secs(5),
    )
    .unwrap();

    ComparablesService::new(Arc::new(geocoder), Arc::new(store), Analyzer::default(), 500)
}

fn query() -> ComparablesQuery {
    ComparablesQuery {
        adresse: "12 cours de l'Intendance, Bordeaux".to_string(),
        type_bien: Some("Appartement".to_string()),
        surface: Some(50.0),
        prix: Some(250_000.0),
        pieces: Some(2),
        ..ComparablesQuery::default()
    }
}

#[tokio::test]
async fn test_integration_full_lookup() {
    let mut server = mockito::Server::new_async().await;
    let geocoder_mock = mock_geocoder(&mut server).await;

    let rows = serde_json::json!([
        store_row(100.0, 50.0, 5000.0, 2, "2024-06-01", "AB"),
        store_row(200.0, 60.0, 4500.0, 3, "2024-03-10", "AB"),
        store_row(300.0, 45.0, 5500.0, 2, "2023-01-15", "AC"),
        // Skipped at ingestion: no location, then zero surface
        { "type_bien": "Appartement", "surface": 40.0, "valeur_fonciere": 200000.0, "prix_m2": 5000.0 },
        { "type_bien": "Appartement", "surface": 0.0, "valeur_fonciere": 200000.0, "prix_m2": 0.0,
          "latitude": CENTER_LAT, "longitude": CENTER_LON },
        // Outside the bounding box the store was asked for
        store_row(1000.0, 50.0, 9000.0, 2, "2024-06-01", "AD"),
    ]);

    let store_mock = server
        .mock("GET", "/rest/v1/transactions")
        .match_query(Matcher::AllOf(vec![
            Matcher::UrlEncoded("code_postal".into(), "eq.33000".into()),
            Matcher::UrlEncoded("type_bien".into(), "eq.Appartement".into()),
            Matcher::UrlEncoded("prix_m2".into(), "gt.0".into()),
        ]))
        .match_header("apikey", "anon-key")
        .match_header("authorization", "Bearer anon-key")
        .match_header("range", "0-499")
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(rows.to_string())
        .create_async()
        .await;

    let lookup = service(&server.url())
        .lookup_as_of(&query(), as_of())
        .await
        .unwrap();

    geocoder_mock.assert_async().await;
    store_mock.assert_async().await;

    assert_eq!(lookup.address.postcode, "33000");

    let analysis = &lookup.analysis;
    assert_eq!(analysis.total_candidates, 3);
    assert_eq!(analysis.summary.sample_size, 3);
    assert_eq!(analysis.summary.p25, 4750.0);
    assert_eq!(analysis.summary.median, 5000.0);
    assert_eq!(analysis.summary.p75, 5250.0);
    assert_eq!(analysis.summary.reliability, Reliability::Low);
    assert_eq!(analysis.summary.recent_sales, 2);
    assert_eq!(analysis.summary.tension, Tension::Low);
    assert_eq!(analysis.summary.homogeneity, Some(Homogeneity::Heterogeneous));

    let estimate = analysis.estimate.unwrap();
    assert_eq!(estimate.price, 250_000.0);
    assert_eq!(estimate.min, 237_500.0);
    assert_eq!(estimate.max, 262_500.0);

    let comparison = analysis.comparison.unwrap();
    assert_eq!(comparison.price_per_m2, 5000.0);
    assert_eq!(comparison.verdict, Verdict::Fair);

    // Same size and rooms as the target, nearest: ranked first
    let best = &analysis.comparables[0];
    assert_eq!(best.distance_m, 100);
    assert_eq!(best.transaction.surface_m2, 50.0);
    assert_eq!(best.score, 77);

    let distances: Vec<u32> = analysis.comparables.iter().map(|c| c.distance_m).collect();
    assert_eq!(distances, vec![100, 200, 300]);
}

#[tokio::test]
async fn test_integration_unknown_address() {
    let mut server = mockito::Server::new_async().await;
    let _mock = server
        .mock("GET", "/geocodage/search")
        .match_query(Matcher::Any)
        .with_status(200)
        .with_body(r#"{"type":"FeatureCollection","features":[]}"#)
        .create_async()
        .await;

    let err = service(&server.url())
        .lookup_as_of(&query(), as_of())
        .await
        .unwrap_err();

    assert!(matches!(err, LookupError::AddressNotFound(_)));
}

#[tokio::test]
async fn test_integration_store_failure() {
    let mut server = mockito::Server::new_async().await;
    let _geocoder = mock_geocoder(&mut server).await;
    let _mock = server
        .mock("GET", "/rest/v1/transactions")
        .match_query(Matcher::Any)
        .with_status(500)
        .with_body(r#"{"message":"canceling statement due to statement timeout"}"#)
        .create_async()
        .await;

    let err = service(&server.url())
        .lookup_as_of(&query(), as_of())
        .await
        .unwrap_err();

    assert!(matches!(err, LookupError::Store(_)));
}

#[tokio::test]
async fn test_integration_empty_store() {
    let mut server = mockito::Server::new_async().await;
    let _geocoder = mock_geocoder(&mut server).await;
    let _mock = server
        .mock("GET", "/rest/v1/transactions")
        .match_query(Matcher::Any)
        .with_status(200)
        .with_body("[]")
        .create_async()
        .await;

    let err = service(&server.url())
        .lookup_as_of(&query(), as_of())
        .await
        .unwrap_err();

    assert!(matches!(err, LookupError::NoComparables(_)));
    assert_eq!(err.to_string(), "Aucune vente trouvée dans ce périmètre.");
}

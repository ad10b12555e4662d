//! Integration tests for the truth-match table

use ntuplizer::config::{Config, TrackTruthConfig};
use ntuplizer::core::{TableProducer, TrackTruthProducer};
use ntuplizer::error::Error;
use ntuplizer::types::{Cluster3d, DecodedTrack, Event, TrackRef, TruthAssociationMap, TruthCategories};
use pretty_assertions::assert_eq;

fn pipeline() -> impl TableProducer {
    TrackTruthProducer::pipeline(&TrackTruthConfig::default()).unwrap()
}

fn track(pt: f64, id: u64) -> DecodedTrack {
    DecodedTrack { pt, track: TrackRef(id), ..Default::default() }
}

fn truth() -> TruthAssociationMap {
    [
        (TrackRef(10), TruthCategories::new(true, true, false, false)),
        (TrackRef(11), TruthCategories::new(false, false, false, true)),
        (TrackRef(12), TruthCategories::new(false, false, true, false)),
        (TrackRef(13), TruthCategories::new(true, true, true, true)),
    ]
    .into_iter()
    .collect()
}

#[test]
fn test_truth_columns() {
    let tracks = vec![track(5.0, 10), track(3.0, 11), track(2.0, 12), track(9.0, 13)];
    let event = Event::new(2)
        .with_tracks("decoded_tracks", tracks)
        .with_truth("tt_track_truth", truth());
    let table = pipeline().produce(&event).unwrap();

    assert_eq!(table.name, "DecTkTruth");
    assert_eq!(
        table.column_names(),
        vec!["is_genuine", "is_loosely_genuine", "is_unknown", "is_combinatoric", "truth_match_code"]
    );
    assert_eq!(table.uints("is_genuine").unwrap(), &[1, 0, 0, 1]);
    assert_eq!(table.uints("is_combinatoric").unwrap(), &[0, 1, 0, 1]);
    assert_eq!(table.uints("truth_match_code").unwrap(), &[12, 1, 2, 15]);
}

#[test]
fn test_missing_truth_map_fails_event() {
    let event = Event::new(2).with_tracks("decoded_tracks", vec![track(5.0, 10)]);
    let err = pipeline().produce(&event).unwrap_err();
    assert!(matches!(err, Error::MissingTruthRecord(_)));
}

#[test]
fn test_missing_truth_map_fails_even_without_tracks() {
    let event = Event::new(2).with_tracks("decoded_tracks", vec![]);
    assert!(pipeline().produce(&event).is_err());
}

#[test]
fn test_unmatched_track_has_no_category() {
    let event = Event::new(2)
        .with_tracks("decoded_tracks", vec![track(5.0, 10), track(1.0, 99)])
        .with_truth("tt_track_truth", truth());
    let table = pipeline().produce(&event).unwrap();

    assert_eq!(table.row_count, 2);
    assert_eq!(table.uints("is_genuine").unwrap(), &[1, 0]);
    assert_eq!(table.uints("is_loosely_genuine").unwrap(), &[1, 0]);
    assert_eq!(table.uints("is_unknown").unwrap(), &[0, 0]);
    assert_eq!(table.uints("is_combinatoric").unwrap(), &[0, 0]);
    assert_eq!(table.uints("truth_match_code").unwrap(), &[12, 0]);
}

#[test]
fn test_unmatched_track_keeps_other_tables() {
    let set = Config::default().build().unwrap();
    let event = Event::new(3)
        .with_clusters_3d("hgc3d_clusters", vec![Cluster3d { pt: 4.0, eta: 2.0, ..Default::default() }])
        .with_pf_clusters("pf_clusters", vec![])
        .with_tracks("decoded_tracks", vec![track(2.0, 2)])
        .with_truth("tt_track_truth", TruthAssociationMap::new());

    let tables = set.run(&event).unwrap();
    assert_eq!(tables.len(), 3);
    assert_eq!(tables[0].row_count, 1);
    assert_eq!(tables[2].uints("truth_match_code").unwrap(), &[0]);
}

#[test]
fn test_truth_map_from_json() {
    let json = r#"{
        "id": 3,
        "tracks": {"decoded_tracks": [{"pt": 4.0, "track": 7}]},
        "truth": {"tt_track_truth": [{"track": 7, "loosely_genuine": true, "unknown": true}]}
    }"#;
    let event: Event = serde_json::from_str(json).unwrap();
    let table = pipeline().produce(&event).unwrap();
    assert_eq!(table.uints("truth_match_code").unwrap(), &[6]);
    assert_eq!(table.uints("is_genuine").unwrap(), &[0]);
}

//! Scoring, training and artifact tests

use std::sync::Arc;

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::error::PipelineError;
use crate::logic::config::{ScorerConfig, TrainingConfig};
use crate::logic::features::{FeatureSource, FeatureVector};
use crate::logic::fixtures;
use crate::logic::model::{anomaly_score, AnomalyScorer, ModelRegistry, OutlierTrainer};
use crate::logic::observation::Domain;

fn normal_traffic(n: usize) -> Vec<FeatureVector> {
    let mut rng = StdRng::seed_from_u64(1);
    (0..n)
        .map(|_| {
            let mut flow = fixtures::network_flow();
            flow.packet_size = rng.gen_range(400.0..600.0);
            flow.connection_duration = rng.gen_range(1.0..4.0);
            flow.packets_sent = rng.gen_range(10..30);
            flow.packets_received = rng.gen_range(10..30);
            flow.bytes_sent = rng.gen_range(8_000.0..12_000.0);
            flow.bytes_received = rng.gen_range(8_000.0..12_000.0);
            flow.features()
        })
        .collect()
}

fn flood() -> FeatureVector {
    let mut flow = fixtures::network_flow();
    flow.packet_size = 40.0;
    flow.connection_duration = 0.1;
    flow.port_number = 80;
    flow.packets_sent = 50_000;
    flow.packets_received = 0;
    flow.bytes_sent = 2_000_000.0;
    flow.bytes_received = 0.0;
    flow.features()
}

fn trained_scorer() -> AnomalyScorer {
    let model = OutlierTrainer::default()
        .fit(Domain::Network, &normal_traffic(300))
        .unwrap();
    let scorer = AnomalyScorer::new(ScorerConfig::default());
    scorer.install(Arc::new(model));
    scorer
}

#[test]
fn test_not_ready_without_model() {
    let scorer = AnomalyScorer::default();
    let err = scorer.score(&fixtures::email().features()).unwrap_err();

    assert!(matches!(err, PipelineError::ModelNotReady(Domain::Email)));
    assert!(!err.is_bad_input());
}

#[test]
fn test_score_range_and_threshold_consistency() {
    let scorer = trained_scorer();
    let mut vectors = normal_traffic(50);
    vectors.push(flood());

    for vector in &vectors {
        let result = scorer.score(vector).unwrap();

        assert!(result.anomaly_score > 0.0 && result.anomaly_score < 1.0);
        assert!((result.anomaly_score - anomaly_score(result.raw_score)).abs() < 1e-12);
        assert_eq!(result.is_anomaly, result.decision < result.threshold);
        assert_eq!(result.is_anomaly, result.anomaly_score > result.score_threshold);
    }
}

#[test]
fn test_flood_is_flagged() {
    let model = OutlierTrainer::default()
        .fit(Domain::Network, &normal_traffic(300))
        .unwrap();
    // Flag anything below the contamination offset
    let scorer = AnomalyScorer::new(ScorerConfig {
        network_threshold: 0.0,
        ..ScorerConfig::default()
    });
    scorer.install(Arc::new(model));

    let result = scorer.score(&flood()).unwrap();
    assert!(result.decision < 0.0);
    assert!(result.is_anomaly);

    let typical = scorer.score(&normal_traffic(1)[0]).unwrap();
    assert!(result.anomaly_score > typical.anomaly_score);
}

#[test]
fn test_scoring_is_idempotent() {
    let scorer = trained_scorer();
    let vector = flood();

    let first = scorer.score(&vector).unwrap();
    let second = scorer.score(&vector).unwrap();
    assert_eq!(first, second);
}

#[test]
fn test_threshold_is_configurable_per_domain() {
    let model = Arc::new(
        OutlierTrainer::default()
            .fit(Domain::Network, &normal_traffic(100))
            .unwrap(),
    );

    // Threshold far below any decision value: nothing is anomalous
    let lenient = AnomalyScorer::new(ScorerConfig {
        network_threshold: -10.0,
        ..ScorerConfig::default()
    });
    lenient.install(Arc::clone(&model));
    assert!(!lenient.score(&flood()).unwrap().is_anomaly);
    assert_eq!(lenient.threshold(Domain::Network).unwrap().decision_threshold, -10.0);
}

#[test]
fn test_training_requires_two_records() {
    let trainer = OutlierTrainer::new(TrainingConfig::default());

    let err = trainer.fit(Domain::Network, &normal_traffic(1)).unwrap_err();
    assert!(err.is_bad_input());

    assert!(trainer.fit(Domain::Network, &normal_traffic(2)).is_ok());
}

#[test]
fn test_training_rejects_mixed_domains() {
    let mut vectors = normal_traffic(5);
    vectors.push(fixtures::email().features());

    let err = OutlierTrainer::default().fit(Domain::Network, &vectors).unwrap_err();
    assert!(err.is_bad_input());
}

#[test]
fn test_artifacts_round_trip() {
    let dir = tempfile::tempdir().unwrap();
    let registry = ModelRegistry::new(dir.path());
    let model = OutlierTrainer::default()
        .fit(Domain::Network, &normal_traffic(64))
        .unwrap();

    registry.save_outlier(&model).unwrap();
    assert!(registry.detector_path(Domain::Network).exists());
    assert!(registry.scaler_path(Domain::Network).exists());

    let loaded = registry.load_outlier(Domain::Network).unwrap().unwrap();
    assert_eq!(loaded.trained_on, 64);

    let vector = flood();
    assert_eq!(loaded.raw_score(&vector), model.raw_score(&vector));

    let scorer = registry.load_scorer(ScorerConfig::default());
    assert!(scorer.is_ready(Domain::Network));
    assert!(!scorer.is_ready(Domain::Email));
}

#[test]
fn test_missing_artifacts_are_not_an_error() {
    let dir = tempfile::tempdir().unwrap();
    let registry = ModelRegistry::new(dir.path());

    assert!(registry.load_outlier(Domain::Email).unwrap().is_none());
    assert!(registry.load_threat_model(Domain::Email).unwrap().is_none());
    assert!(!registry.load_classifier().has_model(Domain::Email));
}

#[test]
fn test_layout_mismatch_is_refused() {
    let dir = tempfile::tempdir().unwrap();
    let registry = ModelRegistry::new(dir.path());
    let model = OutlierTrainer::default()
        .fit(Domain::Network, &normal_traffic(16))
        .unwrap();
    registry.save_outlier(&model).unwrap();

    // Tamper with the recorded layout hash in both files
    for path in [registry.detector_path(Domain::Network), registry.scaler_path(Domain::Network)] {
        let mut json: serde_json::Value =
            serde_json::from_slice(&std::fs::read(&path).unwrap()).unwrap();
        json["layout"]["hash"] = serde_json::json!(12345);
        std::fs::write(&path, serde_json::to_vec(&json).unwrap()).unwrap();
    }

    let err = registry.load_outlier(Domain::Network).unwrap_err();
    assert!(matches!(err, PipelineError::Artifact { .. }));

    // Startup degrades to not ready instead of failing
    let scorer = registry.load_scorer(ScorerConfig::default());
    assert!(!scorer.is_ready(Domain::Network));
}

#[test]
fn test_incomplete_pair_is_refused() {
    let dir = tempfile::tempdir().unwrap();
    let registry = ModelRegistry::new(dir.path());
    let model = OutlierTrainer::default()
        .fit(Domain::Email, &[fixtures::email().features(), fixtures::email().features()])
        .unwrap();
    registry.save_outlier(&model).unwrap();

    std::fs::remove_file(registry.scaler_path(Domain::Email)).unwrap();
    assert!(registry.load_outlier(Domain::Email).is_err());
}

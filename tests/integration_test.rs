// Integration tests for tracklist
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::collections::HashSet;
use std::sync::Arc;
use tracklist::prelude::*;
use tracklist::PlaylistVectors;

const FEATURES: [&str; 13] = [
    "danceability",
    "energy",
    "key",
    "loudness",
    "mode",
    "speechiness",
    "acousticness",
    "instrumentalness",
    "liveness",
    "valence",
    "tempo",
    "duration_ms",
    "time_signature",
];

fn tracks(n: usize, seed: u64) -> FeatureTable {
    let mut rng = StdRng::seed_from_u64(seed);
    let rows = (0..n)
        .map(|i| {
            serde_json::json!({
                "name": format!("Track {}", i),
                "artist": format!("Artist {}", i % 17),
                "danceability": rng.random_range(0.0..1.0),
                "energy": rng.random_range(0.0..1.0),
                "key": rng.random_range(0..12),
                "loudness": rng.random_range(-30.0..0.0),
                "mode": rng.random_range(0..2),
                "speechiness": rng.random_range(0.0..0.5),
                "acousticness": rng.random_range(0.0..1.0),
                "instrumentalness": rng.random_range(0.0..1.0),
                "liveness": rng.random_range(0.0..1.0),
                "valence": rng.random_range(0.0..1.0),
                "tempo": rng.random_range(60.0..200.0),
                "duration_ms": rng.random_range(90_000..420_000),
                "time_signature": rng.random_range(3..6),
            })
        })
        .collect();
    FeatureTable::new(rows)
}

fn embed(n: usize, dim: usize) -> Arc<EmbeddedCorpus> {
    let reducer = FeatureReducer::new(FEATURES, dim).unwrap();
    let (_, corpus) = reducer.fit_transform(&tracks(n, 42)).unwrap();
    Arc::new(corpus)
}

fn resolve(ids: &[usize], corpus: &EmbeddedCorpus) -> PlaylistVectors {
    Playlist::new(ids.to_vec()).unwrap().resolve(corpus).unwrap()
}

#[test]
fn test_flat_walk_scenario() {
    let corpus = embed(500, 8);
    assert_eq!(corpus.len(), 500);
    assert_eq!(corpus.dim(), 8);

    let handle = IndexFactory::default()
        .build(corpus.clone(), &IndexSpec::FlatL2)
        .unwrap();
    let playlist = PlaylistWalker::default().walk(&handle, 0, 10).unwrap();

    assert_eq!(playlist.len(), 10);
    assert_eq!(playlist.first(), Some(0));
    let distinct: HashSet<usize> = playlist.iter().collect();
    assert_eq!(distinct.len(), 10);
    assert!(playlist.iter().all(|id| id < 500));
}

#[test]
fn test_every_strategy_walks_distinct() {
    let corpus = embed(500, 8);
    let factory = IndexFactory::default();
    let specs = [
        IndexSpec::FlatL2,
        IndexSpec::FlatInnerProduct,
        IndexSpec::graph_approx(16),
        IndexSpec::clustered_flat(8, 4),
        IndexSpec::clustered_quantized(8, 4, 4),
    ];

    for spec in &specs {
        let handle = factory.build(corpus.clone(), spec).unwrap();
        assert_eq!(handle.len(), 500);
        for seed in [0, 137, 499] {
            let playlist = PlaylistWalker::default().walk(&handle, seed, 10).unwrap();
            assert_eq!(playlist.len(), 10, "{:?}", spec);
            assert_eq!(playlist.first(), Some(seed));
            let distinct: HashSet<usize> = playlist.iter().collect();
            assert_eq!(distinct.len(), 10, "{:?} from {}", spec, seed);
        }
    }
}

#[test]
fn test_too_many_clusters_rejected() {
    let corpus = embed(50, 8);
    let factory = IndexFactory::default();
    let spec = IndexSpec::clustered_flat(32, 1);

    // build() runs validate() before constructing or training anything, so the
    // shape-only check must yield the identical error
    let shape_only = factory.validate(corpus.len(), corpus.dim(), &spec).unwrap_err();
    let err = factory.build(corpus, &spec).unwrap_err();
    assert!(matches!(err, Error::Configuration(_)), "{:?}", err);
    assert_eq!(err.to_string(), shape_only.to_string());
}

#[test]
fn test_bad_quantizer_parameters_rejected() {
    let corpus = embed(500, 8);
    let factory = IndexFactory::default();

    // 3 does not divide 8
    let err = factory
        .build(corpus.clone(), &IndexSpec::clustered_quantized(4, 2, 3))
        .unwrap_err();
    assert!(matches!(err, Error::Configuration(_)));

    // 2^9 codewords cannot be trained
    let err = factory
        .build(
            corpus.clone(),
            &IndexSpec::ClusteredQuantized {
                cluster_count: 4,
                probe_count: 2,
                segment_count: 4,
                bits_per_code: 9,
            },
        )
        .unwrap_err();
    assert!(matches!(err, Error::Configuration(_)));

    let small = embed(200, 8);
    let err = factory
        .build(small, &IndexSpec::clustered_quantized(4, 2, 4))
        .unwrap_err();
    assert!(matches!(err, Error::Configuration(_)));

    let err = factory
        .build(corpus, &IndexSpec::clustered_flat(4, 5))
        .unwrap_err();
    assert!(matches!(err, Error::Configuration(_)));
}

#[test]
fn test_disjoint_playlists_pairwise_distance() {
    let corpus = embed(500, 8);
    let a: Vec<usize> = (0..10).collect();
    let b: Vec<usize> = (100..110).collect();

    let got = SimilarityScorer::mean_pairwise_distance(&resolve(&a, &corpus), &resolve(&b, &corpus))
        .unwrap();

    let mut total = 0.0f64;
    for &i in &a {
        for &j in &b {
            let x = corpus.row(i).unwrap();
            let y = corpus.row(j).unwrap();
            total += x
                .iter()
                .zip(y)
                .map(|(p, q)| (*p as f64 - *q as f64).powi(2))
                .sum::<f64>()
                .sqrt();
        }
    }
    let expected = total / 100.0;

    assert!(got.is_finite());
    assert!(got >= 0.0);
    assert!((got - expected).abs() < 1e-9);
}

#[test]
fn test_scores_are_reflexive() {
    let corpus = embed(500, 8);
    let handle = IndexFactory::default()
        .build(corpus.clone(), &IndexSpec::graph_approx(12))
        .unwrap();
    let playlist = PlaylistWalker::default().walk(&handle, 3, 10).unwrap();
    let vectors = playlist.resolve(&corpus).unwrap();

    let report = SimilarityScorer::score(&vectors, &vectors).unwrap();
    assert_eq!(report.cosine, 1.0);
    assert_eq!(report.centroid_distance, 0.0);
    assert!(report.pairwise_distance > 0.0);
}

#[test]
fn test_reduction_is_deterministic() {
    let table = tracks(300, 7);
    let reducer = FeatureReducer::new(FEATURES, 8).unwrap();
    let (first, a) = reducer.fit_transform(&table).unwrap();
    let (second, b) = reducer.fit_transform(&table).unwrap();

    assert_eq!(a.as_slice(), b.as_slice());
    assert_eq!(first.space_id(), second.space_id());

    // row order is preserved: re-embedding a row reproduces its corpus row
    let raw: Vec<f64> = FEATURES.iter().map(|f| table.numeric(42, f).unwrap()).collect();
    let row = first.transform_row(&raw).unwrap();
    for (x, y) in row.as_slice().iter().zip(a.row(42).unwrap()) {
        assert!((x - y).abs() < 1e-5);
    }
}

#[test]
fn test_build_and_walk_are_deterministic() {
    let corpus = embed(500, 8);
    let factory = IndexFactory::default();
    for spec in [IndexSpec::graph_approx(8), IndexSpec::clustered_quantized(8, 2, 4)] {
        let first = factory.build(corpus.clone(), &spec).unwrap();
        let second = factory.build(corpus.clone(), &spec).unwrap();
        let walker = PlaylistWalker::default();
        assert_eq!(
            walker.walk(&first, 11, 10).unwrap(),
            walker.walk(&second, 11, 10).unwrap()
        );
    }
}

#[test]
fn test_playlists_from_different_reductions_do_not_mix() {
    let table = tracks(100, 1);
    let (_, eight) = FeatureReducer::new(FEATURES, 8).unwrap().fit_transform(&table).unwrap();
    let (_, other) = FeatureReducer::new(FEATURES[..12].iter().copied(), 8)
        .unwrap()
        .fit_transform(&table)
        .unwrap();
    let (_, four) = FeatureReducer::new(FEATURES, 4).unwrap().fit_transform(&table).unwrap();

    let ids = [0, 1, 2];
    let a = resolve(&ids, &eight);
    assert!(matches!(
        SimilarityScorer::score(&a, &resolve(&ids, &other)),
        Err(Error::SpaceMismatch { .. })
    ));
    assert!(SimilarityScorer::centroid_cosine(&a, &resolve(&ids, &four))
        .unwrap_err()
        .is_dimension_mismatch());
}

#[test]
fn test_bad_table_is_data_error() {
    let mut rows = tracks(20, 3).rows().to_vec();
    rows[9]["energy"] = serde_json::Value::Null;
    let err = FeatureReducer::new(FEATURES, 4)
        .unwrap()
        .fit_transform(&FeatureTable::new(rows))
        .unwrap_err();
    match err {
        Error::Data { row, column, .. } => {
            assert_eq!(row, 9);
            assert_eq!(column, "energy");
        }
        other => panic!("unexpected {:?}", other),
    }
}

#[test]
fn test_playlist_labels() {
    let table = tracks(60, 5);
    let (_, corpus) = FeatureReducer::new(FEATURES, 6).unwrap().fit_transform(&table).unwrap();
    let handle = IndexFactory::default()
        .build(Arc::new(corpus), &IndexSpec::FlatL2)
        .unwrap();
    let playlist = PlaylistWalker::default().walk(&handle, 4, 5).unwrap();

    let names = playlist.labels(&table, "name");
    assert_eq!(names.len(), 5);
    assert_eq!(names[0].as_deref(), Some("Track 4"));
    assert!(names.iter().all(Option::is_some));
}

#[test]
fn test_item_similarity() {
    let corpus = embed(100, 8);
    let (cos, dist) = SimilarityScorer::item_similarity(&corpus, 5, 5).unwrap();
    assert!((cos - 1.0).abs() < 1e-12);
    assert_eq!(dist, 0.0);

    let (cos, dist) = SimilarityScorer::item_similarity(&corpus, 5, 6).unwrap();
    assert!((-1.0..=1.0).contains(&cos));
    assert!(dist > 0.0);
}

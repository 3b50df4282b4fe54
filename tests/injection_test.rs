use motif_inject::{
    larger_motif_set, similarity, tpm, BaseMethod, Generator, GeneratorConfig, InjectionResult,
    MotifShape, RunningStats, Strategy,
};

fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

fn run(config: GeneratorConfig) -> InjectionResult {
    init_tracing();
    Generator::new(config).unwrap().run().unwrap()
}

fn distance(series: &[f64], stats: &RunningStats, a: usize, b: usize) -> f64 {
    similarity(series, stats, a, b, f64::INFINITY).unwrap().value()
}

/// Every pair of `positions` is within `radius` and no position belongs to a
/// group larger than `positions`.
fn assert_exclusive_group(result: &InjectionResult, window: usize, radius: f64) {
    let series = &result.series;
    let stats = RunningStats::calc(series, window).unwrap();
    let primary = result.primary();
    for (k, &a) in primary.iter().enumerate() {
        for &b in &primary[k + 1..] {
            let d = distance(series, &stats, a, b);
            assert!(d <= radius, "occurrences {a} and {b} at {d} > {radius}");
        }
    }
    for &p in primary {
        let size = larger_motif_set(series, &stats, p, primary.len(), radius).unwrap();
        assert_eq!(size, primary.len(), "group around {p}");
    }
}

#[test]
fn set_motif_end_to_end() {
    let config = GeneratorConfig::new(300, 20)
        .with_size(3)
        .with_shape(MotifShape::Box)
        .with_height(50.0)
        .with_strategy(Strategy::Set)
        .with_seed(7);
    let result = run(config);

    assert_eq!(result.series.len(), 300);
    assert_eq!(result.primary().len(), 3);
    assert_eq!(result.motif, vec![MotifShape::Box.render(20, 50.0).unwrap()]);
    assert_eq!(result.radii.len(), result.positions.len());

    let radius = result.radius().unwrap();
    assert!(radius > 0.0);
    assert_exclusive_group(&result, 20, radius);
}

#[test]
fn set_motif_reports_top_pair() {
    let config = GeneratorConfig::new(500, 20)
        .with_strategy(Strategy::Set)
        .with_height(40.0)
        .with_seed(19);
    let result = run(config);
    let stats = RunningStats::calc(&result.series, 20).unwrap();
    let top = result.top_pair.unwrap();
    assert_eq!(Some(top), tpm(&result.series, &stats).unwrap());
    assert!(top.b >= top.a + 20);
}

#[test]
fn latent_motif_checked_at_twice_the_radius() {
    let config = GeneratorConfig::new(600, 20)
        .with_strategy(Strategy::Latent)
        .with_method(BaseMethod::NormalRandomWalk)
        .with_shape(MotifShape::Sine)
        .with_height(40.0)
        .with_seed(3);
    let result = run(config);

    assert_eq!(result.primary().len(), 3);
    assert_eq!(result.motif.len(), 1);
    assert_eq!(result.motif[0].len(), 20);
    let radius = result.radius().unwrap();
    assert_exclusive_group(&result, 20, 2.0 * radius);
}

#[test]
fn pair_motif_is_top_pair() {
    let config = GeneratorConfig::new(400, 16)
        .with_strategy(Strategy::Pair)
        .with_method(BaseMethod::NormalRandomWalk)
        .with_shape(MotifShape::Semicircle)
        .with_height(30.0)
        .with_smaller(2)
        .with_seed(5);
    let result = run(config);

    // Pair runs carry no decoy groups
    assert_eq!(result.positions.len(), 1);
    assert!(result.decoys().is_empty());
    let (p0, p1) = (result.primary()[0], result.primary()[1]);
    let top = result.top_pair.unwrap();
    assert_eq!((top.a, top.b), (p0.min(p1), p0.max(p1)));
    assert!((top.distance - result.radius().unwrap()).abs() < 1e-9);
    assert_eq!(result.motif.len(), 2);
}

#[test]
fn decoy_groups_are_smaller_and_apart() {
    let config = GeneratorConfig::new(1500, 20)
        .with_size(4)
        .with_strategy(Strategy::Set)
        .with_height(40.0)
        .with_smaller(2)
        .with_seed(11);
    let result = run(config);

    assert_eq!(result.primary().len(), 4);
    let all: Vec<usize> = result.positions.iter().flatten().copied().collect();
    for (k, &a) in all.iter().enumerate() {
        for &b in &all[k + 1..] {
            assert!(a.abs_diff(b) >= 40, "occurrences {a} and {b} overlap");
        }
    }
    for group in result.decoys() {
        assert!((2..=3).contains(&group.len()), "decoy group {group:?}");
    }
}

#[test]
fn bounded_base_keeps_occurrences_in_bound() {
    let config = GeneratorConfig::new(800, 20)
        .with_strategy(Strategy::Set)
        .with_method(BaseMethod::BoundedNormalRandomWalk)
        .with_maxi(20.0)
        .with_height(10.0)
        .with_seed(13);
    let result = run(config);
    for group in &result.positions {
        for &p in group {
            for v in &result.series[p..p + 20] {
                assert!(v.abs() <= 20.0 + 1e-9, "value {v} of occurrence {p}");
            }
        }
    }
}

#[test]
fn runs_are_reproducible() {
    for strategy in [Strategy::Pair, Strategy::Set, Strategy::Latent] {
        let config = GeneratorConfig::new(400, 16)
            .with_strategy(strategy)
            .with_method(BaseMethod::RealRandomWalk)
            .with_height(30.0)
            .with_seed(42);
        let a = run(config.clone());
        let b = run(config);
        assert_eq!(a, b, "{} runs differ", strategy.name());
    }
}

#[test]
fn different_seeds_differ() {
    let config = GeneratorConfig::new(300, 20).with_strategy(Strategy::Set);
    let a = run(config.clone().with_seed(1));
    let b = run(config.with_seed(2));
    assert_ne!(a.series, b.series);
}

#[test]
fn config_round_trips_through_json() {
    let config = GeneratorConfig::new(300, 20)
        .with_shape(MotifShape::Custom(vec![0.0; 20]))
        .with_strategy(Strategy::Pair)
        .with_seed(9);
    let json = serde_json::to_string(&config).unwrap();
    let back: GeneratorConfig = serde_json::from_str(&json).unwrap();
    assert_eq!(back, config);
}

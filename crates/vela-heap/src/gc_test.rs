use super::*;

#[test]
fn raises_threshold_when_heap_mostly_freed() {
    let config = GcConfig::default();
    let next = recompute_threshold(&config, 100_000, 90_000, 100_000);
    assert_eq!(next, 300_000);
}

#[test]
fn tightens_threshold_when_little_freed() {
    let config = GcConfig::default();
    let next = recompute_threshold(&config, 100_000, 5_000, 100_000);
    assert_eq!(next, 150_000);
}

#[test]
fn doubles_on_typical_cycle() {
    let config = GcConfig::default();
    let next = recompute_threshold(&config, 100_000, 30_000, 100_000);
    assert_eq!(next, 200_000);
}

#[test]
fn clamps_to_configured_bounds() {
    let config = GcConfig { min_threshold: 1_000, max_threshold: 2_000, ..GcConfig::default() };
    assert_eq!(recompute_threshold(&config, 10_000, 9_000, 10_000), 2_000);
    assert_eq!(recompute_threshold(&config, 100, 10, 100), 1_000);
}

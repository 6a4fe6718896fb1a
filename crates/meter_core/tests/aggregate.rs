use meter_core::{AggregateMeter, MeterTable};

#[test]
fn fresh_meter_counts_from_zero() {
    let meter = AggregateMeter::new(3);

    assert_eq!(meter.counts(), (0, 3));
    assert!(!meter.is_complete());
    assert_eq!(meter.fraction(), 0.0);
    assert_eq!(meter.jobs_label(), "Jobs: 0 / 3");
}

#[test]
fn completions_accumulate_and_clamp_at_total() {
    let meter = AggregateMeter::new(3);

    assert!(meter.complete_one());
    assert_eq!(meter.jobs_label(), "Jobs: 1 / 3");
    assert!(meter.complete_one());
    assert!(meter.complete_one());
    assert!(meter.is_complete());
    assert_eq!(meter.fraction(), 1.0);

    // Surplus completion signals do not push past the total, and report
    // that nothing advanced.
    assert!(!meter.complete_one());
    assert_eq!(meter.counts(), (3, 3));
}

#[test]
fn status_lookup_for_unseen_worker_is_absent() {
    let table = MeterTable::new();
    assert_eq!(table.worker_status(42), None);
}

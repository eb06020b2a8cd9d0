//! Scenario S6: the reference control-plane trace, exercised directly from
//! outside the crate the way a caller that only sees the public API would.

use ran5g_fec::run_attach_trace;

#[test]
fn public_api_exposes_a_converging_attach_trace() {
    let report = run_attach_trace().unwrap();
    assert!(report.ldpc_converged);
    assert!(report.polar_converged);
    assert!(report.ldpc_iterations >= 1);
}

#[test]
fn running_the_trace_twice_gives_the_same_outcome() {
    // The trace has no hidden randomness; repeated calls are deterministic.
    let first = run_attach_trace().unwrap();
    let second = run_attach_trace().unwrap();
    assert_eq!(first, second);
}

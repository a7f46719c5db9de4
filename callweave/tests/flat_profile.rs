//! End-to-end coverage of `#[flat_profile]`.

use std::cell::RefCell;
use std::time::Duration;

use callweave::flat_profile;
use callweave::profile::{CallTimes, FnDescriptor};

thread_local! {
    static REPORTS: RefCell<Vec<Report>> = const { RefCell::new(Vec::new()) };
}

#[derive(Debug, Clone)]
struct Report {
    total: Duration,
    limit: Duration,
    calls: Vec<(String, usize)>,
    function: String,
}

fn capture(total: Duration, limit: Duration, times: &CallTimes, func: &FnDescriptor) {
    REPORTS.with(|reports| {
        reports.borrow_mut().push(Report {
            total,
            limit,
            calls: times
                .iter()
                .map(|(name, durations)| (name.to_string(), durations.len()))
                .collect(),
            function: func.name.to_string(),
        })
    });
}

fn take_reports() -> Vec<Report> {
    REPORTS.with(|reports| reports.borrow_mut().drain(..).collect())
}

fn step_a() -> u32 {
    1
}

fn step_b() -> u32 {
    2
}

fn nap() {
    std::thread::sleep(Duration::from_millis(5));
}

#[flat_profile(time_limit = 60, below_callback = capture, above_callback = none)]
fn quick() -> u32 {
    step_a() + step_a() + step_b()
}

#[test]
fn below_limit_reports_through_the_below_callback() {
    assert_eq!(quick(), 4);
    let reports = take_reports();
    assert_eq!(reports.len(), 1);
    let report = &reports[0];
    assert_eq!(report.limit, Duration::from_secs(60));
    assert!(report.total < report.limit);
    assert!(report.function.ends_with("::quick"));
    assert_eq!(
        report.calls,
        [("step_a".to_string(), 2), ("step_b".to_string(), 1)]
    );
}

#[flat_profile(time_limit = 0.001, below_callback = none, above_callback = capture)]
fn slow() -> u32 {
    nap();
    step_b()
}

#[test]
fn above_limit_reports_through_the_above_callback() {
    assert_eq!(slow(), 2);
    let reports = take_reports();
    assert_eq!(reports.len(), 1);
    let report = &reports[0];
    assert!(report.total >= report.limit);
    assert_eq!(
        report.calls,
        [("nap".to_string(), 1), ("step_b".to_string(), 1)]
    );
}

#[test]
fn each_invocation_reports_once() {
    quick();
    quick();
    quick();
    assert_eq!(take_reports().len(), 3);
}

#[flat_profile(time_limit = 60, below_callback = capture, above_callback = none)]
fn partial() -> u32 {
    step_a();
    panic!("boom");
}

#[test]
fn panicking_bodies_still_report_the_partial_breakdown() {
    let result = std::panic::catch_unwind(partial);
    assert!(result.is_err());
    let reports = take_reports();
    assert_eq!(reports.len(), 1);
    assert_eq!(reports[0].calls, [("step_a".to_string(), 1)]);
}

#[flat_profile(
    time_limit = 60,
    below_callback = capture,
    above_callback = none,
    whitelist("step_b")
)]
fn filtered() -> u32 {
    step_a() + step_b()
}

#[test]
fn filters_apply_to_profiled_calls_too() {
    assert_eq!(filtered(), 3);
    let reports = take_reports();
    assert_eq!(reports[0].calls, [("step_b".to_string(), 1)]);
}

#[flat_profile(time_limit = 60, below_callback = capture, above_callback = none)]
fn fallible(input: &str) -> Result<u32, std::num::ParseIntError> {
    let parsed = input.parse::<u32>()?;
    Ok(parsed + step_a())
}

#[test]
fn early_returns_via_question_mark_still_report() {
    assert!(fallible("oops").is_err());
    let reports = take_reports();
    assert_eq!(reports.len(), 1);
    assert_eq!(reports[0].calls, [("input.parse".to_string(), 1)]);
}

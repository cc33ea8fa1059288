// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use chrono::TimeZone;

// 2026-03-04 is a Wednesday (dow=3).
fn wed(hour: u32, minute: u32) -> DateTime<Local> {
    match Local.with_ymd_and_hms(2026, 3, 4, hour, minute, 0) {
        chrono::LocalResult::Single(t) => t,
        _ => panic!("ambiguous local time"),
    }
}

#[test]
fn wildcard_matches_every_minute() {
    let expr = CronExpr::parse("* * * * *").unwrap();
    for minute in [0, 17, 59] {
        assert!(expr.matches(wed(13, minute)));
    }
}

#[yare::parameterized(
    step_5_on_slot  = { "*/5 * * * *", 25, true },
    step_5_off_slot = { "*/5 * * * *", 27, false },
    step_7_zero     = { "*/7 * * * *", 0, true },
    step_7_on_slot  = { "*/7 * * * *", 56, true },
    step_7_off_slot = { "*/7 * * * *", 58, false },
)]
fn interval_matches_multiples_of_n(source: &str, minute: u32, expected: bool) {
    let expr = CronExpr::parse(source).unwrap();
    assert_eq!(expr.matches(wed(8, minute)), expected);
}

#[test]
fn range_matches_inclusive_bounds() {
    let expr = CronExpr::parse("10-20 * * * *").unwrap();
    assert!(!expr.matches(wed(8, 9)));
    assert!(expr.matches(wed(8, 10)));
    assert!(expr.matches(wed(8, 15)));
    assert!(expr.matches(wed(8, 20)));
    assert!(!expr.matches(wed(8, 21)));
}

#[test]
fn comma_list_unions_components() {
    let expr = CronExpr::parse("0,30,45-47 * * * *").unwrap();
    for (minute, expected) in [(0, true), (30, true), (46, true), (15, false)] {
        assert_eq!(expr.matches(wed(8, minute)), expected);
    }
}

#[test]
fn day_of_week_sunday_is_zero() {
    // 2026-03-08 is a Sunday.
    let sunday = match Local.with_ymd_and_hms(2026, 3, 8, 9, 0, 0) {
        chrono::LocalResult::Single(t) => t,
        _ => panic!("ambiguous local time"),
    };
    assert!(CronExpr::parse("0 9 * * 0").unwrap().matches(sunday));
    assert!(!CronExpr::parse("0 9 * * 1").unwrap().matches(sunday));
}

#[yare::parameterized(
    minute_out_of_range = { "60 * * * *" },
    hour_out_of_range   = { "0 24 * * *" },
    dom_zero            = { "0 0 0 * *" },
    month_thirteen      = { "0 0 1 13 *" },
    dow_seven           = { "0 0 * * 7" },
    descending_range    = { "30-10 * * * *" },
    zero_step           = { "*/0 * * * *" },
    not_a_number        = { "x * * * *" },
    four_fields         = { "* * * *" },
    six_fields          = { "* * * * * *" },
)]
fn invalid_expressions_reject(source: &str) {
    assert!(CronExpr::parse(source).is_err());
}

#[test]
fn descending_range_error_names_field() {
    let err = CronExpr::parse("* 9-3 * * *").unwrap_err();
    assert_eq!(err, CronError::DescendingRange { field: "hour", start: 9, end: 3 });
}

#[test]
fn latest_before_returns_todays_elapsed_slot() {
    let expr = CronExpr::parse("0 9 * * *").unwrap();
    assert_eq!(expr.latest_before(wed(10, 15)), Some(wed(9, 0)));
    assert_eq!(expr.latest_before(wed(9, 0)), Some(wed(9, 0)));
    assert_eq!(expr.latest_before(wed(8, 59)), None);
}

#[test]
fn latest_before_picks_most_recent_slot() {
    let expr = CronExpr::parse("*/5 * * * *").unwrap();
    assert_eq!(expr.latest_before(wed(12, 31)), Some(wed(12, 30)));
    assert_eq!(expr.latest_before(wed(12, 35)), Some(wed(12, 35)));
}

#[test]
fn latest_before_none_when_date_fields_miss() {
    // Monday-only schedule evaluated on a Wednesday.
    let expr = CronExpr::parse("0 6 * * 1").unwrap();
    assert_eq!(expr.latest_before(wed(23, 59)), None);
}

#[test]
fn latest_before_does_not_cross_midnight() {
    let expr = CronExpr::parse("30 23 * * *").unwrap();
    assert_eq!(expr.latest_before(wed(0, 10)), None);
    assert_eq!(expr.latest_before(wed(23, 45)), Some(wed(23, 30)));
}

#[test]
fn latest_before_scans_past_sparse_minutes() {
    // At 14:05 the 14:xx slot (minute 30) has not elapsed; 13:30 has.
    let expr = CronExpr::parse("30 * * * *").unwrap();
    assert_eq!(expr.latest_before(wed(14, 5)), Some(wed(13, 30)));
}

#[test]
fn next_after_same_day() {
    let expr = CronExpr::parse("*/15 * * * *").unwrap();
    assert_eq!(expr.next_after(wed(9, 0)), Some(wed(9, 15)));
    assert_eq!(expr.next_after(wed(9, 50)), Some(wed(10, 0)));
}

#[test]
fn next_after_rolls_to_next_matching_day() {
    // Daily 09:00, asked after today's slot passed.
    let expr = CronExpr::parse("0 9 * * *").unwrap();
    let next = expr.next_after(wed(10, 0)).unwrap();
    assert_eq!(next, match Local.with_ymd_and_hms(2026, 3, 5, 9, 0, 0) {
        chrono::LocalResult::Single(t) => t,
        _ => panic!("ambiguous local time"),
    });
}

#[test]
fn next_after_honors_day_of_week() {
    // Monday-only schedule asked on a Wednesday: 2026-03-09 is the next Monday.
    let expr = CronExpr::parse("0 6 * * 1").unwrap();
    let next = expr.next_after(wed(12, 0)).unwrap();
    assert_eq!(next.date_naive(), chrono::NaiveDate::from_ymd_opt(2026, 3, 9).unwrap());
}

#[test]
fn next_after_is_strictly_after() {
    let expr = CronExpr::parse("0 9 * * *").unwrap();
    assert_eq!(expr.next_after(wed(9, 0)), Some(wed(9, 0) + chrono::Duration::days(1)));
}

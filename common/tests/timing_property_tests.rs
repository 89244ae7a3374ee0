// Property-based tests for trigger time calculation

use chrono::{Duration, TimeZone, Utc};
use chrono_tz::America::Chicago;
use common::timing::{warning_offset, TimeGate};
use proptest::prelude::*;

// Epoch-second range covering 2000–2100, wide enough to cross many DST
// boundaries in the conference timezone
const EPOCH_RANGE: std::ops::Range<i64> = 946_684_800..4_102_444_800;

// ============================================================================
// Timezone normalization is idempotent
// ============================================================================

#[test]
fn property_to_conference_time_idempotent() {
    proptest!(|(secs in EPOCH_RANGE)| {
        let gate = TimeGate::new(Chicago);
        let ts = Utc.timestamp_opt(secs, 0).unwrap();

        let once = gate.to_conference_time(ts);
        let twice = gate.to_conference_time(once);

        prop_assert_eq!(once, twice);
        // Conversion changes representation, never the instant
        prop_assert_eq!(once.with_timezone(&Utc), ts);
    });
}

// ============================================================================
// The warning trigger is always exactly five minutes before the immediate
// ============================================================================

#[test]
fn property_warning_exactly_five_minutes_before() {
    proptest!(|(start_secs in EPOCH_RANGE, now_secs in EPOCH_RANGE, post_now in any::<bool>())| {
        let gate = TimeGate::new(Chicago);
        let start = gate.to_conference_time(Utc.timestamp_opt(start_secs, 0).unwrap());
        let now = Utc.timestamp_opt(now_secs, 0).unwrap();

        let post_time = gate.effective_post_time(start, now, post_now);
        let warning = gate.warning_time(post_time);

        prop_assert_eq!(post_time - warning, warning_offset());
    });
}

// ============================================================================
// post_now lands the immediate trigger within 5s of now + 5min
// ============================================================================

#[test]
fn property_post_now_window() {
    proptest!(|(start_secs in EPOCH_RANGE, now_secs in EPOCH_RANGE)| {
        let gate = TimeGate::new(Chicago);
        let start = gate.to_conference_time(Utc.timestamp_opt(start_secs, 0).unwrap());
        let now = Utc.timestamp_opt(now_secs, 0).unwrap();

        let post_time = gate.effective_post_time(start, now, true);
        let delta = post_time.with_timezone(&Utc) - (now + Duration::minutes(5));

        prop_assert!(delta >= Duration::zero());
        prop_assert!(delta <= Duration::seconds(5));

        // ...which makes the warning due right away
        let warning = gate.warning_time(post_time);
        prop_assert!(warning.with_timezone(&Utc) - now <= Duration::seconds(5));
    });
}

// ============================================================================
// is_due agrees with plain instant ordering
// ============================================================================

#[test]
fn property_is_due_matches_ordering() {
    proptest!(|(trigger_secs in EPOCH_RANGE, now_secs in EPOCH_RANGE)| {
        let gate = TimeGate::new(Chicago);
        let trigger = gate.to_conference_time(Utc.timestamp_opt(trigger_secs, 0).unwrap());
        let now = Utc.timestamp_opt(now_secs, 0).unwrap();

        prop_assert_eq!(gate.is_due(trigger, now), trigger_secs <= now_secs);
    });
}

// ============================================================================
// Offset-carrying timestamp strings survive a parse round trip
// ============================================================================

#[test]
fn property_parse_round_trip() {
    proptest!(|(secs in EPOCH_RANGE)| {
        let gate = TimeGate::new(Chicago);
        let ts = gate.to_conference_time(Utc.timestamp_opt(secs, 0).unwrap());

        let formatted = ts.format("%Y-%m-%d %H:%M:%S %z").to_string();
        let parsed = gate.parse_timestamp(&formatted).unwrap();

        prop_assert_eq!(parsed, ts);
    });
}

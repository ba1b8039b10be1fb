use crate::calendar::Slot;
use crate::types::{BlockedTime, Booking};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Whether the half-open intervals `[a_start, a_end)` and `[b_start, b_end)`
/// share an instant. Touching intervals do not overlap.
pub fn overlaps<T: PartialOrd>(a_start: T, a_end: T, b_start: T, b_end: T) -> bool {
    a_start < b_end && b_start < a_end
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SlotStatus {
    Available,
    Booked,
    Blocked,
    Past,
}

impl SlotStatus {
    pub fn is_reservable(self) -> bool {
        self == SlotStatus::Available
    }
}

pub fn is_booked(start: DateTime<Utc>, bookings: &[Booking]) -> bool {
    bookings.iter().any(|booking| booking.date_time == start)
}

pub fn is_blocked(start: DateTime<Utc>, end: DateTime<Utc>, blocked_times: &[BlockedTime]) -> bool {
    blocked_times
        .iter()
        .any(|blocked| overlaps(start, end, blocked.start_time, blocked.end_time))
}

/// First match wins: past, booked, blocked, available.
pub fn classify(
    slot: &Slot,
    bookings: &[Booking],
    blocked_times: &[BlockedTime],
    now: DateTime<Utc>,
) -> SlotStatus {
    if slot.start < now {
        SlotStatus::Past
    } else if is_booked(slot.start, bookings) {
        SlotStatus::Booked
    } else if is_blocked(slot.start, slot.end(), blocked_times) {
        SlotStatus::Blocked
    } else {
        SlotStatus::Available
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::calendar::{enumerate_slots, WorkingHours};
    use chrono::{Duration, NaiveDate};
    use chrono_tz::UTC;
    use proptest::prelude::*;
    use test_case::test_case;

    fn utc(s: &str) -> DateTime<Utc> {
        DateTime::parse_from_rfc3339(s).unwrap().with_timezone(&Utc)
    }

    fn slot(s: &str) -> Slot {
        let start = utc(s);
        Slot {
            date: start.date_naive(),
            hour: 9,
            start,
        }
    }

    fn booking_at(s: &str) -> Booking {
        Booking {
            id: 1,
            client_name: "Jane".into(),
            email: "jane@example.com".into(),
            phone: "555-0100".into(),
            reason: "Strength".into(),
            date_time: utc(s),
            notes: None,
            created_at: utc("2024-06-01T00:00:00Z"),
        }
    }

    fn blocked(start: &str, end: &str) -> BlockedTime {
        BlockedTime {
            id: 1,
            start_time: utc(start),
            end_time: utc(end),
            reason: None,
            created_at: utc("2024-06-01T00:00:00Z"),
        }
    }

    #[test_case(0, 10, 5, 15, true ; "partial overlap")]
    #[test_case(0, 10, 10, 20, false ; "touching end to start")]
    #[test_case(10, 20, 0, 10, false ; "touching start to end")]
    #[test_case(0, 10, 2, 3, true ; "containment")]
    #[test_case(0, 10, 0, 10, true ; "identical")]
    #[test_case(0, 10, 11, 20, false ; "disjoint")]
    fn overlap_cases(a_start: i64, a_end: i64, b_start: i64, b_end: i64, expected: bool) {
        assert_eq!(overlaps(a_start, a_end, b_start, b_end), expected);
    }

    proptest! {
        #[test]
        fn overlap_is_symmetric(a in -1000i64..1000, a_len in 1i64..500, b in -1000i64..1000, b_len in 1i64..500) {
            prop_assert_eq!(
                overlaps(a, a + a_len, b, b + b_len),
                overlaps(b, b + b_len, a, a + a_len)
            );
        }

        #[test]
        fn interval_overlaps_itself(a in -1000i64..1000, len in 1i64..500) {
            prop_assert!(overlaps(a, a + len, a, a + len));
        }
    }

    #[test]
    fn empty_inputs_are_available() {
        let now = utc("2024-06-08T00:00:00Z");
        let slots: Vec<Slot> =
            enumerate_slots(utc("2024-06-12T00:00:00Z"), 0, WorkingHours::default(), UTC).collect();
        assert_eq!(slots.len(), 63);
        assert!(slots
            .iter()
            .all(|slot| classify(slot, &[], &[], now) == SlotStatus::Available));
    }

    #[test]
    fn past_slots() {
        let now = utc("2024-06-10T09:30:00Z");
        assert_eq!(classify(&slot("2024-06-10T09:00:00Z"), &[], &[], now), SlotStatus::Past);
        assert_eq!(
            classify(&slot("2024-06-10T10:00:00Z"), &[], &[], now),
            SlotStatus::Available
        );
    }

    #[test]
    fn booked_slot_matches_exact_instant() {
        let now = utc("2024-06-01T00:00:00Z");
        let bookings = vec![booking_at("2024-06-10T09:00:00Z")];
        assert_eq!(
            classify(&slot("2024-06-10T09:00:00Z"), &bookings, &[], now),
            SlotStatus::Booked
        );
        assert_eq!(
            classify(&slot("2024-06-10T10:00:00Z"), &bookings, &[], now),
            SlotStatus::Available
        );
    }

    #[test]
    fn blocked_slot_uses_interval_overlap() {
        let now = utc("2024-06-01T00:00:00Z");
        let blocks = vec![blocked("2024-06-10T09:30:00Z", "2024-06-10T11:00:00Z")];
        assert_eq!(
            classify(&slot("2024-06-10T09:00:00Z"), &[], &blocks, now),
            SlotStatus::Blocked
        );
        assert_eq!(
            classify(&slot("2024-06-10T10:00:00Z"), &[], &blocks, now),
            SlotStatus::Blocked
        );
        assert_eq!(
            classify(&slot("2024-06-10T11:00:00Z"), &[], &blocks, now),
            SlotStatus::Available
        );
        assert_eq!(
            classify(&slot("2024-06-10T08:00:00Z"), &[], &blocks, now),
            SlotStatus::Available
        );
    }

    #[test]
    fn precedence_is_past_then_booked_then_blocked() {
        let bookings = vec![booking_at("2024-06-10T09:00:00Z")];
        let blocks = vec![blocked("2024-06-10T08:00:00Z", "2024-06-10T17:00:00Z")];
        let target = slot("2024-06-10T09:00:00Z");

        assert_eq!(
            classify(&target, &bookings, &blocks, utc("2024-06-11T00:00:00Z")),
            SlotStatus::Past
        );
        assert_eq!(
            classify(&target, &bookings, &blocks, utc("2024-06-01T00:00:00Z")),
            SlotStatus::Booked
        );
        assert_eq!(
            classify(&target, &[], &blocks, utc("2024-06-01T00:00:00Z")),
            SlotStatus::Blocked
        );
    }

    #[test]
    fn only_available_is_reservable() {
        assert!(SlotStatus::Available.is_reservable());
        assert!(!SlotStatus::Booked.is_reservable());
        assert!(!SlotStatus::Blocked.is_reservable());
        assert!(!SlotStatus::Past.is_reservable());
    }

    #[test]
    fn whole_day_block_covers_every_slot_of_that_day() {
        let now = utc("2024-06-01T00:00:00Z");
        let blocks = vec![blocked("2024-06-10T08:00:00Z", "2024-06-10T17:00:00Z")];
        let monday = NaiveDate::from_ymd_opt(2024, 6, 10).unwrap();

        for slot in enumerate_slots(utc("2024-06-12T00:00:00Z"), 0, WorkingHours::default(), UTC) {
            let expected = if slot.date == monday {
                SlotStatus::Blocked
            } else {
                SlotStatus::Available
            };
            assert_eq!(classify(&slot, &[], &blocks, now), expected);
            assert_eq!(slot.end() - slot.start, Duration::hours(1));
        }
    }
}

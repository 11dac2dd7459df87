use crate::models::BreakSlot;
use chrono::{DateTime, Duration, Utc};

/// Next break window starting no earlier than `earliest_start`, pushed back
/// to the end of the last existing window if it would overlap it.
///
/// `existing` must already be chronological and non-overlapping; the
/// returned slot keeps it that way when appended.
pub fn schedule_break(
    existing: &[BreakSlot],
    earliest_start: DateTime<Utc>,
    duration: Duration,
) -> BreakSlot {
    let start = match existing.last() {
        Some(last) if last.end > earliest_start => last.end,
        _ => earliest_start,
    };

    BreakSlot {
        start,
        end: start + duration,
    }
}

pub fn is_chronological(slots: &[BreakSlot]) -> bool {
    slots
        .windows(2)
        .all(|pair| pair[0].start < pair[0].end && pair[0].end <= pair[1].start)
        && slots.last().is_none_or(|slot| slot.start < slot.end)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn at(hour: u32, minute: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 3, 4, hour, minute, 0).unwrap()
    }

    #[test]
    fn test_first_break_starts_at_requested_time() {
        let slot = schedule_break(&[], at(12, 0), Duration::minutes(30));
        assert_eq!(slot.start, at(12, 0));
        assert_eq!(slot.end, at(12, 30));
    }

    #[test]
    fn test_overlapping_break_is_pushed_back() {
        let existing = vec![BreakSlot {
            start: at(12, 0),
            end: at(12, 30),
        }];

        let slot = schedule_break(&existing, at(12, 10), Duration::minutes(30));
        assert_eq!(slot.start, at(12, 30));
        assert_eq!(slot.end, at(13, 0));

        let mut all = existing.clone();
        all.push(slot);
        assert!(is_chronological(&all));
    }

    #[test]
    fn test_later_break_is_kept() {
        let existing = vec![BreakSlot {
            start: at(8, 0),
            end: at(8, 30),
        }];

        let slot = schedule_break(&existing, at(16, 0), Duration::minutes(30));
        assert_eq!(slot.start, at(16, 0));
    }

    #[test]
    fn test_is_chronological_rejects_overlap() {
        let slots = vec![
            BreakSlot {
                start: at(8, 0),
                end: at(9, 0),
            },
            BreakSlot {
                start: at(8, 30),
                end: at(9, 30),
            },
        ];
        assert!(!is_chronological(&slots));
    }
}

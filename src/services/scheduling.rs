use sqlx::FromRow;
use time::{Date, Time};

/// A persisted exam slot, as loaded for conflict checking.
#[derive(Debug, Clone, FromRow)]
pub(crate) struct RoomSlot {
    pub(crate) exam_id: String,
    pub(crate) subject: String,
    pub(crate) date: Date,
    pub(crate) room: String,
    pub(crate) start_time: Time,
    pub(crate) end_time: Time,
}

/// Returns the first booked slot that double-books the candidate room.
///
/// Two slots conflict when they share a room and date and their half-open
/// intervals [start, end) overlap. Back-to-back slots do not conflict.
pub(crate) fn find_room_conflict<'a>(
    date: Date,
    room: &str,
    start_time: Time,
    end_time: Time,
    booked: &'a [RoomSlot],
) -> Option<&'a RoomSlot> {
    booked.iter().find(|slot| {
        slot.date == date
            && slot.room == room
            && slot.start_time < end_time
            && slot.end_time > start_time
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use time::macros::{date, time};

    fn slot(room: &str, date: Date, start: Time, end: Time) -> RoomSlot {
        RoomSlot {
            exam_id: "exam-1".to_string(),
            subject: "Mathematics".to_string(),
            date,
            room: room.to_string(),
            start_time: start,
            end_time: end,
        }
    }

    #[test]
    fn identical_slot_conflicts() {
        let booked = [slot("A101", date!(2026 - 02 - 15), time!(09:00), time!(11:00))];
        let found =
            find_room_conflict(date!(2026 - 02 - 15), "A101", time!(09:00), time!(11:00), &booked);
        assert!(found.is_some());
    }

    #[test]
    fn nested_slot_conflicts() {
        let booked = [slot("A101", date!(2026 - 02 - 15), time!(09:00), time!(11:00))];
        let found =
            find_room_conflict(date!(2026 - 02 - 15), "A101", time!(10:00), time!(10:30), &booked);
        assert_eq!(found.map(|hit| hit.exam_id.as_str()), Some("exam-1"));
    }

    #[test]
    fn partial_overlap_conflicts() {
        let booked = [slot("A101", date!(2026 - 02 - 15), time!(09:00), time!(11:00))];
        let found =
            find_room_conflict(date!(2026 - 02 - 15), "A101", time!(10:30), time!(12:00), &booked);
        assert!(found.is_some());
    }

    #[test]
    fn adjacent_slots_do_not_conflict() {
        let booked = [slot("A101", date!(2026 - 02 - 15), time!(09:00), time!(11:00))];

        let after =
            find_room_conflict(date!(2026 - 02 - 15), "A101", time!(11:00), time!(12:00), &booked);
        assert!(after.is_none());

        let before =
            find_room_conflict(date!(2026 - 02 - 15), "A101", time!(08:00), time!(09:00), &booked);
        assert!(before.is_none());
    }

    #[test]
    fn different_room_does_not_conflict() {
        let booked = [slot("A101", date!(2026 - 02 - 15), time!(09:00), time!(11:00))];
        let found =
            find_room_conflict(date!(2026 - 02 - 15), "B202", time!(09:00), time!(11:00), &booked);
        assert!(found.is_none());
    }

    #[test]
    fn different_date_does_not_conflict() {
        let booked = [slot("A101", date!(2026 - 02 - 15), time!(09:00), time!(11:00))];
        let found =
            find_room_conflict(date!(2026 - 02 - 16), "A101", time!(09:00), time!(11:00), &booked);
        assert!(found.is_none());
    }
}

use time::macros::format_description;
use time::{format_description::well_known::Rfc3339, Date, OffsetDateTime, PrimitiveDateTime, Time};

pub(crate) fn primitive_now_utc() -> PrimitiveDateTime {
    let now = OffsetDateTime::now_utc();
    PrimitiveDateTime::new(now.date(), now.time())
}

pub(crate) fn today_utc() -> Date {
    OffsetDateTime::now_utc().date()
}

pub(crate) fn format_primitive(value: PrimitiveDateTime) -> String {
    value.assume_utc().format(&Rfc3339).unwrap_or_else(|_| value.assume_utc().to_string())
}

pub(crate) fn format_date(value: Date) -> String {
    value.format(&format_description!("[year]-[month]-[day]")).unwrap_or_else(|_| value.to_string())
}

pub(crate) fn format_time(value: Time) -> String {
    value.format(&format_description!("[hour]:[minute]")).unwrap_or_else(|_| value.to_string())
}

pub(crate) fn parse_date(raw: &str) -> Option<Date> {
    Date::parse(raw, &format_description!("[year]-[month]-[day]")).ok()
}

/// Accepts "HH:MM" and "HH:MM:SS"; schedule forms send the former.
pub(crate) fn parse_time(raw: &str) -> Option<Time> {
    if let Ok(value) = Time::parse(raw, &format_description!("[hour]:[minute]")) {
        return Some(value);
    }

    Time::parse(raw, &format_description!("[hour]:[minute]:[second]")).ok()
}

#[cfg(test)]
mod tests {
    use super::*;
    use time::{Date, Time};

    #[test]
    fn format_primitive_outputs_utc_z() {
        let date = Date::from_calendar_date(2025, time::Month::January, 2).unwrap();
        let time = Time::from_hms(10, 20, 30).unwrap();
        let value = PrimitiveDateTime::new(date, time);
        assert_eq!(format_primitive(value), "2025-01-02T10:20:30Z");
    }

    #[test]
    fn date_roundtrip() {
        let parsed = parse_date("2026-02-15").expect("date");
        assert_eq!(parsed, Date::from_calendar_date(2026, time::Month::February, 15).unwrap());
        assert_eq!(format_date(parsed), "2026-02-15");
    }

    #[test]
    fn time_parses_with_and_without_seconds() {
        assert_eq!(parse_time("09:00"), Some(Time::from_hms(9, 0, 0).unwrap()));
        assert_eq!(parse_time("09:00:30"), Some(Time::from_hms(9, 0, 30).unwrap()));
        assert_eq!(parse_time("9h00"), None);
    }

    #[test]
    fn format_time_drops_seconds() {
        assert_eq!(format_time(Time::from_hms(14, 30, 0).unwrap()), "14:30");
    }
}

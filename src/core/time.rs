use time::{format_description::well_known::Rfc3339, OffsetDateTime, PrimitiveDateTime};

/// Database timestamps are naive UTC.
pub(crate) fn primitive_now_utc() -> PrimitiveDateTime {
    let now = OffsetDateTime::now_utc();
    PrimitiveDateTime::new(now.date(), now.time())
}

pub(crate) fn format_primitive(value: PrimitiveDateTime) -> String {
    value.assume_utc().format(&Rfc3339).unwrap_or_else(|_| value.assume_utc().to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use time::{Date, Time};

    #[test]
    fn format_primitive_outputs_utc_z() {
        let date = Date::from_calendar_date(2025, time::Month::February, 3).unwrap();
        let time = Time::from_hms(8, 15, 0).unwrap();
        assert_eq!(format_primitive(PrimitiveDateTime::new(date, time)), "2025-02-03T08:15:00Z");
    }

    #[test]
    fn primitive_now_is_close_to_offset_now() {
        let primitive = primitive_now_utc().assume_utc();
        let delta = OffsetDateTime::now_utc() - primitive;
        assert!(delta.whole_seconds().abs() < 5);
        assert!(format_primitive(primitive_now_utc()).ends_with('Z'));
    }
}

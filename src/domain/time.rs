use chrono::{DateTime, Local, NaiveDate, NaiveDateTime, TimeZone, Utc};

const NAIVE_FORMATS: [&str; 2] = ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f"];

/// Parses a server timestamp into an instant.
///
/// The server emits either RFC 3339 strings or zone-less local date-times.
/// Zone-less values are read in the local zone, so both forms compare on
/// the same UTC timeline.
pub fn parse_timestamp(raw: &str) -> Option<DateTime<Utc>> {
    let raw = raw.trim();

    if let Ok(parsed) = DateTime::parse_from_rfc3339(raw) {
        return Some(parsed.with_timezone(&Utc));
    }

    NAIVE_FORMATS
        .iter()
        .find_map(|format| NaiveDateTime::parse_from_str(raw, format).ok())
        .map(local_to_utc)
}

/// Local wall time to UTC. A wall time skipped by a DST jump has no local
/// instant and is taken as UTC.
fn local_to_utc(naive: NaiveDateTime) -> DateTime<Utc> {
    Local
        .from_local_datetime(&naive)
        .earliest()
        .map_or_else(|| naive.and_utc(), |local| local.with_timezone(&Utc))
}

/// Calendar day of a server timestamp in the local zone.
pub fn local_date(raw: &str) -> Option<NaiveDate> {
    parse_timestamp(raw).map(|instant| instant.with_timezone(&Local).date_naive())
}

/// Formats a server timestamp as a local `HH:MM` clock label.
pub fn format_clock(raw: &str) -> String {
    parse_timestamp(raw)
        .map(|instant| instant.with_timezone(&Local).format("%H:%M").to_string())
        .unwrap_or_else(|| "--:--".to_owned())
}

#[cfg(test)]
mod tests {
    use chrono::Duration;

    use super::*;

    #[test]
    fn parses_zone_less_value_as_local_time() {
        let parsed = parse_timestamp("2024-03-01T09:15:30.123456").expect("must parse");

        assert_eq!(
            parsed.with_timezone(&Local).format("%H:%M:%S").to_string(),
            "09:15:30"
        );
    }

    #[test]
    fn parses_rfc3339_into_utc() {
        let parsed = parse_timestamp("2024-03-01T09:15:30+09:00").expect("must parse");

        assert_eq!(parsed.format("%H:%M").to_string(), "00:15");
    }

    #[test]
    fn zone_less_and_rfc3339_values_share_one_timeline() {
        let instant = Utc.with_ymd_and_hms(2024, 3, 1, 12, 0, 0).single().expect("valid instant");
        let one_minute_later = (instant.with_timezone(&Local) + Duration::minutes(1))
            .naive_local()
            .format("%Y-%m-%dT%H:%M:%S")
            .to_string();

        let zoned = parse_timestamp("2024-03-01T12:00:00Z").expect("must parse");
        let local = parse_timestamp(&one_minute_later).expect("must parse");

        assert_eq!(zoned, instant);
        assert_eq!(local - zoned, Duration::minutes(1));
    }

    #[test]
    fn rejects_garbage() {
        assert_eq!(parse_timestamp("yesterday"), None);
        assert_eq!(local_date("yesterday"), None);
    }

    #[test]
    fn formats_zone_less_clock_as_written() {
        assert_eq!(format_clock("2024-03-01T21:07:00"), "21:07");
        assert_eq!(local_date("2024-03-01 21:07:00"), NaiveDate::from_ymd_opt(2024, 3, 1));
        assert_eq!(format_clock("not a time"), "--:--");
    }
}

use chrono::{DateTime, NaiveDateTime, Utc};

/// Format written into `<pubDate>`.
const RSS_DATE_FORMAT: &str = "%a, %d %b %Y %H:%M:%S %z";

const OFFSET_DATE_FORMATS: [&str; 2] = ["%a, %d %b %Y %H:%M:%S %z", "%a, %d %b %Y %H:%M:%S %:z"];

/// Formats without a numeric offset; the timestamp is taken as UTC.
const UTC_DATE_FORMATS: [&str; 4] = [
    "%a, %d %b %Y %H:%M:%S GMT",
    "%a, %d %b %Y %H:%M:%S UTC",
    "%a, %d %b %Y %H:%M:%S",
    "%d %b %Y %H:%M:%S",
];

/// Parse a manifest publication date.
///
/// Returns `None` for anything unrecognised; a bad date never fails decoding.
pub(crate) fn parse_publication_date(raw: &str) -> Option<DateTime<Utc>> {
    let raw = raw.trim();
    if raw.is_empty() {
        return None;
    }

    if let Ok(date) = DateTime::parse_from_rfc2822(raw) {
        return Some(date.with_timezone(&Utc));
    }
    if let Ok(date) = DateTime::parse_from_rfc3339(raw) {
        return Some(date.with_timezone(&Utc));
    }

    for format in OFFSET_DATE_FORMATS {
        if let Ok(date) = DateTime::parse_from_str(raw, format) {
            return Some(date.with_timezone(&Utc));
        }
    }

    UTC_DATE_FORMATS
        .iter()
        .find_map(|format| NaiveDateTime::parse_from_str(raw, format).ok())
        .map(|naive| naive.and_utc())
}

pub(crate) fn format_publication_date(date: &DateTime<Utc>) -> String {
    date.format(RSS_DATE_FORMAT).to_string()
}

#[cfg(test)]
mod tests {
    use chrono::{TimeZone, Utc};

    use super::{format_publication_date, parse_publication_date};

    #[test]
    fn accepts_numeric_offsets() {
        let expected = Utc.with_ymd_and_hms(2024, 1, 15, 10, 30, 0).single();
        assert_eq!(
            parse_publication_date("Mon, 15 Jan 2024 10:30:00 +0000"),
            expected
        );
        assert_eq!(
            parse_publication_date("Mon, 15 Jan 2024 12:30:00 +02:00"),
            expected
        );
        assert_eq!(
            parse_publication_date("Mon, 15 Jan 2024 05:30:00 -0500"),
            expected
        );
    }

    #[test]
    fn accepts_gmt_and_missing_offset() {
        let expected = Utc.with_ymd_and_hms(2024, 3, 1, 8, 0, 0).single();
        assert_eq!(
            parse_publication_date("Fri, 01 Mar 2024 08:00:00 GMT"),
            expected
        );
        assert_eq!(
            parse_publication_date("Fri, 01 Mar 2024 08:00:00"),
            expected
        );
    }

    #[test]
    fn accepts_rfc3339() {
        assert_eq!(
            parse_publication_date("2023-11-20T16:45:00Z"),
            Utc.with_ymd_and_hms(2023, 11, 20, 16, 45, 0).single()
        );
    }

    #[test]
    fn unrecognised_dates_are_absent() {
        assert_eq!(parse_publication_date(""), None);
        assert_eq!(parse_publication_date("yesterday"), None);
        assert_eq!(parse_publication_date("32/13/2024"), None);
    }

    #[test]
    fn formatted_dates_parse_back() {
        let date = Utc
            .with_ymd_and_hms(2024, 6, 3, 23, 59, 59)
            .single()
            .expect("valid date");
        let formatted = format_publication_date(&date);
        assert_eq!(formatted, "Mon, 03 Jun 2024 23:59:59 +0000");
        assert_eq!(parse_publication_date(&formatted), Some(date));
    }
}

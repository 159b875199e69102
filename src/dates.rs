use time::{format_description::FormatItem, macros::format_description, Date};

const ISO_DATE: &[FormatItem<'static>] = format_description!("[year]-[month]-[day]");

/// Parse a `YYYY-MM-DD` path or query parameter.
pub fn parse_iso_date(input: &str) -> Result<Date, time::error::Parse> {
    Date::parse(input, ISO_DATE)
}

pub fn format_iso_date(date: Date) -> String {
    // The format description is infallible for any valid Date.
    date.format(ISO_DATE).expect("formatting a calendar date")
}

/// Serde adapter for `time::Date` as a `YYYY-MM-DD` string.
pub mod iso {
    use serde::{de, Deserialize, Deserializer, Serializer};
    use time::Date;

    pub fn serialize<S: Serializer>(date: &Date, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&super::format_iso_date(*date))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Date, D::Error> {
        let raw = String::deserialize(deserializer)?;
        super::parse_iso_date(&raw).map_err(de::Error::custom)
    }

    /// Same adapter for nullable date columns.
    pub mod option {
        use serde::{de, Deserialize, Deserializer, Serializer};
        use time::Date;

        pub fn serialize<S: Serializer>(
            date: &Option<Date>,
            serializer: S,
        ) -> Result<S::Ok, S::Error> {
            match date {
                Some(date) => serializer.serialize_some(&crate::dates::format_iso_date(*date)),
                None => serializer.serialize_none(),
            }
        }

        pub fn deserialize<'de, D: Deserializer<'de>>(
            deserializer: D,
        ) -> Result<Option<Date>, D::Error> {
            let raw = Option::<String>::deserialize(deserializer)?;
            raw.map(|s| crate::dates::parse_iso_date(&s).map_err(de::Error::custom))
                .transpose()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use time::macros::date;

    #[test]
    fn parses_and_formats_round_trip() {
        let parsed = parse_iso_date("2024-03-09").expect("valid date");
        assert_eq!(parsed, date!(2024 - 03 - 09));
        assert_eq!(format_iso_date(parsed), "2024-03-09");
    }

    #[test]
    fn rejects_malformed_input() {
        assert!(parse_iso_date("03/09/2024").is_err());
        assert!(parse_iso_date("2024-13-01").is_err());
        assert!(parse_iso_date("not-a-date").is_err());
    }
}

pub mod option;

use serde::{Deserialize, Deserializer, Serializer};
use time::{
	OffsetDateTime, PrimitiveDateTime, format_description::well_known::Rfc3339, macros::format_description,
};

pub fn serialize<S>(value: &OffsetDateTime, serializer: S) -> Result<S::Ok, S::Error>
where
	S: Serializer,
{
	let formatted = value.format(&Rfc3339).map_err(serde::ser::Error::custom)?;

	serializer.serialize_str(&formatted)
}

pub fn deserialize<'de, D>(deserializer: D) -> Result<OffsetDateTime, D::Error>
where
	D: Deserializer<'de>,
{
	let raw = String::deserialize(deserializer)?;

	parse(&raw).ok_or_else(|| serde::de::Error::custom(format!("Invalid timestamp {raw:?}.")))
}

/// Accepts RFC 3339 and, for documents written without an offset, a naive
/// `YYYY-MM-DDTHH:MM:SS` prefix read as UTC.
pub fn parse(raw: &str) -> Option<OffsetDateTime> {
	let raw = raw.trim();

	if let Ok(parsed) = OffsetDateTime::parse(raw, &Rfc3339) {
		return Some(parsed);
	}

	let naive = raw.get(..19)?;
	let parsed = PrimitiveDateTime::parse(
		naive,
		format_description!("[year]-[month]-[day]T[hour]:[minute]:[second]"),
	)
	.ok()?;

	Some(parsed.assume_utc())
}

#[cfg(test)]
mod tests {
	use time::macros::datetime;

	use super::*;

	#[test]
	fn parses_rfc3339_and_naive_timestamps() {
		assert_eq!(parse("2024-03-01T10:20:30Z"), Some(datetime!(2024-03-01 10:20:30 UTC)));
		assert_eq!(parse("2024-03-01T10:20:30.123456"), Some(datetime!(2024-03-01 10:20:30 UTC)));
		assert_eq!(parse("yesterday"), None);
	}
}

use std::collections::HashSet;

use serde_json::Value;

/// Tag field as stored by the engine. A note with a single tag may come back as a bare
/// string instead of a one-element array.
pub fn normalize_tags(raw: &Value) -> Vec<String> {
	match raw {
		Value::String(tag) => vec![tag.clone()],
		Value::Array(items) =>
			items.iter().filter_map(|item| item.as_str().map(str::to_string)).collect(),
		_ => Vec::new(),
	}
}

/// Trims user supplied tag names, dropping blanks and duplicates while keeping order.
pub fn clean_tags<I, S>(tags: I) -> Vec<String>
where
	I: IntoIterator<Item = S>,
	S: AsRef<str>,
{
	let mut seen = HashSet::new();
	let mut out = Vec::new();

	for tag in tags {
		let tag = tag.as_ref().trim();

		if tag.is_empty() || !seen.insert(tag.to_string()) {
			continue;
		}

		out.push(tag.to_string());
	}

	out
}

/// Splits a comma separated tag list as typed into a form field.
pub fn parse_tag_list(raw: &str) -> Vec<String> {
	clean_tags(raw.split(','))
}

/// A note survives when it carries every tag of `tags_in` and none of `tags_off`.
pub fn matches_constraints(tags: &[String], tags_in: &[String], tags_off: &[String]) -> bool {
	let own: HashSet<&str> = tags.iter().map(String::as_str).collect();
	let superset = tags_in.iter().all(|tag| own.contains(tag.as_str()));
	let disjoint = !tags_off.iter().any(|tag| own.contains(tag.as_str()));

	superset && disjoint
}

pub fn intersects(tags: &[String], other: &[String]) -> bool {
	tags.iter().any(|tag| other.contains(tag))
}

#[cfg(test)]
mod tests {
	use serde_json::json;

	use super::*;

	fn strings(values: &[&str]) -> Vec<String> {
		values.iter().map(|value| value.to_string()).collect()
	}

	#[test]
	fn scalar_and_list_normalize_to_the_same_list() {
		let from_list = normalize_tags(&json!(["a"]));
		let from_scalar = normalize_tags(&json!("a"));

		assert_eq!(from_list, strings(&["a"]));
		assert_eq!(from_scalar, from_list);
	}

	#[test]
	fn normalization_is_idempotent() {
		let once = normalize_tags(&json!(["Docker", "IaC"]));
		let twice = normalize_tags(&json!(once.clone()));

		assert_eq!(once, twice);
	}

	#[test]
	fn missing_tags_normalize_to_empty() {
		assert!(normalize_tags(&Value::Null).is_empty());
		assert!(normalize_tags(&json!(42)).is_empty());
	}

	#[test]
	fn superset_and_disjoint_constraints() {
		assert!(matches_constraints(&strings(&["Docker"]), &strings(&["Docker"]), &[]));
		assert!(matches_constraints(&strings(&["Ansible", "IaC"]), &[], &strings(&["Docker"])));
		assert!(!matches_constraints(&strings(&["Docker"]), &[], &strings(&["Docker"])));
		assert!(!matches_constraints(&strings(&["Docker"]), &strings(&["Docker", "IaC"]), &[]));
		assert!(matches_constraints(&strings(&["IaC", "Docker", "Linux"]), &strings(&["Docker", "IaC"]), &[]));
		assert!(matches_constraints(&[], &[], &[]));
	}

	#[test]
	fn clean_tags_trims_and_dedupes() {
		assert_eq!(parse_tag_list(" Docker, ,IaC,Docker "), strings(&["Docker", "IaC"]));
	}
}

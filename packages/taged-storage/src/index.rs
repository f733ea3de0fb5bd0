//! Typed index definitions rendered into engine mappings.

use std::{fmt, str::FromStr};

use serde_json::{Map, Value, json};

use crate::{Error, Result, client::CreateIndex, client::SearchClient};

/// Field name that is always taken from the engine document id and never mapped.
pub const ID_FIELD: &str = "id";

/// Dense-vector width of the notes embedding field.
pub const NOTE_EMBEDDING_DIMS: u32 = 312;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum FieldType {
	Text,
	Integer,
	Float,
	Boolean,
	Date,
	Binary,
	Object,
	DenseVector { dims: u32 },
}
impl FieldType {
	pub fn engine_type(&self) -> &'static str {
		match self {
			Self::Text => "text",
			Self::Integer => "integer",
			Self::Float => "float",
			Self::Boolean => "boolean",
			Self::Date => "date",
			Self::Binary => "binary",
			Self::Object => "object",
			Self::DenseVector { .. } => "dense_vector",
		}
	}
}
impl FromStr for FieldType {
	type Err = Error;

	fn from_str(raw: &str) -> Result<Self> {
		match raw {
			"str" | "text" => Ok(Self::Text),
			"int" | "integer" => Ok(Self::Integer),
			"float" => Ok(Self::Float),
			"bool" | "boolean" => Ok(Self::Boolean),
			"datetime" | "date" => Ok(Self::Date),
			"bytes" | "binary" => Ok(Self::Binary),
			"dict" | "object" => Ok(Self::Object),
			other => Err(Error::Definition(format!("Unsupported field type {other:?}."))),
		}
	}
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum Dynamic {
	#[default]
	Permissive,
	Strict,
}
impl fmt::Display for Dynamic {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		match self {
			Self::Permissive => f.write_str("true"),
			Self::Strict => f.write_str("strict"),
		}
	}
}

#[derive(Clone, Debug, PartialEq)]
pub struct FieldDecl {
	pub name: String,
	pub field_type: FieldType,
	/// Extra mapping properties such as an analyzer, merged over the generated type.
	pub extra: Map<String, Value>,
}
impl FieldDecl {
	pub fn new(name: impl Into<String>, field_type: FieldType) -> Self {
		Self { name: name.into(), field_type, extra: Map::new() }
	}

	pub fn with(mut self, key: &str, value: Value) -> Self {
		self.extra.insert(key.to_string(), value);

		self
	}

	fn mapping(&self) -> Value {
		let mut mapping = Map::new();

		mapping.insert("type".to_string(), Value::from(self.field_type.engine_type()));

		if let FieldType::DenseVector { dims } = self.field_type {
			mapping.insert("dims".to_string(), Value::from(dims));
		}

		for (key, value) in &self.extra {
			mapping.insert(key.clone(), value.clone());
		}

		Value::Object(mapping)
	}
}

/// A validated index: its name, its field mappings in declaration order and its settings.
#[derive(Clone, Debug, PartialEq)]
pub struct IndexDefinition {
	name: String,
	fields: Vec<FieldDecl>,
	settings: Value,
	dynamic: Dynamic,
}
impl IndexDefinition {
	pub fn define(name: &str, fields: Vec<FieldDecl>, settings: Value) -> Result<Self> {
		let name = name.trim();

		if name.is_empty() {
			return Err(Error::Definition("Index name must be non-empty.".to_string()));
		}
		if name.chars().any(|c| c.is_ascii_uppercase() || c.is_whitespace()) {
			return Err(Error::Definition(format!(
				"Index name {name:?} must be lowercase without whitespace."
			)));
		}
		if !settings.is_object() {
			return Err(Error::Definition("Index settings must be a JSON object.".to_string()));
		}

		let mut kept: Vec<FieldDecl> = Vec::with_capacity(fields.len());

		for field in fields {
			if field.name == ID_FIELD {
				continue;
			}
			if field.name.trim().is_empty() {
				return Err(Error::Definition(format!("Index {name:?} has an unnamed field.")));
			}
			if kept.iter().any(|existing| existing.name == field.name) {
				return Err(Error::Definition(format!(
					"Index {name:?} declares field {:?} twice.",
					field.name
				)));
			}

			kept.push(field);
		}

		Ok(Self { name: name.to_string(), fields: kept, settings, dynamic: Dynamic::default() })
	}

	pub fn with_dynamic(mut self, dynamic: Dynamic) -> Self {
		self.dynamic = dynamic;

		self
	}

	pub fn name(&self) -> &str {
		&self.name
	}

	pub fn fields(&self) -> &[FieldDecl] {
		&self.fields
	}

	pub fn field_names(&self) -> Vec<String> {
		self.fields.iter().map(|field| field.name.clone()).collect()
	}

	pub fn properties(&self) -> Value {
		let mut properties = Map::new();

		for field in &self.fields {
			properties.insert(field.name.clone(), field.mapping());
		}

		Value::Object(properties)
	}

	/// Body of the create-index request.
	pub fn index_settings(&self) -> Value {
		json!({
			"settings": self.settings,
			"mappings": {
				"dynamic": self.dynamic.to_string(),
				"properties": self.properties(),
			},
		})
	}
}

/// Creates the index when the engine is reachable. An index that already exists is not an error.
pub async fn register(client: &dyn SearchClient, definition: &IndexDefinition) -> Result<()> {
	if !client.ping().await? {
		return Err(Error::Unavailable(format!(
			"Ping failed before registering index {:?}.",
			definition.name()
		)));
	}

	match client.create_index(definition.name(), &definition.index_settings()).await? {
		CreateIndex::Created => tracing::info!(index = definition.name(), "Created search index."),
		CreateIndex::AlreadyExists =>
			tracing::debug!(index = definition.name(), "Search index already exists."),
	}

	Ok(())
}

/// Analysis settings shared by the notes index: russian stemming with english stop words.
pub fn notes_analysis() -> Value {
	json!({
		"analysis": {
			"filter": {
				"russian_stop": { "type": "stop", "stopwords": "_russian_" },
				"russian_stemmer": { "type": "stemmer", "language": "russian" },
				"english_stop": { "type": "stop", "stopwords": "_english_" },
			},
			"analyzer": {
				"default": {
					"tokenizer": "standard",
					"filter": ["lowercase", "russian_stop", "english_stop", "russian_stemmer"],
				},
			},
		},
	})
}

pub fn notes_index(name: &str) -> Result<IndexDefinition> {
	IndexDefinition::define(
		name,
		vec![
			FieldDecl::new("title", FieldType::Text),
			FieldDecl::new("content", FieldType::Text),
			FieldDecl::new("tags", FieldType::Text),
			FieldDecl::new("published_at", FieldType::Date),
			FieldDecl::new("preview_image", FieldType::Text).with("index", Value::Bool(false)),
			FieldDecl::new("embedding", FieldType::DenseVector { dims: NOTE_EMBEDDING_DIMS }),
		],
		notes_analysis(),
	)
}

/// Analysis settings of the books index: html stripped, russian stemming.
pub fn books_analysis() -> Value {
	json!({
		"analysis": {
			"filter": {
				"ru_stop": { "type": "stop", "stopwords": "_russian_" },
				"ru_stemmer": { "type": "stemmer", "language": "russian" },
			},
			"analyzer": {
				"default": {
					"char_filter": ["html_strip"],
					"tokenizer": "standard",
					"filter": ["lowercase", "ru_stop", "ru_stemmer"],
				},
			},
		},
	})
}

pub fn books_index(name: &str) -> Result<IndexDefinition> {
	IndexDefinition::define(
		name,
		vec![
			FieldDecl::new("title", FieldType::Text),
			FieldDecl::new("author", FieldType::Text),
			FieldDecl::new("year", FieldType::Text),
			FieldDecl::new("about", FieldType::Text),
			FieldDecl::new("published_at", FieldType::Date),
		],
		books_analysis(),
	)
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn unknown_type_names_are_rejected() {
		assert!(matches!("tuple".parse::<FieldType>(), Err(Error::Definition(_))));
		assert_eq!("datetime".parse::<FieldType>().expect("Known type."), FieldType::Date);
	}

	#[test]
	fn id_field_is_never_mapped() {
		let definition = IndexDefinition::define(
			"items",
			vec![FieldDecl::new("id", FieldType::Text), FieldDecl::new("name", FieldType::Text)],
			json!({}),
		)
		.expect("Definition should be valid.");

		assert_eq!(definition.field_names(), vec!["name".to_string()]);
		assert!(definition.properties().get("id").is_none());
	}

	#[test]
	fn extra_properties_override_generated_mapping() {
		let definition = IndexDefinition::define(
			"items",
			vec![FieldDecl::new("name", FieldType::Text).with("analyzer", json!("russian"))],
			json!({}),
		)
		.expect("Definition should be valid.");

		assert_eq!(
			definition.properties()["name"],
			json!({ "type": "text", "analyzer": "russian" })
		);
	}

	#[test]
	fn notes_index_renders_full_body() {
		let body = notes_index("notes").expect("Notes index should be valid.").index_settings();

		assert_eq!(body["mappings"]["dynamic"], json!("true"));
		assert_eq!(body["mappings"]["properties"]["published_at"]["type"], json!("date"));
		assert_eq!(body["mappings"]["properties"]["embedding"]["dims"], json!(312));
		assert!(body["settings"]["analysis"]["analyzer"]["default"].is_object());
	}

	#[test]
	fn strict_dynamic_is_rendered() {
		let body = books_index("books")
			.expect("Books index should be valid.")
			.with_dynamic(Dynamic::Strict)
			.index_settings();

		assert_eq!(body["mappings"]["dynamic"], json!("strict"));
	}

	#[test]
	fn duplicate_fields_and_bad_names_fail() {
		let duplicate = IndexDefinition::define(
			"items",
			vec![FieldDecl::new("a", FieldType::Text), FieldDecl::new("a", FieldType::Integer)],
			json!({}),
		);

		assert!(matches!(duplicate, Err(Error::Definition(_))));
		assert!(IndexDefinition::define("Items", Vec::new(), json!({})).is_err());
		assert!(IndexDefinition::define("items", Vec::new(), json!([])).is_err());
	}
}

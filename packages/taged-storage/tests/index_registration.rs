use serde_json::json;

use taged_storage::{
	Error,
	index::{self, FieldDecl, FieldType, IndexDefinition},
};
use taged_testkit::FakeSearchEngine;

#[tokio::test]
async fn registration_creates_the_index_once() {
	let engine = FakeSearchEngine::new();
	let definition = index::notes_index("notes").expect("Notes index should be valid.");

	index::register(&engine, &definition).await.expect("First registration should succeed.");
	index::register(&engine, &definition).await.expect("Existing index should be accepted.");

	let body = engine.index_body("notes").expect("Index body was stored.");

	assert_eq!(body, definition.index_settings());
}

#[tokio::test]
async fn registration_requires_a_reachable_engine() {
	let engine = FakeSearchEngine::new();

	engine.set_offline(true);

	let definition = index::books_index("books").expect("Books index should be valid.");
	let err = index::register(&engine, &definition).await.expect_err("Offline engine must fail.");

	assert!(matches!(err, Error::Unavailable(_)));
	assert!(engine.index_body("books").is_none());
}

#[test]
fn every_semantic_type_maps_to_one_engine_type() {
	let declared = [
		("str", "text"),
		("int", "integer"),
		("float", "float"),
		("bool", "boolean"),
		("datetime", "date"),
		("bytes", "binary"),
		("dict", "object"),
	];
	let fields = declared
		.iter()
		.map(|(name, semantic)| {
			FieldDecl::new(*name, semantic.parse::<FieldType>().expect("Known semantic type."))
		})
		.collect::<Vec<_>>();
	let definition =
		IndexDefinition::define("typed", fields, json!({})).expect("Definition should be valid.");
	let properties = definition.properties();
	let properties = properties.as_object().expect("Properties are an object.");

	assert_eq!(properties.len(), declared.len());

	for (name, engine_type) in declared {
		assert_eq!(properties[name]["type"], json!(engine_type));
	}
}

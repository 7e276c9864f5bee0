use pluggable_core::plugin::PluginSchema;
use pluggable_macros::PluginSchema;
use serde::{Deserialize, Serialize};

#[derive(Debug, Serialize, Deserialize, PluginSchema)]
struct HelloRequest {
	#[schema(desc = "who to greet")]
	name: String,
	age: u32,
}

fn main() {
	assert_eq!(HelloRequest::type_name(), "HelloRequest");
	assert_eq!(HelloRequest::schema_items().len(), 2);
	assert!(!HelloRequest::struct_optional());
}

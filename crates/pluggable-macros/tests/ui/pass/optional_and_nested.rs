use pluggable_core::plugin::PluginSchema;
use pluggable_core::wire::WireType;
use pluggable_macros::PluginSchema;
use serde::{Deserialize, Serialize};

#[derive(Debug, Serialize, Deserialize, PluginSchema)]
struct Address {
	city: String,
}

#[derive(Debug, Serialize, Deserialize, PluginSchema)]
#[schema(optional)]
struct Profile {
	nickname: Option<String>,
	address: Address,
}

fn main() {
	assert!(Profile::struct_optional());
	let items = Profile::schema_items();
	assert_eq!(items[0].wire_type, WireType::String);
	assert_eq!(items[1].wire_type, WireType::Message);
}

use pluggable_core::plugin::PluginSchema;
use pluggable_macros::PluginSchema;
use serde::{Deserialize, Serialize};

#[derive(Debug, Serialize, Deserialize, PluginSchema)]
struct ColorRequest {
	#[schema(desc = "which color", options = "[\"red\",\"green\",\"blue\"]")]
	color: String,
	size: u32,
}

fn main() {
	let options = ColorRequest::field_options();
	assert_eq!(options.len(), 2);
	assert_eq!(options[0].as_deref(), Some("[\"red\",\"green\",\"blue\"]"));
	assert_eq!(options[1], None);
}

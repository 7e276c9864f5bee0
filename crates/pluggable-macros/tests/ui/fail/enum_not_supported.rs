use pluggable_macros::PluginSchema;

#[derive(PluginSchema)]
enum Shape {
	Circle,
	Square,
}

fn main() {}

use pluggable_macros::PluginSchema;

#[derive(PluginSchema)]
struct Coordinates(f64, f64);

fn main() {}

//! `#[derive(PluginSchema)]`.
//!
//! Implements `pluggable_core::plugin::PluginSchema` for a struct with named
//! fields by walking its fields at compile time, the way `pluggable/meta.go`'s
//! `resolveType()` walked them at runtime via `reflect`. Each field's Rust
//! type is mapped to a wire type using the same table as
//! `pluggable_core::wire::WireType::from_rust_type_name`.
//!
//! Struct-level `#[schema(optional)]` marks the whole record a nullable
//! reference, which cascades to every `Input` built from it (the Go
//! source's pointer-receiver convention). Field-level `#[schema(desc =
//! "...")]` sets that field's description, and `#[schema(options = "...")]`
//! carries a JSON array literal of allowed values through to the field's
//! `Input::options` (only meaningful for input types; the registry parses it
//! at registration time).

use proc_macro::TokenStream;
use quote::quote;
use syn::{parse_macro_input, Data, DeriveInput, Fields, Type};

#[proc_macro_derive(PluginSchema, attributes(schema))]
pub fn derive_plugin_schema(input: TokenStream) -> TokenStream {
	let input = parse_macro_input!(input as DeriveInput);

	let fields = match extract_named_fields(&input.data) {
		Ok(fields) => fields,
		Err(err) => return err.to_compile_error().into(),
	};

	let struct_optional = has_schema_flag(&input.attrs, "optional");
	let ident = &input.ident;
	let type_name_lit = ident.to_string();

	let item_exprs = fields.iter().map(|field| {
		let field_ident = field.ident.as_ref().expect("named field");
		let field_name_lit = field_ident.to_string();
		let desc_lit = field_desc(&field.attrs).unwrap_or_default();
		let wire_type = wire_type_tokens(&field.ty);
		quote! {
			::pluggable_core::meta::Item {
				name: #field_name_lit.to_string(),
				wire_type: #wire_type,
				desc: #desc_lit.to_string(),
			}
		}
	});

	let options_exprs = fields.iter().map(|field| match field_options(&field.attrs) {
		Some(options_lit) => quote! { ::std::option::Option::Some(#options_lit.to_string()) },
		None => quote! { ::std::option::Option::None },
	});

	let expanded = quote! {
		impl ::pluggable_core::plugin::PluginSchema for #ident {
			fn type_name() -> &'static str {
				#type_name_lit
			}

			fn schema_items() -> ::std::vec::Vec<::pluggable_core::meta::Item> {
				::std::vec![ #( #item_exprs ),* ]
			}

			fn struct_optional() -> bool {
				#struct_optional
			}

			fn field_options() -> ::std::vec::Vec<::std::option::Option<::std::string::String>> {
				::std::vec![ #( #options_exprs ),* ]
			}
		}
	};

	expanded.into()
}

fn extract_named_fields(data: &Data) -> syn::Result<Vec<syn::Field>> {
	match data {
		Data::Struct(data) => match &data.fields {
			Fields::Named(named) => Ok(named.named.iter().cloned().collect()),
			_ => Err(syn::Error::new_spanned(
				&data.fields,
				"PluginSchema can only be derived for structs with named fields",
			)),
		},
		_ => Err(syn::Error::new(
			proc_macro2::Span::call_site(),
			"PluginSchema can only be derived for structs",
		)),
	}
}

fn has_schema_flag(attrs: &[syn::Attribute], flag: &str) -> bool {
	attrs.iter().any(|attr| {
		if !attr.path().is_ident("schema") {
			return false;
		}
		let mut found = false;
		let _ = attr.parse_nested_meta(|meta| {
			if meta.path.is_ident(flag) {
				found = true;
			}
			Ok(())
		});
		found
	})
}

fn field_desc(attrs: &[syn::Attribute]) -> Option<String> {
	for attr in attrs {
		if !attr.path().is_ident("schema") {
			continue;
		}
		let mut desc = None;
		let _ = attr.parse_nested_meta(|meta| {
			if meta.path.is_ident("desc") {
				let value = meta.value()?;
				let lit: syn::LitStr = value.parse()?;
				desc = Some(lit.value());
			}
			Ok(())
		});
		if desc.is_some() {
			return desc;
		}
	}
	None
}

fn field_options(attrs: &[syn::Attribute]) -> Option<String> {
	for attr in attrs {
		if !attr.path().is_ident("schema") {
			continue;
		}
		let mut options = None;
		let _ = attr.parse_nested_meta(|meta| {
			if meta.path.is_ident("options") {
				let value = meta.value()?;
				let lit: syn::LitStr = value.parse()?;
				options = Some(lit.value());
			}
			Ok(())
		});
		if options.is_some() {
			return options;
		}
	}
	None
}

/// Mirrors `pluggable_core::wire::WireType::from_rust_type_name`'s table,
/// applied to the field's syntax tree instead of a stringified type name at
/// runtime.
fn wire_type_tokens(ty: &Type) -> proc_macro2::TokenStream {
	let variant = last_segment_ident(ty).unwrap_or_default();
	match variant.as_str() {
		"String" | "str" => quote!(::pluggable_core::wire::WireType::String),
		"bool" => quote!(::pluggable_core::wire::WireType::Bool),
		"i8" | "i16" | "i32" => quote!(::pluggable_core::wire::WireType::Int32),
		"i64" | "i128" | "isize" => quote!(::pluggable_core::wire::WireType::Int64),
		"f32" | "f64" => quote!(::pluggable_core::wire::WireType::Float),
		"u8" | "u16" | "u32" => quote!(::pluggable_core::wire::WireType::Uint32),
		"u64" | "u128" | "usize" => quote!(::pluggable_core::wire::WireType::Uint64),
		_ => quote!(::pluggable_core::wire::WireType::Message),
	}
}

/// For `Option<T>` this descends into `T`, so an optional scalar field still
/// gets the scalar's wire type rather than falling through to `Message`.
fn last_segment_ident(ty: &Type) -> Option<String> {
	let Type::Path(type_path) = ty else {
		return None;
	};
	let segment = type_path.path.segments.last()?;
	if segment.ident == "Option" {
		if let syn::PathArguments::AngleBracketed(args) = &segment.arguments {
			if let Some(syn::GenericArgument::Type(inner)) = args.args.first() {
				return last_segment_ident(inner);
			}
		}
	}
	Some(segment.ident.to_string())
}

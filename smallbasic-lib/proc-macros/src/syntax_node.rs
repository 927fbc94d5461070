use proc_macro::TokenStream;
use proc_macro2::TokenStream as TokenStream2;
use quote::quote;
use syn::{parse_macro_input, parse_quote, ItemEnum, ItemStruct};

pub fn syntax_node_impl(tokens: TokenStream) -> TokenStream {
    let def = parse_macro_input!(tokens as syn::Item);
    match def {
        syn::Item::Enum(en_def) => enum_impl(en_def),
        syn::Item::Struct(s_def) => struct_impl(s_def),
        _ => panic!("This macro can only be used with structs and enums"),
    }
}

pub fn enum_impl(def: ItemEnum) -> TokenStream {
    let enum_name = &def.ident;
    let (impl_generics, ty_generics, where_clause) = def.generics.split_for_impl();

    let arms: Vec<_> = def
        .variants
        .iter()
        .map(|v| {
            let var_name = &v.ident;
            let var_str = var_name.to_string();
            match &v.fields {
                syn::Fields::Unnamed(fields) => {
                    assert!(
                        fields.unnamed.iter().count() == 1,
                        "Tuple variants must wrap exactly one node"
                    );
                    (
                        quote! { Self::#var_name(x) => crate::core::SyntaxNode::range(x), },
                        quote! { Self::#var_name(x) => crate::core::SyntaxNode::kind(x), },
                    )
                }
                syn::Fields::Named(fields) => {
                    assert!(
                        fields
                            .named
                            .iter()
                            .any(|f| f.ident.as_ref().map(|i| i == "range").unwrap_or(false)),
                        "Variant {} has no range field",
                        var_str
                    );
                    (
                        quote! { Self::#var_name { range, .. } => *range, },
                        quote! { Self::#var_name { .. } => #var_str, },
                    )
                }
                syn::Fields::Unit => panic!("Unit variants carry no range"),
            }
        })
        .collect();

    let (range_arms, kind_arms): (TokenStream2, TokenStream2) = itertools::multiunzip(arms);

    quote! {
        impl #impl_generics crate::core::SyntaxNode for #enum_name #ty_generics #where_clause {
            fn range(&self) -> crate::core::TextRange {
                match self {
                    #range_arms
                }
            }

            fn kind(&self) -> &'static str {
                match self {
                    #kind_arms
                }
            }
        }
    }
    .into()
}

fn struct_impl(st_def: ItemStruct) -> TokenStream {
    match &st_def.fields {
        syn::Fields::Unnamed(fields) => unnamed_st_impl(&st_def, fields),
        syn::Fields::Named(fields) => named_st_impl(&st_def, fields),
        syn::Fields::Unit => panic!("Unit structs aren't allowed"),
    }
}

fn unnamed_st_impl(st_def: &ItemStruct, fields: &syn::FieldsUnnamed) -> TokenStream {
    let name = &st_def.ident;
    let name_str = name.to_string();
    let (impl_generics, ty_generics, where_clause) = st_def.generics.split_for_impl();
    let fields: Vec<_> = fields.unnamed.iter().collect();
    assert!(
        !fields.is_empty(),
        "a struct with unnamed fields must always have a TextRange as first field."
    );
    let range_t: syn::Type = parse_quote!(TextRange);
    assert!(fields[0].ty == range_t, "The first field is no TextRange");

    quote! {
        impl #impl_generics crate::core::SyntaxNode for #name #ty_generics #where_clause {
            fn range(&self) -> crate::core::TextRange {
                self.0
            }

            fn kind(&self) -> &'static str {
                #name_str
            }
        }
    }
    .into()
}

fn named_st_impl(st_def: &ItemStruct, fields: &syn::FieldsNamed) -> TokenStream {
    let name = &st_def.ident;
    let name_str = name.to_string();
    let (impl_generics, ty_generics, where_clause) = st_def.generics.split_for_impl();
    let range_t: syn::Type = parse_quote!(TextRange);
    let range_field = fields
        .named
        .iter()
        .find(|f| f.ident.as_ref().map(|i| i == "range").unwrap_or(false) && f.ty == range_t);
    assert!(
        range_field.is_some(),
        "a struct with named fields must always have a range: TextRange field."
    );

    quote! {
        impl #impl_generics crate::core::SyntaxNode for #name #ty_generics #where_clause {
            fn range(&self) -> crate::core::TextRange {
                self.range
            }

            fn kind(&self) -> &'static str {
                #name_str
            }
        }
    }
    .into()
}

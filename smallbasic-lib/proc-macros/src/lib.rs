use proc_macro::TokenStream;
mod syntax_node;

/// Used on the syntax tree and bound tree node types.
///
/// Every node in those trees owns the source range it was produced from, and the
/// diagnostics, the instruction generator and the debugger all need to get at it without
/// caring which concrete node they hold. This derive generates an implementation of
/// `crate::core::SyntaxNode` with:
/// * `range(&self) -> TextRange`
/// * `kind(&self) -> &'static str`, the name of the node (or of the variant for enums with
///   named variants)
///
/// The following shapes are supported:
/// * structs with named fields, one of which must be `range: TextRange`
/// * tuple structs, whose first field must be a `TextRange`
/// * enums, whose variants either wrap exactly one other node (the call is delegated), or
///   have named fields, one of which is called `range`
#[proc_macro_derive(SyntaxNode)]
pub fn syntax_node(tokens: TokenStream) -> TokenStream {
    syntax_node::syntax_node_impl(tokens)
}

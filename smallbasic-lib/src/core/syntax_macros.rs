/// generates a type for an enum node, which always only contains variants with one unnamed field,
/// which are further nodes. Each variant is named like the type it wraps. It implements From<T>
/// for each child type, and SyntaxNode by delegating to the child
macro_rules! mk_enum_node{
    ($name:ident $(, $child_ty:tt)+ $(,)?) => {
        #[derive(Debug, Serialize, Deserialize, Clone, PartialEq, SyntaxNode)]
        pub enum $name {
            $($child_ty($child_ty),)*
        }

    $(
        impl From<$child_ty> for $name {
            fn from(child: $child_ty) -> Self {
                Self::$child_ty(child)
            }
        }
    )*
    };
}
pub(crate) use mk_enum_node;

//! Extraction of per-type member information from a parsed unit.
//!
//! The engine works at type granularity: a `TypeInfo` couples a struct's
//! fields with every inherent method across its impl blocks, plus the
//! `self.field` accesses each method makes. Line ranges come from span
//! locations so strategies can splice the original text.

use crate::complexity::calculate_cyclomatic;
use crate::core::source::node_lines;
use crate::core::CompilationUnit;
use quote::ToTokens;
use std::collections::BTreeSet;
use syn::visit::Visit;
use syn::{Fields, Item};

#[derive(Debug, Clone)]
pub struct FieldInfo {
    pub name: String,
    pub ty: String,
    pub is_public: bool,
}

#[derive(Debug, Clone)]
pub struct MethodInfo {
    pub name: String,
    pub is_public: bool,
    pub has_receiver: bool,
    pub fields_used: BTreeSet<String>,
    pub signature: syn::Signature,
    /// First and last source line of the whole method item.
    pub lines: (usize, usize),
    pub cyclomatic: u32,
}

impl MethodInfo {
    /// Render the method signature on one line, e.g. for trait extraction.
    pub fn signature_text(&self) -> String {
        normalize_tokens(&self.signature.to_token_stream().to_string())
    }

    /// Comma-separated argument names for a delegating call.
    pub fn argument_names(&self) -> String {
        self.signature
            .inputs
            .iter()
            .filter_map(|arg| match arg {
                syn::FnArg::Typed(pat_type) => match pat_type.pat.as_ref() {
                    syn::Pat::Ident(ident) => Some(ident.ident.to_string()),
                    _ => None,
                },
                syn::FnArg::Receiver(_) => None,
            })
            .collect::<Vec<_>>()
            .join(", ")
    }
}

#[derive(Debug, Clone)]
pub struct TypeInfo {
    pub name: String,
    pub is_public: bool,
    pub fields: Vec<FieldInfo>,
    pub methods: Vec<MethodInfo>,
    /// Line range of the struct definition.
    pub struct_lines: (usize, usize),
    /// Line ranges of the inherent impl blocks, in source order.
    pub impl_ranges: Vec<(usize, usize)>,
}

impl TypeInfo {
    pub fn method(&self, name: &str) -> Option<&MethodInfo> {
        self.methods.iter().find(|m| m.name == name)
    }

    pub fn public_methods(&self) -> impl Iterator<Item = &MethodInfo> {
        self.methods.iter().filter(|m| m.is_public)
    }
}

/// Collect every struct (with named fields or unit) and its inherent
/// methods from a unit. Units without an AST yield nothing.
pub fn extract_types(unit: &CompilationUnit) -> Vec<TypeInfo> {
    let Some(file) = unit.ast() else {
        return Vec::new();
    };

    let mut types: Vec<TypeInfo> = Vec::new();
    for item in &file.items {
        if let Item::Struct(item_struct) = item {
            let fields = match &item_struct.fields {
                Fields::Named(named) => named
                    .named
                    .iter()
                    .map(|f| FieldInfo {
                        name: f.ident.as_ref().map(|i| i.to_string()).unwrap_or_default(),
                        ty: normalize_tokens(&f.ty.to_token_stream().to_string()),
                        is_public: matches!(f.vis, syn::Visibility::Public(_)),
                    })
                    .collect(),
                _ => Vec::new(),
            };
            types.push(TypeInfo {
                name: item_struct.ident.to_string(),
                is_public: matches!(item_struct.vis, syn::Visibility::Public(_)),
                fields,
                methods: Vec::new(),
                struct_lines: node_lines(item_struct),
                impl_ranges: Vec::new(),
            });
        }
    }

    for item in &file.items {
        let Item::Impl(item_impl) = item else {
            continue;
        };
        if item_impl.trait_.is_some() {
            continue;
        }
        let Some(self_name) = impl_self_name(item_impl) else {
            continue;
        };
        let Some(ty) = types.iter_mut().find(|t| t.name == self_name) else {
            continue;
        };
        ty.impl_ranges.push(node_lines(item_impl));
        for impl_item in &item_impl.items {
            if let syn::ImplItem::Fn(method) = impl_item {
                let mut accesses = SelfFieldVisitor::default();
                accesses.visit_block(&method.block);
                ty.methods.push(MethodInfo {
                    name: method.sig.ident.to_string(),
                    is_public: matches!(method.vis, syn::Visibility::Public(_)),
                    has_receiver: method.sig.receiver().is_some(),
                    fields_used: accesses.fields,
                    signature: method.sig.clone(),
                    lines: node_lines(method),
                    cyclomatic: calculate_cyclomatic(&method.block),
                });
            }
        }
    }

    types
}

/// Find one named type in a unit.
pub fn find_type(unit: &CompilationUnit, name: &str) -> Option<TypeInfo> {
    extract_types(unit).into_iter().find(|t| t.name == name)
}

fn impl_self_name(item_impl: &syn::ItemImpl) -> Option<String> {
    match item_impl.self_ty.as_ref() {
        syn::Type::Path(type_path) => type_path
            .path
            .segments
            .last()
            .map(|seg| seg.ident.to_string()),
        _ => None,
    }
}

/// Collects `self.field` accesses inside a method body.
#[derive(Default)]
struct SelfFieldVisitor {
    fields: BTreeSet<String>,
}

impl<'ast> Visit<'ast> for SelfFieldVisitor {
    fn visit_expr_field(&mut self, expr: &'ast syn::ExprField) {
        if let syn::Expr::Path(path) = expr.base.as_ref() {
            if path.path.is_ident("self") {
                if let syn::Member::Named(ident) = &expr.member {
                    self.fields.insert(ident.to_string());
                }
            }
        }
        syn::visit::visit_expr_field(self, expr);
    }
}

/// Token-stream rendering puts spaces around every punct; tighten the few
/// sequences that matter for readable generated signatures.
pub(crate) fn normalize_tokens(text: &str) -> String {
    text.replace(" :: ", "::")
        .replace(" : ", ": ")
        .replace("& self", "&self")
        .replace("& mut self", "&mut self")
        .replace("& mut ", "&mut ")
        .replace("& ", "&")
        .replace(" < ", "<")
        .replace(" > ", ">")
        .replace(" >", ">")
        .replace(" ,", ",")
        .replace(" ;", ";")
        .replace("! ", "!")
        .replace(" ( ", "(")
        .replace(" )", ")")
        .replace("( ", "(")
        .replace(" (", "(")
        .replace(" . ", ".")
}

#[cfg(test)]
mod tests {
    use super::*;
    use indoc::indoc;

    fn unit_of(source: &str) -> CompilationUnit {
        CompilationUnit::parse("t.rs", source)
    }

    #[test]
    fn collects_fields_and_methods() {
        let unit = unit_of(indoc! {"
            pub struct Account {
                pub id: u64,
                balance: i64,
            }

            impl Account {
                pub fn deposit(&mut self, amount: i64) {
                    self.balance += amount;
                }

                fn audit(&self) -> u64 {
                    self.id
                }
            }
        "});
        let types = extract_types(&unit);
        assert_eq!(types.len(), 1);
        let ty = &types[0];
        assert_eq!(ty.fields.len(), 2);
        assert!(ty.fields[0].is_public);
        assert_eq!(ty.methods.len(), 2);
        assert!(ty.methods[0].is_public);
        assert!(ty.methods[0].fields_used.contains("balance"));
        assert!(ty.methods[1].fields_used.contains("id"));
    }

    #[test]
    fn trait_impls_are_skipped() {
        let unit = unit_of(indoc! {"
            struct S { a: u32 }
            impl Default for S {
                fn default() -> Self { S { a: 0 } }
            }
        "});
        let ty = find_type(&unit, "S").unwrap();
        assert!(ty.methods.is_empty());
        assert!(ty.impl_ranges.is_empty());
    }

    #[test]
    fn argument_names_skip_receiver() {
        let unit = unit_of(indoc! {"
            struct S { a: u32 }
            impl S {
                fn add(&self, x: u32, y: u32) -> u32 { self.a + x + y }
            }
        "});
        let ty = find_type(&unit, "S").unwrap();
        assert_eq!(ty.methods[0].argument_names(), "x, y");
    }

    #[test]
    fn method_lines_cover_the_item() {
        let unit = unit_of("struct S { a: u32 }\nimpl S {\n    fn m(&self) {\n    }\n}\n");
        let ty = find_type(&unit, "S").unwrap();
        assert_eq!(ty.methods[0].lines, (3, 4));
    }
}

//! Shared facade rewriting for member-moving strategies.
//!
//! Extract-class and split-god-class both carve methods and fields out of a
//! type into freshly synthesized types, leaving the original as a facade: it
//! keeps one delegate field per new type and re-exposes every moved public
//! method as a one-line delegating call under its original name and
//! signature. Non-moved members stay where they are.

use crate::cohesion::{FieldInfo, TypeInfo};
use crate::core::source::{apply_edits, extract_lines, Edit};
use crate::core::CompilationUnit;
use std::collections::BTreeSet;

/// One planned move of members into a new type.
#[derive(Debug, Clone)]
pub(crate) struct MemberMove {
    pub new_type: String,
    pub delegate_field: String,
    pub method_names: Vec<String>,
    pub field_names: Vec<String>,
}

pub(crate) fn snake_case(name: &str) -> String {
    let mut out = String::with_capacity(name.len() + 4);
    for (i, c) in name.chars().enumerate() {
        if c.is_uppercase() {
            if i > 0 {
                out.push('_');
            }
            out.extend(c.to_lowercase());
        } else {
            out.push(c);
        }
    }
    out
}

/// Produce the unit's rewritten source with all `moves` applied, or `None`
/// when the type shape does not support a clean line-level rewrite.
pub(crate) fn rewrite_with_moves(
    unit: &CompilationUnit,
    ty: &TypeInfo,
    moves: &[MemberMove],
) -> Option<String> {
    if moves.is_empty() || ty.fields.is_empty() {
        return None;
    }
    let moved_fields: BTreeSet<&str> = moves
        .iter()
        .flat_map(|m| m.field_names.iter().map(String::as_str))
        .collect();
    let mut edits = Vec::new();

    // Rebuild the struct definition: kept fields plus one delegate per move.
    let kept: Vec<&FieldInfo> = ty
        .fields
        .iter()
        .filter(|f| !moved_fields.contains(f.name.as_str()))
        .collect();
    let struct_vis = if ty.is_public { "pub " } else { "" };
    let mut struct_text = format!("{struct_vis}struct {} {{\n", ty.name);
    for field in kept {
        let vis = if field.is_public { "pub " } else { "" };
        struct_text.push_str(&format!("    {vis}{}: {},\n", field.name, field.ty));
    }
    for mv in moves {
        struct_text.push_str(&format!("    {}: {},\n", mv.delegate_field, mv.new_type));
    }
    struct_text.push_str("}\n");
    edits.push(Edit::Replace {
        start: ty.struct_lines.0,
        end: ty.struct_lines.1,
        text: struct_text,
    });

    // Moved methods: public ones become delegations, private ones leave.
    for mv in moves {
        for name in &mv.method_names {
            let method = ty.method(name)?;
            let text = if method.is_public {
                let args = method.argument_names();
                format!(
                    "    pub {} {{\n        self.{}.{}({args})\n    }}\n",
                    method.signature_text(),
                    mv.delegate_field,
                    method.name
                )
            } else {
                String::new()
            };
            edits.push(Edit::Replace {
                start: method.lines.0,
                end: method.lines.1,
                text,
            });
        }
    }

    // Synthesized types go at the end of the unit.
    let mut appended = String::new();
    for mv in moves {
        appended.push('\n');
        appended.push_str(&format!("{struct_vis}struct {} {{\n", mv.new_type));
        for field_name in &mv.field_names {
            let field = ty.fields.iter().find(|f| f.name == *field_name)?;
            appended.push_str(&format!("    {}: {},\n", field.name, field.ty));
        }
        appended.push_str("}\n\n");
        appended.push_str(&format!("impl {} {{\n", mv.new_type));
        for (i, name) in mv.method_names.iter().enumerate() {
            let method = ty.method(name)?;
            if i > 0 {
                appended.push('\n');
            }
            appended.push_str(&extract_lines(unit.source(), method.lines.0, method.lines.1));
        }
        appended.push_str("}\n");
    }
    edits.push(Edit::InsertAfter {
        line: unit.line_count(),
        text: appended,
    });

    Some(apply_edits(unit.source(), edits))
}

/// True when every field in `field_names` is referenced only by the methods
/// in `method_names`; moving them cannot strand a non-moved member.
pub(crate) fn fields_are_exclusive(
    ty: &TypeInfo,
    method_names: &[String],
    field_names: &[String],
) -> bool {
    let movers: BTreeSet<&str> = method_names.iter().map(String::as_str).collect();
    let moved: BTreeSet<&str> = field_names.iter().map(String::as_str).collect();
    ty.methods
        .iter()
        .filter(|m| !movers.contains(m.name.as_str()))
        .all(|m| m.fields_used.iter().all(|f| !moved.contains(f.as_str())))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn snake_case_handles_pascal_names() {
        assert_eq!(snake_case("OrderValidation"), "order_validation");
        assert_eq!(snake_case("Hub"), "hub");
    }
}

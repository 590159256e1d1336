//! Line and structural diffing between a baseline unit and a candidate.
//!
//! The line diff is a longest-common-subsequence pass rendered in unified
//! format. The structural diff keys members by signature (function name plus
//! parameter types, field name) and classifies each as added, removed, or
//! modified by comparing serialized member text. Added/removed line counts
//! are computed independently of the unified rendering (set difference of
//! trimmed line content) because the scorer consumes them for its LOC delta.

use crate::core::source::node_lines;
use crate::core::CompilationUnit;
use quote::ToTokens;
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use syn::Item;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum MemberChangeKind {
    Added,
    Removed,
    Modified,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MemberChange {
    pub signature: String,
    pub kind: MemberChangeKind,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DocumentDiff {
    pub unified: String,
    pub added_lines: usize,
    pub removed_lines: usize,
    pub member_changes: Vec<MemberChange>,
}

impl DocumentDiff {
    pub fn is_empty(&self) -> bool {
        self.added_lines == 0 && self.removed_lines == 0 && self.member_changes.is_empty()
    }
}

pub fn diff_units(baseline: &CompilationUnit, candidate: &CompilationUnit) -> DocumentDiff {
    let base_lines: Vec<&str> = baseline.source().lines().collect();
    let cand_lines: Vec<&str> = candidate.source().lines().collect();

    let unified = unified_diff(&base_lines, &cand_lines, baseline.path().display());

    let base_set: HashSet<&str> = base_lines
        .iter()
        .map(|l| l.trim())
        .filter(|l| !l.is_empty())
        .collect();
    let cand_set: HashSet<&str> = cand_lines
        .iter()
        .map(|l| l.trim())
        .filter(|l| !l.is_empty())
        .collect();

    DocumentDiff {
        unified,
        added_lines: cand_set.difference(&base_set).count(),
        removed_lines: base_set.difference(&cand_set).count(),
        member_changes: member_diff(baseline, candidate),
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
enum Op {
    Keep,
    Remove,
    Add,
}

/// LCS edit script over lines, smallest-table DP.
fn edit_script<'a>(base: &[&'a str], cand: &[&'a str]) -> Vec<(Op, &'a str)> {
    let n = base.len();
    let m = cand.len();
    let mut table = vec![vec![0usize; m + 1]; n + 1];
    for i in (0..n).rev() {
        for j in (0..m).rev() {
            table[i][j] = if base[i] == cand[j] {
                table[i + 1][j + 1] + 1
            } else {
                table[i + 1][j].max(table[i][j + 1])
            };
        }
    }

    let mut script = Vec::new();
    let (mut i, mut j) = (0, 0);
    while i < n && j < m {
        if base[i] == cand[j] {
            script.push((Op::Keep, base[i]));
            i += 1;
            j += 1;
        } else if table[i + 1][j] >= table[i][j + 1] {
            script.push((Op::Remove, base[i]));
            i += 1;
        } else {
            script.push((Op::Add, cand[j]));
            j += 1;
        }
    }
    script.extend(base[i..].iter().map(|l| (Op::Remove, *l)));
    script.extend(cand[j..].iter().map(|l| (Op::Add, *l)));
    script
}

const CONTEXT: usize = 3;

fn unified_diff(base: &[&str], cand: &[&str], path: impl std::fmt::Display) -> String {
    let script = edit_script(base, cand);
    if script.iter().all(|(op, _)| *op == Op::Keep) {
        return String::new();
    }

    let mut out = format!("--- a/{path}\n+++ b/{path}\n");
    // Hunks: runs of changes padded with up to CONTEXT kept lines.
    let mut idx = 0;
    let mut old_line = 1usize;
    let mut new_line = 1usize;
    while idx < script.len() {
        if script[idx].0 == Op::Keep {
            old_line += 1;
            new_line += 1;
            idx += 1;
            continue;
        }
        // Found a change; open a hunk including leading context.
        let lead = idx.saturating_sub(CONTEXT);
        let lead = (lead..idx)
            .rev()
            .take_while(|&k| script[k].0 == Op::Keep)
            .count();
        let hunk_start = idx - lead;

        // Extend through changes, closing after CONTEXT kept lines.
        let mut end = idx;
        let mut kept_run = 0;
        while end < script.len() {
            if script[end].0 == Op::Keep {
                kept_run += 1;
                if kept_run > CONTEXT {
                    break;
                }
            } else {
                kept_run = 0;
            }
            end += 1;
        }
        let hunk = &script[hunk_start..end];

        let hunk_old_start = old_line - lead;
        let hunk_new_start = new_line - lead;
        let old_count = hunk.iter().filter(|(op, _)| *op != Op::Add).count();
        let new_count = hunk.iter().filter(|(op, _)| *op != Op::Remove).count();
        out.push_str(&format!(
            "@@ -{hunk_old_start},{old_count} +{hunk_new_start},{new_count} @@\n"
        ));
        for (op, line) in hunk {
            let prefix = match op {
                Op::Keep => ' ',
                Op::Remove => '-',
                Op::Add => '+',
            };
            out.push(prefix);
            out.push_str(line);
            out.push('\n');
        }

        for (op, _) in &script[idx..end] {
            match op {
                Op::Keep => {
                    old_line += 1;
                    new_line += 1;
                }
                Op::Remove => old_line += 1,
                Op::Add => new_line += 1,
            }
        }
        idx = end;
    }
    out
}

/// Map of member signature to the member's source text.
fn member_index(unit: &CompilationUnit) -> HashMap<String, String> {
    let mut members = HashMap::new();
    let Some(file) = unit.ast() else {
        return members;
    };
    for item in &file.items {
        match item {
            Item::Fn(f) => {
                members.insert(fn_signature(&f.sig), item_text(unit, f));
            }
            Item::Struct(s) => {
                members.insert(format!("struct {}", s.ident), item_text(unit, s));
                if let syn::Fields::Named(named) = &s.fields {
                    for field in &named.named {
                        if let Some(ident) = &field.ident {
                            members.insert(
                                format!("{}::{}", s.ident, ident),
                                field.ty.to_token_stream().to_string(),
                            );
                        }
                    }
                }
            }
            Item::Enum(e) => {
                members.insert(format!("enum {}", e.ident), item_text(unit, e));
            }
            Item::Trait(t) => {
                members.insert(format!("trait {}", t.ident), item_text(unit, t));
            }
            Item::Impl(i) => {
                let self_name = match i.self_ty.as_ref() {
                    syn::Type::Path(p) => p
                        .path
                        .segments
                        .last()
                        .map(|s| s.ident.to_string())
                        .unwrap_or_default(),
                    _ => continue,
                };
                for impl_item in &i.items {
                    if let syn::ImplItem::Fn(m) = impl_item {
                        members.insert(
                            format!("{}::{}", self_name, fn_signature(&m.sig)),
                            item_text(unit, m),
                        );
                    }
                }
            }
            _ => {}
        }
    }
    members
}

/// Function name plus parameter types, e.g. `parse(&str, usize)`.
fn fn_signature(sig: &syn::Signature) -> String {
    let params: Vec<String> = sig
        .inputs
        .iter()
        .map(|arg| match arg {
            syn::FnArg::Receiver(_) => "self".to_string(),
            syn::FnArg::Typed(t) => t.ty.to_token_stream().to_string(),
        })
        .collect();
    format!("{}({})", sig.ident, params.join(", "))
}

fn item_text<T: syn::spanned::Spanned>(unit: &CompilationUnit, node: &T) -> String {
    let (start, end) = node_lines(node);
    crate::core::source::extract_lines(unit.source(), start, end)
}

fn member_diff(baseline: &CompilationUnit, candidate: &CompilationUnit) -> Vec<MemberChange> {
    let base = member_index(baseline);
    let cand = member_index(candidate);

    let mut changes = Vec::new();
    for (signature, text) in &base {
        match cand.get(signature) {
            None => changes.push(MemberChange {
                signature: signature.clone(),
                kind: MemberChangeKind::Removed,
            }),
            Some(other) if other != text => changes.push(MemberChange {
                signature: signature.clone(),
                kind: MemberChangeKind::Modified,
            }),
            Some(_) => {}
        }
    }
    for signature in cand.keys() {
        if !base.contains_key(signature) {
            changes.push(MemberChange {
                signature: signature.clone(),
                kind: MemberChangeKind::Added,
            });
        }
    }
    changes.sort_by(|a, b| a.signature.cmp(&b.signature));
    changes
}

#[cfg(test)]
mod tests {
    use super::*;
    use indoc::indoc;

    fn unit(source: &str) -> CompilationUnit {
        CompilationUnit::parse("m.rs", source)
    }

    #[test]
    fn identical_units_diff_empty() {
        let a = unit("fn one() {}\n");
        let b = unit("fn one() {}\n");
        let diff = diff_units(&a, &b);
        assert!(diff.is_empty());
        assert!(diff.unified.is_empty());
    }

    #[test]
    fn added_function_is_reported() {
        let a = unit("fn one() {}\n");
        let b = unit("fn one() {}\nfn two() {}\n");
        let diff = diff_units(&a, &b);
        assert_eq!(diff.added_lines, 1);
        assert_eq!(diff.removed_lines, 0);
        assert_eq!(
            diff.member_changes,
            vec![MemberChange {
                signature: "two()".to_string(),
                kind: MemberChangeKind::Added,
            }]
        );
        assert!(diff.unified.contains("+fn two() {}"));
    }

    #[test]
    fn modified_body_is_classified_modified() {
        let a = unit(indoc! {"
            fn one() {
                let x = 1;
            }
        "});
        let b = unit(indoc! {"
            fn one() {
                let x = 2;
            }
        "});
        let diff = diff_units(&a, &b);
        assert_eq!(diff.member_changes.len(), 1);
        assert_eq!(diff.member_changes[0].kind, MemberChangeKind::Modified);
        assert_eq!(diff.added_lines, 1);
        assert_eq!(diff.removed_lines, 1);
    }

    #[test]
    fn method_signatures_are_keyed_by_type() {
        let a = unit("struct S { a: u32 }\nimpl S { fn m(&self) -> u32 { self.a } }\n");
        let b = unit("struct S { a: u32 }\n");
        let diff = diff_units(&a, &b);
        assert!(diff
            .member_changes
            .iter()
            .any(|c| c.signature.starts_with("S::m") && c.kind == MemberChangeKind::Removed));
    }

    #[test]
    fn unified_diff_has_hunk_headers() {
        let a = unit("fn a() {}\nfn b() {}\nfn c() {}\nfn d() {}\nfn e() {}\n");
        let b = unit("fn a() {}\nfn b() {}\nfn x() {}\nfn d() {}\nfn e() {}\n");
        let diff = diff_units(&a, &b);
        assert!(diff.unified.starts_with("--- a/m.rs\n+++ b/m.rs\n"));
        assert!(diff.unified.contains("@@ -"));
        assert!(diff.unified.contains("-fn c() {}"));
        assert!(diff.unified.contains("+fn x() {}"));
    }
}

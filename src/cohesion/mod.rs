//! Cohesion analysis over a type's members.
//!
//! Builds a graph whose nodes are a type's methods, with an edge wherever
//! two methods touch a common field. Connected components are candidate
//! responsibility clusters; the component count is the LCOM4 metric
//! (1 is ideal, more signals mixed responsibilities).

pub mod type_info;

pub use type_info::{extract_types, find_type, FieldInfo, MethodInfo, TypeInfo};
pub(crate) use type_info::normalize_tokens;

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

/// A group of methods connected through shared field access.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CohesiveCluster {
    pub suggested_name: String,
    pub method_names: Vec<String>,
    pub shared_field_names: Vec<String>,
    pub property_names: Vec<String>,
    pub cohesion_score: f64,
    pub total_complexity: u32,
}

/// A cluster labelled with the responsibility its method names suggest.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResponsibilityBoundary {
    pub responsibility: String,
    pub cluster: CohesiveCluster,
}

/// Method-name prefixes mapped to responsibility labels. A cluster with no
/// majority prefix falls back to the generic label.
const PREFIX_RESPONSIBILITIES: &[(&str, &str)] = &[
    ("get", "Accessors"),
    ("set", "Accessors"),
    ("is", "Accessors"),
    ("has", "Accessors"),
    ("load", "Loading"),
    ("read", "Loading"),
    ("fetch", "Loading"),
    ("open", "Loading"),
    ("save", "Persistence"),
    ("write", "Persistence"),
    ("store", "Persistence"),
    ("flush", "Persistence"),
    ("validate", "Validation"),
    ("check", "Validation"),
    ("verify", "Validation"),
    ("ensure", "Validation"),
    ("calculate", "Computation"),
    ("compute", "Computation"),
    ("sum", "Computation"),
    ("count", "Computation"),
    ("parse", "Parsing"),
    ("format", "Formatting"),
    ("render", "Formatting"),
    ("print", "Formatting"),
    ("send", "Messaging"),
    ("notify", "Messaging"),
    ("publish", "Messaging"),
    ("emit", "Messaging"),
    ("handle", "Processing"),
    ("process", "Processing"),
    ("update", "Processing"),
];

const GENERIC_RESPONSIBILITY: &str = "Core";

/// Minimum methods for a cluster to be worth extracting.
const MIN_CLUSTER_SIZE: usize = 2;

#[derive(Debug, Clone, Copy, Default)]
pub struct CohesionAnalyzer;

impl CohesionAnalyzer {
    pub fn new() -> Self {
        Self
    }

    /// LCOM4: number of connected components in the shared-field graph.
    ///
    /// A type with no fields has nothing to measure; 0.0 is the defined
    /// sentinel (never a division by zero).
    pub fn calculate_lcom4(&self, ty: &TypeInfo) -> f64 {
        if ty.fields.is_empty() {
            return 0.0;
        }
        components(ty).len() as f64
    }

    /// Connected components with at least [`MIN_CLUSTER_SIZE`] methods,
    /// largest first. Singleton components are not extractable.
    pub fn find_cohesive_clusters(&self, ty: &TypeInfo) -> Vec<CohesiveCluster> {
        if ty.fields.is_empty() {
            return Vec::new();
        }
        let mut clusters: Vec<CohesiveCluster> = components(ty)
            .into_iter()
            .filter(|c| c.len() >= MIN_CLUSTER_SIZE)
            .map(|component| build_cluster(ty, &component))
            .collect();
        clusters.sort_by(|a, b| b.method_names.len().cmp(&a.method_names.len()));
        clusters
    }

    /// Clusters labelled by majority method-name prefix.
    pub fn identify_responsibilities(&self, ty: &TypeInfo) -> Vec<ResponsibilityBoundary> {
        self.find_cohesive_clusters(ty)
            .into_iter()
            .map(|mut cluster| {
                let responsibility = majority_responsibility(&cluster.method_names);
                cluster.suggested_name = format!("{}{responsibility}", ty.name);
                ResponsibilityBoundary {
                    responsibility,
                    cluster,
                }
            })
            .collect()
    }
}

/// Connected components over method indices, as sorted method-index sets.
fn components(ty: &TypeInfo) -> Vec<Vec<usize>> {
    let n = ty.methods.len();
    let mut visited = vec![false; n];
    let mut result = Vec::new();

    for start in 0..n {
        if visited[start] {
            continue;
        }
        let mut component = Vec::new();
        let mut stack = vec![start];
        visited[start] = true;
        while let Some(i) = stack.pop() {
            component.push(i);
            for j in 0..n {
                if !visited[j] && shares_field(&ty.methods[i], &ty.methods[j]) {
                    visited[j] = true;
                    stack.push(j);
                }
            }
        }
        component.sort_unstable();
        result.push(component);
    }
    result
}

fn shares_field(a: &MethodInfo, b: &MethodInfo) -> bool {
    a.fields_used.intersection(&b.fields_used).next().is_some()
}

fn build_cluster(ty: &TypeInfo, component: &[usize]) -> CohesiveCluster {
    let methods: Vec<&MethodInfo> = component.iter().map(|&i| &ty.methods[i]).collect();
    let method_names: Vec<String> = methods.iter().map(|m| m.name.clone()).collect();

    let mut field_counts: BTreeMap<&str, usize> = BTreeMap::new();
    for m in &methods {
        for f in &m.fields_used {
            *field_counts.entry(f.as_str()).or_insert(0) += 1;
        }
    }
    let shared_field_names: Vec<String> = field_counts
        .iter()
        .filter(|(_, &count)| count >= 2 || methods.len() == 1)
        .map(|(name, _)| name.to_string())
        .collect();

    let touched: BTreeSet<&str> = field_counts.keys().copied().collect();
    let property_names: Vec<String> = ty
        .fields
        .iter()
        .filter(|f| f.is_public && touched.contains(f.name.as_str()))
        .map(|f| f.name.clone())
        .collect();

    CohesiveCluster {
        suggested_name: format!("{}{GENERIC_RESPONSIBILITY}", ty.name),
        method_names,
        shared_field_names,
        property_names,
        cohesion_score: edge_density(&methods),
        total_complexity: methods.iter().map(|m| m.cyclomatic).sum(),
    }
}

/// Fraction of method pairs in the cluster that directly share a field.
fn edge_density(methods: &[&MethodInfo]) -> f64 {
    let n = methods.len();
    if n < 2 {
        return 1.0;
    }
    let mut edges = 0usize;
    for i in 0..n {
        for j in (i + 1)..n {
            if shares_field(methods[i], methods[j]) {
                edges += 1;
            }
        }
    }
    edges as f64 / (n * (n - 1) / 2) as f64
}

fn method_prefix(name: &str) -> &str {
    name.split('_').next().unwrap_or(name)
}

fn majority_responsibility(method_names: &[String]) -> String {
    let mut votes: BTreeMap<&str, usize> = BTreeMap::new();
    for name in method_names {
        let prefix = method_prefix(name);
        if let Some((_, label)) = PREFIX_RESPONSIBILITIES.iter().find(|(p, _)| *p == prefix) {
            *votes.entry(label).or_insert(0) += 1;
        }
    }
    let majority = votes
        .into_iter()
        .max_by_key(|&(_, count)| count)
        .filter(|&(_, count)| count * 2 > method_names.len());
    match majority {
        Some((label, _)) => label.to_string(),
        None => GENERIC_RESPONSIBILITY.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::CompilationUnit;
    use indoc::indoc;

    fn type_of(source: &str) -> TypeInfo {
        let unit = CompilationUnit::parse("t.rs", source);
        extract_types(&unit).remove(0)
    }

    #[test]
    fn single_shared_field_means_one_component() {
        let ty = type_of(indoc! {"
            struct S { a: u32 }
            impl S {
                fn one(&self) -> u32 { self.a }
                fn two(&self) -> u32 { self.a + 1 }
            }
        "});
        let analyzer = CohesionAnalyzer::new();
        assert_eq!(analyzer.calculate_lcom4(&ty), 1.0);
        assert_eq!(analyzer.find_cohesive_clusters(&ty).len(), 1);
    }

    #[test]
    fn disjoint_field_groups_split_components() {
        // 20 methods split 12/8 across two disjoint field-access groups.
        let mut source = String::from("struct S { a: u32, b: u32 }\nimpl S {\n");
        for i in 0..12 {
            source.push_str(&format!("    fn first_{i}(&self) -> u32 {{ self.a }}\n"));
        }
        for i in 0..8 {
            source.push_str(&format!("    fn second_{i}(&self) -> u32 {{ self.b }}\n"));
        }
        source.push_str("}\n");

        let ty = type_of(&source);
        let analyzer = CohesionAnalyzer::new();
        assert_eq!(analyzer.calculate_lcom4(&ty), 2.0);

        let clusters = analyzer.find_cohesive_clusters(&ty);
        assert_eq!(clusters.len(), 2);
        assert_eq!(clusters[0].method_names.len(), 12);
        assert_eq!(clusters[1].method_names.len(), 8);
    }

    #[test]
    fn zero_fields_yields_sentinel() {
        let ty = type_of("struct S;\nimpl S { fn go(&self) {} }\n");
        let analyzer = CohesionAnalyzer::new();
        assert_eq!(analyzer.calculate_lcom4(&ty), 0.0);
        assert!(analyzer.find_cohesive_clusters(&ty).is_empty());
    }

    #[test]
    fn singleton_clusters_are_not_extractable() {
        let ty = type_of(indoc! {"
            struct S { a: u32, b: u32 }
            impl S {
                fn lonely(&self) -> u32 { self.a }
                fn first(&self) -> u32 { self.b }
                fn second(&self) -> u32 { self.b + 1 }
            }
        "});
        let clusters = CohesionAnalyzer::new().find_cohesive_clusters(&ty);
        assert_eq!(clusters.len(), 1);
        assert_eq!(clusters[0].method_names, vec!["first", "second"]);
    }

    #[test]
    fn majority_prefix_names_the_responsibility() {
        let ty = type_of(indoc! {"
            struct Order { total: u64 }
            impl Order {
                fn validate_total(&self) -> bool { self.total > 0 }
                fn validate_lines(&self) -> bool { self.total < 100 }
                fn check_currency(&self) -> bool { self.total != 0 }
            }
        "});
        let boundaries = CohesionAnalyzer::new().identify_responsibilities(&ty);
        assert_eq!(boundaries.len(), 1);
        assert_eq!(boundaries[0].responsibility, "Validation");
        assert_eq!(boundaries[0].cluster.suggested_name, "OrderValidation");
    }

    #[test]
    fn no_majority_falls_back_to_generic_label() {
        let ty = type_of(indoc! {"
            struct S { a: u32 }
            impl S {
                fn alpha(&self) -> u32 { self.a }
                fn beta(&self) -> u32 { self.a }
                fn gamma(&self) -> u32 { self.a }
            }
        "});
        let boundaries = CohesionAnalyzer::new().identify_responsibilities(&ty);
        assert_eq!(boundaries[0].responsibility, GENERIC_RESPONSIBILITY);
    }
}

//! Halstead volume from operator/operand vocabulary and length.
//!
//! Tokens come straight from the lexer: identifiers and literals are
//! operands (keywords count as operators), punctuation and group delimiters
//! are operators.

use proc_macro2::{TokenStream, TokenTree};
use std::collections::HashSet;
use std::str::FromStr;

const KEYWORDS: &[&str] = &[
    "as", "async", "await", "break", "const", "continue", "crate", "dyn", "else", "enum", "extern",
    "fn", "for", "if", "impl", "in", "let", "loop", "match", "mod", "move", "mut", "pub", "ref",
    "return", "self", "Self", "static", "struct", "super", "trait", "type", "unsafe", "use",
    "where", "while",
];

#[derive(Debug, Clone, Default, PartialEq)]
pub struct HalsteadMetrics {
    pub distinct_operators: usize,
    pub distinct_operands: usize,
    pub total_operators: usize,
    pub total_operands: usize,
}

impl HalsteadMetrics {
    pub fn vocabulary(&self) -> usize {
        self.distinct_operators + self.distinct_operands
    }

    pub fn length(&self) -> usize {
        self.total_operators + self.total_operands
    }

    /// `length * log2(vocabulary)`; a vocabulary of zero is defined as
    /// volume 1 to keep downstream logarithms well-formed.
    pub fn volume(&self) -> f64 {
        let vocabulary = self.vocabulary();
        if vocabulary == 0 {
            return 1.0;
        }
        self.length() as f64 * (vocabulary as f64).log2()
    }
}

/// Tokenize `source` and tally Halstead operators/operands. Source that the
/// lexer rejects yields empty metrics (volume 1).
pub fn measure_source(source: &str) -> HalsteadMetrics {
    let mut operators: HashSet<String> = HashSet::new();
    let mut operands: HashSet<String> = HashSet::new();
    let mut metrics = HalsteadMetrics::default();

    let Ok(stream) = TokenStream::from_str(source) else {
        return metrics;
    };
    tally(stream, &mut operators, &mut operands, &mut metrics);
    metrics.distinct_operators = operators.len();
    metrics.distinct_operands = operands.len();
    metrics
}

fn tally(
    stream: TokenStream,
    operators: &mut HashSet<String>,
    operands: &mut HashSet<String>,
    metrics: &mut HalsteadMetrics,
) {
    for tree in stream {
        match tree {
            TokenTree::Ident(ident) => {
                let text = ident.to_string();
                if KEYWORDS.contains(&text.as_str()) {
                    metrics.total_operators += 1;
                    operators.insert(text);
                } else {
                    metrics.total_operands += 1;
                    operands.insert(text);
                }
            }
            TokenTree::Literal(lit) => {
                metrics.total_operands += 1;
                operands.insert(lit.to_string());
            }
            TokenTree::Punct(punct) => {
                metrics.total_operators += 1;
                operators.insert(punct.as_char().to_string());
            }
            TokenTree::Group(group) => {
                metrics.total_operators += 1;
                operators.insert(format!("{:?}", group.delimiter()));
                tally(group.stream(), operators, operands, metrics);
            }
        }
    }
}

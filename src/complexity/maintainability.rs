/// Maintainability index on the classic 0-100 scale.
///
/// `171 - 5.2*ln(volume) - 0.23*cyclomatic - 16.2*ln(loc)`, clamped to
/// [0, 100]. Undefined inputs (no code, or no measurable volume) score 100:
/// there is nothing to penalize.
pub fn maintainability_index(halstead_volume: f64, cyclomatic: u32, loc: usize) -> f64 {
    if loc == 0 || halstead_volume <= 0.0 {
        return 100.0;
    }
    let raw = 171.0
        - 5.2 * halstead_volume.ln()
        - 0.23 * f64::from(cyclomatic)
        - 16.2 * (loc as f64).ln();
    raw.clamp(0.0, 100.0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_input_is_perfectly_maintainable() {
        assert_eq!(maintainability_index(0.0, 0, 0), 100.0);
        assert_eq!(maintainability_index(100.0, 5, 0), 100.0);
        assert_eq!(maintainability_index(-1.0, 5, 10), 100.0);
    }

    #[test]
    fn result_is_clamped_to_scale() {
        let huge = maintainability_index(1e12, 500, 100_000);
        assert_eq!(huge, 0.0);
        let tiny = maintainability_index(1.0, 1, 1);
        assert!(tiny <= 100.0 && tiny > 0.0);
    }

    #[test]
    fn more_complexity_lowers_the_index() {
        let simple = maintainability_index(100.0, 2, 20);
        let complex = maintainability_index(100.0, 20, 20);
        assert!(simple > complex);
    }
}

use crate::process::kind::ColumnHint;

/// Blank and whitespace-only cells collapse to the missing-sentinel.
pub fn clean_cell(raw: &str) -> Option<String> {
    if raw.trim().is_empty() {
        None
    } else {
        Some(raw.to_string())
    }
}

/// Render a number the way float-typed storage prints it: integral values keep a `.0`.
pub fn render_float(s: &str) -> Option<String> {
    let v: f64 = s.trim().parse().ok()?;
    if !v.is_finite() {
        return None;
    }
    if v.fract() == 0.0 && v.abs() < 1e16 {
        Some(format!("{:.1}", v))
    } else {
        Some(v.to_string())
    }
}

/// Apply a loader hint to one cell. Non-numeric text under a `Float` hint is kept as-is.
pub fn apply_hint(cell: Option<String>, hint: ColumnHint) -> Option<String> {
    match (cell, hint) {
        (Some(s), ColumnHint::Float) => Some(render_float(&s).unwrap_or(s)),
        (cell, _) => cell,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn blank_cells_are_missing() {
        assert_eq!(clean_cell(""), None);
        assert_eq!(clean_cell("  \t"), None);
        assert_eq!(clean_cell(" x "), Some(" x ".into()));
    }

    #[test]
    fn floats_render_like_numeric_storage() {
        assert_eq!(render_float("20170304").as_deref(), Some("20170304.0"));
        assert_eq!(render_float("2").as_deref(), Some("2.0"));
        assert_eq!(render_float("2.0").as_deref(), Some("2.0"));
        assert_eq!(render_float("2.5").as_deref(), Some("2.5"));
        assert_eq!(render_float("abc"), None);
    }

    #[test]
    fn hints() {
        assert_eq!(
            apply_hint(Some("17101".into()), ColumnHint::Text).as_deref(),
            Some("17101")
        );
        assert_eq!(
            apply_hint(Some("17101".into()), ColumnHint::Float).as_deref(),
            Some("17101.0")
        );
        assert_eq!(
            apply_hint(Some("n/a".into()), ColumnHint::Float).as_deref(),
            Some("n/a")
        );
        assert_eq!(apply_hint(None, ColumnHint::Float), None);
    }
}

use crate::process::raw_table::Cell;

/// 1) Trim whitespace + strip outer quotes if present.
pub fn clean_str(raw: &str) -> String {
    let trimmed = raw.trim();
    if trimmed.starts_with('"') && trimmed.ends_with('"') && trimmed.len() >= 2 {
        trimmed[1..trimmed.len() - 1].trim().to_string()
    } else {
        trimmed.to_string()
    }
}

/// 2) Render a cell as text. Empty, blank and not-a-number cells give `None`.
/// Integral floats render without a fractional part ("6.0" reads as "6").
pub fn cell_text(cell: &Cell) -> Option<String> {
    match cell {
        Cell::Empty => None,
        Cell::Int(i) => Some(i.to_string()),
        Cell::Float(f) if !f.is_finite() => None,
        Cell::Float(f) if f.fract() == 0.0 && f.abs() < 1e15 => Some((*f as i64).to_string()),
        Cell::Float(f) => Some(f.to_string()),
        Cell::Bool(b) => Some(b.to_string()),
        Cell::Text(s) => {
            let s = clean_str(s);
            if s.is_empty() || s.eq_ignore_ascii_case("nan") {
                None
            } else {
                Some(s)
            }
        }
    }
}

/// 3) Coerce a cell to an integer, truncating floats. Anything unparseable is `None`.
pub fn coerce_int(cell: &Cell) -> Option<i64> {
    match cell {
        Cell::Empty => None,
        Cell::Int(i) => Some(*i),
        Cell::Float(f) if f.is_finite() => Some(f.trunc() as i64),
        Cell::Float(_) => None,
        Cell::Bool(b) => Some(i64::from(*b)),
        Cell::Text(s) => {
            let s: String = clean_str(s)
                .chars()
                .filter(|c| *c != ',' && *c != '$')
                .collect();
            if s.is_empty() {
                return None;
            }
            s.parse::<i64>().ok().or_else(|| {
                s.parse::<f64>()
                    .ok()
                    .filter(|f| f.is_finite())
                    .map(|f| f.trunc() as i64)
            })
        }
    }
}

/// 4) Left-pad a code with zeros up to `width`. Longer codes are left alone.
pub fn zero_pad(code: &str, width: usize) -> String {
    format!("{:0>width$}", code, width = width)
}

//! Typed access to table cells
//!
//! Spreadsheet exports are loose about types: an integer column that
//! contains a blank turns into floats (`58.0`), blanks become `null`, and
//! flags may arrive as booleans, numbers or strings. These helpers read a
//! cell the way a human reading the sheet would.

use serde_json::Value;

/// Check whether a cell is a blank placeholder
///
/// `null`, empty strings and `"nan"` all count as blank.
pub fn is_blank(value: Option<&Value>) -> bool {
    match value {
        None | Some(Value::Null) => true,
        Some(Value::String(s)) => {
            let s = s.trim();
            s.is_empty() || s.eq_ignore_ascii_case("nan")
        }
        Some(Value::Number(n)) => n.as_f64().map_or(false, f64::is_nan),
        _ => false,
    }
}

/// Read a cell as a non-empty string
///
/// Numbers are rendered in their integral form when they have no fraction,
/// so a chain or code column that was parsed as a number still reads back
/// as text.
pub fn as_string(value: Option<&Value>) -> Option<String> {
    if is_blank(value) {
        return None;
    }
    match value? {
        Value::String(s) => Some(s.trim().to_string()),
        Value::Number(n) => {
            if let Some(i) = n.as_i64() {
                Some(i.to_string())
            } else {
                n.as_f64()
                    .map(|f| integral(f).map_or_else(|| f.to_string(), |i| i.to_string()))
            }
        }
        Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}

/// Read a cell as an integer sequence position
///
/// Accepts integers, floats with no fractional part and numeric strings.
pub fn as_position(value: Option<&Value>) -> Option<i64> {
    if is_blank(value) {
        return None;
    }
    match value? {
        Value::Number(n) => n.as_i64().or_else(|| n.as_f64().and_then(integral)),
        Value::String(s) => {
            let s = s.trim();
            s.parse::<i64>()
                .ok()
                .or_else(|| s.parse::<f64>().ok().and_then(integral))
        }
        _ => None,
    }
}

/// The integer a float stands for, if it has no fraction and fits an `i64`
fn integral(f: f64) -> Option<i64> {
    // i64::MAX as f64 rounds up to 2^63, which is out of range
    let bound = i64::MAX as f64;
    (f.fract() == 0.0 && f >= -bound && f < bound).then(|| f as i64)
}

/// Read a cell as a float
pub fn as_f64(value: Option<&Value>) -> Option<f64> {
    if is_blank(value) {
        return None;
    }
    match value? {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

/// Read a cell as a boolean flag
///
/// Accepts JSON booleans, `0`/`1`, and `true`/`false`/`yes`/`no` strings.
pub fn as_bool(value: Option<&Value>) -> Option<bool> {
    if is_blank(value) {
        return None;
    }
    match value? {
        Value::Bool(b) => Some(*b),
        Value::Number(n) => n.as_f64().map(|f| f != 0.0),
        Value::String(s) => match s.trim().to_ascii_lowercase().as_str() {
            "true" | "yes" | "1" => Some(true),
            "false" | "no" | "0" => Some(false),
            _ => None,
        },
        _ => None,
    }
}

/// Convert an optional float into a cell, writing `null` for `None`
pub fn float_cell(value: Option<f64>) -> Value {
    value
        .and_then(serde_json::Number::from_f64)
        .map(Value::Number)
        .unwrap_or(Value::Null)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_blank_cells() {
        assert!(is_blank(None));
        assert!(is_blank(Some(&Value::Null)));
        assert!(is_blank(Some(&json!("  "))));
        assert!(is_blank(Some(&json!("NaN"))));
        assert!(!is_blank(Some(&json!(0))));
    }

    #[test]
    fn test_position_from_float_and_string() {
        assert_eq!(as_position(Some(&json!(58))), Some(58));
        assert_eq!(as_position(Some(&json!(58.0))), Some(58));
        assert_eq!(as_position(Some(&json!("58"))), Some(58));
        assert_eq!(as_position(Some(&json!(58.5))), None);
        assert_eq!(as_position(Some(&Value::Null)), None);
    }

    #[test]
    fn test_out_of_range_floats_are_not_clamped() {
        assert_eq!(as_position(Some(&json!(1e30))), None);
        assert_eq!(as_position(Some(&json!("2E50"))), None);
        assert_eq!(as_position(Some(&json!(-1e19))), None);
        assert_eq!(as_position(Some(&json!(-9.0e15))), Some(-9_000_000_000_000_000));

        let text = as_string(Some(&json!(2e50))).unwrap();
        assert_eq!(text, format!("2{}", "0".repeat(50)));
    }

    #[test]
    fn test_string_from_number() {
        assert_eq!(as_string(Some(&json!(1.0))), Some("1".to_string()));
        assert_eq!(as_string(Some(&json!(" A "))), Some("A".to_string()));
        assert_eq!(as_string(Some(&json!(""))), None);
    }

    #[test]
    fn test_bool_flags() {
        assert_eq!(as_bool(Some(&json!(true))), Some(true));
        assert_eq!(as_bool(Some(&json!(0))), Some(false));
        assert_eq!(as_bool(Some(&json!("False"))), Some(false));
        assert_eq!(as_bool(Some(&json!("maybe"))), None);
    }

    #[test]
    fn test_float_cell_handles_nan() {
        assert_eq!(float_cell(Some(1.5)), json!(1.5));
        assert_eq!(float_cell(Some(f64::NAN)), Value::Null);
        assert_eq!(float_cell(None), Value::Null);
    }
}

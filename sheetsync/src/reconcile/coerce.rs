//! Coercion of raw wire cells into canonical cells
//!
//! Coercion is total: anything it does not recognise degrades to its string
//! form and the validator decides whether that is acceptable.

use serde_json::Value as Json;

use super::types::CanonicalCell;

/// Normalize one raw cell
pub fn coerce(raw: &Json) -> CanonicalCell {
    match raw {
        Json::Null => CanonicalCell::Null,
        Json::Bool(b) => CanonicalCell::Bool(*b),
        Json::Number(n) => coerce_number(n),
        Json::String(s) => coerce_string(s),
        Json::Object(map) => match decode_tagged(map) {
            Some(cell) => cell,
            None => CanonicalCell::String(raw.to_string()),
        },
        Json::Array(_) => CanonicalCell::String(raw.to_string()),
    }
}

/// Coerce a full row, padding or truncating to `width` cells
pub fn coerce_row(row: &[Json], width: usize) -> Vec<CanonicalCell> {
    (0..width)
        .map(|i| row.get(i).map(coerce).unwrap_or_default())
        .collect()
}

/// A row whose every cell is null or blank
pub fn is_blank_row(cells: &[CanonicalCell]) -> bool {
    cells.iter().all(CanonicalCell::is_blank)
}

fn coerce_string(s: &str) -> CanonicalCell {
    if s.trim().is_empty() {
        CanonicalCell::Null
    } else {
        CanonicalCell::String(s.to_string())
    }
}

fn coerce_number(n: &serde_json::Number) -> CanonicalCell {
    if let Some(i) = n.as_i64() {
        return CanonicalCell::Int(i);
    }
    match n.as_f64() {
        Some(f) => float_or_int(f),
        // Not reachable without arbitrary precision, keep the literal
        None => CanonicalCell::String(n.to_string()),
    }
}

/// Integers stay integers unless they carry a fraction or overflow i64
fn float_or_int(f: f64) -> CanonicalCell {
    // i64::MAX as f64 rounds up to 2^63, hence the strict upper bound
    let in_range = f >= i64::MIN as f64 && f < i64::MAX as f64;
    if f.is_finite() && f.fract() == 0.0 && in_range {
        CanonicalCell::Int(f as i64)
    } else {
        CanonicalCell::Float(f)
    }
}

/// Decode the `{"type": ..., "value": ...}` wire form of a canonical cell
fn decode_tagged(map: &serde_json::Map<String, Json>) -> Option<CanonicalCell> {
    let tag = map.get("type")?.as_str()?;
    let extra_keys = map.keys().any(|k| k != "type" && k != "value");
    if extra_keys {
        return None;
    }
    let value = map.get("value").unwrap_or(&Json::Null);

    let cell = match tag.to_ascii_lowercase().as_str() {
        "null" => CanonicalCell::Null,
        "string" => match value {
            Json::String(s) => coerce_string(s),
            Json::Null => CanonicalCell::Null,
            other => CanonicalCell::String(other.to_string()),
        },
        "int" | "float" | "number" => match value {
            Json::Number(n) => coerce_number(n),
            Json::Null => CanonicalCell::Null,
            _ => return None,
        },
        "bool" | "boolean" => match value {
            Json::Bool(b) => CanonicalCell::Bool(*b),
            Json::Null => CanonicalCell::Null,
            _ => return None,
        },
        _ => return None,
    };
    Some(cell)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_null_and_blank_strings() {
        assert_eq!(coerce(&json!(null)), CanonicalCell::Null);
        assert_eq!(coerce(&json!("")), CanonicalCell::Null);
        assert_eq!(coerce(&json!(" \t ")), CanonicalCell::Null);
        assert_eq!(coerce(&json!(" x ")), CanonicalCell::from(" x "));
    }

    #[test]
    fn test_numbers_prefer_integers() {
        assert_eq!(coerce(&json!(123)), CanonicalCell::Int(123));
        assert_eq!(coerce(&json!(-7)), CanonicalCell::Int(-7));
        assert_eq!(coerce(&json!(5.0)), CanonicalCell::Int(5));
        assert_eq!(coerce(&json!(123.5)), CanonicalCell::Float(123.5));
    }

    #[test]
    fn test_out_of_range_numbers_fall_back_to_float() {
        let big = coerce(&json!(u64::MAX));
        assert!(matches!(big, CanonicalCell::Float(_)));

        let huge = coerce(&json!(1e20));
        assert_eq!(huge, CanonicalCell::Float(1e20));
    }

    #[test]
    fn test_strings_are_not_parsed() {
        assert_eq!(coerce(&json!("123")), CanonicalCell::from("123"));
        assert_eq!(coerce(&json!("true")), CanonicalCell::from("true"));
    }

    #[test]
    fn test_booleans_map_directly() {
        assert_eq!(coerce(&json!(true)), CanonicalCell::Bool(true));
        assert_eq!(coerce(&json!(false)), CanonicalCell::Bool(false));
    }

    #[test]
    fn test_tagged_wire_values() {
        assert_eq!(
            coerce(&json!({"type": "Int", "value": 9})),
            CanonicalCell::Int(9)
        );
        assert_eq!(
            coerce(&json!({"type": "String", "value": "  "})),
            CanonicalCell::Null
        );
        assert_eq!(coerce(&json!({"type": "Null"})), CanonicalCell::Null);
        assert_eq!(
            coerce(&json!({"type": "Bool", "value": true})),
            CanonicalCell::Bool(true)
        );
    }

    #[test]
    fn test_unrecognised_shapes_degrade_to_strings() {
        assert_eq!(coerce(&json!([1, 2])), CanonicalCell::from("[1,2]"));
        assert_eq!(
            coerce(&json!({"a": 1})),
            CanonicalCell::from(r#"{"a":1}"#)
        );
        // Known tag with a mismatched payload is not a tagged value
        assert_eq!(
            coerce(&json!({"type": "Int", "value": "x"})),
            CanonicalCell::String(r#"{"type":"Int","value":"x"}"#.into())
        );
    }

    #[test]
    fn test_coerce_row_pads_and_truncates() {
        let row = vec![json!("a"), json!(1)];
        assert_eq!(
            coerce_row(&row, 3),
            vec![CanonicalCell::from("a"), CanonicalCell::Int(1), CanonicalCell::Null]
        );
        assert_eq!(coerce_row(&row, 1), vec![CanonicalCell::from("a")]);
    }

    #[test]
    fn test_blank_row_detection() {
        let blank = coerce_row(&[json!(null), json!("  "), json!("")], 3);
        assert!(is_blank_row(&blank));
        let not_blank = coerce_row(&[json!(null), json!(0)], 2);
        assert!(!is_blank_row(&not_blank));
    }
}

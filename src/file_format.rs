//! The user-facing strokes file: `{ "version": 1, "strokes": [...] }`.
//!
//! Import validates the whole document before building any stroke, so a
//! rejected file never partially applies.

use serde::de::DeserializeOwned;
use serde_json::{Map, Value, json};

use crate::drawing::{FontFamily, FontSize, LineStyle, ShapeKind, Stroke, TextAlign};
use crate::error::ImportError;

pub const FILE_VERSION: u64 = 1;

pub fn export_strokes_file(strokes: &[Stroke]) -> Value {
    json!({
        "version": FILE_VERSION,
        "strokes": strokes,
    })
}

pub fn parse_strokes_file(raw: &str) -> Result<Vec<Stroke>, ImportError> {
    let value: Value = serde_json::from_str(raw)?;
    validate_strokes_file(&value)
}

pub fn validate_strokes_file(value: &Value) -> Result<Vec<Stroke>, ImportError> {
    let root = value.as_object().ok_or(ImportError::NotAnObject)?;
    match root.get("version") {
        Some(v) if v.as_u64() == Some(FILE_VERSION) => {}
        Some(v) => return Err(ImportError::UnsupportedVersion(v.to_string())),
        None => return Err(ImportError::UnsupportedVersion("missing".into())),
    }
    let raw = root
        .get("strokes")
        .and_then(Value::as_array)
        .ok_or(ImportError::MissingStrokes)?;

    let mut cleaned = Vec::with_capacity(raw.len());
    for (index, item) in raw.iter().enumerate() {
        let obj = item
            .as_object()
            .ok_or_else(|| ImportError::stroke(index, "must be an object"))?;
        check_stroke(obj).map_err(|reason| ImportError::stroke(index, reason))?;
        cleaned.push(without_nulls(obj));
    }

    cleaned
        .into_iter()
        .enumerate()
        .map(|(index, obj)| {
            serde_json::from_value::<Stroke>(Value::Object(obj))
                .map_err(|e| ImportError::stroke(index, e.to_string()))
        })
        .collect()
}

fn without_nulls(obj: &Map<String, Value>) -> Map<String, Value> {
    obj.iter()
        .filter(|(_, v)| !v.is_null())
        .map(|(k, v)| (k.clone(), v.clone()))
        .collect()
}

fn present<'a>(obj: &'a Map<String, Value>, key: &str) -> Option<&'a Value> {
    obj.get(key).filter(|v| !v.is_null())
}

fn check_enum<T: DeserializeOwned>(obj: &Map<String, Value>, key: &str) -> Result<(), String> {
    match present(obj, key) {
        None => Ok(()),
        Some(v) => serde_json::from_value::<T>(v.clone())
            .map(|_| ())
            .map_err(|_| format!("unrecognized {key} {v}")),
    }
}

fn check_type(
    obj: &Map<String, Value>,
    key: &str,
    what: &str,
    ok: impl Fn(&Value) -> bool,
) -> Result<(), String> {
    match present(obj, key) {
        Some(v) if !ok(v) => Err(format!("{key} must be {what}")),
        _ => Ok(()),
    }
}

fn check_stroke(obj: &Map<String, Value>) -> Result<(), String> {
    let points = obj
        .get("points")
        .and_then(Value::as_array)
        .filter(|p| !p.is_empty())
        .ok_or("points must be a non-empty array")?;
    for (j, p) in points.iter().enumerate() {
        let numeric = |k: &str| p.get(k).is_some_and(Value::is_number);
        if !(numeric("x") && numeric("y")) {
            return Err(format!("point {j} needs numeric x and y"));
        }
    }

    if !obj
        .get("lineWidth")
        .and_then(Value::as_f64)
        .is_some_and(|w| w > 0.0)
    {
        return Err("lineWidth must be a positive number".into());
    }
    if !obj.get("color").is_some_and(Value::is_string) {
        return Err("color must be a string".into());
    }

    check_enum::<LineStyle>(obj, "style")?;
    check_enum::<ShapeKind>(obj, "shape")?;
    check_enum::<FontSize>(obj, "fontSize")?;
    check_enum::<FontFamily>(obj, "fontFamily")?;
    check_enum::<TextAlign>(obj, "textAlign")?;

    check_type(obj, "dashGap", "a number", Value::is_number)?;
    check_type(obj, "text", "a string", Value::is_string)?;
    check_type(obj, "highlight", "a boolean", Value::is_boolean)?;
    check_type(obj, "bold", "a boolean", Value::is_boolean)?;
    check_type(obj, "italic", "a boolean", Value::is_boolean)?;
    check_type(obj, "fill", "a boolean", Value::is_boolean)?;
    check_type(obj, "fontScale", "a positive number", |v| {
        v.as_f64().is_some_and(|s| s > 0.0)
    })?;
    check_type(obj, "seed", "an unsigned 32-bit integer", |v| {
        v.as_u64().is_some_and(|s| s <= u64::from(u32::MAX))
    })?;
    check_type(obj, "widths", "an array of numbers", |v| {
        v.as_array()
            .is_some_and(|ws| ws.iter().all(Value::is_number))
    })?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::{Point, TextStyle};

    fn sample() -> Vec<Stroke> {
        vec![
            Stroke::freehand(
                vec![Point::new(0.0, 0.0), Point::new(10.5, 3.25)],
                "#000000",
                3.0,
            )
            .with_widths(vec![1.0, 2.5]),
            Stroke::shape(
                ShapeKind::Star,
                Point::new(-4.0, 2.0),
                Point::new(40.0, 44.0),
                "#ff0000",
                2.0,
            )
            .with_seed(42)
            .filled(true)
            .with_dashes(1.5),
            Stroke::text(
                Point::new(7.0, 7.0),
                "two\nlines",
                "#00ff00",
                &TextStyle::default(),
                TextAlign::Center,
            ),
        ]
    }

    #[test]
    fn export_then_import_is_identity() {
        let strokes = sample();
        let text = serde_json::to_string(&export_strokes_file(&strokes)).unwrap();
        assert_eq!(parse_strokes_file(&text).unwrap(), strokes);
    }

    #[test]
    fn rejects_bad_roots() {
        assert!(matches!(
            validate_strokes_file(&json!([])),
            Err(ImportError::NotAnObject)
        ));
        assert!(matches!(
            validate_strokes_file(&json!({"version": 2, "strokes": []})),
            Err(ImportError::UnsupportedVersion(v)) if v == "2"
        ));
        assert!(matches!(
            validate_strokes_file(&json!({"version": 1})),
            Err(ImportError::MissingStrokes)
        ));
        assert!(matches!(parse_strokes_file("{"), Err(ImportError::Json(_))));
    }

    #[test]
    fn names_the_failing_stroke_and_field() {
        let file = json!({
            "version": 1,
            "strokes": [
                {"points": [{"x": 0, "y": 0}], "lineWidth": 2, "color": "#000"},
                {"points": [{"x": 0, "y": 0}], "lineWidth": -1, "color": "#000"},
            ]
        });
        let err = validate_strokes_file(&file).unwrap_err();
        assert_eq!(err.to_string(), "stroke 1: lineWidth must be a positive number");

        let bad_point = json!({
            "version": 1,
            "strokes": [{"points": [{"x": 0}], "lineWidth": 2, "color": "#000"}]
        });
        assert_eq!(
            validate_strokes_file(&bad_point).unwrap_err().to_string(),
            "stroke 0: point 0 needs numeric x and y"
        );
    }

    #[test]
    fn rejects_unknown_enum_values() {
        let file = json!({
            "version": 1,
            "strokes": [{
                "points": [{"x": 0, "y": 0}, {"x": 5, "y": 5}],
                "lineWidth": 2,
                "color": "#000",
                "shape": "blob"
            }]
        });
        let err = validate_strokes_file(&file).unwrap_err();
        assert!(err.to_string().contains("shape"));
    }

    #[test]
    fn tolerates_unknown_fields_and_nulls() {
        let file = json!({
            "version": 1,
            "strokes": [{
                "points": [{"x": 1, "y": 2}],
                "lineWidth": 2,
                "color": "#000",
                "shape": null,
                "author": "someone"
            }]
        });
        let strokes = validate_strokes_file(&file).unwrap();
        assert_eq!(strokes.len(), 1);
        assert_eq!(strokes[0].shape, None);
    }
}

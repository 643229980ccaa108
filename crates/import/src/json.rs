use serde_json::Value;

use crate::cell::Cell;
use crate::error::ImportError;

/// Accepts an array of arrays (first row is the header), an array of objects
/// (keys of the first object are the header), or an object wrapping one of
/// those under its first array-valued field.
pub fn parse(data: &[u8]) -> Result<Vec<Vec<Cell>>, ImportError> {
    let data = data.strip_prefix(b"\xEF\xBB\xBF").unwrap_or(data);
    let value: Value = serde_json::from_slice(data)?;

    let records = match value {
        Value::Array(items) => items,
        Value::Object(map) => map
            .into_iter()
            .find_map(|(_, v)| match v {
                Value::Array(items) => Some(items),
                _ => None,
            })
            .ok_or_else(|| ImportError::malformed("json", "object holds no array of rows"))?,
        _ => return Err(ImportError::malformed("json", "expected an array of rows")),
    };

    match records.first() {
        None => Ok(Vec::new()),
        Some(Value::Object(first)) => {
            let headers: Vec<String> = first.keys().cloned().collect();
            let mut rows = vec![headers.iter().map(|h| Cell::text(h)).collect()];
            for record in &records {
                let Value::Object(obj) = record else {
                    return Err(ImportError::malformed("json", "mixed object and non-object rows"));
                };
                rows.push(
                    headers
                        .iter()
                        .map(|h| obj.get(h).map(to_cell).unwrap_or_default())
                        .collect(),
                );
            }
            Ok(rows)
        }
        Some(_) => records
            .iter()
            .map(|record| match record {
                Value::Array(cells) => Ok(cells.iter().map(to_cell).collect::<Vec<_>>()),
                _ => Err(ImportError::malformed("json", "expected every row to be an array")),
            })
            .collect(),
    }
}

fn to_cell(value: &Value) -> Cell {
    match value {
        Value::Null => Cell::Empty,
        Value::Number(n) => n.as_f64().map(Cell::Number).unwrap_or_default(),
        Value::String(s) => Cell::text(s),
        Value::Bool(b) => Cell::Text(b.to_string()),
        other => Cell::Text(other.to_string()),
    }
}

use crate::cell::Cell;
use crate::error::ImportError;

#[derive(Debug, Default)]
struct Element {
    name: String,
    text: String,
    children: Vec<Element>,
}

impl Element {
    fn is_leaf(&self) -> bool {
        self.children.is_empty()
    }

    fn value(&self) -> String {
        if self.is_leaf() {
            self.text.trim().to_string()
        } else {
            self.children.iter().map(Element::value).collect::<Vec<_>>().join(" ")
        }
    }

    fn walk<'a>(&'a self, out: &mut Vec<&'a Element>) {
        out.push(self);
        for child in &self.children {
            child.walk(out);
        }
    }
}

/// Reads either an Excel 2003 SpreadsheetML document (`Row`/`Cell`/`Data`)
/// or a record-style document where each record is an element whose children
/// are all leaves, e.g. `<compte><numero>411</numero><libelle>Clients</libelle></compte>`.
pub fn parse(data: &[u8]) -> Result<Vec<Vec<Cell>>, ImportError> {
    let data = data.strip_prefix(b"\xEF\xBB\xBF").unwrap_or(data);
    let text = std::str::from_utf8(data)
        .map_err(|e| ImportError::malformed("xml", format!("invalid UTF-8: {e}")))?;
    let root = build_tree(text)?;

    let mut elements = Vec::new();
    root.walk(&mut elements);

    let sheet_rows: Vec<&Element> = elements
        .iter()
        .copied()
        .filter(|e| {
            e.name.eq_ignore_ascii_case("row")
                && e.children.iter().any(|c| c.name.eq_ignore_ascii_case("cell"))
        })
        .collect();
    if !sheet_rows.is_empty() {
        return Ok(sheet_rows
            .iter()
            .map(|row| {
                row.children
                    .iter()
                    .filter(|c| c.name.eq_ignore_ascii_case("cell"))
                    .map(|c| Cell::text(&c.value()))
                    .collect()
            })
            .collect());
    }

    let records: Vec<&Element> = elements
        .iter()
        .copied()
        .filter(|e| !e.is_leaf() && e.children.iter().all(Element::is_leaf))
        .collect();

    let mut headers: Vec<&str> = Vec::new();
    for record in &records {
        for field in &record.children {
            if !headers.contains(&field.name.as_str()) {
                headers.push(&field.name);
            }
        }
    }

    let mut rows = Vec::with_capacity(records.len() + 1);
    rows.push(headers.iter().map(|h| Cell::text(h)).collect());
    for record in &records {
        rows.push(
            headers
                .iter()
                .map(|h| {
                    record
                        .children
                        .iter()
                        .find(|c| c.name == *h)
                        .map(|c| Cell::text(&c.value()))
                        .unwrap_or_default()
                })
                .collect(),
        );
    }
    Ok(rows)
}

/// Deepest element nesting accepted. Balance exports stay far below it.
const MAX_DEPTH: usize = 256;

fn build_tree(text: &str) -> Result<Element, ImportError> {
    let mut stack = vec![Element::default()];
    let mut rest = text;

    while let Some(start) = rest.find('<') {
        if let Some(top) = stack.last_mut() {
            top.text.push_str(&decode_entities(&rest[..start]));
        }
        rest = &rest[start..];

        if let Some(after) = rest.strip_prefix("<![CDATA[") {
            let end = after
                .find("]]>")
                .ok_or_else(|| ImportError::malformed("xml", "unterminated CDATA section"))?;
            if let Some(top) = stack.last_mut() {
                top.text.push_str(&after[..end]);
            }
            rest = &after[end + 3..];
            continue;
        }
        if let Some(after) = rest.strip_prefix("<!--") {
            let end = after
                .find("-->")
                .ok_or_else(|| ImportError::malformed("xml", "unterminated comment"))?;
            rest = &after[end + 3..];
            continue;
        }

        let end = rest
            .find('>')
            .ok_or_else(|| ImportError::malformed("xml", "unterminated tag"))?;
        let tag = &rest[1..end];
        rest = &rest[end + 1..];

        if tag.starts_with('?') || tag.starts_with('!') {
            continue;
        }
        if let Some(closing) = tag.strip_prefix('/') {
            let name = local_name(closing);
            let element = stack
                .pop()
                .filter(|e| e.name == name && !e.name.is_empty())
                .ok_or_else(|| ImportError::malformed("xml", format!("unexpected </{name}>")))?;
            match stack.last_mut() {
                Some(parent) => parent.children.push(element),
                None => return Err(ImportError::malformed("xml", "unbalanced tags")),
            }
            continue;
        }

        let self_closing = tag.ends_with('/');
        let element = Element {
            name: local_name(tag.trim_end_matches('/')).to_string(),
            ..Element::default()
        };
        if self_closing {
            if let Some(parent) = stack.last_mut() {
                parent.children.push(element);
            }
        } else if stack.len() > MAX_DEPTH {
            return Err(ImportError::malformed(
                "xml",
                format!("elements nested deeper than {MAX_DEPTH} levels"),
            ));
        } else {
            stack.push(element);
        }
    }

    if stack.len() != 1 {
        return Err(ImportError::malformed("xml", "document ended with open tags"));
    }
    stack
        .pop()
        .ok_or_else(|| ImportError::malformed("xml", "empty document"))
}

/// Element name without attributes or namespace prefix.
fn local_name(tag: &str) -> &str {
    let name = tag.split_whitespace().next().unwrap_or("");
    name.rsplit(':').next().unwrap_or(name)
}

fn decode_entities(s: &str) -> String {
    if !s.contains('&') {
        return s.to_string();
    }
    let mut out = String::with_capacity(s.len());
    let mut rest = s;
    while let Some(amp) = rest.find('&') {
        out.push_str(&rest[..amp]);
        rest = &rest[amp..];
        let Some(semi) = rest.find(';') else {
            break;
        };
        let entity = &rest[1..semi];
        let decoded = match entity {
            "amp" => Some('&'),
            "lt" => Some('<'),
            "gt" => Some('>'),
            "quot" => Some('"'),
            "apos" => Some('\''),
            _ => entity
                .strip_prefix("#x")
                .and_then(|hex| u32::from_str_radix(hex, 16).ok())
                .or_else(|| entity.strip_prefix('#').and_then(|d| d.parse().ok()))
                .and_then(char::from_u32),
        };
        match decoded {
            Some(c) => {
                out.push(c);
                rest = &rest[semi + 1..];
            }
            None => {
                out.push('&');
                rest = &rest[1..];
            }
        }
    }
    out.push_str(rest);
    out
}

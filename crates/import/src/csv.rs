use crate::cell::Cell;
use crate::error::ImportError;

const CANDIDATE_SEPARATORS: [u8; 4] = [b';', b',', b'\t', b'|'];

/// Turns raw bytes into text according to the declared encoding.
pub fn decode_text(data: &[u8], encoding: Option<&str>) -> Result<String, ImportError> {
    let label = encoding.unwrap_or("utf-8").trim().to_lowercase();
    match label.as_str() {
        "utf-8" | "utf8" => {
            let data = data.strip_prefix(b"\xEF\xBB\xBF").unwrap_or(data);
            String::from_utf8(data.to_vec())
                .map_err(|e| ImportError::malformed("csv", format!("invalid UTF-8: {e}")))
        }
        // Latin-1 maps every byte onto the code point of the same value.
        "iso-8859-1" | "latin1" | "latin-1" => Ok(data.iter().map(|&b| b as char).collect()),
        "windows-1252" | "cp1252" => Ok(data.iter().map(|&b| cp1252_char(b)).collect()),
        other => Err(ImportError::UnsupportedFormat(format!("encoding '{other}'"))),
    }
}

/// Code points of bytes 0x80..=0x9F in windows-1252. Unassigned bytes keep
/// their Latin-1 value.
const CP1252_HIGH: [char; 32] = [
    '\u{20AC}', '\u{81}', '\u{201A}', '\u{192}', '\u{201E}', '\u{2026}', '\u{2020}', '\u{2021}',
    '\u{2C6}', '\u{2030}', '\u{160}', '\u{2039}', '\u{152}', '\u{8D}', '\u{17D}', '\u{8F}',
    '\u{90}', '\u{2018}', '\u{2019}', '\u{201C}', '\u{201D}', '\u{2022}', '\u{2013}', '\u{2014}',
    '\u{2DC}', '\u{2122}', '\u{161}', '\u{203A}', '\u{153}', '\u{9D}', '\u{17E}', '\u{178}',
];

fn cp1252_char(byte: u8) -> char {
    match byte {
        0x80..=0x9F => CP1252_HIGH[usize::from(byte - 0x80)],
        _ => byte as char,
    }
}

/// Picks the candidate separator that occurs most often on the first line.
pub fn sniff_separator(text: &str) -> u8 {
    let first_line = text.lines().find(|l| !l.trim().is_empty()).unwrap_or("");
    CANDIDATE_SEPARATORS
        .iter()
        .copied()
        .map(|sep| (sep, first_line.bytes().filter(|b| *b == sep).count()))
        .filter(|(_, count)| *count > 0)
        .max_by_key(|(_, count)| *count)
        .map(|(sep, _)| sep)
        .unwrap_or(b';')
}

pub fn parse(
    data: &[u8],
    separator: Option<char>,
    encoding: Option<&str>,
) -> Result<Vec<Vec<Cell>>, ImportError> {
    let text = decode_text(data, encoding)?;
    let delimiter = match separator {
        Some(c) if c.is_ascii() => c as u8,
        Some(c) => {
            return Err(ImportError::UnsupportedFormat(format!(
                "non-ASCII separator '{c}'"
            )))
        }
        None => sniff_separator(&text),
    };

    let mut reader = csv::ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .delimiter(delimiter)
        .from_reader(text.as_bytes());

    let mut rows = Vec::new();
    for result in reader.records() {
        let record = result?;
        rows.push(record.iter().map(Cell::text).collect());
    }
    Ok(rows)
}

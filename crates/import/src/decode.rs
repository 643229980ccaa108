use crate::cell::RawMatrix;
use crate::config::ImportFormat;
use crate::error::ImportError;

/// Decoder hints taken from the import configuration.
#[derive(Debug, Clone, Copy, Default)]
pub struct DecodeOptions<'a> {
    pub separator: Option<char>,
    pub encoding: Option<&'a str>,
}

pub fn decode(
    data: &[u8],
    format: ImportFormat,
    options: DecodeOptions<'_>,
) -> Result<RawMatrix, ImportError> {
    if data.iter().all(u8::is_ascii_whitespace) {
        return Err(ImportError::EmptyFile);
    }

    let rows = match format {
        ImportFormat::Csv => crate::csv::parse(data, options.separator, options.encoding)?,
        ImportFormat::Excel => crate::excel::parse(data)?,
        ImportFormat::Json => crate::json::parse(data)?,
        ImportFormat::Xml => crate::xml::parse(data)?,
    };

    let matrix = RawMatrix::from_rows(rows).ok_or(ImportError::EmptyFile)?;
    if matrix.rows.is_empty() {
        return Err(ImportError::NoDataRows);
    }

    tracing::debug!(
        %format,
        columns = matrix.headers.len(),
        rows = matrix.rows.len(),
        "decoded balance file"
    );
    Ok(matrix)
}

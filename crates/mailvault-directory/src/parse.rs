//! Listing parser for the directory tool's tabular output
//!
//! The first line is a header naming the columns. Identifier and display
//! name columns are located by header name and fall back to positions 0 and
//! 1 when the header does not carry them. Fields may be double-quoted to
//! embed the delimiter (`"Doe, Jane"`) or a line break; a doubled quote
//! inside a quoted field is a literal quote.

use mailvault_core::{validate_account_identifier, EntityRecord};

/// Column selection for a listing
#[derive(Debug, Clone)]
pub struct ListingFormat {
    pub identifier_column: String,
    pub display_name_column: String,
    pub delimiter: char,
}

impl Default for ListingFormat {
    fn default() -> Self {
        Self {
            identifier_column: "primaryEmail".to_string(),
            display_name_column: "name.fullName".to_string(),
            delimiter: ',',
        }
    }
}

/// Result of parsing a listing
#[derive(Debug, Default)]
pub struct ParsedListing {
    /// Valid records in listing order
    pub records: Vec<EntityRecord>,
    /// Identifiers that failed validation (empty rows are not included)
    pub rejected: Vec<String>,
}

/// Parse a listing into entity records, dropping rows with invalid identifiers
pub fn parse_listing(text: &str, format: &ListingFormat) -> ParsedListing {
    let mut records = split_records(text, format.delimiter).into_iter();
    let mut parsed = ParsedListing::default();

    let Some(header) = records.next() else {
        return parsed;
    };
    let (id_idx, name_idx) = locate_columns(&header, format);

    for fields in records {
        let identifier = fields.get(id_idx).map(|s| s.trim()).unwrap_or_default();
        if identifier.is_empty() {
            continue;
        }

        if validate_account_identifier(identifier).is_err() {
            tracing::warn!(identifier, "Dropping listing row with invalid identifier");
            parsed.rejected.push(identifier.to_string());
            continue;
        }

        let display_name = fields
            .get(name_idx)
            .map(|s| s.trim().to_string())
            .unwrap_or_default();
        parsed
            .records
            .push(EntityRecord::new(identifier, display_name));
    }

    parsed
}

fn locate_columns(header: &[String], format: &ListingFormat) -> (usize, usize) {
    let find = |name: &str| {
        header
            .iter()
            .position(|h| h.trim().eq_ignore_ascii_case(name))
    };

    let id_idx = find(&format.identifier_column).unwrap_or(0);
    let name_idx = find(&format.display_name_column).unwrap_or(1);
    (id_idx, name_idx)
}

/// Split text into records of fields, honouring double quotes.
///
/// Line breaks inside a quoted field belong to the field. Blank lines are
/// dropped.
fn split_records(text: &str, delimiter: char) -> Vec<Vec<String>> {
    let mut records = Vec::new();
    let mut fields = Vec::new();
    let mut current = String::new();
    let mut in_quotes = false;
    let mut chars = text.chars().peekable();

    let mut end_record = |fields: &mut Vec<String>, current: &mut String| {
        fields.push(std::mem::take(current));
        let record = std::mem::take(fields);
        if !(record.len() == 1 && record[0].trim().is_empty()) {
            records.push(record);
        }
    };

    while let Some(c) = chars.next() {
        match c {
            '"' if in_quotes => {
                if chars.peek() == Some(&'"') {
                    current.push('"');
                    chars.next();
                } else {
                    in_quotes = false;
                }
            }
            '"' if current.trim().is_empty() => {
                current.clear();
                in_quotes = true;
            }
            '\r' if !in_quotes && chars.peek() == Some(&'\n') => {}
            '\n' if !in_quotes => end_record(&mut fields, &mut current),
            c if c == delimiter && !in_quotes => {
                fields.push(std::mem::take(&mut current));
            }
            c => current.push(c),
        }
    }
    end_record(&mut fields, &mut current);

    records
}

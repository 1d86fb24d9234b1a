//! AAMVA payload parsing.
//!
//! Turns the text decoded from a driver's license PDF417 symbol into a
//! [`LicenseRecord`]. Parsing never fails: malformed input produces an empty
//! or partial record.
use serde::{Deserialize, Serialize};

pub mod dlid;
mod record;

pub use dlid::{FieldDesignator, LicenseRecord};

/// Placeholder some decoders emit instead of a line feed.
pub const LINE_FEED_PLACEHOLDER: &str = "<LF>";

/// Placeholder some decoders emit instead of a record separator.
pub const RECORD_SEPARATOR_PLACEHOLDER: &str = "<RS>";

/// Placeholder some decoders emit instead of a carriage return.
pub const CARRIAGE_RETURN_PLACEHOLDER: &str = "<CR>";

const DATA_ELEMENT_SEPARATOR: char = '\n';

const RECORD_SEPARATOR: char = '\x1e';

const SEGMENT_TERMINATOR: char = '\r';

const COMPLIANCE_INDICATOR: char = '@';

const FILE_TYPES: [&str; 2] = ["ANSI ", "AAMVA"];

const SUBFILE_TYPES: [&str; 2] = ["DL", "ID"];

const IIN_SIZE: usize = 6;

const SUBFILE_DESIGNATOR_SIZE: usize = 2 + 4 + 4;

/// What to do when the same designator appears more than once.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum DuplicatePolicy {
    /// The later occurrence overwrites the earlier one.
    #[default]
    LastWins,

    /// The first occurrence is kept, later ones are ignored.
    FirstWins,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ParseOptions {
    pub duplicate_policy: DuplicatePolicy,

    /// Recover the first data element when it shares its line with the file
    /// header and subfile designators.
    pub recover_header_line: bool,
}

impl Default for ParseOptions {
    fn default() -> Self {
        Self {
            duplicate_policy: DuplicatePolicy::default(),
            recover_header_line: true,
        }
    }
}

/// Replaces delimiter placeholders and control characters so that data
/// elements end up separated by a single `\n`.
///
/// Line feeds and record separators become `\n`, carriage returns are
/// removed. Both the literal control characters and their `<LF>`, `<RS>` and
/// `<CR>` placeholders are handled. The result is a fixpoint:
/// `normalize(&normalize(s)) == normalize(s)`.
///
/// Carriage returns are removed before line feeds and record separators are
/// replaced, so a carriage return splitting a placeholder does not hide it:
/// `<L<CR>F>` is a line feed.
pub fn normalize(raw: &str) -> String {
    let mut text = raw.replace(SEGMENT_TERMINATOR, "");
    while text.contains(CARRIAGE_RETURN_PLACEHOLDER) {
        text = text.replace(CARRIAGE_RETURN_PLACEHOLDER, "");
    }

    text.replace(LINE_FEED_PLACEHOLDER, "\n")
        .replace(RECORD_SEPARATOR_PLACEHOLDER, "\n")
        .replace(RECORD_SEPARATOR, "\n")
}

/// Parses a decoded payload with the default options.
pub fn parse(raw: &str) -> LicenseRecord {
    parse_with(raw, &ParseOptions::default())
}

pub fn parse_with(raw: &str, options: &ParseOptions) -> LicenseRecord {
    let mut record = LicenseRecord::new();

    for line in normalize(raw).split(DATA_ELEMENT_SEPARATOR) {
        let element = parse_element(line).or_else(|| {
            options
                .recover_header_line
                .then(|| header_line_element(line))
                .flatten()
                .and_then(parse_element)
        });

        let Some((designator, value)) = element else {
            if line.len() >= 3 {
                tracing::trace!(code = ?line.get(..3), "skipping unrecognized data element");
            }
            continue;
        };

        match options.duplicate_policy {
            DuplicatePolicy::LastWins => {
                record.insert(designator, value.to_owned());
            }
            DuplicatePolicy::FirstWins => {
                if !record.contains(designator) {
                    record.insert(designator, value.to_owned());
                }
            }
        }
    }

    record
}

/// Splits an element line into its designator and trimmed value.
pub fn parse_element(line: &str) -> Option<(FieldDesignator, &str)> {
    let designator = FieldDesignator::from_prefix(line)?;
    Some((designator, line[3..].trim()))
}

/// Finds the first data element on a header line.
///
/// The header is `@`, the file type (`ANSI ` or `AAMVA`), the issuer
/// identification number, the AAMVA version, the jurisdiction version (from
/// version 2 on), the number of entries and one subfile designator per entry.
/// The first subfile then starts on the same line with its type (`DL` or
/// `ID`). When the header cannot be walked field by field, the last subfile
/// type followed by a known designator is used.
fn header_line_element(line: &str) -> Option<&str> {
    let line = line.trim_start_matches(COMPLIANCE_INDICATOR).trim_start();
    let body = FILE_TYPES
        .into_iter()
        .find_map(|file_type| line.strip_prefix(file_type))?;

    decode_header(body).or_else(|| scan_subfile_type(body))
}

fn decode_header(body: &str) -> Option<&str> {
    let version = decode_digits(body.get(IIN_SIZE..IIN_SIZE + 2)?)?;
    let mut offset = IIN_SIZE + 2;
    if version >= 2 {
        // Jurisdiction version.
        offset += 2;
    }

    let entry_count = decode_digits(body.get(offset..offset + 2)?)?;
    offset += 2 + entry_count * SUBFILE_DESIGNATOR_SIZE;

    let subfile = body.get(offset..)?;
    let element = SUBFILE_TYPES
        .into_iter()
        .find_map(|subfile_type| subfile.strip_prefix(subfile_type))?;
    FieldDesignator::from_prefix(element).map(|_| element)
}

fn scan_subfile_type(body: &str) -> Option<&str> {
    SUBFILE_TYPES
        .into_iter()
        .flat_map(|subfile_type| body.match_indices(subfile_type))
        .map(|(i, subfile_type)| &body[i + subfile_type.len()..])
        .filter(|element| FieldDesignator::from_prefix(element).is_some())
        .min_by_key(|element| element.len())
}

fn decode_digits(digits: &str) -> Option<usize> {
    if digits.bytes().all(|d| d.is_ascii_digit()) {
        digits.parse().ok()
    } else {
        None
    }
}

//! FITS binary-table reader for survey catalogues.
//!
//! A minimal, standard-conforming subset of FITS: 2880-byte blocks,
//! 80-character header cards, and BINTABLE extensions with scalar column
//! formats. Payloads are big-endian, per the standard.
//!
//! Supported `TFORMn` type letters: `L`, `B`, `I`, `J`, `K`, `E`, `D`.
//! Repeat counts larger than one read the first element of the cell, which
//! matches how the pipeline consumes scalar photometric columns. Character
//! columns (`A`) and variable-length arrays are not numeric and yield NaN
//! when requested.
//!
//! HDU indexing follows the usual convention: index 0 is the primary HDU,
//! index 1 the first extension.
use std::fs;

use camino::Utf8Path;

use crate::astrodiff_errors::AstrodiffError;

use super::{SurveyColumns, SurveyEntry};

const BLOCK_SIZE: usize = 2880;
const CARD_SIZE: usize = 80;

/// Read the configured columns of a binary-table HDU.
///
/// Arguments
/// ---------
/// * `path`: path to the FITS file
/// * `hdu`: HDU index of the table (0 = primary)
/// * `columns`: column-name configuration
///
/// Return
/// ------
/// * The table rows mapped to [`SurveyEntry`], or a fatal error when the
///   file is not FITS, the HDU does not exist, or it is not a binary table
pub fn read_fits_catalogue(
    path: &Utf8Path,
    hdu: usize,
    columns: &SurveyColumns,
) -> Result<Vec<SurveyEntry>, AstrodiffError> {
    let bytes = fs::read(path)?;
    let table = BinTable::from_bytes(&bytes, hdu)?;

    let required = |name: &str| {
        table
            .column(name)
            .ok_or_else(|| AstrodiffError::MissingColumn(name.to_string()))
    };
    let optional = |name: &Option<String>| -> Result<Option<ColumnSpec>, AstrodiffError> {
        match name {
            None => Ok(None),
            Some(n) => required(n).map(Some),
        }
    };

    let ra_col = required(&columns.ra)?;
    let dec_col = required(&columns.dec)?;
    let mag_col = required(&columns.mag)?;
    let flags_col = optional(&columns.flags)?;
    let clstar_col = optional(&columns.clstar)?;
    let fwhm_col = optional(&columns.fwhm)?;
    let sn_col = optional(&columns.sn)?;

    let mut entries = Vec::with_capacity(table.rows);
    for row in 0..table.rows {
        entries.push(SurveyEntry {
            ra: table.value(row, ra_col),
            dec: table.value(row, dec_col),
            mag: table.value(row, mag_col),
            flags: flags_col.map(|c| table.value(row, c)),
            clstar: clstar_col.map(|c| table.value(row, c)),
            fwhm: fwhm_col.map(|c| table.value(row, c)),
            sn: sn_col.map(|c| table.value(row, c)),
        });
    }
    Ok(entries)
}

/// One parsed header: keyword → raw value string, in file order.
struct Header {
    cards: Vec<(String, String)>,
}

impl Header {
    fn get(&self, key: &str) -> Option<&str> {
        self.cards
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    fn get_int(&self, key: &str) -> Option<i64> {
        self.get(key).and_then(|v| v.trim().parse().ok())
    }

    fn get_string(&self, key: &str) -> Option<String> {
        let raw = self.get(key)?.trim();
        let inner = raw.strip_prefix('\'')?;
        let end = inner.find('\'')?;
        Some(inner[..end].trim_end().to_string())
    }
}

/// Parse one header starting at `offset`; returns the header and the offset
/// of the data unit that follows it (next 2880-byte boundary after END).
fn parse_header(bytes: &[u8], offset: usize) -> Result<(Header, usize), AstrodiffError> {
    let mut cards = Vec::new();
    let mut pos = offset;
    loop {
        if pos + CARD_SIZE > bytes.len() {
            return Err(AstrodiffError::FitsParsingError(
                "header runs past end of file".to_string(),
            ));
        }
        let card = &bytes[pos..pos + CARD_SIZE];
        pos += CARD_SIZE;

        let name = String::from_utf8_lossy(&card[..8]).trim_end().to_string();
        if name == "END" {
            break;
        }
        if &card[8..10] == b"= " {
            let value_part = String::from_utf8_lossy(&card[10..]).to_string();
            cards.push((name, strip_comment(&value_part)));
        }
    }
    // Header is padded with blank cards to a block boundary
    let consumed = pos - offset;
    let padded = consumed.div_ceil(BLOCK_SIZE) * BLOCK_SIZE;
    Ok((Header { cards }, offset + padded))
}

/// Drop an inline comment, respecting quoted string values.
fn strip_comment(value: &str) -> String {
    let trimmed = value.trim_start();
    if let Some(inner) = trimmed.strip_prefix('\'') {
        if let Some(end) = inner.find('\'') {
            return format!("'{}'", &inner[..end]);
        }
        return trimmed.to_string();
    }
    match trimmed.find('/') {
        Some(idx) => trimmed[..idx].trim().to_string(),
        None => trimmed.trim().to_string(),
    }
}

/// Size in bytes of the data unit following a header, block padding included.
fn data_unit_size(header: &Header) -> usize {
    let bitpix = header.get_int("BITPIX").unwrap_or(8).unsigned_abs() as usize / 8;
    let naxis = header.get_int("NAXIS").unwrap_or(0);
    if naxis == 0 {
        return 0;
    }
    let mut elements: usize = 1;
    for n in 1..=naxis {
        elements *= header.get_int(&format!("NAXIS{n}")).unwrap_or(0).max(0) as usize;
    }
    let pcount = header.get_int("PCOUNT").unwrap_or(0).max(0) as usize;
    let gcount = header.get_int("GCOUNT").unwrap_or(1).max(1) as usize;
    let raw = bitpix * gcount * (pcount + elements);
    raw.div_ceil(BLOCK_SIZE) * BLOCK_SIZE
}

#[derive(Debug, Clone, Copy)]
struct ColumnSpec {
    offset: usize,
    form: u8,
}

/// A binary-table HDU located inside a FITS file.
#[derive(Debug)]
struct BinTable<'a> {
    data: &'a [u8],
    row_bytes: usize,
    rows: usize,
    columns: Vec<(String, ColumnSpec)>,
}

impl<'a> BinTable<'a> {
    /// Walk the HDUs of `bytes` and expose HDU `hdu` as a binary table.
    fn from_bytes(bytes: &'a [u8], hdu: usize) -> Result<Self, AstrodiffError> {
        if bytes.len() < CARD_SIZE || &bytes[..6] != b"SIMPLE" {
            return Err(AstrodiffError::WrongCatalogueFormat {
                expected: "FITS".to_string(),
                reason: "file does not start with a SIMPLE card".to_string(),
            });
        }

        let mut offset = 0usize;
        let mut index = 0usize;
        loop {
            let (header, data_offset) = parse_header(bytes, offset)?;
            let data_size = data_unit_size(&header);
            if index == hdu {
                return Self::from_header(bytes, &header, data_offset, hdu);
            }
            offset = data_offset + data_size;
            index += 1;
            if offset >= bytes.len() {
                return Err(AstrodiffError::HduOutOfRange(hdu, index));
            }
        }
    }

    fn from_header(
        bytes: &'a [u8],
        header: &Header,
        data_offset: usize,
        hdu: usize,
    ) -> Result<Self, AstrodiffError> {
        let xtension = header.get_string("XTENSION").unwrap_or_default();
        if xtension != "BINTABLE" {
            return Err(AstrodiffError::FitsParsingError(format!(
                "HDU {hdu} is not a binary table (XTENSION = '{xtension}')"
            )));
        }
        let row_bytes = header.get_int("NAXIS1").unwrap_or(0).max(0) as usize;
        let rows = header.get_int("NAXIS2").unwrap_or(0).max(0) as usize;
        let tfields = header.get_int("TFIELDS").unwrap_or(0).max(0) as usize;

        let mut columns = Vec::with_capacity(tfields);
        let mut offset_in_row = 0usize;
        for n in 1..=tfields {
            let name = header.get_string(&format!("TTYPE{n}")).unwrap_or_default();
            let tform = header
                .get_string(&format!("TFORM{n}"))
                .ok_or_else(|| AstrodiffError::FitsParsingError(format!("missing TFORM{n}")))?;
            let (repeat, form) = parse_tform(&tform)?;
            columns.push((
                name,
                ColumnSpec {
                    offset: offset_in_row,
                    form,
                },
            ));
            offset_in_row += repeat * type_width(form)?;
        }
        if offset_in_row != row_bytes {
            return Err(AstrodiffError::FitsParsingError(format!(
                "TFORM widths sum to {offset_in_row} bytes but NAXIS1 is {row_bytes}"
            )));
        }

        let data_end = data_offset + row_bytes * rows;
        if data_end > bytes.len() {
            return Err(AstrodiffError::FitsParsingError(
                "table data runs past end of file".to_string(),
            ));
        }

        Ok(BinTable {
            data: &bytes[data_offset..data_end],
            row_bytes,
            rows,
            columns,
        })
    }

    fn column(&self, name: &str) -> Option<ColumnSpec> {
        self.columns
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, spec)| *spec)
    }

    /// Numeric value of one cell, NaN for non-numeric forms.
    fn value(&self, row: usize, spec: ColumnSpec) -> f64 {
        let start = row * self.row_bytes + spec.offset;
        let cell = &self.data[start..];
        match spec.form {
            b'L' => {
                if cell[0] == b'T' {
                    1.0
                } else {
                    0.0
                }
            }
            b'B' => cell[0] as f64,
            b'I' => i16::from_be_bytes([cell[0], cell[1]]) as f64,
            b'J' => i32::from_be_bytes([cell[0], cell[1], cell[2], cell[3]]) as f64,
            b'K' => i64::from_be_bytes([
                cell[0], cell[1], cell[2], cell[3], cell[4], cell[5], cell[6], cell[7],
            ]) as f64,
            b'E' => f32::from_be_bytes([cell[0], cell[1], cell[2], cell[3]]) as f64,
            b'D' => f64::from_be_bytes([
                cell[0], cell[1], cell[2], cell[3], cell[4], cell[5], cell[6], cell[7],
            ]),
            _ => f64::NAN,
        }
    }
}

/// Split a `TFORMn` value like `"1E"` or `"D"` into repeat count and type.
fn parse_tform(tform: &str) -> Result<(usize, u8), AstrodiffError> {
    let trimmed = tform.trim();
    let split = trimmed
        .find(|c: char| c.is_ascii_alphabetic())
        .ok_or_else(|| AstrodiffError::FitsParsingError(format!("bad TFORM '{tform}'")))?;
    let repeat = if split == 0 {
        1
    } else {
        trimmed[..split]
            .parse()
            .map_err(|_| AstrodiffError::FitsParsingError(format!("bad TFORM '{tform}'")))?
    };
    Ok((repeat, trimmed.as_bytes()[split]))
}

fn type_width(form: u8) -> Result<usize, AstrodiffError> {
    match form {
        b'L' | b'B' | b'A' => Ok(1),
        b'I' => Ok(2),
        b'J' | b'E' => Ok(4),
        b'K' | b'D' => Ok(8),
        other => Err(AstrodiffError::FitsParsingError(format!(
            "unsupported TFORM type '{}'",
            other as char
        ))),
    }
}

//! Reading the 9-column interval table family and attribute extraction

use crate::types::{ExtensionRecord, Feature, FeatureType, LeapError, Result, Strand, TableRow};
use log::{debug, info, warn};
use regex::Regex;
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;
use std::process::Command;
use std::str::FromStr;
use std::sync::OnceLock;

/// A loaded table: parsed rows, the header if one was present, and the count
/// of malformed rows that were dropped.
#[derive(Debug)]
pub struct FeatureTable {
    pub rows: Vec<TableRow>,
    pub header: Option<Vec<String>>,
    pub skipped: u64,
}

/// Read a feature table from a file, detecting whether a header is present.
pub fn read_feature_table<P: AsRef<Path>>(path: P) -> Result<FeatureTable> {
    let path = path.as_ref();
    info!("Reading table: {}", path.display());
    let file = File::open(path).map_err(|e| {
        LeapError::InvalidInput(format!("Failed to open {}: {}", path.display(), e))
    })?;
    read_feature_table_from(BufReader::new(file), &path.display().to_string())
}

/// Read a feature table from any buffered reader.
///
/// The first non-comment line is taken as a header unless its 4th and 5th
/// fields both parse as coordinates. Malformed rows are dropped and counted,
/// never fatal. If any row's chromosome carries a leading `chr` prefix the
/// prefix is stripped from every row.
pub fn read_feature_table_from<R: BufRead>(reader: R, label: &str) -> Result<FeatureTable> {
    let mut rows = Vec::new();
    let mut header = None;
    let mut skipped = 0u64;
    let mut first_content = true;
    let mut line_number = 0u64;

    for line in reader.lines() {
        line_number += 1;
        let line = line?;

        if line.starts_with('#') || line.trim().is_empty() {
            continue;
        }

        if first_content {
            first_content = false;
            if is_header_line(&line) {
                header = Some(line.split('\t').map(|s| s.to_string()).collect());
                continue;
            }
        }

        match parse_table_row(&line) {
            Ok(row) => rows.push(row),
            Err(e) => {
                debug!("{}: dropping line {}: {}", label, line_number, e);
                skipped += 1;
            }
        }
    }

    if skipped > 0 {
        warn!("{}: dropped {} malformed row(s)", label, skipped);
    }

    normalize_chromosomes(&mut rows);
    Ok(FeatureTable {
        rows,
        header,
        skipped,
    })
}

/// A header line is anything whose coordinate columns are not numeric.
fn is_header_line(line: &str) -> bool {
    let fields: Vec<&str> = line.split('\t').collect();
    if fields.len() < 9 {
        return true;
    }
    !(fields[3].trim().parse::<u64>().is_ok() && fields[4].trim().parse::<u64>().is_ok())
}

/// Parse one data line into the 9 interval columns plus trailing extras.
fn parse_table_row(line: &str) -> Result<TableRow> {
    let fields: Vec<&str> = line.split('\t').collect();

    if fields.len() < 9 {
        return Err(LeapError::Parse(format!(
            "Expected at least 9 fields, found {}",
            fields.len()
        )));
    }

    let start = fields[3]
        .trim()
        .parse::<u64>()
        .map_err(|_| LeapError::Parse(format!("Invalid start position: {}", fields[3])))?;
    let end = fields[4]
        .trim()
        .parse::<u64>()
        .map_err(|_| LeapError::Parse(format!("Invalid end position: {}", fields[4])))?;

    if start > end {
        return Err(LeapError::Parse(format!(
            "Start position {} is greater than end position {}",
            start, end
        )));
    }

    let strand = Strand::from_str(fields[6])?;
    let ftype = FeatureType::from_str(fields[2])?;

    let feature = Feature {
        chrom: fields[0].to_string(),
        source: fields[1].to_string(),
        ftype,
        start,
        end,
        score: fields[5].to_string(),
        strand,
        phase: fields[7].to_string(),
        attributes: fields[8].to_string(),
    };

    let extras = fields[9..].iter().map(|s| s.to_string()).collect();
    Ok(TableRow { feature, extras })
}

/// Strip a leading `chr` prefix from every row iff any row carries one.
/// Whole-column decision, applied once per table.
pub fn normalize_chromosomes(rows: &mut [TableRow]) {
    if !rows.iter().any(|r| r.feature.chrom.starts_with("chr")) {
        return;
    }
    for row in rows.iter_mut() {
        if let Some(stripped) = row.feature.chrom.strip_prefix("chr") {
            row.feature.chrom = stripped.to_string();
        }
    }
}

/// Parse a coordinate that may have passed through float formatting
/// ("950" or "950.0"). Empty and nan-like values yield None.
pub fn parse_coord(s: &str) -> Option<u64> {
    let s = s.trim();
    if s.is_empty() || s.eq_ignore_ascii_case("nan") {
        return None;
    }
    if let Ok(v) = s.parse::<u64>() {
        return Some(v);
    }
    match s.parse::<f64>() {
        Ok(v) if v >= 0.0 && v.fract() == 0.0 => Some(v as u64),
        _ => None,
    }
}

/// Source-specific transcript ID and block number extraction.
///
/// Selected once per file by [`detect_style`], never re-sniffed per row.
pub trait AttributeStyle: Send + Sync {
    fn transcript_id(&self, attributes: &str) -> Option<String>;
    fn block_number(&self, attributes: &str) -> Option<u64>;
}

/// FANTOM-style attributes: `Name="<transcript>.<n>"` with block suffixes
/// like `Name="<transcript>.<n>_block3"`.
pub struct FantomStyle {
    id_re: Regex,
    block_re: Regex,
}

impl FantomStyle {
    pub fn new() -> Self {
        Self {
            id_re: compile(r#"Name="(.*?)\..*?""#),
            block_re: compile(r#"Name=".*?_block(.*?)""#),
        }
    }
}

impl Default for FantomStyle {
    fn default() -> Self {
        Self::new()
    }
}

impl AttributeStyle for FantomStyle {
    fn transcript_id(&self, attributes: &str) -> Option<String> {
        capture(&self.id_re, attributes)
    }

    fn block_number(&self, attributes: &str) -> Option<u64> {
        capture(&self.block_re, attributes).as_deref().and_then(parse_coord)
    }
}

/// GTF-style attributes: `transcript_id "<id>"; exon_number "<n>";`.
pub struct GtfStyle {
    id_re: Regex,
    block_re: Regex,
}

impl GtfStyle {
    pub fn new() -> Self {
        Self {
            id_re: compile(r#"transcript_id "(.*?)""#),
            block_re: compile(r#"exon_number "(.*?)""#),
        }
    }
}

impl Default for GtfStyle {
    fn default() -> Self {
        Self::new()
    }
}

impl AttributeStyle for GtfStyle {
    fn transcript_id(&self, attributes: &str) -> Option<String> {
        capture(&self.id_re, attributes)
    }

    fn block_number(&self, attributes: &str) -> Option<u64> {
        capture(&self.block_re, attributes).as_deref().and_then(parse_coord)
    }
}

/// Pick the attribute style from the first data row of a table.
pub fn detect_style(rows: &[TableRow]) -> Box<dyn AttributeStyle> {
    match rows.first() {
        Some(row) if row.feature.attributes.contains("Name=") => Box::new(FantomStyle::new()),
        _ => Box::new(GtfStyle::new()),
    }
}

fn capture(re: &Regex, text: &str) -> Option<String> {
    re.captures(text)
        .and_then(|c| c.get(1))
        .map(|m| m.as_str().to_string())
}

// Hard-coded patterns; compilation cannot fail at runtime.
fn compile(pattern: &str) -> Regex {
    Regex::new(pattern).expect("invalid built-in pattern")
}

fn parent_transcript_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| compile(r"Parent=transcript:(.*?);"))
}

fn transcript_key_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| compile(r"transcript:([^;]+)"))
}

/// Extract the reference transcript ID from Ensembl-style attributes
/// (`Parent=transcript:<id>;`).
pub fn ensembl_transcript_id(attributes: &str) -> Option<String> {
    capture(parent_transcript_re(), attributes)
}

/// Extract a transcript key from any `transcript:<id>` occurrence. Matches
/// both `ID=transcript:` and `Parent=transcript:` rows, so it keys every row
/// belonging to a transcript while leaving gene rows unkeyed.
pub fn transcript_key(attributes: &str) -> Option<String> {
    capture(transcript_key_re(), attributes)
}

/// Parse `key=value;` attributes into an ordered list. Fragments without `=`
/// are skipped.
pub fn parse_attribute_map(attributes: &str) -> Vec<(String, String)> {
    attributes
        .split(';')
        .filter_map(|pair| {
            let pair = pair.trim();
            let (key, value) = pair.split_once('=')?;
            Some((key.trim().to_string(), value.trim().to_string()))
        })
        .collect()
}

/// Look up a single key in `key=value;` attributes.
pub fn attribute_value(attributes: &str, key: &str) -> Option<String> {
    attributes.split(';').find_map(|pair| {
        let (k, v) = pair.trim().split_once('=')?;
        (k.trim() == key).then(|| v.trim().to_string())
    })
}

/// A loaded extension table plus the count of rows dropped for missing or
/// non-numeric key columns.
#[derive(Debug)]
pub struct ExtensionTable {
    pub records: Vec<ExtensionRecord>,
    pub dropped: u64,
}

/// Read a serialized extension table (the `check`/`select` interchange
/// format). Rows whose name or peak coordinates are missing are dropped and
/// counted, per the selector contract.
pub fn read_extension_table<P: AsRef<Path>>(path: P) -> Result<ExtensionTable> {
    let path = path.as_ref();
    info!("Reading extension table: {}", path.display());
    let file = File::open(path).map_err(|e| {
        LeapError::InvalidInput(format!("Failed to open {}: {}", path.display(), e))
    })?;
    read_extension_table_from(BufReader::new(file), &path.display().to_string())
}

/// Read an extension table from any buffered reader.
pub fn read_extension_table_from<R: BufRead>(reader: R, label: &str) -> Result<ExtensionTable> {
    let table = read_feature_table_from(reader, label)?;
    let mut records = Vec::new();
    let mut dropped = table.skipped;

    for row in table.rows {
        match bind_extension_row(row) {
            Some(record) => records.push(record),
            None => dropped += 1,
        }
    }

    if dropped > 0 {
        warn!("{}: dropped {} incomplete extension row(s)", label, dropped);
    }
    Ok(ExtensionTable { records, dropped })
}

/// Bind the extra columns of a table row to extension record fields.
/// Column order after the 9 interval columns: gene_id, Name, capOrTail_Start,
/// capOrTail_End, Transcript_Start, Transcript_End, Transcript_Name,
/// then optionally Difference.
fn bind_extension_row(row: TableRow) -> Option<ExtensionRecord> {
    let gene_id = row.extra(0)?.to_string();
    let name = row.extra(1)?.trim().to_string();
    if name.is_empty() || name.eq_ignore_ascii_case("nan") {
        return None;
    }
    let cap_start = parse_coord(row.extra(2)?)?;
    let cap_end = parse_coord(row.extra(3)?)?;
    let transcript_start = parse_coord(row.extra(4)?)?;
    let transcript_end = parse_coord(row.extra(5)?)?;
    let transcript_name = row.extra(6).unwrap_or(&name).to_string();
    let difference = row.extra(7).and_then(parse_coord);

    Some(ExtensionRecord {
        feature: row.feature,
        gene_id,
        name,
        cap_start,
        cap_end,
        transcript_start,
        transcript_end,
        transcript_name,
        difference,
    })
}

/// Run `gffread -E` over an input as a structural sanity check.
///
/// Failure (including a missing gffread binary) is logged and never fatal.
pub fn validate_with_gffread<P: AsRef<Path>>(path: P) {
    let path = path.as_ref();
    match Command::new("gffread").arg("-E").arg(path).output() {
        Ok(output) if output.status.success() => {
            debug!("gffread validation passed: {}", path.display());
        }
        Ok(output) => {
            warn!(
                "gffread reported problems in {}: {}",
                path.display(),
                String::from_utf8_lossy(&output.stderr).trim()
            );
        }
        Err(e) => {
            warn!(
                "gffread validation skipped for {}: {}",
                path.display(),
                e
            );
        }
    }
}

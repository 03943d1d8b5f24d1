//! Per-chromosome fan-out of the pipeline's input files

use crate::types::{LeapError, Result};
use log::{info, warn};
use std::fmt;
use std::fs::File;
use std::io::{BufRead, BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};

/// How a split input is read and written.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SplitFormat {
    /// GFF/GTF/GFF3: `#` comments skipped, no header in or out.
    Annotation,
    /// BED: headerless, remapped into the 9-column model on output.
    Bed,
    /// Anything else: first line is a header, preserved in the output.
    Table,
}

impl SplitFormat {
    /// Format by file extension, case-insensitive.
    pub fn from_path(path: &Path) -> SplitFormat {
        match path
            .extension()
            .and_then(|e| e.to_str())
            .map(|e| e.to_ascii_lowercase())
            .as_deref()
        {
            Some("gff") | Some("gtf") | Some("gff3") => SplitFormat::Annotation,
            Some("bed") => SplitFormat::Bed,
            _ => SplitFormat::Table,
        }
    }
}

/// Per-file split counters
#[derive(Debug, Default)]
pub struct SplitSummary {
    pub rows_seen: u64,
    pub rows_matched: u64,
    pub malformed_dropped: u64,
    pub written: bool,
}

impl fmt::Display for SplitSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} of {} row(s) matched, {} malformed dropped",
            self.rows_matched, self.rows_seen, self.malformed_dropped
        )
    }
}

/// Filtered content of one input: the preserved header (table format only)
/// and the matching output lines.
#[derive(Debug)]
pub struct SplitResult {
    pub header: Option<String>,
    pub lines: Vec<String>,
    pub summary: SplitSummary,
}

/// Remap a BED line into the 9-column model: chromosome, source `BAM`, type
/// `region`, start, end, score, strand, phase `.`, attributes from the
/// tenth BED column.
fn bed_to_gff(fields: &[&str]) -> Option<String> {
    if fields.len() < 10 {
        return None;
    }
    Some(format!(
        "{}\tBAM\tregion\t{}\t{}\t{}\t{}\t.\t{}",
        fields[0], fields[1], fields[2], fields[4], fields[5], fields[9]
    ))
}

/// Select the rows of one input belonging to `chromosome`.
///
/// The chromosome column's own `chr` prefix is honored: if any row carries
/// one, the comparison target gets the prefix too. Whole-column decision.
pub fn filter_chromosome_lines<R: BufRead>(
    reader: R,
    format: SplitFormat,
    chromosome: &str,
) -> Result<SplitResult> {
    let chromosome = chromosome.strip_prefix("chr").unwrap_or(chromosome);
    let mut summary = SplitSummary::default();
    let mut header = None;
    let mut data: Vec<String> = Vec::new();

    for line in reader.lines() {
        let line = line?;
        if format == SplitFormat::Annotation && line.starts_with('#') {
            continue;
        }
        if format == SplitFormat::Table && header.is_none() {
            header = Some(line);
            continue;
        }
        if line.trim().is_empty() {
            continue;
        }
        data.push(line);
    }
    summary.rows_seen = data.len() as u64;

    let prefixed = data
        .iter()
        .any(|line| line.split('\t').next().map_or(false, |c| c.starts_with("chr")));
    let target = if prefixed {
        format!("chr{}", chromosome)
    } else {
        chromosome.to_string()
    };

    let mut lines = Vec::new();
    for line in &data {
        let fields: Vec<&str> = line.split('\t').collect();
        if fields.first() != Some(&target.as_str()) {
            continue;
        }
        match format {
            SplitFormat::Bed => match bed_to_gff(&fields) {
                Some(remapped) => lines.push(remapped),
                None => summary.malformed_dropped += 1,
            },
            _ => lines.push(line.clone()),
        }
    }
    summary.rows_matched = lines.len() as u64;

    Ok(SplitResult {
        header,
        lines,
        summary,
    })
}

/// Split one input file, writing `{prefix}_{chromosome}.txt` into `outdir`.
///
/// Nothing is written when no rows match; the event is logged, not an error.
pub fn split_file(
    input: &Path,
    prefix: &str,
    chromosome: &str,
    outdir: &Path,
) -> Result<SplitSummary> {
    let file = File::open(input).map_err(|e| {
        LeapError::InvalidInput(format!("Failed to open {}: {}", input.display(), e))
    })?;
    let format = SplitFormat::from_path(input);
    let mut result = filter_chromosome_lines(BufReader::new(file), format, chromosome)?;

    if result.lines.is_empty() {
        warn!(
            "No data for chromosome {} in {}",
            chromosome,
            input.display()
        );
        return Ok(result.summary);
    }

    let output: PathBuf = outdir.join(format!("{}_{}.txt", prefix, chromosome));
    let mut writer = BufWriter::new(File::create(&output)?);
    if format == SplitFormat::Table {
        if let Some(header) = &result.header {
            writeln!(writer, "{}", header)?;
        }
    }
    for line in &result.lines {
        writeln!(writer, "{}", line)?;
    }
    writer.flush()?;
    result.summary.written = true;
    info!(
        "{} -> {}: {}",
        input.display(),
        output.display(),
        result.summary
    );
    Ok(result.summary)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    fn run(input: &str, format: SplitFormat, chromosome: &str) -> SplitResult {
        filter_chromosome_lines(Cursor::new(input), format, chromosome).unwrap()
    }

    #[test]
    fn test_format_from_extension() {
        assert_eq!(
            SplitFormat::from_path(Path::new("in.gff3")),
            SplitFormat::Annotation
        );
        assert_eq!(SplitFormat::from_path(Path::new("in.GTF")), SplitFormat::Annotation);
        assert_eq!(SplitFormat::from_path(Path::new("reads.bed")), SplitFormat::Bed);
        assert_eq!(SplitFormat::from_path(Path::new("peaks.txt")), SplitFormat::Table);
        assert_eq!(SplitFormat::from_path(Path::new("noext")), SplitFormat::Table);
    }

    #[test]
    fn test_annotation_comments_skipped_and_filtered() {
        let input = "##gff-version 3\n\
                     1\tx\texon\t1\t2\t.\t+\t.\ta\n\
                     2\tx\texon\t3\t4\t.\t+\t.\tb\n";
        let result = run(input, SplitFormat::Annotation, "1");
        assert!(result.header.is_none());
        assert_eq!(result.lines, vec!["1\tx\texon\t1\t2\t.\t+\t.\ta"]);
        assert_eq!(result.summary.rows_seen, 2);
        assert_eq!(result.summary.rows_matched, 1);
    }

    #[test]
    fn test_table_header_preserved() {
        let input = "Chromosome\tStart\tEnd\n1\t10\t20\nX\t30\t40\n";
        let result = run(input, SplitFormat::Table, "X");
        assert_eq!(result.header.as_deref(), Some("Chromosome\tStart\tEnd"));
        assert_eq!(result.lines, vec!["X\t30\t40"]);
    }

    #[test]
    fn test_chr_prefix_honored() {
        let input = "chr1\t10\t20\nchr2\t30\t40\n";
        let result = run(input, SplitFormat::Bed, "1");
        assert_eq!(result.summary.rows_matched, 0);
        assert_eq!(result.summary.malformed_dropped, 1);

        // prefix on the request side is ignored when the column is bare
        let bare = "1\tx\texon\t1\t2\t.\t+\t.\ta\n";
        let result = run(bare, SplitFormat::Annotation, "chr1");
        assert_eq!(result.summary.rows_matched, 1);
    }

    #[test]
    fn test_bed_remap() {
        let input = "1\t100\t200\tname\t60\t+\t.\t.\t0\tTE=L1;\n";
        let result = run(input, SplitFormat::Bed, "1");
        assert_eq!(result.lines, vec!["1\tBAM\tregion\t100\t200\t60\t+\t.\tTE=L1;"]);
    }

    #[test]
    fn test_bed_short_row_dropped() {
        let input = "1\t100\t200\tname\t60\t+\n";
        let result = run(input, SplitFormat::Bed, "1");
        assert!(result.lines.is_empty());
        assert_eq!(result.summary.malformed_dropped, 1);
    }
}

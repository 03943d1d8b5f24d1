//! Protein-coding gene-block filter for `###`-delimited annotations

use crate::types::{LeapError, Result};
use log::{info, warn};
use std::collections::HashSet;
use std::fmt;
use std::fs::File;
use std::io::{BufRead, BufReader, Write};
use std::path::Path;

/// Per-run filter counters
#[derive(Debug, Default)]
pub struct FilterSummary {
    pub blocks_seen: u64,
    pub blocks_kept: u64,
    pub readthrough_dropped: u64,
    pub single_exon_dropped: u64,
}

impl FilterSummary {
    pub fn new() -> Self {
        Self::default()
    }
}

impl fmt::Display for FilterSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Gene-block filter:")?;
        writeln!(f, "  Blocks seen: {}", self.blocks_seen)?;
        writeln!(f, "  Blocks kept: {}", self.blocks_kept)?;
        writeln!(f, "  Readthrough blocks dropped: {}", self.readthrough_dropped)?;
        write!(f, "  Single-exon blocks dropped: {}", self.single_exon_dropped)
    }
}

/// Load readthrough transcript stable IDs, one per line. A `stable_id`
/// header line is skipped; empty lines are ignored.
pub fn load_readthrough_list<P: AsRef<Path>>(path: P) -> Result<HashSet<String>> {
    let path = path.as_ref();
    let file = File::open(path).map_err(|e| {
        LeapError::InvalidInput(format!("Failed to open {}: {}", path.display(), e))
    })?;

    let mut ids = HashSet::new();
    for line in BufReader::new(file).lines() {
        let line = line?;
        // first tab-separated column; tolerate extra metadata columns
        let id = line.split('\t').next().unwrap_or("").trim();
        if id.is_empty() || id == "stable_id" {
            continue;
        }
        ids.insert(id.to_string());
    }
    info!("Loaded {} readthrough ID(s) from {}", ids.len(), path.display());
    Ok(ids)
}

/// One accumulated gene block and its keep/drop evidence.
#[derive(Debug, Default)]
struct GeneBlock {
    lines: Vec<String>,
    protein_coding: bool,
    readthrough: bool,
    exon_count: u64,
}

impl GeneBlock {
    fn observe(&mut self, line: &str, readthrough_ids: &HashSet<String>) {
        if line.contains("biotype=protein_coding") {
            self.protein_coding = true;
        }
        if !self.readthrough && readthrough_ids.iter().any(|id| line.contains(id.as_str())) {
            self.readthrough = true;
        }
        if line.contains("\texon\t") {
            self.exon_count += 1;
        }
        self.lines.push(line.to_string());
    }

    fn keep(&self, keep_single_exon: bool) -> bool {
        self.protein_coding && !self.readthrough && (keep_single_exon || self.exon_count >= 2)
    }
}

/// Copy the gene blocks that pass the protein-coding / readthrough / exon
/// count criteria, verbatim including their `###` separators.
///
/// Line-oriented: no record parsing, so blocks survive byte for byte.
pub fn filter_gene_blocks<R: BufRead, W: Write>(
    reader: R,
    mut writer: W,
    readthrough_ids: &HashSet<String>,
    keep_single_exon: bool,
) -> Result<FilterSummary> {
    let mut summary = FilterSummary::new();
    let mut block = GeneBlock::default();

    let flush_block = |block: &GeneBlock,
                           separator: Option<&str>,
                           writer: &mut W,
                           summary: &mut FilterSummary|
     -> Result<()> {
        if block.lines.is_empty() {
            return Ok(());
        }
        summary.blocks_seen += 1;
        if block.keep(keep_single_exon) {
            summary.blocks_kept += 1;
            for line in &block.lines {
                writeln!(writer, "{}", line)?;
            }
            if let Some(sep) = separator {
                writeln!(writer, "{}", sep)?;
            }
        } else if block.protein_coding && block.readthrough {
            summary.readthrough_dropped += 1;
        } else if block.protein_coding && !keep_single_exon && block.exon_count < 2 {
            summary.single_exon_dropped += 1;
        }
        Ok(())
    };

    for line in reader.lines() {
        let line = line?;
        if line.starts_with("###") {
            flush_block(&block, Some(&line), &mut writer, &mut summary)?;
            block = GeneBlock::default();
        } else {
            block.observe(&line, readthrough_ids);
        }
    }
    // trailing block without a closing separator
    flush_block(&block, None, &mut writer, &mut summary)?;

    if summary.blocks_kept == 0 && summary.blocks_seen > 0 {
        warn!("No gene blocks passed the filter");
    }
    info!("{}", summary);
    Ok(summary)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    fn run(input: &str, readthrough: &[&str], keep_single_exon: bool) -> (String, FilterSummary) {
        let ids: HashSet<String> = readthrough.iter().map(|s| s.to_string()).collect();
        let mut out = Vec::new();
        let summary =
            filter_gene_blocks(Cursor::new(input), &mut out, &ids, keep_single_exon).unwrap();
        (String::from_utf8(out).unwrap(), summary)
    }

    const PROTEIN_CODING: &str = "\
1\thavana\tgene\t100\t900\t.\t+\t.\tID=gene:ENSG01;biotype=protein_coding;
1\thavana\texon\t100\t200\t.\t+\t.\tParent=transcript:ENST01;
1\thavana\texon\t300\t900\t.\t+\t.\tParent=transcript:ENST01;
###
";

    const LINC_RNA: &str = "\
1\thavana\tgene\t100\t900\t.\t+\t.\tID=gene:ENSG02;biotype=lincRNA;
1\thavana\texon\t100\t200\t.\t+\t.\tParent=transcript:ENST02;
1\thavana\texon\t300\t900\t.\t+\t.\tParent=transcript:ENST02;
###
";

    const SINGLE_EXON: &str = "\
1\thavana\tgene\t100\t900\t.\t+\t.\tID=gene:ENSG03;biotype=protein_coding;
1\thavana\texon\t100\t900\t.\t+\t.\tParent=transcript:ENST03;
###
";

    #[test]
    fn test_protein_coding_block_kept_verbatim() {
        let input = format!("{}{}", PROTEIN_CODING, LINC_RNA);
        let (out, summary) = run(&input, &[], false);
        assert_eq!(out, PROTEIN_CODING);
        assert_eq!(summary.blocks_seen, 2);
        assert_eq!(summary.blocks_kept, 1);
    }

    #[test]
    fn test_readthrough_block_dropped() {
        let (out, summary) = run(PROTEIN_CODING, &["ENST01"], false);
        assert!(out.is_empty());
        assert_eq!(summary.readthrough_dropped, 1);
    }

    #[test]
    fn test_single_exon_block_dropped_by_default() {
        let (out, summary) = run(SINGLE_EXON, &[], false);
        assert!(out.is_empty());
        assert_eq!(summary.single_exon_dropped, 1);

        let (out, summary) = run(SINGLE_EXON, &[], true);
        assert_eq!(out, SINGLE_EXON);
        assert_eq!(summary.blocks_kept, 1);
    }

    #[test]
    fn test_trailing_block_without_separator() {
        let input = PROTEIN_CODING.trim_end_matches("###\n");
        let (out, summary) = run(input, &[], false);
        assert_eq!(out, input);
        assert_eq!(summary.blocks_kept, 1);
    }

    #[test]
    fn test_empty_input() {
        let (out, summary) = run("", &[], false);
        assert!(out.is_empty());
        assert_eq!(summary.blocks_seen, 0);
    }
}

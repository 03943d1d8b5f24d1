use anyhow::Result;
use clap::Parser;
use log::info;
use std::path::{Path, PathBuf};

use crate::gff::{read_feature_table, validate_with_gffread};
use crate::logging::log_empty_result;
use crate::matcher::{match_blocks, shared_gene_filter};
use crate::output::TableWriter;
use crate::types::{Direction, TableRow};

/// Match reference terminal exons against both transcript evidence sources
/// by exact splice-boundary equality
#[derive(Parser)]
#[command(name = "match")]
pub struct MatchCommand {
    /// Reference terminal exon table (grab output)
    annotation_exons: PathBuf,

    /// FANTOM evidence blocks
    fantom: PathBuf,

    /// Long-read evidence blocks
    longread: PathBuf,

    /// Drop single-exon evidence transcripts (true/false)
    #[arg(action = clap::ArgAction::Set)]
    exclude_single_exon: bool,

    /// Transcript end to match: five | three
    direction: String,

    /// Output directory
    outdir: PathBuf,
}

fn write_rows(path: &Path, rows: &[TableRow]) -> Result<()> {
    let mut writer = TableWriter::new(path)?;
    for row in rows {
        writer.write_row(row)?;
    }
    writer.finish()?;
    Ok(())
}

impl MatchCommand {
    pub fn run(self) -> Result<()> {
        let direction: Direction = self.direction.parse()?;

        for file in [&self.annotation_exons, &self.fantom, &self.longread] {
            if !file.exists() {
                anyhow::bail!("File not found: {}", file.display());
            }
            validate_with_gffread(file);
        }
        std::fs::create_dir_all(&self.outdir)?;

        info!("Step 1: Loading reference terminal exons");
        let exons = read_feature_table(&self.annotation_exons)?;

        info!("Step 2: Matching FANTOM blocks ({})", direction);
        let fantom = read_feature_table(&self.fantom)?;
        let fantom_outcome =
            match_blocks(&exons.rows, &fantom.rows, direction, self.exclude_single_exon);

        info!("Step 3: Matching long-read blocks ({})", direction);
        let longread = read_feature_table(&self.longread)?;
        let longread_outcome =
            match_blocks(&exons.rows, &longread.rows, direction, self.exclude_single_exon);

        info!("Step 4: Gene-level corroboration across the two sources");
        let filtered = shared_gene_filter(
            &fantom_outcome.matched_exons,
            &longread_outcome.matched_exons,
        );
        if filtered.is_empty() {
            log_empty_result("match", "corroborated reference exons");
        }

        write_rows(
            &self.outdir.join("matched_human_exons_fantom.gff"),
            &fantom_outcome.matched_exons,
        )?;
        write_rows(
            &self.outdir.join("matched_fantom_blocks.gff"),
            &fantom_outcome.matched_blocks,
        )?;
        write_rows(
            &self.outdir.join("matched_human_exons_longread.gff"),
            &longread_outcome.matched_exons,
        )?;
        write_rows(
            &self.outdir.join("matched_longread_blocks.gff"),
            &longread_outcome.matched_blocks,
        )?;
        write_rows(
            &self.outdir.join("filtered_matched_human_exons.gff"),
            &filtered,
        )?;

        info!(
            "Matched tables written to {} ({} corroborated exon(s))",
            self.outdir.display(),
            filtered.len()
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_single_exon_argument_parses_as_positional_bool() {
        let cmd = MatchCommand::try_parse_from([
            "match", "exons.gff", "fantom.gff", "longread.gff", "true", "five", "outdir",
        ])
        .unwrap();
        assert!(cmd.exclude_single_exon);
        assert_eq!(cmd.direction, "five");

        let cmd = MatchCommand::try_parse_from([
            "match", "exons.gff", "fantom.gff", "longread.gff", "false", "three", "outdir",
        ])
        .unwrap();
        assert!(!cmd.exclude_single_exon);

        assert!(MatchCommand::try_parse_from([
            "match", "exons.gff", "fantom.gff", "longread.gff", "maybe", "five", "outdir",
        ])
        .is_err());
    }
}

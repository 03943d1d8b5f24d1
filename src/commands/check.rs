use anyhow::Result;
use clap::Parser;
use log::info;
use std::path::PathBuf;

use crate::gff::read_feature_table;
use crate::logging::log_empty_result;
use crate::output::write_extension_table;
use crate::peaks::find_candidates;
use crate::types::{CheckConfig, Direction};

/// Find capOrTail peaks within the window of each reference terminal exon,
/// corroborated by both transcript evidence sources
#[derive(Parser)]
pub struct CheckCommand {
    /// Reference terminal exon table (grab/match output)
    annotation_exons: PathBuf,

    /// capOrTail peak file
    caportail: PathBuf,

    /// FANTOM evidence file
    fantom: PathBuf,

    /// Long-read evidence file
    longread: PathBuf,

    /// Chromosome this shard covers
    chromosome: String,

    /// Transcript end to check: five | three
    direction: String,

    /// Output file prefix
    prefix: String,

    /// Maximum peak distance from the exon boundary, in bp
    #[arg(long = "window", value_name = "N", default_value_t = CheckConfig::default().window)]
    window: u64,
}

impl CheckCommand {
    pub fn run(self) -> Result<()> {
        let direction: Direction = self.direction.parse()?;

        for file in [
            &self.annotation_exons,
            &self.caportail,
            &self.fantom,
            &self.longread,
        ] {
            if !file.exists() {
                anyhow::bail!("File not found: {}", file.display());
            }
        }

        info!("Step 1: Loading inputs");
        let exons = read_feature_table(&self.annotation_exons)?;
        let sites = read_feature_table(&self.caportail)?;
        let fantom = read_feature_table(&self.fantom)?;
        let longread = read_feature_table(&self.longread)?;

        // tables arrive chr-normalized, so normalize the argument the same way
        let chromosome = self
            .chromosome
            .strip_prefix("chr")
            .unwrap_or(&self.chromosome);
        let shard: Vec<_> = exons
            .rows
            .into_iter()
            .filter(|r| r.feature.chrom == chromosome)
            .collect();

        info!(
            "Step 2: Searching {} exon(s) on chromosome {} ({}, window {})",
            shard.len(),
            chromosome,
            direction,
            self.window
        );
        let config = CheckConfig {
            window: self.window,
        };
        let (candidates, _summary) = find_candidates(
            &shard,
            &sites.rows,
            &fantom.rows,
            &longread.rows,
            direction,
            &config,
        );
        if candidates.is_empty() {
            log_empty_result("check", "candidate extensions");
        }

        let output = format!("{}_matched_chr{}.csv", self.prefix, chromosome);
        write_extension_table(&output, &candidates, false)?;
        info!("{} candidate(s) written to {}", candidates.len(), output);
        Ok(())
    }
}

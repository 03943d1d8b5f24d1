use anyhow::Result;
use clap::Parser;
use log::info;
use std::path::PathBuf;

use crate::gff::{read_extension_table, read_feature_table};
use crate::reconcile::{reconcile, write_reconciled_table};
use crate::rewriter::rewrite_annotation;
use crate::types::RewriteConfig;

/// Merge the four per-direction selection tables and rewrite the reference
/// annotation to the extended boundaries
#[derive(Parser)]
pub struct RewriteCommand {
    /// 5' final table, evidence source A
    five_a: PathBuf,

    /// 3' final table, evidence source A
    three_a: PathBuf,

    /// 5' final table, evidence source B
    five_b: PathBuf,

    /// 3' final table, evidence source B
    three_b: PathBuf,

    /// Reference annotation (GFF3)
    annotation: PathBuf,

    /// Extended annotation output (GFF3)
    output_gff: PathBuf,

    /// Reconciled per-transcript table output
    merged_table: PathBuf,

    /// Apply evidence-implied boundary contraction instead of keeping the
    /// original boundary
    #[arg(long = "allow-contraction")]
    allow_contraction: bool,
}

impl RewriteCommand {
    pub fn run(self) -> Result<()> {
        for file in [
            &self.five_a,
            &self.three_a,
            &self.five_b,
            &self.three_b,
            &self.annotation,
        ] {
            if !file.exists() {
                anyhow::bail!("File not found: {}", file.display());
            }
        }

        info!("Step 1: Loading the four selection tables");
        let five_a = read_extension_table(&self.five_a)?;
        let three_a = read_extension_table(&self.three_a)?;
        let five_b = read_extension_table(&self.five_b)?;
        let three_b = read_extension_table(&self.three_b)?;

        info!("Step 2: Reconciling per-transcript extensions");
        let (reconciled, _summary) = reconcile(
            &five_a.records,
            &three_a.records,
            &five_b.records,
            &three_b.records,
        );
        write_reconciled_table(&self.merged_table, &reconciled)?;
        info!("Reconciled table written to {}", self.merged_table.display());

        info!("Step 3: Loading the reference annotation");
        let annotation = read_feature_table(&self.annotation)?;

        info!("Step 4: Rewriting terminal coordinates");
        let config = RewriteConfig {
            allow_contraction: self.allow_contraction,
        };
        rewrite_annotation(&annotation.rows, &reconciled, &config, &self.output_gff)?;

        info!("Extended annotation written to {}", self.output_gff.display());
        Ok(())
    }
}

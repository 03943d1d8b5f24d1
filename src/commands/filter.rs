use anyhow::Result;
use clap::Parser;
use log::info;
use std::fs::File;
use std::io::{BufReader, BufWriter, Write};
use std::path::PathBuf;

use crate::filter::{filter_gene_blocks, load_readthrough_list};

/// Keep protein-coding, non-readthrough gene blocks of a `###`-delimited
/// annotation
#[derive(Parser)]
pub struct FilterCommand {
    /// Input annotation with `###` gene-block separators
    annotation: PathBuf,

    /// Readthrough transcript stable IDs, one per line
    readthrough_list: PathBuf,

    /// Filtered output annotation
    output: PathBuf,

    /// Keep single-exon genes (excluded by default)
    #[arg(long = "keep-single-exon")]
    keep_single_exon: bool,
}

impl FilterCommand {
    pub fn run(self) -> Result<()> {
        for file in [&self.annotation, &self.readthrough_list] {
            if !file.exists() {
                anyhow::bail!("File not found: {}", file.display());
            }
        }

        info!(
            "Filtering {} -> {}",
            self.annotation.display(),
            self.output.display()
        );
        let readthrough_ids = load_readthrough_list(&self.readthrough_list)?;

        let reader = BufReader::new(File::open(&self.annotation)?);
        let mut writer = BufWriter::new(File::create(&self.output)?);
        filter_gene_blocks(reader, &mut writer, &readthrough_ids, self.keep_single_exon)?;
        writer.flush()?;

        info!("Filtered annotation written to {}", self.output.display());
        Ok(())
    }
}

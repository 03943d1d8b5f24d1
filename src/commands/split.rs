use anyhow::Result;
use clap::Parser;
use log::info;
use std::path::PathBuf;

use crate::split::split_file;

/// Split the four pipeline inputs by chromosome, producing the
/// `{prefix}_{chromosome}.txt` files the core stages consume
#[derive(Parser)]
pub struct SplitCommand {
    /// Chromosome to select (e.g. 1, X, MT)
    chromosome: String,

    /// FANTOM evidence file
    fantom: PathBuf,

    /// Long-read evidence file
    longread: PathBuf,

    /// capOrTail peak file
    caportail: PathBuf,

    /// Reference annotation
    annotation: PathBuf,

    /// Output directory
    #[arg(long = "outdir", value_name = "DIR", default_value = ".")]
    outdir: PathBuf,
}

impl SplitCommand {
    pub fn run(self) -> Result<()> {
        let inputs: [(&PathBuf, &str); 4] = [
            (&self.fantom, "split_fantom"),
            (&self.longread, "split_longRead"),
            (&self.caportail, "split_capOrTail"),
            (&self.annotation, "split_human"),
        ];

        for (file, _) in &inputs {
            if !file.exists() {
                anyhow::bail!("File not found: {}", file.display());
            }
        }
        std::fs::create_dir_all(&self.outdir)?;

        info!(
            "Splitting chromosome {} into {}",
            self.chromosome,
            self.outdir.display()
        );
        for (file, prefix) in &inputs {
            split_file(file, prefix, &self.chromosome, &self.outdir)?;
        }
        Ok(())
    }
}

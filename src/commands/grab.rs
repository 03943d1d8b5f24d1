use anyhow::Result;
use clap::Parser;
use log::info;
use std::path::PathBuf;

use crate::gff::read_feature_table;
use crate::grab::grab_terminal_exons;
use crate::output::TableWriter;
use crate::types::{Direction, ExtensionRecord};

/// Pick the furthest 5' or 3' transcript's terminal exon for every gene
#[derive(Parser)]
pub struct GrabCommand {
    /// Reference annotation (GFF3)
    annotation: PathBuf,

    /// Transcript end to grab: five | three
    direction: String,

    /// Output table (header + gene_id column)
    output: PathBuf,
}

impl GrabCommand {
    pub fn run(self) -> Result<()> {
        // direction errors are fatal before any file is touched
        let direction: Direction = self.direction.parse()?;

        if !self.annotation.exists() {
            anyhow::bail!("File not found: {}", self.annotation.display());
        }

        info!(
            "Grabbing {} terminal exons from {}",
            direction,
            self.annotation.display()
        );
        let table = read_feature_table(&self.annotation)?;
        let (rows, _summary) = grab_terminal_exons(&table.rows, direction);

        let mut writer = TableWriter::new(&self.output)?;
        writer.write_header(&ExtensionRecord::HEADER[..10])?;
        for row in &rows {
            writer.write_row(row)?;
        }
        writer.finish()?;

        info!("Terminal exon table written to {}", self.output.display());
        Ok(())
    }
}

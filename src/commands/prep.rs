use anyhow::Result;
use clap::Parser;
use log::info;
use std::path::PathBuf;

use crate::gff::{read_extension_table, read_feature_table};
use crate::output::TableWriter;
use crate::prep::prepare_next_round;
use crate::types::{Direction, ExtensionRecord};

/// Extract the opposite end's terminal exons for the next pipeline round
#[derive(Parser)]
pub struct PrepCommand {
    /// Final extension table of the run just completed (select output)
    final_table: PathBuf,

    /// Reference annotation (GFF3)
    annotation: PathBuf,

    /// Direction the completed run extended: five | three
    direction: String,
}

impl PrepCommand {
    pub fn run(self) -> Result<()> {
        let direction: Direction = self.direction.parse()?;

        for file in [&self.final_table, &self.annotation] {
            if !file.exists() {
                anyhow::bail!("File not found: {}", file.display());
            }
        }

        info!("Step 1: Loading the {} final table", direction);
        let final_table = read_extension_table(&self.final_table)?;

        info!("Step 2: Loading the reference annotation");
        let annotation = read_feature_table(&self.annotation)?;

        info!("Step 3: Selecting next-round terminal exons");
        let (rows, _summary) =
            prepare_next_round(&final_table.records, &annotation.rows, direction);

        let output = format!("{}_nextRun.gff", direction);
        let mut writer = TableWriter::new(&output)?;
        writer.write_header(&ExtensionRecord::HEADER[..10])?;
        for row in &rows {
            writer.write_row(row)?;
        }
        writer.finish()?;

        info!("{} row(s) written to {}", rows.len(), output);
        Ok(())
    }
}

use anyhow::Result;
use clap::Parser;
use log::info;
use std::path::PathBuf;

use crate::gff::read_extension_table;
use crate::logging::log_empty_result;
use crate::output::write_extension_table;
use crate::selector::select_best;
use crate::stats::{write_stats_report, ExtensionStats};
use crate::types::Direction;

/// Reduce candidate extensions to the best-supported one per transcript and
/// report extension-length statistics
#[derive(Parser)]
pub struct SelectCommand {
    /// Candidate extension table (check output)
    candidates: PathBuf,

    /// Transcript end the candidates extend: five | three
    direction: String,

    /// Output file prefix
    prefix: String,
}

impl SelectCommand {
    pub fn run(self) -> Result<()> {
        let direction: Direction = self.direction.parse()?;

        if !self.candidates.exists() {
            anyhow::bail!("File not found: {}", self.candidates.display());
        }

        info!("Step 1: Loading candidates");
        let table = read_extension_table(&self.candidates)?;

        info!("Step 2: Selecting the best extension per transcript");
        let (selected, _summary) = select_best(&table.records, direction);
        if selected.is_empty() {
            log_empty_result("select", "selected extensions");
        }

        let label = direction.file_label();
        let final_table = format!("{}_{}_final.csv", self.prefix, label);
        write_extension_table(&final_table, &selected, true)?;
        info!("{} row(s) written to {}", selected.len(), final_table);

        info!("Step 3: Computing extension statistics");
        let differences: Vec<u64> = selected.iter().filter_map(|r| r.difference).collect();
        let stats = ExtensionStats::from_differences(&differences);
        let report = format!("{}_{}_ExtendStats.txt", self.prefix, label);
        write_stats_report(&report, &stats)?;
        info!("Statistics written to {}", report);
        Ok(())
    }
}

//! Buffered writers for the pipeline's interchange tables and the final GFF3

use crate::types::{ExtensionRecord, Feature, Result, TableRow};
use log::info;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

/// Serialize the 9 interval columns of a feature, tab separated.
pub fn format_feature(feature: &Feature) -> String {
    format!(
        "{}\t{}\t{}\t{}\t{}\t{}\t{}\t{}\t{}",
        feature.chrom,
        feature.source,
        feature.ftype,
        feature.start,
        feature.end,
        feature.score,
        feature.strand,
        feature.phase,
        feature.attributes
    )
}

/// Tab-separated table writer with an optional header line.
pub struct TableWriter {
    writer: BufWriter<File>,
}

impl TableWriter {
    pub fn new<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        info!("Writing table: {}", path.display());
        let file = File::create(path)?;
        Ok(TableWriter {
            writer: BufWriter::new(file),
        })
    }

    pub fn write_header(&mut self, columns: &[&str]) -> Result<()> {
        writeln!(self.writer, "{}", columns.join("\t"))?;
        Ok(())
    }

    pub fn write_row(&mut self, row: &TableRow) -> Result<()> {
        if row.extras.is_empty() {
            writeln!(self.writer, "{}", format_feature(&row.feature))?;
        } else {
            writeln!(
                self.writer,
                "{}\t{}",
                format_feature(&row.feature),
                row.extras.join("\t")
            )?;
        }
        Ok(())
    }

    pub fn finish(mut self) -> Result<()> {
        self.writer.flush()?;
        Ok(())
    }
}

/// Write an extension table with its header; the `Difference` column is
/// appended when requested (selector output).
pub fn write_extension_table<P: AsRef<Path>>(
    path: P,
    records: &[ExtensionRecord],
    with_difference: bool,
) -> Result<()> {
    let mut writer = TableWriter::new(path)?;
    let mut columns: Vec<&str> = ExtensionRecord::HEADER.to_vec();
    if with_difference {
        columns.push("Difference");
    }
    writer.write_header(&columns)?;

    for record in records {
        let mut extras = vec![
            record.gene_id.clone(),
            record.name.clone(),
            record.cap_start.to_string(),
            record.cap_end.to_string(),
            record.transcript_start.to_string(),
            record.transcript_end.to_string(),
            record.transcript_name.clone(),
        ];
        if with_difference {
            extras.push(record.difference.unwrap_or(0).to_string());
        }
        writer.write_row(&TableRow {
            feature: record.feature.clone(),
            extras,
        })?;
    }
    writer.finish()
}

/// GFF3 writer for the rewritten annotation.
pub struct AnnotationWriter {
    writer: BufWriter<File>,
    rows_written: u64,
}

impl AnnotationWriter {
    pub fn new<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        info!("Creating annotation output: {}", path.display());
        let file = File::create(path)?;
        let mut writer = BufWriter::new(file);

        writeln!(writer, "##gff-version 3")?;

        Ok(AnnotationWriter {
            writer,
            rows_written: 0,
        })
    }

    pub fn write_feature(&mut self, feature: &Feature) -> Result<()> {
        writeln!(self.writer, "{}", format_feature(feature))?;
        self.rows_written += 1;
        Ok(())
    }

    pub fn finish(mut self) -> Result<u64> {
        self.writer.flush()?;
        Ok(self.rows_written)
    }
}

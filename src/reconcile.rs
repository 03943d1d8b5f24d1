//! Merge per-direction extension tables into one record per transcript

use crate::types::{ExtensionRecord, ReconciledTranscript, Result};
use log::info;
use std::collections::HashMap;
use std::fmt;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

pub const RECONCILED_HEADER: [&str; 8] = [
    "Transcript_Name",
    "Chromosome",
    "Strand",
    "Gene_ID",
    "five_capOrTail_Start",
    "five_capOrTail_End",
    "three_capOrTail_Start",
    "three_capOrTail_End",
];

/// Counters for one reconciliation run.
#[derive(Debug, Default)]
pub struct ReconcileSummary {
    pub transcripts: u64,
    pub with_five_prime: u64,
    pub with_three_prime: u64,
    pub with_both: u64,
}

impl ReconcileSummary {
    pub fn new() -> Self {
        Self::default()
    }
}

impl fmt::Display for ReconcileSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Reconciliation summary:")?;
        writeln!(f, "  Transcripts: {}", self.transcripts)?;
        writeln!(f, "  With 5' extension: {}", self.with_five_prime)?;
        writeln!(f, "  With 3' extension: {}", self.with_three_prime)?;
        write!(f, "  With both: {}", self.with_both)
    }
}

/// Full outer join of the four selection outputs on `Transcript_Name`.
///
/// Tables are visited in the order `five_a`, `three_a`, `five_b`, `three_b`;
/// transcripts keep the order they are first seen in. Chromosome, strand and
/// gene are consolidated first-non-empty across all four tables in that
/// order. Peak coordinates are consolidated within a direction only: the 5'
/// coordinates come from `five_a` falling back to `five_b`, never from a 3'
/// table, and vice versa.
pub fn reconcile(
    five_a: &[ExtensionRecord],
    three_a: &[ExtensionRecord],
    five_b: &[ExtensionRecord],
    three_b: &[ExtensionRecord],
) -> (Vec<ReconciledTranscript>, ReconcileSummary) {
    let mut merged: Vec<ReconciledTranscript> = Vec::new();
    let mut index: HashMap<String, usize> = HashMap::new();

    let tables: [(&[ExtensionRecord], bool); 4] = [
        (five_a, true),
        (three_a, false),
        (five_b, true),
        (three_b, false),
    ];

    for (table, is_five_prime) in tables {
        for record in table {
            let at = match index.get(&record.transcript_name) {
                Some(&at) => at,
                None => {
                    index.insert(record.transcript_name.clone(), merged.len());
                    merged.push(ReconciledTranscript {
                        transcript_name: record.transcript_name.clone(),
                        ..Default::default()
                    });
                    merged.len() - 1
                }
            };
            let entry = &mut merged[at];
            if entry.chrom.is_none() {
                entry.chrom = Some(record.feature.chrom.clone());
            }
            if entry.strand.is_none() {
                entry.strand = Some(record.feature.strand);
            }
            if entry.gene_id.is_none() {
                entry.gene_id = Some(record.gene_id.clone());
            }
            if is_five_prime {
                if entry.five_cap_start.is_none() {
                    entry.five_cap_start = Some(record.cap_start);
                    entry.five_cap_end = Some(record.cap_end);
                }
            } else if entry.three_cap_start.is_none() {
                entry.three_cap_start = Some(record.cap_start);
                entry.three_cap_end = Some(record.cap_end);
            }
        }
    }

    let mut summary = ReconcileSummary::new();
    summary.transcripts = merged.len() as u64;
    for entry in &merged {
        let five = entry.five_cap_start.is_some();
        let three = entry.three_cap_start.is_some();
        if five {
            summary.with_five_prime += 1;
        }
        if three {
            summary.with_three_prime += 1;
        }
        if five && three {
            summary.with_both += 1;
        }
    }
    info!("{}", summary);
    (merged, summary)
}

fn opt_string<T: fmt::Display>(value: &Option<T>) -> String {
    match value {
        Some(v) => v.to_string(),
        None => String::new(),
    }
}

/// Write the merged table as TSV, empty cells for absent values.
pub fn write_reconciled_table<P: AsRef<Path>>(
    path: P,
    records: &[ReconciledTranscript],
) -> Result<()> {
    let mut writer = BufWriter::new(File::create(path.as_ref())?);
    writeln!(writer, "{}", RECONCILED_HEADER.join("\t"))?;
    for record in records {
        writeln!(
            writer,
            "{}\t{}\t{}\t{}\t{}\t{}\t{}\t{}",
            record.transcript_name,
            opt_string(&record.chrom),
            opt_string(&record.strand),
            opt_string(&record.gene_id),
            opt_string(&record.five_cap_start),
            opt_string(&record.five_cap_end),
            opt_string(&record.three_cap_start),
            opt_string(&record.three_cap_end),
        )?;
    }
    writer.flush()?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{Feature, FeatureType, Strand};

    fn record(name: &str, chrom: &str, strand: Strand, cap_start: u64, cap_end: u64) -> ExtensionRecord {
        ExtensionRecord {
            feature: Feature {
                chrom: chrom.to_string(),
                source: "test".to_string(),
                ftype: FeatureType::Exon,
                start: 1000,
                end: 5000,
                score: ".".to_string(),
                strand,
                phase: ".".to_string(),
                attributes: String::new(),
            },
            gene_id: format!("gene_of_{}", name),
            name: name.to_string(),
            cap_start,
            cap_end,
            transcript_start: 1000,
            transcript_end: 5000,
            transcript_name: name.to_string(),
            difference: Some(0),
        }
    }

    #[test]
    fn test_outer_join_keeps_transcripts_from_every_table() {
        let five_a = vec![record("T1", "1", Strand::Forward, 950, 970)];
        let three_a = vec![record("T2", "1", Strand::Forward, 8100, 8200)];
        let five_b = vec![record("T3", "2", Strand::Reverse, 400, 450)];
        let three_b = vec![record("T4", "2", Strand::Reverse, 100, 150)];
        let (merged, summary) = reconcile(&five_a, &three_a, &five_b, &three_b);
        let names: Vec<&str> = merged.iter().map(|r| r.transcript_name.as_str()).collect();
        assert_eq!(names, vec!["T1", "T2", "T3", "T4"]);
        assert_eq!(summary.transcripts, 4);
        assert_eq!(summary.with_five_prime, 2);
        assert_eq!(summary.with_three_prime, 2);
        assert_eq!(summary.with_both, 0);
    }

    #[test]
    fn test_shared_columns_take_first_non_empty() {
        let five_a = vec![record("T1", "1", Strand::Forward, 950, 970)];
        // conflicting chromosome in a later table loses
        let three_a = vec![record("T1", "99", Strand::Reverse, 8100, 8200)];
        let (merged, _) = reconcile(&five_a, &three_a, &[], &[]);
        assert_eq!(merged.len(), 1);
        assert_eq!(merged[0].chrom.as_deref(), Some("1"));
        assert_eq!(merged[0].strand, Some(Strand::Forward));
        assert_eq!(merged[0].five_cap_start, Some(950));
        assert_eq!(merged[0].three_cap_start, Some(8100));
    }

    #[test]
    fn test_caps_never_cross_directions() {
        let three_b = vec![record("T1", "1", Strand::Forward, 8100, 8200)];
        let (merged, _) = reconcile(&[], &[], &[], &three_b);
        assert_eq!(merged[0].five_cap_start, None);
        assert_eq!(merged[0].five_cap_end, None);
        assert_eq!(merged[0].three_cap_start, Some(8100));
        assert_eq!(merged[0].three_cap_end, Some(8200));
    }

    #[test]
    fn test_second_set_fills_only_missing_caps() {
        let five_a = vec![record("T1", "1", Strand::Forward, 950, 970)];
        let five_b = vec![
            record("T1", "1", Strand::Forward, 700, 720),
            record("T2", "1", Strand::Forward, 300, 320),
        ];
        let (merged, _) = reconcile(&five_a, &[], &five_b, &[]);
        assert_eq!(merged[0].five_cap_start, Some(950));
        assert_eq!(merged[1].transcript_name, "T2");
        assert_eq!(merged[1].five_cap_start, Some(300));
    }

    #[test]
    fn test_written_table_has_empty_cells_for_missing_values() {
        let dir = std::env::temp_dir().join("leap_reconcile_test");
        std::fs::create_dir_all(&dir).unwrap();
        let path = dir.join("merged.tsv");

        let five_a = vec![record("T1", "1", Strand::Forward, 950, 970)];
        let (merged, _) = reconcile(&five_a, &[], &[], &[]);
        write_reconciled_table(&path, &merged).unwrap();

        let written = std::fs::read_to_string(&path).unwrap();
        let mut lines = written.lines();
        assert_eq!(lines.next().unwrap(), RECONCILED_HEADER.join("\t"));
        assert_eq!(lines.next().unwrap(), "T1\t1\t+\tgene_of_T1\t950\t970\t\t");
        std::fs::remove_dir_all(&dir).unwrap();
    }
}

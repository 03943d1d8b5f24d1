//! Per-gene terminal-transcript selection from a reference annotation

use crate::gff::ensembl_transcript_id;
use crate::types::{Direction, FeatureType, Strand, TableRow, MANE_SUFFIX};
use log::{debug, info};
use std::collections::HashSet;
use std::fmt;

/// Per-run grab counters
#[derive(Debug, Default)]
pub struct GrabSummary {
    pub genes_seen: u64,
    pub genes_emitted: u64,
    pub genes_skipped: u64,
    pub mane_marked: u64,
    pub leading_rows_skipped: u64,
}

impl GrabSummary {
    pub fn new() -> Self {
        Self::default()
    }
}

impl fmt::Display for GrabSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Terminal-transcript grab:")?;
        writeln!(f, "  Genes seen: {}", self.genes_seen)?;
        writeln!(f, "  Genes emitted: {}", self.genes_emitted)?;
        writeln!(f, "  Genes without a valid transcript: {}", self.genes_skipped)?;
        write!(f, "  MANE-Select transcripts marked: {}", self.mane_marked)
    }
}

/// Gene ID from a `gene` row's attributes (`ID=gene:<id>;`).
fn gene_id(attributes: &str) -> Option<String> {
    let (_, rest) = attributes.split_once("ID=gene:")?;
    Some(rest.split(';').next().unwrap_or(rest).to_string())
}

/// Whether the terminal exon for this strand and direction is the one with
/// the minimum start (otherwise: maximum end).
fn terminal_takes_min_start(direction: Direction, strand: Strand) -> bool {
    matches!(
        (direction, strand),
        (Direction::FivePrime, Strand::Forward) | (Direction::ThreePrime, Strand::Reverse)
    )
}

/// Fold the annotation into per-gene groups: a `gene` row opens a group and
/// every following row belongs to it until the next `gene` row. Rows before
/// the first gene row are skipped and counted.
fn group_by_gene(rows: &[TableRow]) -> (Vec<(String, Vec<&TableRow>)>, u64) {
    let mut groups: Vec<(String, Vec<&TableRow>)> = Vec::new();
    let mut leading_skipped = 0u64;

    for row in rows {
        if row.feature.ftype == FeatureType::Gene {
            if let Some(id) = gene_id(&row.feature.attributes) {
                groups.push((id, vec![row]));
                continue;
            }
        }
        match groups.last_mut() {
            Some((_, members)) => members.push(row),
            None => leading_skipped += 1,
        }
    }
    (groups, leading_skipped)
}

/// Pick the furthest 5' or 3' transcript's terminal exon per gene.
///
/// Only transcripts carrying both a `five_prime_UTR` and a `three_prime_UTR`
/// row participate. The emitted row is the chosen exon with the gene ID as
/// its single extra column; when the chosen transcript's mRNA is tagged
/// `MANE_Select`, the transcript ID inside the emitted attributes gets the
/// `_MANE_copy` suffix. Genes with no valid transcript are skipped and
/// counted.
pub fn grab_terminal_exons(
    rows: &[TableRow],
    direction: Direction,
) -> (Vec<TableRow>, GrabSummary) {
    let mut summary = GrabSummary::new();
    let (groups, leading_skipped) = group_by_gene(rows);
    summary.leading_rows_skipped = leading_skipped;
    summary.genes_seen = groups.len() as u64;

    let mut output = Vec::new();
    for (gene, members) in &groups {
        match grab_for_gene(gene, members, direction, &mut summary) {
            Some(row) => {
                summary.genes_emitted += 1;
                output.push(row);
            }
            None => {
                debug!("No valid transcript for gene {}", gene);
                summary.genes_skipped += 1;
            }
        }
    }

    info!("{}", summary);
    (output, summary)
}

fn grab_for_gene(
    gene: &str,
    members: &[&TableRow],
    direction: Direction,
    summary: &mut GrabSummary,
) -> Option<TableRow> {
    let utr_transcripts = |utr: FeatureType| -> HashSet<String> {
        members
            .iter()
            .filter(|r| r.feature.ftype == utr)
            .filter_map(|r| ensembl_transcript_id(&r.feature.attributes))
            .collect()
    };
    let five = utr_transcripts(FeatureType::FivePrimeUtr);
    let three = utr_transcripts(FeatureType::ThreePrimeUtr);
    let valid: HashSet<&String> = five.intersection(&three).collect();
    if valid.is_empty() {
        return None;
    }

    // strict comparisons keep the first-encountered exon on ties
    let mut chosen: Option<&TableRow> = None;
    for row in members {
        if row.feature.ftype != FeatureType::Exon {
            continue;
        }
        let Some(tid) = ensembl_transcript_id(&row.feature.attributes) else {
            continue;
        };
        if !valid.contains(&tid) {
            continue;
        }
        let better = match chosen {
            None => true,
            Some(current) => {
                if terminal_takes_min_start(direction, row.feature.strand) {
                    row.feature.start < current.feature.start
                } else {
                    row.feature.end > current.feature.end
                }
            }
        };
        if better {
            chosen = Some(row);
        }
    }
    let chosen = chosen?;
    let transcript_id = ensembl_transcript_id(&chosen.feature.attributes)?;

    let has_mane = members.iter().any(|r| {
        r.feature.ftype == FeatureType::Mrna
            && r.feature.attributes.contains(&transcript_id)
            && r.feature.attributes.contains("MANE_Select")
    });

    let mut feature = chosen.feature.clone();
    if has_mane {
        summary.mane_marked += 1;
        feature.attributes = feature
            .attributes
            .replace(&transcript_id, &format!("{}{}", transcript_id, MANE_SUFFIX));
    }

    Some(TableRow {
        feature,
        extras: vec![gene.to_string()],
    })
}

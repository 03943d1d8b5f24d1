//! Terminal-exon extraction feeding the next pipeline round

use crate::gff::{attribute_value, ensembl_transcript_id, parse_coord};
use crate::types::{
    Direction, ExtensionRecord, Feature, FeatureType, Strand, TableRow, MANE_SUFFIX,
    split_mane_suffix,
};
use log::{debug, info, warn};
use std::collections::{HashMap, HashSet};
use std::fmt;

/// Per-run prep counters
#[derive(Debug, Default)]
pub struct PrepSummary {
    pub records_in: u64,
    pub transcripts_listed: u64,
    pub exons_considered: u64,
    pub transcripts_emitted: u64,
    pub mane_copies: u64,
    pub missing_rank_dropped: u64,
    pub missing_gene_id: u64,
}

impl PrepSummary {
    pub fn new() -> Self {
        Self::default()
    }
}

impl fmt::Display for PrepSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Next-round preparation:")?;
        writeln!(f, "  Input rows: {}", self.records_in)?;
        writeln!(f, "  Transcripts listed: {}", self.transcripts_listed)?;
        writeln!(f, "  Exon rows considered: {}", self.exons_considered)?;
        writeln!(f, "  Transcripts emitted: {}", self.transcripts_emitted)?;
        write!(f, "  MANE copy rows: {}", self.mane_copies)
    }
}

/// Transcript ID of a final-table row: the `Parent` attribute when present,
/// the `Transcript_Name` column otherwise.
fn record_transcript_id(record: &ExtensionRecord) -> Option<String> {
    if let Some(parent) = attribute_value(&record.feature.attributes, "Parent") {
        if let Some((_, id)) = parent.split_once(':') {
            return Some(id.to_string());
        }
        return Some(parent);
    }
    let name = record.transcript_name.trim();
    (!name.is_empty()).then(|| name.to_string())
}

/// The opposite end's terminal exon: after a 5' run keep the exon furthest
/// 3', after a 3' run the exon furthest 5'. True means minimum start wins
/// (otherwise: maximum end).
fn next_round_takes_min_start(completed: Direction, strand: Strand) -> bool {
    matches!(
        (completed, strand),
        (Direction::FivePrime, Strand::Reverse) | (Direction::ThreePrime, Strand::Forward)
    )
}

#[derive(Debug)]
struct ExonCandidate {
    feature: Feature,
    rank: u64,
}

/// Build the next round's input: one terminal exon per transcript named in
/// the final table, taken from the reference annotation.
///
/// `completed` is the direction the finished run extended; the exon kept is
/// the one at the opposite end. A transcript whose final-table name carries
/// the `_MANE_copy` suffix is looked up under its base ID and emitted twice:
/// the base-ID row plus one derived row with the suffix.
pub fn prepare_next_round(
    final_records: &[ExtensionRecord],
    annotation: &[TableRow],
    completed: Direction,
) -> (Vec<TableRow>, PrepSummary) {
    let mut summary = PrepSummary::new();
    summary.records_in = final_records.len() as u64;

    let mut wanted: HashSet<String> = HashSet::new();
    let mut mane: HashSet<String> = HashSet::new();
    let mut gene_ids: HashMap<String, String> = HashMap::new();
    for record in final_records {
        let Some(id) = record_transcript_id(record) else {
            debug!("Final-table row without a transcript ID: {}", record.name);
            continue;
        };
        let (base, is_mane) = split_mane_suffix(&id);
        wanted.insert(base.to_string());
        if is_mane {
            mane.insert(base.to_string());
        }
        gene_ids
            .entry(base.to_string())
            .or_insert_with(|| record.gene_id.clone());
    }
    summary.transcripts_listed = wanted.len() as u64;

    // exon candidates per transcript, ordered by rank within a transcript
    let mut candidates: Vec<(String, ExonCandidate)> = Vec::new();
    for row in annotation {
        if row.feature.ftype != FeatureType::Exon {
            continue;
        }
        let Some(tid) = ensembl_transcript_id(&row.feature.attributes) else {
            continue;
        };
        if !wanted.contains(&tid) {
            continue;
        }
        summary.exons_considered += 1;
        match attribute_value(&row.feature.attributes, "rank").as_deref().and_then(parse_coord) {
            Some(rank) => candidates.push((
                tid,
                ExonCandidate {
                    feature: row.feature.clone(),
                    rank,
                },
            )),
            None => {
                debug!("Exon of {} without a numeric rank", tid);
                summary.missing_rank_dropped += 1;
            }
        }
    }
    candidates.sort_by(|a, b| a.0.cmp(&b.0).then(a.1.rank.cmp(&b.1.rank)));

    // one exon per transcript; strict comparisons keep the lowest-rank row
    // on coordinate ties
    let mut selected: Vec<(String, ExonCandidate)> = Vec::new();
    let mut index: HashMap<String, usize> = HashMap::new();
    for (tid, candidate) in candidates {
        match index.get(&tid) {
            None => {
                index.insert(tid.clone(), selected.len());
                selected.push((tid, candidate));
            }
            Some(&at) => {
                let incumbent = &selected[at].1;
                let better = if next_round_takes_min_start(completed, candidate.feature.strand) {
                    candidate.feature.start < incumbent.feature.start
                } else {
                    candidate.feature.end > incumbent.feature.end
                };
                if better {
                    selected[at].1 = candidate;
                }
            }
        }
    }

    let mut output = Vec::new();
    for (tid, candidate) in &selected {
        let gene = match gene_ids.get(tid) {
            Some(gene) => gene.clone(),
            None => {
                summary.missing_gene_id += 1;
                String::new()
            }
        };
        output.push(next_round_row(candidate, tid, &gene));
        summary.transcripts_emitted += 1;
        if mane.contains(tid) {
            let copy_id = format!("{}{}", tid, MANE_SUFFIX);
            output.push(next_round_row(candidate, &copy_id, &gene));
            summary.mane_copies += 1;
        }
    }

    if output.is_empty() {
        warn!("Next-round preparation produced no rows");
    }
    info!("{}", summary);
    (output, summary)
}

fn next_round_row(candidate: &ExonCandidate, transcript_id: &str, gene_id: &str) -> TableRow {
    let mut feature = candidate.feature.clone();
    feature.attributes = format!(
        "exon_number {};Parent=transcript:{}; gene_id={}",
        candidate.rank, transcript_id, gene_id
    );
    TableRow {
        feature,
        extras: vec![gene_id.to_string()],
    }
}

//! Splice-boundary matching of evidence transcript blocks to reference exons

use crate::gff::{detect_style, ensembl_transcript_id};
use crate::types::{Direction, Feature, Strand, TableRow};
use log::{debug, info};
use std::collections::{HashMap, HashSet};
use std::fmt;

/// One evidence row with its extracted transcript ID and block number.
struct BlockRecord {
    row: TableRow,
    transcript_id: String,
    block_num: u64,
}

/// Counters for one boundary-matching run.
#[derive(Debug, Default)]
pub struct MatchSummary {
    pub reference_rows: u64,
    pub evidence_rows: u64,
    pub evidence_rows_dropped: u64,
    pub transcripts_excluded: u64,
    pub transcripts_considered: u64,
    pub matched_exons: u64,
    pub matched_blocks: u64,
}

impl MatchSummary {
    pub fn new() -> Self {
        Self::default()
    }
}

impl fmt::Display for MatchSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Boundary matching summary:")?;
        writeln!(f, "  Reference exon rows: {}", self.reference_rows)?;
        writeln!(f, "  Evidence rows: {}", self.evidence_rows)?;
        writeln!(f, "  Evidence rows dropped: {}", self.evidence_rows_dropped)?;
        writeln!(f, "  Single-exon transcripts excluded: {}", self.transcripts_excluded)?;
        writeln!(f, "  Evidence transcripts considered: {}", self.transcripts_considered)?;
        writeln!(f, "  Matched reference exons: {}", self.matched_exons)?;
        write!(f, "  Matched evidence blocks: {}", self.matched_blocks)
    }
}

/// Result of one boundary-matching run. The two row sets are sorted by the
/// anchor coordinate, Forward rows first, so corresponding rows align
/// positionally.
pub struct MatchOutcome {
    pub matched_exons: Vec<TableRow>,
    pub matched_blocks: Vec<TableRow>,
    pub summary: MatchSummary,
}

/// Whether the extremal block of a transcript is the one with the minimum
/// block number for this strand and direction.
fn extremal_takes_min(direction: Direction, strand: Strand) -> bool {
    matches!(
        (direction, strand),
        (Direction::FivePrime, Strand::Forward) | (Direction::ThreePrime, Strand::Reverse)
    )
}

/// The coordinate compared between a reference exon and an evidence block.
/// The same rule applies to both sides of the join.
fn anchor_coordinate(direction: Direction, strand: Strand, feature: &Feature) -> u64 {
    match (direction, strand) {
        (Direction::FivePrime, Strand::Forward) => feature.end,
        (Direction::FivePrime, Strand::Reverse) => feature.start,
        (Direction::ThreePrime, Strand::Forward) => feature.start,
        (Direction::ThreePrime, Strand::Reverse) => feature.end,
    }
}

/// Match reference terminal exons against evidence transcript blocks by exact
/// splice-boundary equality.
///
/// Evidence transcripts are first reduced to their extremal block for the
/// requested direction (ties keep the first-encountered row). With
/// `exclude_single_exon`, transcripts whose maximum block number is 1 or less
/// are dropped beforehand.
pub fn match_blocks(
    reference_exons: &[TableRow],
    evidence: &[TableRow],
    direction: Direction,
    exclude_single_exon: bool,
) -> MatchOutcome {
    let mut summary = MatchSummary::new();
    summary.reference_rows = reference_exons.len() as u64;
    summary.evidence_rows = evidence.len() as u64;

    let style = detect_style(evidence);
    let mut blocks: Vec<BlockRecord> = Vec::new();
    for row in evidence {
        let attrs = &row.feature.attributes;
        match (style.transcript_id(attrs), style.block_number(attrs)) {
            (Some(transcript_id), Some(block_num)) => blocks.push(BlockRecord {
                row: row.clone(),
                transcript_id,
                block_num,
            }),
            _ => {
                debug!("Dropping evidence row without usable ID/block: {}", attrs);
                summary.evidence_rows_dropped += 1;
            }
        }
    }

    if exclude_single_exon {
        let mut max_block: HashMap<&str, u64> = HashMap::new();
        for block in &blocks {
            let entry = max_block.entry(block.transcript_id.as_str()).or_insert(0);
            *entry = (*entry).max(block.block_num);
        }
        let keep: HashSet<String> = max_block
            .iter()
            .filter(|(_, &max)| max > 1)
            .map(|(id, _)| id.to_string())
            .collect();
        summary.transcripts_excluded = (max_block.len() - keep.len()) as u64;
        blocks.retain(|b| keep.contains(&b.transcript_id));
    }

    // Extremal block per (strand, transcript); strict comparison keeps the
    // first-encountered row on ties.
    let mut best: HashMap<(Strand, String), usize> = HashMap::new();
    let mut order: Vec<(Strand, String)> = Vec::new();
    for (i, block) in blocks.iter().enumerate() {
        let strand = block.row.feature.strand;
        let min_wins = extremal_takes_min(direction, strand);
        let key = (strand, block.transcript_id.clone());
        match best.get(&key) {
            None => {
                best.insert(key.clone(), i);
                order.push(key);
            }
            Some(&current) => {
                let better = if min_wins {
                    block.block_num < blocks[current].block_num
                } else {
                    block.block_num > blocks[current].block_num
                };
                if better {
                    best.insert(key, i);
                }
            }
        }
    }
    summary.transcripts_considered = order.len() as u64;
    let extremal: Vec<&BlockRecord> = order.iter().map(|key| &blocks[best[key]]).collect();

    let mut matched_exons = Vec::new();
    let mut matched_blocks = Vec::new();

    for strand in [Strand::Forward, Strand::Reverse] {
        let block_anchors: HashSet<u64> = extremal
            .iter()
            .filter(|b| b.row.feature.strand == strand)
            .map(|b| anchor_coordinate(direction, strand, &b.row.feature))
            .collect();
        let exon_anchors: HashSet<u64> = reference_exons
            .iter()
            .filter(|r| r.feature.strand == strand)
            .map(|r| anchor_coordinate(direction, strand, &r.feature))
            .collect();

        let mut exons: Vec<TableRow> = reference_exons
            .iter()
            .filter(|r| {
                r.feature.strand == strand
                    && block_anchors.contains(&anchor_coordinate(direction, strand, &r.feature))
            })
            .map(|r| {
                let mut row = r.clone();
                let tid = ensembl_transcript_id(&row.feature.attributes).unwrap_or_default();
                row.extras.push(tid);
                row
            })
            .collect();
        exons.sort_by_key(|r| anchor_coordinate(direction, strand, &r.feature));

        let mut blks: Vec<TableRow> = extremal
            .iter()
            .filter(|b| {
                b.row.feature.strand == strand
                    && exon_anchors.contains(&anchor_coordinate(direction, strand, &b.row.feature))
            })
            .map(|b| {
                let mut row = b.row.clone();
                row.extras.push(b.transcript_id.clone());
                row.extras.push(b.block_num.to_string());
                row
            })
            .collect();
        blks.sort_by_key(|r| anchor_coordinate(direction, strand, &r.feature));

        matched_exons.extend(exons);
        matched_blocks.extend(blks);
    }

    summary.matched_exons = matched_exons.len() as u64;
    summary.matched_blocks = matched_blocks.len() as u64;
    info!("{}", summary);

    MatchOutcome {
        matched_exons,
        matched_blocks,
        summary,
    }
}

/// Keep the rows of `matched_a` whose gene ID also occurs in `matched_b`.
/// Gene-level corroboration across the two evidence sources; the gene ID is
/// the first extra column of the reference rows.
pub fn shared_gene_filter(matched_a: &[TableRow], matched_b: &[TableRow]) -> Vec<TableRow> {
    let genes_b: HashSet<&str> = matched_b.iter().filter_map(|r| r.extra(0)).collect();
    matched_a
        .iter()
        .filter(|r| r.extra(0).map_or(false, |g| genes_b.contains(g)))
        .cloned()
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::FeatureType;

    fn reference_exon(strand: Strand, start: u64, end: u64, tid: &str, gene: &str) -> TableRow {
        TableRow {
            feature: Feature {
                chrom: "1".to_string(),
                source: "havana".to_string(),
                ftype: FeatureType::Exon,
                start,
                end,
                score: ".".to_string(),
                strand,
                phase: ".".to_string(),
                attributes: format!("Parent=transcript:{};", tid),
            },
            extras: vec![gene.to_string()],
        }
    }

    fn fantom_block(strand: Strand, start: u64, end: u64, tid: &str, block: u64) -> TableRow {
        TableRow {
            feature: Feature {
                chrom: "1".to_string(),
                source: "fantom".to_string(),
                ftype: FeatureType::Other("region".to_string()),
                start,
                end,
                score: ".".to_string(),
                strand,
                phase: ".".to_string(),
                attributes: format!("Name=\"{}.1_block{}\";", tid, block),
            },
            extras: Vec::new(),
        }
    }

    #[test]
    fn test_five_prime_forward_matches_on_end() {
        let reference = vec![reference_exon(Strand::Forward, 1000, 2000, "T1", "G1")];
        let evidence = vec![
            fantom_block(Strand::Forward, 900, 2000, "tx1", 1),
            fantom_block(Strand::Forward, 3000, 4000, "tx1", 2),
        ];
        let out = match_blocks(&reference, &evidence, Direction::FivePrime, false);
        assert_eq!(out.matched_exons.len(), 1);
        assert_eq!(out.matched_blocks.len(), 1);
        assert_eq!(out.matched_blocks[0].feature.start, 900);
        // extracted transcript ID lands in the trailing extras
        assert_eq!(out.matched_exons[0].extra(1), Some("T1"));
        assert_eq!(out.matched_blocks[0].extra(0), Some("tx1"));
    }

    #[test]
    fn test_extremal_block_per_direction() {
        // 5' forward keeps block 1 (end 2000); 3' forward keeps block 3 (start 5000)
        let evidence = vec![
            fantom_block(Strand::Forward, 900, 2000, "tx1", 1),
            fantom_block(Strand::Forward, 2500, 3000, "tx1", 2),
            fantom_block(Strand::Forward, 5000, 6000, "tx1", 3),
        ];
        let five_ref = vec![reference_exon(Strand::Forward, 1000, 2000, "T1", "G1")];
        let three_ref = vec![reference_exon(Strand::Forward, 5000, 5500, "T1", "G1")];

        let five = match_blocks(&five_ref, &evidence, Direction::FivePrime, false);
        assert_eq!(five.matched_blocks.len(), 1);
        assert_eq!(five.matched_blocks[0].extra(1), Some("1"));

        let three = match_blocks(&three_ref, &evidence, Direction::ThreePrime, false);
        assert_eq!(three.matched_blocks.len(), 1);
        assert_eq!(three.matched_blocks[0].extra(1), Some("3"));
    }

    #[test]
    fn test_reverse_strand_anchors() {
        // 5' reverse anchors on start
        let reference = vec![reference_exon(Strand::Reverse, 4000, 5000, "T2", "G2")];
        let evidence = vec![
            fantom_block(Strand::Reverse, 4000, 5600, "tx2", 3),
            fantom_block(Strand::Reverse, 2000, 3000, "tx2", 1),
        ];
        let out = match_blocks(&reference, &evidence, Direction::FivePrime, false);
        assert_eq!(out.matched_exons.len(), 1);
        assert_eq!(out.matched_blocks[0].feature.start, 4000);
    }

    #[test]
    fn test_single_exon_exclusion() {
        let reference = vec![reference_exon(Strand::Forward, 1000, 2000, "T1", "G1")];
        let evidence = vec![fantom_block(Strand::Forward, 900, 2000, "solo", 1)];

        let kept = match_blocks(&reference, &evidence, Direction::FivePrime, false);
        assert_eq!(kept.matched_blocks.len(), 1);

        let excluded = match_blocks(&reference, &evidence, Direction::FivePrime, true);
        assert!(excluded.matched_blocks.is_empty());
        assert!(excluded.matched_exons.is_empty());
        assert_eq!(excluded.summary.transcripts_excluded, 1);
    }

    #[test]
    fn test_rows_without_block_number_dropped() {
        let reference = vec![reference_exon(Strand::Forward, 1000, 2000, "T1", "G1")];
        let mut bad = fantom_block(Strand::Forward, 900, 2000, "tx1", 1);
        bad.feature.attributes = "Name=\"tx1.1\";".to_string();
        let out = match_blocks(&reference, &[bad], Direction::FivePrime, false);
        assert_eq!(out.summary.evidence_rows_dropped, 1);
        assert!(out.matched_blocks.is_empty());
    }

    #[test]
    fn test_output_sorted_forward_then_reverse() {
        let reference = vec![
            reference_exon(Strand::Reverse, 7000, 8000, "T3", "G3"),
            reference_exon(Strand::Forward, 3000, 4000, "T2", "G2"),
            reference_exon(Strand::Forward, 1000, 2000, "T1", "G1"),
        ];
        let evidence = vec![
            fantom_block(Strand::Forward, 2900, 4000, "a", 1),
            fantom_block(Strand::Forward, 900, 2000, "b", 1),
            fantom_block(Strand::Reverse, 7000, 8100, "c", 2),
            fantom_block(Strand::Reverse, 6000, 6500, "c", 1),
        ];
        let out = match_blocks(&reference, &evidence, Direction::FivePrime, false);
        // forward rows sorted by end, then the reverse row
        let ends: Vec<u64> = out.matched_exons.iter().map(|r| r.feature.end).collect();
        assert_eq!(ends, vec![2000, 4000, 8000]);
        let strands: Vec<Strand> = out
            .matched_exons
            .iter()
            .map(|r| r.feature.strand)
            .collect();
        assert_eq!(strands, vec![Strand::Forward, Strand::Forward, Strand::Reverse]);
    }

    #[test]
    fn test_shared_gene_filter() {
        let a = vec![
            reference_exon(Strand::Forward, 1, 2, "T1", "G1"),
            reference_exon(Strand::Forward, 3, 4, "T2", "G2"),
        ];
        let b = vec![reference_exon(Strand::Forward, 5, 6, "T3", "G2")];
        let filtered = shared_gene_filter(&a, &b);
        assert_eq!(filtered.len(), 1);
        assert_eq!(filtered[0].extra(0), Some("G2"));
    }

    #[test]
    fn test_no_matches_is_empty_not_error() {
        let reference = vec![reference_exon(Strand::Forward, 1000, 2000, "T1", "G1")];
        let evidence = vec![fantom_block(Strand::Forward, 10, 20, "tx", 1)];
        let out = match_blocks(&reference, &evidence, Direction::FivePrime, false);
        assert!(out.matched_exons.is_empty());
        assert!(out.matched_blocks.is_empty());
    }
}

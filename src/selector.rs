//! Per-transcript reduction of candidate extensions to the furthest
//! evidence-supported boundary

use crate::types::{Direction, ExtensionRecord, Strand};
use log::info;
use std::collections::HashMap;
use std::fmt;

/// Counters for one selection run.
#[derive(Debug, Default)]
pub struct SelectSummary {
    pub candidates_in: u64,
    pub transcripts_selected: u64,
}

impl SelectSummary {
    pub fn new() -> Self {
        Self::default()
    }
}

impl fmt::Display for SelectSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Best-extension selection summary:")?;
        writeln!(f, "  Candidate rows: {}", self.candidates_in)?;
        write!(f, "  Transcripts selected: {}", self.transcripts_selected)
    }
}

/// Which peak coordinate decides the winner within a transcript group.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum SelectionRule {
    MinCapStart,
    MaxCapEnd,
}

fn selection_rule(direction: Direction, strand: Strand) -> SelectionRule {
    match (direction, strand) {
        (Direction::FivePrime, Strand::Forward) => SelectionRule::MinCapStart,
        (Direction::FivePrime, Strand::Reverse) => SelectionRule::MaxCapEnd,
        (Direction::ThreePrime, Strand::Forward) => SelectionRule::MaxCapEnd,
        (Direction::ThreePrime, Strand::Reverse) => SelectionRule::MinCapStart,
    }
}

/// Extension distance of a selected row. The coordinate pairing is
/// asymmetric across the four cases; in particular both 3' cases difference
/// against `capOrTail_Start`.
fn extension_distance(direction: Direction, record: &ExtensionRecord) -> u64 {
    match (direction, record.feature.strand) {
        (Direction::FivePrime, Strand::Forward) => {
            record.transcript_start.abs_diff(record.cap_start)
        }
        (Direction::FivePrime, Strand::Reverse) => record.transcript_end.abs_diff(record.cap_end),
        (Direction::ThreePrime, Strand::Forward) => {
            record.transcript_end.abs_diff(record.cap_start)
        }
        (Direction::ThreePrime, Strand::Reverse) => {
            record.transcript_start.abs_diff(record.cap_start)
        }
    }
}

/// Reduce candidate rows to one row per transcript name and fill in the
/// extension distance.
///
/// Groups keep their first-encountered order; within a group the winner is
/// decided by the strand × direction rule, strict comparisons keeping the
/// first-encountered row on ties. Running the selection over its own output
/// returns the same rows.
pub fn select_best(
    candidates: &[ExtensionRecord],
    direction: Direction,
) -> (Vec<ExtensionRecord>, SelectSummary) {
    let mut summary = SelectSummary::new();
    summary.candidates_in = candidates.len() as u64;

    let mut selected: Vec<ExtensionRecord> = Vec::new();
    let mut index: HashMap<String, usize> = HashMap::new();

    for candidate in candidates {
        match index.get(&candidate.name) {
            None => {
                index.insert(candidate.name.clone(), selected.len());
                selected.push(candidate.clone());
            }
            Some(&at) => {
                let incumbent = &selected[at];
                // the first row of a group fixes the rule for the group
                let better = match selection_rule(direction, incumbent.feature.strand) {
                    SelectionRule::MinCapStart => candidate.cap_start < incumbent.cap_start,
                    SelectionRule::MaxCapEnd => candidate.cap_end > incumbent.cap_end,
                };
                if better {
                    selected[at] = candidate.clone();
                }
            }
        }
    }

    for record in selected.iter_mut() {
        record.difference = Some(extension_distance(direction, record));
    }

    summary.transcripts_selected = selected.len() as u64;
    info!("{}", summary);
    (selected, summary)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{Feature, FeatureType};

    fn candidate(
        name: &str,
        strand: Strand,
        transcript_start: u64,
        transcript_end: u64,
        cap_start: u64,
        cap_end: u64,
    ) -> ExtensionRecord {
        ExtensionRecord {
            feature: Feature {
                chrom: "1".to_string(),
                source: "test".to_string(),
                ftype: FeatureType::Exon,
                start: transcript_start,
                end: transcript_end,
                score: ".".to_string(),
                strand,
                phase: ".".to_string(),
                attributes: format!("Parent=transcript:{};", name),
            },
            gene_id: "G1".to_string(),
            name: name.to_string(),
            cap_start,
            cap_end,
            transcript_start,
            transcript_end,
            transcript_name: name.to_string(),
            difference: None,
        }
    }

    #[test]
    fn test_five_prime_forward_keeps_min_cap_start() {
        let rows = vec![
            candidate("T1", Strand::Forward, 1000, 5000, 950, 970),
            candidate("T1", Strand::Forward, 1000, 5000, 700, 720),
            candidate("T1", Strand::Forward, 1000, 5000, 990, 995),
        ];
        let (selected, summary) = select_best(&rows, Direction::FivePrime);
        assert_eq!(selected.len(), 1);
        assert_eq!(selected[0].cap_start, 700);
        assert_eq!(summary.candidates_in, 3);
        assert_eq!(summary.transcripts_selected, 1);
    }

    #[test]
    fn test_five_prime_reverse_keeps_max_cap_end() {
        let rows = vec![
            candidate("T1", Strand::Reverse, 1000, 5000, 5100, 5200),
            candidate("T1", Strand::Reverse, 1000, 5000, 5400, 5500),
        ];
        let (selected, _) = select_best(&rows, Direction::FivePrime);
        assert_eq!(selected[0].cap_end, 5500);
    }

    #[test]
    fn test_three_prime_forward_keeps_max_cap_end() {
        let rows = vec![
            candidate("T1", Strand::Forward, 7000, 8000, 8100, 8200),
            candidate("T1", Strand::Forward, 7000, 8000, 9100, 9200),
        ];
        let (selected, _) = select_best(&rows, Direction::ThreePrime);
        assert_eq!(selected[0].cap_end, 9200);
    }

    #[test]
    fn test_three_prime_reverse_keeps_min_cap_start() {
        let rows = vec![
            candidate("T1", Strand::Reverse, 7000, 8000, 6000, 6500),
            candidate("T1", Strand::Reverse, 7000, 8000, 5000, 5500),
        ];
        let (selected, _) = select_best(&rows, Direction::ThreePrime);
        assert_eq!(selected[0].cap_start, 5000);
    }

    #[test]
    fn test_tie_keeps_first_encountered_row() {
        let mut first = candidate("T1", Strand::Forward, 1000, 5000, 950, 970);
        first.gene_id = "FIRST".to_string();
        let mut second = candidate("T1", Strand::Forward, 1000, 5000, 950, 980);
        second.gene_id = "SECOND".to_string();
        let (selected, _) = select_best(&[first, second], Direction::FivePrime);
        assert_eq!(selected[0].gene_id, "FIRST");
    }

    #[test]
    fn test_difference_pairings() {
        // 5' forward: |Transcript_Start - capOrTail_Start|
        let (selected, _) = select_best(
            &[candidate("T1", Strand::Forward, 1000, 5000, 950, 970)],
            Direction::FivePrime,
        );
        assert_eq!(selected[0].difference, Some(50));

        // 5' reverse: |Transcript_End - capOrTail_End|
        let (selected, _) = select_best(
            &[candidate("T1", Strand::Reverse, 1000, 5000, 5100, 5200)],
            Direction::FivePrime,
        );
        assert_eq!(selected[0].difference, Some(200));

        // 3' forward: |Transcript_End - capOrTail_Start|
        let (selected, _) = select_best(
            &[candidate("T1", Strand::Forward, 7000, 8000, 8100, 8300)],
            Direction::ThreePrime,
        );
        assert_eq!(selected[0].difference, Some(100));

        // 3' reverse: |Transcript_Start - capOrTail_Start|
        let (selected, _) = select_best(
            &[candidate("T1", Strand::Reverse, 7000, 8000, 6000, 6500)],
            Direction::ThreePrime,
        );
        assert_eq!(selected[0].difference, Some(1000));
    }

    #[test]
    fn test_group_order_is_first_encountered() {
        let rows = vec![
            candidate("T2", Strand::Forward, 1, 10, 5, 6),
            candidate("T1", Strand::Forward, 1, 10, 5, 6),
            candidate("T2", Strand::Forward, 1, 10, 3, 4),
        ];
        let (selected, _) = select_best(&rows, Direction::FivePrime);
        let names: Vec<&str> = selected.iter().map(|r| r.name.as_str()).collect();
        assert_eq!(names, vec!["T2", "T1"]);
        assert_eq!(selected[0].cap_start, 3);
    }

    #[test]
    fn test_selection_is_idempotent() {
        let rows = vec![
            candidate("T1", Strand::Forward, 1000, 5000, 950, 970),
            candidate("T1", Strand::Forward, 1000, 5000, 700, 720),
            candidate("T2", Strand::Reverse, 1000, 5000, 5100, 5200),
        ];
        let (first, _) = select_best(&rows, Direction::FivePrime);
        let (second, _) = select_best(&first, Direction::FivePrime);
        assert_eq!(first.len(), second.len());
        for (a, b) in first.iter().zip(second.iter()) {
            assert_eq!(a.name, b.name);
            assert_eq!(a.cap_start, b.cap_start);
            assert_eq!(a.cap_end, b.cap_end);
            assert_eq!(a.difference, b.difference);
        }
    }

    #[test]
    fn test_empty_input_is_empty_output() {
        let (selected, summary) = select_best(&[], Direction::FivePrime);
        assert!(selected.is_empty());
        assert_eq!(summary.transcripts_selected, 0);
    }
}

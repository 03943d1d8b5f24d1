//! Windowed capOrTail peak search with dual transcript-evidence corroboration

use crate::gff::ensembl_transcript_id;
use crate::types::{CheckConfig, Direction, ExtensionRecord, Feature, Strand, TableRow};
use log::{debug, info};
use rayon::prelude::*;
use std::fmt;

/// Counters for one corroboration run.
#[derive(Debug, Default)]
pub struct CheckSummary {
    pub exons_examined: u64,
    pub missing_transcript_id: u64,
    pub sites_in_window: u64,
    pub candidates: u64,
}

impl CheckSummary {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn merge(&mut self, other: &CheckSummary) {
        self.exons_examined += other.exons_examined;
        self.missing_transcript_id += other.missing_transcript_id;
        self.sites_in_window += other.sites_in_window;
        self.candidates += other.candidates;
    }
}

impl fmt::Display for CheckSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Peak corroboration summary:")?;
        writeln!(f, "  Exons examined: {}", self.exons_examined)?;
        writeln!(f, "  Exons without transcript ID: {}", self.missing_transcript_id)?;
        writeln!(f, "  Peaks within window: {}", self.sites_in_window)?;
        write!(f, "  Candidate extensions: {}", self.candidates)
    }
}

/// Does this peak lie beyond the exon boundary and inside the window?
///
/// The four strand × direction contracts are independent: the 3' window is
/// bounded against the opposite exon coordinate, not the near one.
fn site_in_window(direction: Direction, exon: &Feature, site: &Feature, window: u64) -> bool {
    if site.strand != exon.strand || site.chrom != exon.chrom {
        return false;
    }
    match (direction, exon.strand) {
        (Direction::FivePrime, Strand::Forward) => {
            site.end < exon.start && site.start >= exon.start.saturating_sub(window)
        }
        (Direction::FivePrime, Strand::Reverse) => {
            site.start > exon.end && site.end <= exon.end + window
        }
        (Direction::ThreePrime, Strand::Forward) => {
            site.start > exon.end && site.start <= exon.start + window
        }
        (Direction::ThreePrime, Strand::Reverse) => {
            site.end < exon.start && site.end >= exon.end.saturating_sub(window)
        }
    }
}

/// Does this evidence transcript share the exon's splice boundary and reach
/// the peak? The reverse-strand 3' reach tests `site.start`, not `site.end`.
fn corroborates(direction: Direction, exon: &Feature, evidence: &Feature, site: &Feature) -> bool {
    if evidence.strand != exon.strand || evidence.chrom != exon.chrom {
        return false;
    }
    match (direction, exon.strand) {
        (Direction::FivePrime, Strand::Forward) => {
            evidence.end == exon.end && evidence.start < site.start
        }
        (Direction::FivePrime, Strand::Reverse) => {
            evidence.start == exon.start && evidence.end > site.end
        }
        (Direction::ThreePrime, Strand::Forward) => {
            evidence.start == exon.start && evidence.end >= site.start
        }
        (Direction::ThreePrime, Strand::Reverse) => {
            evidence.end == exon.end && evidence.start <= site.start
        }
    }
}

/// Search every reference terminal exon for capOrTail peaks within the
/// window that are corroborated by both transcript evidence sources.
///
/// One candidate is emitted per (exon, peak) pair; candidate order follows
/// exon order, then peak order within an exon. Exons without an extractable
/// transcript ID are skipped and counted.
pub fn find_candidates(
    reference_exons: &[TableRow],
    sites: &[TableRow],
    fantom: &[TableRow],
    longread: &[TableRow],
    direction: Direction,
    config: &CheckConfig,
) -> (Vec<ExtensionRecord>, CheckSummary) {
    let window = config.window;

    let per_exon: Vec<(Vec<ExtensionRecord>, CheckSummary)> = reference_exons
        .par_iter()
        .map(|exon_row| {
            let mut local = CheckSummary::new();
            local.exons_examined = 1;
            let mut records = Vec::new();

            let exon = &exon_row.feature;
            let name = match ensembl_transcript_id(&exon.attributes) {
                Some(name) => name,
                None => {
                    debug!("No transcript ID in exon attributes: {}", exon.attributes);
                    local.missing_transcript_id = 1;
                    return (records, local);
                }
            };
            let gene_id = exon_row.extra(0).unwrap_or_default().to_string();

            for site_row in sites {
                let site = &site_row.feature;
                if !site_in_window(direction, exon, site, window) {
                    continue;
                }
                local.sites_in_window += 1;

                let fantom_support = fantom
                    .iter()
                    .any(|ev| corroborates(direction, exon, &ev.feature, site));
                if !fantom_support {
                    continue;
                }
                let longread_support = longread
                    .iter()
                    .any(|ev| corroborates(direction, exon, &ev.feature, site));
                if !longread_support {
                    continue;
                }

                records.push(ExtensionRecord {
                    feature: exon.clone(),
                    gene_id: gene_id.clone(),
                    name: name.clone(),
                    cap_start: site.start,
                    cap_end: site.end,
                    transcript_start: exon.start,
                    transcript_end: exon.end,
                    transcript_name: name.clone(),
                    difference: None,
                });
            }

            (records, local)
        })
        .collect();

    let mut summary = CheckSummary::new();
    let mut candidates = Vec::new();
    for (records, local) in per_exon {
        summary.merge(&local);
        candidates.extend(records);
    }
    summary.candidates = candidates.len() as u64;
    info!("{}", summary);

    (candidates, summary)
}

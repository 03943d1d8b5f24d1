//! Rewrite reference transcripts to their evidence-extended boundaries

use crate::gff::transcript_key;
use crate::logging::log_boundary_change;
use crate::output::AnnotationWriter;
use crate::types::{
    split_mane_suffix, Feature, FeatureType, ReconciledTranscript, Result, RewriteConfig, Strand,
    TableRow,
};
use log::{info, warn};
use rayon::prelude::*;
use std::collections::HashMap;
use std::fmt;
use std::path::Path;

/// Counters for one rewrite run.
#[derive(Debug, Default)]
pub struct RewriteSummary {
    pub transcripts_in: u64,
    pub transcripts_written: u64,
    pub lookup_misses: u64,
    pub mane_copies: u64,
    pub contractions_rejected: u64,
    pub rows_written: u64,
}

impl RewriteSummary {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn merge(&mut self, other: &RewriteSummary) {
        self.transcripts_in += other.transcripts_in;
        self.transcripts_written += other.transcripts_written;
        self.lookup_misses += other.lookup_misses;
        self.mane_copies += other.mane_copies;
        self.contractions_rejected += other.contractions_rejected;
        self.rows_written += other.rows_written;
    }
}

impl fmt::Display for RewriteSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Annotation rewrite summary:")?;
        writeln!(f, "  Transcripts in: {}", self.transcripts_in)?;
        writeln!(f, "  Transcripts written: {}", self.transcripts_written)?;
        writeln!(f, "  Reference lookup misses: {}", self.lookup_misses)?;
        writeln!(f, "  MANE copies: {}", self.mane_copies)?;
        writeln!(f, "  Contractions rejected: {}", self.contractions_rejected)?;
        write!(f, "  Rows written: {}", self.rows_written)
    }
}

/// Original and extended outer boundaries of one transcript.
#[derive(Debug, Clone, Copy)]
struct Boundaries {
    gff_start: u64,
    gff_end: u64,
    extended_start: u64,
    extended_end: u64,
    contractions_rejected: u64,
}

/// Resolve the peak coordinates against the transcript's original span.
///
/// Missing 5' (cage) coordinates fall back to the boundary the 5' end sits on
/// for the strand, missing 3' (polya) coordinates to the opposite one. With
/// contraction disallowed, a computed boundary inside the original span is
/// replaced by the original boundary and the event counted.
fn compute_boundaries(
    record: &ReconciledTranscript,
    strand: Strand,
    gff_start: u64,
    gff_end: u64,
    config: &RewriteConfig,
) -> Boundaries {
    let (cage_fallback, polya_fallback) = match strand {
        Strand::Forward => (gff_start, gff_end),
        Strand::Reverse => (gff_end, gff_start),
    };
    let cage_start = record.five_cap_start.unwrap_or(cage_fallback);
    let cage_end = record.five_cap_end.unwrap_or(cage_fallback);
    let polya_start = record.three_cap_start.unwrap_or(polya_fallback);
    let polya_end = record.three_cap_end.unwrap_or(polya_fallback);

    let (mut extended_start, mut extended_end) = match strand {
        Strand::Forward => (cage_start, polya_end),
        Strand::Reverse => (polya_start, cage_end),
    };

    let mut contractions_rejected = 0;
    if !config.allow_contraction {
        if extended_start > gff_start {
            extended_start = gff_start;
            contractions_rejected += 1;
        }
        if extended_end < gff_end {
            extended_end = gff_end;
            contractions_rejected += 1;
        }
    }

    Boundaries {
        gff_start,
        gff_end,
        extended_start,
        extended_end,
        contractions_rejected,
    }
}

/// Append provenance tags to an attribute string carrying a `tag=` list.
///
/// `MANE_Select` mRNAs additionally get `MANE_copy`. The list keeps its
/// order and everything outside it is untouched; rows without a tag list
/// are returned as-is.
fn inject_tags(attributes: &str, ftype: &FeatureType) -> String {
    let Some((before, after)) = attributes.split_once("tag=") else {
        return attributes.to_string();
    };
    let (list, rest) = match after.split_once(';') {
        Some((list, rest)) => (list, Some(rest)),
        None => (after, None),
    };
    let mut tags: Vec<&str> = list.split(',').collect();
    if matches!(ftype, FeatureType::Mrna) && tags.contains(&"MANE_Select") {
        if !tags.contains(&"MANE_copy") {
            tags.push("MANE_copy");
        }
        if !tags.contains(&"LEAP") {
            tags.push("LEAP");
        }
    }
    if !tags.contains(&"gencode_primary") {
        tags.push("gencode_primary");
        tags.push("gencode_basic");
    }
    if !tags.contains(&"LEAP") {
        tags.push("LEAP");
    }
    match rest {
        Some(rest) => format!("{}tag={};{}", before, tags.join(","), rest),
        None => format!("{}tag={}", before, tags.join(",")),
    }
}

/// Rewrite one reference row. Coordinates touching the transcript's original
/// outer boundary move to the extended boundary; everything else passes
/// through with only chromosome and strand normalized.
fn emit_row(row: &TableRow, chrom: &str, strand: Strand, bounds: &Boundaries) -> Feature {
    let feature = &row.feature;
    let mut start = feature.start;
    let mut end = feature.end;
    match feature.ftype {
        FeatureType::Mrna => {
            start = bounds.extended_start;
            end = bounds.extended_end;
        }
        FeatureType::FivePrimeUtr => match strand {
            Strand::Forward => {
                if feature.start == bounds.gff_start {
                    start = bounds.extended_start;
                }
            }
            Strand::Reverse => {
                if feature.end == bounds.gff_end {
                    end = bounds.extended_end;
                }
            }
        },
        FeatureType::ThreePrimeUtr => match strand {
            Strand::Forward => {
                if feature.end == bounds.gff_end {
                    end = bounds.extended_end;
                }
            }
            Strand::Reverse => {
                if feature.start == bounds.gff_start {
                    start = bounds.extended_start;
                }
            }
        },
        FeatureType::Exon => {
            if feature.start == bounds.gff_start {
                start = bounds.extended_start;
            }
            if feature.end == bounds.gff_end {
                end = bounds.extended_end;
            }
        }
        _ => {}
    }
    Feature {
        chrom: chrom.to_string(),
        source: feature.source.clone(),
        ftype: feature.ftype.clone(),
        start,
        end,
        score: feature.score.clone(),
        strand,
        phase: feature.phase.clone(),
        attributes: inject_tags(&feature.attributes, &feature.ftype),
    }
}

/// Group reference rows by the transcript ID embedded in their attributes.
/// Gene rows carry no `transcript:` key and are left out; row order within a
/// transcript is file order.
fn build_transcript_index(reference: &[TableRow]) -> HashMap<String, Vec<usize>> {
    let mut index: HashMap<String, Vec<usize>> = HashMap::new();
    for (at, row) in reference.iter().enumerate() {
        if let Some(key) = transcript_key(&row.feature.attributes) {
            index.entry(key).or_default().push(at);
        }
    }
    index
}

fn rewrite_transcript(
    record: &ReconciledTranscript,
    reference: &[TableRow],
    index: &HashMap<String, Vec<usize>>,
    config: &RewriteConfig,
) -> (Vec<Feature>, RewriteSummary) {
    let mut local = RewriteSummary::new();
    local.transcripts_in = 1;

    let (base, was_mane) = split_mane_suffix(&record.transcript_name);
    if was_mane {
        local.mane_copies = 1;
    }
    let rows: Vec<&TableRow> = match index.get(base) {
        Some(indices) => indices.iter().map(|&at| &reference[at]).collect(),
        None => {
            warn!(
                "Transcript {} not found in the reference annotation, skipping",
                record.transcript_name
            );
            local.lookup_misses = 1;
            return (Vec::new(), local);
        }
    };

    let strand = record.strand.unwrap_or(rows[0].feature.strand);
    let chrom = record
        .chrom
        .clone()
        .unwrap_or_else(|| rows[0].feature.chrom.clone());
    let gff_start = rows.iter().map(|r| r.feature.start).min().unwrap_or(0);
    let gff_end = rows.iter().map(|r| r.feature.end).max().unwrap_or(0);

    let bounds = compute_boundaries(record, strand, gff_start, gff_end, config);
    local.contractions_rejected = bounds.contractions_rejected;
    if bounds.extended_start != bounds.gff_start {
        log_boundary_change(base, "start", bounds.gff_start, bounds.extended_start);
    }
    if bounds.extended_end != bounds.gff_end {
        log_boundary_change(base, "end", bounds.gff_end, bounds.extended_end);
    }

    let features: Vec<Feature> = rows
        .iter()
        .map(|row| emit_row(row, &chrom, strand, &bounds))
        .collect();
    local.transcripts_written = 1;
    local.rows_written = features.len() as u64;
    (features, local)
}

/// Rewrite the reference annotation to the reconciled boundaries.
///
/// Transcripts are processed in parallel and written in reconciled-record
/// order; a transcript missing from the reference is logged and skipped.
pub fn rewrite_annotation<P: AsRef<Path>>(
    reference: &[TableRow],
    reconciled: &[ReconciledTranscript],
    config: &RewriteConfig,
    output: P,
) -> Result<RewriteSummary> {
    let index = build_transcript_index(reference);

    let results: Vec<(Vec<Feature>, RewriteSummary)> = reconciled
        .par_iter()
        .map(|record| rewrite_transcript(record, reference, &index, config))
        .collect();

    let mut writer = AnnotationWriter::new(output)?;
    let mut summary = RewriteSummary::new();
    for (features, local) in &results {
        summary.merge(local);
        for feature in features {
            writer.write_feature(feature)?;
        }
    }
    summary.rows_written = writer.finish()?;
    info!("{}", summary);
    Ok(summary)
}

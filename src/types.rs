//! Core data structures for transcript end extension

use thiserror::Error;

/// Errors that can occur while running the pipeline
#[derive(Error, Debug)]
pub enum LeapError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Parse error: {0}")]
    Parse(String),

    #[error("Invalid direction: {0} (expected 5, 5', five, fiveprime, five_prime or the 3' equivalents)")]
    Direction(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),
}

pub type Result<T> = std::result::Result<T, LeapError>;

/// DNA strand orientation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Strand {
    Forward,
    Reverse,
}

impl std::fmt::Display for Strand {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Strand::Forward => write!(f, "+"),
            Strand::Reverse => write!(f, "-"),
        }
    }
}

impl std::str::FromStr for Strand {
    type Err = LeapError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "+" => Ok(Strand::Forward),
            "-" => Ok(Strand::Reverse),
            _ => Err(LeapError::Parse(format!("Invalid strand: {}", s))),
        }
    }
}

/// Which transcript end a pipeline run is extending
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Direction {
    FivePrime,
    ThreePrime,
}

impl Direction {
    /// Label used in output file names, e.g. `sample_fivePrime_final.csv`.
    pub fn file_label(&self) -> &'static str {
        match self {
            Direction::FivePrime => "fivePrime",
            Direction::ThreePrime => "threePrime",
        }
    }

    pub fn opposite(&self) -> Direction {
        match self {
            Direction::FivePrime => Direction::ThreePrime,
            Direction::ThreePrime => Direction::FivePrime,
        }
    }
}

impl std::fmt::Display for Direction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Direction::FivePrime => write!(f, "five_prime"),
            Direction::ThreePrime => write!(f, "three_prime"),
        }
    }
}

impl std::str::FromStr for Direction {
    type Err = LeapError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "5" | "5'" | "five" | "fiveprime" | "five_prime" => Ok(Direction::FivePrime),
            "3" | "3'" | "three" | "threeprime" | "three_prime" => Ok(Direction::ThreePrime),
            _ => Err(LeapError::Direction(s.to_string())),
        }
    }
}

/// GFF3 feature types the pipeline distinguishes
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FeatureType {
    Gene,
    Mrna,
    Exon,
    Cds,
    FivePrimeUtr,
    ThreePrimeUtr,
    Other(String),
}

impl std::fmt::Display for FeatureType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            FeatureType::Gene => write!(f, "gene"),
            FeatureType::Mrna => write!(f, "mRNA"),
            FeatureType::Exon => write!(f, "exon"),
            FeatureType::Cds => write!(f, "CDS"),
            FeatureType::FivePrimeUtr => write!(f, "five_prime_UTR"),
            FeatureType::ThreePrimeUtr => write!(f, "three_prime_UTR"),
            FeatureType::Other(s) => write!(f, "{}", s),
        }
    }
}

impl std::str::FromStr for FeatureType {
    type Err = LeapError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "gene" => Ok(FeatureType::Gene),
            "mRNA" => Ok(FeatureType::Mrna),
            "exon" => Ok(FeatureType::Exon),
            "CDS" => Ok(FeatureType::Cds),
            "five_prime_UTR" => Ok(FeatureType::FivePrimeUtr),
            "three_prime_UTR" => Ok(FeatureType::ThreePrimeUtr),
            _ => Ok(FeatureType::Other(s.to_string())),
        }
    }
}

/// One row of the 9-column interval-plus-attributes table family.
///
/// Coordinates are 1-based inclusive as found in the input. Score and phase are
/// carried as raw text so pass-through rows are rewritten byte for byte.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Feature {
    pub chrom: String,
    pub source: String,
    pub ftype: FeatureType,
    pub start: u64,
    pub end: u64,
    pub score: String,
    pub strand: Strand,
    pub phase: String,
    pub attributes: String,
}

/// A parsed table row: the 9 interval columns plus any pipeline-specific
/// extra columns, in file order. Consumers bind extras to named fields once
/// at load time.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TableRow {
    pub feature: Feature,
    pub extras: Vec<String>,
}

impl TableRow {
    pub fn extra(&self, index: usize) -> Option<&str> {
        self.extras.get(index).map(|s| s.as_str())
    }
}

/// A candidate (or selected) transcript end extension: the terminal exon row
/// joined with the supporting capOrTail peak.
#[derive(Debug, Clone)]
pub struct ExtensionRecord {
    pub feature: Feature,
    pub gene_id: String,
    /// Transcript ID key, possibly carrying the `_MANE_copy` suffix.
    pub name: String,
    pub cap_start: u64,
    pub cap_end: u64,
    pub transcript_start: u64,
    pub transcript_end: u64,
    pub transcript_name: String,
    /// Extension distance, filled in by the selector.
    pub difference: Option<u64>,
}

impl ExtensionRecord {
    /// Header of the serialized extension table, without the trailing
    /// `Difference` column the selector appends.
    pub const HEADER: [&'static str; 16] = [
        "Chromosome",
        "Source",
        "Type",
        "Start",
        "End",
        "Score",
        "Strand",
        "Phase",
        "Attributes",
        "gene_id",
        "Name",
        "capOrTail_Start",
        "capOrTail_End",
        "Transcript_Start",
        "Transcript_End",
        "Transcript_Name",
    ];
}

/// Outer-join row over the four per-direction selector tables.
///
/// Descriptive columns are consolidated first-non-null in table order; the
/// peak coordinate pairs are kept per direction and never consolidated.
#[derive(Debug, Clone, Default)]
pub struct ReconciledTranscript {
    pub transcript_name: String,
    pub chrom: Option<String>,
    pub strand: Option<Strand>,
    pub gene_id: Option<String>,
    pub five_cap_start: Option<u64>,
    pub five_cap_end: Option<u64>,
    pub three_cap_start: Option<u64>,
    pub three_cap_end: Option<u64>,
}

/// Suffix marking a transcript row duplicated for a MANE-Select variant.
pub const MANE_SUFFIX: &str = "_MANE_copy";

/// Split a `_MANE_copy` suffix (matched case-insensitively) off a transcript
/// name. Returns the base name and whether a suffix was present.
pub fn split_mane_suffix(name: &str) -> (&str, bool) {
    let upper = name.to_ascii_uppercase();
    match upper.find("_MANE_COPY") {
        Some(idx) => (&name[..idx], true),
        None => (name, false),
    }
}

/// Configuration for the peak corroboration stage
#[derive(Debug, Clone)]
pub struct CheckConfig {
    /// Maximum distance between a terminal-exon boundary and a peak, in bp.
    pub window: u64,
}

impl Default for CheckConfig {
    fn default() -> Self {
        Self { window: 10_000 }
    }
}

/// Configuration for the annotation rewrite stage
#[derive(Debug, Clone)]
pub struct RewriteConfig {
    /// Apply evidence-implied boundary contraction instead of keeping the
    /// original boundary.
    pub allow_contraction: bool,
}

impl Default for RewriteConfig {
    fn default() -> Self {
        Self {
            allow_contraction: false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    #[test]
    fn test_strand_round_trip() {
        assert_eq!(Strand::from_str("+").unwrap(), Strand::Forward);
        assert_eq!(Strand::from_str("-").unwrap(), Strand::Reverse);
        assert_eq!(Strand::Forward.to_string(), "+");
        assert_eq!(Strand::Reverse.to_string(), "-");
        assert!(Strand::from_str(".").is_err());
    }

    #[test]
    fn test_direction_synonyms() {
        for s in ["5", "5'", "five", "FivePrime", "five_prime", " FIVE "] {
            assert_eq!(Direction::from_str(s).unwrap(), Direction::FivePrime, "{}", s);
        }
        for s in ["3", "3'", "three", "threePrime", "three_prime"] {
            assert_eq!(Direction::from_str(s).unwrap(), Direction::ThreePrime, "{}", s);
        }
        assert!(Direction::from_str("sideways").is_err());
    }

    #[test]
    fn test_direction_labels() {
        assert_eq!(Direction::FivePrime.file_label(), "fivePrime");
        assert_eq!(Direction::ThreePrime.file_label(), "threePrime");
        assert_eq!(Direction::FivePrime.to_string(), "five_prime");
        assert_eq!(Direction::FivePrime.opposite(), Direction::ThreePrime);
    }

    #[test]
    fn test_feature_type_round_trip() {
        assert_eq!(FeatureType::from_str("mRNA").unwrap(), FeatureType::Mrna);
        assert_eq!(
            FeatureType::from_str("five_prime_UTR").unwrap(),
            FeatureType::FivePrimeUtr
        );
        assert_eq!(
            FeatureType::from_str("biological_region").unwrap(),
            FeatureType::Other("biological_region".to_string())
        );
        assert_eq!(FeatureType::ThreePrimeUtr.to_string(), "three_prime_UTR");
    }

    #[test]
    fn test_mane_suffix() {
        assert_eq!(split_mane_suffix("ENST01"), ("ENST01", false));
        assert_eq!(split_mane_suffix("ENST01_MANE_copy"), ("ENST01", true));
        assert_eq!(split_mane_suffix("ENST01_MANE_COPY"), ("ENST01", true));
        assert_eq!(format!("{}{}", "ENST01", MANE_SUFFIX), "ENST01_MANE_copy");
    }

    #[test]
    fn test_config_defaults() {
        assert_eq!(CheckConfig::default().window, 10_000);
        assert!(!RewriteConfig::default().allow_contraction);
    }
}

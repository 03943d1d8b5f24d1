//! Descriptive statistics over extension distances

use crate::types::Result;
use std::fmt;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

const HISTOGRAM_BINS: u64 = 30;

/// Mean / median / largest extension distance plus a binned histogram.
#[derive(Debug, Default)]
pub struct ExtensionStats {
    pub count: u64,
    pub mean: f64,
    pub median: f64,
    pub largest: u64,
    /// `(lo, hi, count)` per bin; empty when there is no input.
    pub histogram: Vec<(u64, u64, u64)>,
}

impl ExtensionStats {
    /// Summarize a set of extension distances. An empty slice yields the
    /// all-zero report rather than an error.
    pub fn from_differences(differences: &[u64]) -> Self {
        if differences.is_empty() {
            return Self::default();
        }

        let count = differences.len() as u64;
        let sum: u64 = differences.iter().sum();
        let mean = sum as f64 / count as f64;

        let mut sorted = differences.to_vec();
        sorted.sort_unstable();
        let mid = sorted.len() / 2;
        let median = if sorted.len() % 2 == 0 {
            (sorted[mid - 1] + sorted[mid]) as f64 / 2.0
        } else {
            sorted[mid] as f64
        };
        let largest = sorted[sorted.len() - 1];

        ExtensionStats {
            count,
            mean,
            median,
            largest,
            histogram: bin_differences(differences, largest),
        }
    }
}

/// Equal-width bins over `[0, max]`; an all-zero input collapses to one bin.
fn bin_differences(differences: &[u64], max: u64) -> Vec<(u64, u64, u64)> {
    if max == 0 {
        return vec![(0, 0, differences.len() as u64)];
    }
    let mut counts = vec![0u64; HISTOGRAM_BINS as usize];
    for &value in differences {
        let bin = (value * HISTOGRAM_BINS / max).min(HISTOGRAM_BINS - 1);
        counts[bin as usize] += 1;
    }
    counts
        .iter()
        .enumerate()
        .map(|(i, &count)| {
            let lo = i as u64 * max / HISTOGRAM_BINS;
            let hi = if i as u64 == HISTOGRAM_BINS - 1 {
                max
            } else {
                (i as u64 + 1) * max / HISTOGRAM_BINS
            };
            (lo, hi, count)
        })
        .collect()
}

impl fmt::Display for ExtensionStats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Mean difference: {}", self.mean)?;
        writeln!(f, "Median difference: {}", self.median)?;
        write!(f, "Largest difference: {}", self.largest)?;
        for (lo, hi, count) in &self.histogram {
            write!(f, "\n{}..{}\t{}", lo, hi, count)?;
        }
        Ok(())
    }
}

/// Write the statistics report to `path`.
pub fn write_stats_report<P: AsRef<Path>>(path: P, stats: &ExtensionStats) -> Result<()> {
    let mut writer = BufWriter::new(File::create(path.as_ref())?);
    writeln!(writer, "{}", stats)?;
    writer.flush()?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_input_is_zero_report() {
        let stats = ExtensionStats::from_differences(&[]);
        assert_eq!(stats.count, 0);
        assert_eq!(
            stats.to_string(),
            "Mean difference: 0\nMedian difference: 0\nLargest difference: 0"
        );
    }

    #[test]
    fn test_single_value() {
        let stats = ExtensionStats::from_differences(&[50]);
        assert_eq!(stats.count, 1);
        assert_eq!(stats.mean, 50.0);
        assert_eq!(stats.median, 50.0);
        assert_eq!(stats.largest, 50);
    }

    #[test]
    fn test_even_count_median_averages_middle_two() {
        let stats = ExtensionStats::from_differences(&[10, 40, 20, 30]);
        assert_eq!(stats.median, 25.0);
        assert_eq!(stats.mean, 25.0);
        assert_eq!(stats.largest, 40);
    }

    #[test]
    fn test_all_zero_collapses_to_one_bin() {
        let stats = ExtensionStats::from_differences(&[0, 0, 0]);
        assert_eq!(stats.histogram, vec![(0, 0, 3)]);
        assert_eq!(
            stats.to_string(),
            "Mean difference: 0\nMedian difference: 0\nLargest difference: 0\n0..0\t3"
        );
    }

    #[test]
    fn test_histogram_covers_range_and_preserves_counts() {
        let values = vec![0, 1, 299, 300, 150, 150];
        let stats = ExtensionStats::from_differences(&values);
        assert_eq!(stats.histogram.len(), 30);
        assert_eq!(stats.histogram[0].0, 0);
        assert_eq!(stats.histogram[29].1, 300);
        let total: u64 = stats.histogram.iter().map(|(_, _, c)| c).sum();
        assert_eq!(total, values.len() as u64);
        // the maximum lands in the last bin
        assert!(stats.histogram[29].2 >= 1);
    }

    #[test]
    fn test_report_has_header_then_bins() {
        let stats = ExtensionStats::from_differences(&[10, 20, 30]);
        let report = stats.to_string();
        let lines: Vec<&str> = report.lines().collect();
        assert_eq!(lines[0], "Mean difference: 20");
        assert_eq!(lines[1], "Median difference: 20");
        assert_eq!(lines[2], "Largest difference: 30");
        assert_eq!(lines.len(), 3 + 30);
        assert!(lines[3].contains('\t'));
    }
}

use crate::error::{ReportError, Result};
use std::io::Write;

/// One bin of a [`Histogram`]: the half-open range `[lower, upper)`, closed
/// on the right for the last bin.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Bin {
    pub lower: f64,
    pub upper: f64,
    pub count: u64,
}

/// Fixed-width histogram. The last bin includes its upper edge, and a
/// zero-width range is widened by 0.5 on each side.
#[derive(Debug, Clone, PartialEq)]
pub struct Histogram {
    edges: Vec<f64>,
    counts: Vec<u64>,
}

impl Histogram {
    /// Bins `values` into `n_bins` equal-width bins spanning their own min and max.
    pub fn from_values(values: &[f64], n_bins: usize) -> Result<Histogram> {
        let range = match (
            values.iter().copied().reduce(f64::min),
            values.iter().copied().reduce(f64::max),
        ) {
            (Some(lo), Some(hi)) => (lo, hi),
            // Empty input still gets a drawable range
            _ => (0.0, 1.0),
        };
        Histogram::with_range(values, n_bins, range)
    }

    /// Bins `values` over an explicit range. Values outside the range are not counted.
    pub fn with_range(values: &[f64], n_bins: usize, range: (f64, f64)) -> Result<Histogram> {
        if n_bins == 0 {
            return Err(ReportError::Config("number of bins must be at least 1".into()));
        }
        let (mut first, mut last) = range;
        if !(first.is_finite() && last.is_finite()) || first > last {
            return Err(ReportError::Config(format!(
                "histogram range [{}, {}] is not a finite interval",
                first, last
            )));
        }
        if first == last {
            first -= 0.5;
            last += 0.5;
        }

        let step = (last - first) / n_bins as f64;
        let mut edges: Vec<f64> = (0..=n_bins).map(|i| first + i as f64 * step).collect();
        edges[n_bins] = last;

        let norm = n_bins as f64 / (last - first);
        let mut counts = vec![0u64; n_bins];
        for &x in values {
            if !(x >= first && x <= last) {
                continue;
            }
            let mut bin = (((x - first) * norm) as usize).min(n_bins - 1);

            // The division can land one bin off near an edge; settle it against the edges
            if x < edges[bin] && bin > 0 {
                bin -= 1;
            } else if bin + 1 < n_bins && x >= edges[bin + 1] {
                bin += 1;
            }
            counts[bin] += 1;
        }

        Ok(Histogram { edges, counts })
    }

    pub fn n_bins(&self) -> usize {
        self.counts.len()
    }

    pub fn edges(&self) -> &[f64] {
        &self.edges
    }

    pub fn counts(&self) -> &[u64] {
        &self.counts
    }

    pub fn range(&self) -> (f64, f64) {
        (self.edges[0], self.edges[self.edges.len() - 1])
    }

    pub fn total(&self) -> u64 {
        self.counts.iter().sum()
    }

    pub fn max_count(&self) -> u64 {
        self.counts.iter().copied().max().unwrap_or(0)
    }

    pub fn bins(&self) -> impl Iterator<Item = Bin> + '_ {
        self.counts.iter().enumerate().map(move |(i, &count)| Bin {
            lower: self.edges[i],
            upper: self.edges[i + 1],
            count,
        })
    }
}

// Writes one line per bin: the lower edge, the count, and a bar of '#'
// characters scaled so that the fullest bin is `n_columns` wide.
pub fn print_histogram(out: &mut impl Write, hist: &Histogram, n_columns: usize) -> std::io::Result<()> {
    let max_counter = hist.max_count();

    for bin in hist.bins() {
        let n_chars = if max_counter == 0 {
            0
        } else {
            ((bin.count as f64 / max_counter as f64) * n_columns as f64) as usize
        };
        write!(out, "{:.4}\t{}\t", bin.lower, bin.count)?;
        out.write_all(vec![b'#'; n_chars].as_slice())?;
        writeln!(out)?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::{Rng, SeedableRng};
    use rand_chacha::ChaCha8Rng;

    #[test]
    fn test_counts_sum_to_input_length() {
        let mut rng = ChaCha8Rng::seed_from_u64(860);
        let values: Vec<f64> = (0..860).map(|_| rng.random_range(0.0..6.0)).collect();

        let hist = Histogram::from_values(&values, 20).unwrap();
        assert_eq!(hist.n_bins(), 20);
        assert_eq!(hist.edges().len(), 21);
        assert_eq!(hist.total(), 860);
    }

    #[test]
    fn test_range_follows_data() {
        let values = [1.0, 1.0, 2.5, 2.5, 2.5, 5.9];
        let hist = Histogram::from_values(&values, 20).unwrap();

        assert_eq!(hist.range(), (1.0, 5.9));
        assert_eq!(hist.counts()[0], 2);
        assert_eq!(hist.counts()[6], 3);
        assert_eq!(hist.counts()[19], 1);
        assert_eq!(hist.total(), 6);
    }

    #[test]
    fn test_max_value_lands_in_last_bin() {
        let hist = Histogram::from_values(&[0.0, 10.0], 5).unwrap();
        assert_eq!(hist.counts(), &[1, 0, 0, 0, 1]);
        assert_eq!(hist.edges(), &[0.0, 2.0, 4.0, 6.0, 8.0, 10.0]);
    }

    #[test]
    fn test_values_on_inner_edges_go_right() {
        let hist = Histogram::from_values(&[0.0, 1.0, 2.0, 3.0, 4.0], 4).unwrap();
        assert_eq!(hist.counts(), &[1, 1, 1, 2]);
    }

    #[test]
    fn test_constant_input_widens_range() {
        let hist = Histogram::from_values(&[3.0, 3.0, 3.0], 2).unwrap();
        assert_eq!(hist.range(), (2.5, 3.5));
        assert_eq!(hist.counts(), &[0, 3]);
    }

    #[test]
    fn test_empty_input() {
        let hist = Histogram::from_values(&[], 20).unwrap();
        assert_eq!(hist.range(), (0.0, 1.0));
        assert_eq!(hist.total(), 0);
        assert_eq!(hist.max_count(), 0);
    }

    #[test]
    fn test_explicit_range_drops_outliers() {
        let hist = Histogram::with_range(&[-1.0, 0.5, 1.5, 7.0], 2, (0.0, 2.0)).unwrap();
        assert_eq!(hist.counts(), &[1, 1]);
    }

    #[test]
    fn test_zero_bins_is_an_error() {
        assert!(matches!(
            Histogram::from_values(&[1.0], 0),
            Err(ReportError::Config(_))
        ));
    }

    #[test]
    fn test_deterministic() {
        let values = [0.3, 1.7, 2.2, 2.2, 5.1, 0.9];
        assert_eq!(
            Histogram::from_values(&values, 20).unwrap(),
            Histogram::from_values(&values, 20).unwrap()
        );
    }

    #[test]
    fn test_print_histogram() {
        let hist = Histogram::from_values(&[0.0, 0.0, 1.0, 2.0], 2).unwrap();
        let mut out = Vec::new();
        print_histogram(&mut out, &hist, 4).unwrap();
        let text = String::from_utf8(out).unwrap();
        assert_eq!(text, "0.0000\t2\t####\n1.0000\t2\t####\n");
    }
}

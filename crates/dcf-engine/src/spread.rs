//! Credit spread from interest coverage, via the synthetic-rating method.

/// Spread applied when no table row matches. Only reachable for NaN
/// coverage; the table itself spans the whole real line.
const DISTRESSED_SPREAD: f64 = 0.1512;

/// Spread buckets keyed by interest-coverage ratio: (lower bound exclusive,
/// upper bound inclusive, spread, synthetic rating). Scanned in order; a
/// boundary value belongs to the bucket it closes (upper bound inclusive).
const SPREAD_TABLE: &[(f64, f64, f64, &str)] = &[
    (8.5, f64::INFINITY, 0.0063, "AAA"),
    (6.5, 8.5, 0.0078, "AA"),
    (5.5, 6.5, 0.0098, "A+"),
    (4.25, 5.5, 0.0108, "A"),
    (3.0, 4.25, 0.0122, "A-"),
    (2.5, 3.0, 0.0156, "BBB"),
    (2.25, 2.5, 0.0200, "BB+"),
    (2.0, 2.25, 0.0240, "BB"),
    (1.75, 2.0, 0.0351, "B+"),
    (1.5, 1.75, 0.0421, "B"),
    (1.25, 1.5, 0.0515, "B-"),
    (0.8, 1.25, 0.0820, "CCC"),
    (0.65, 0.8, 0.0864, "CC"),
    (0.2, 0.65, 0.1134, "C"),
    (f64::NEG_INFINITY, 0.2, DISTRESSED_SPREAD, "D"),
];

/// Credit spread for an interest-coverage ratio. Total over the real line;
/// negative coverage lands in the lowest bucket.
pub fn credit_spread(interest_coverage: f64) -> f64 {
    lookup(interest_coverage).map_or(DISTRESSED_SPREAD, |row| row.2)
}

/// Synthetic credit rating implied by an interest-coverage ratio.
pub fn synthetic_rating(interest_coverage: f64) -> &'static str {
    lookup(interest_coverage).map_or("D", |row| row.3)
}

fn lookup(interest_coverage: f64) -> Option<&'static (f64, f64, f64, &'static str)> {
    SPREAD_TABLE
        .iter()
        .find(|(lower, upper, _, _)| interest_coverage > *lower && interest_coverage <= *upper)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn boundary_values_follow_upper_inclusive_buckets() {
        // Each documented boundary is the inclusive upper edge of its bucket.
        let boundaries = [
            (8.5, 0.0078),
            (6.5, 0.0098),
            (5.5, 0.0108),
            (4.25, 0.0122),
            (3.0, 0.0156),
            (2.5, 0.0200),
            (2.25, 0.0240),
            (2.0, 0.0351),
            (1.75, 0.0421),
            (1.5, 0.0515),
            (1.25, 0.0820),
            (0.8, 0.0864),
            (0.65, 0.1134),
            (0.2, 0.1512),
        ];
        for (coverage, expected) in boundaries {
            assert_eq!(credit_spread(coverage), expected, "coverage {coverage}");
        }
        assert_eq!(credit_spread(8.6), 0.0063);
    }

    #[test]
    fn spread_is_monotonically_non_increasing_in_coverage() {
        let mut coverage = -5.0;
        let mut previous = credit_spread(coverage);
        while coverage < 10.0 {
            coverage += 0.01;
            let spread = credit_spread(coverage);
            assert!(
                spread <= previous,
                "spread rose from {previous} to {spread} at coverage {coverage}"
            );
            previous = spread;
        }
    }

    #[test]
    fn total_over_the_real_line() {
        assert_eq!(credit_spread(-3.0), 0.1512);
        assert_eq!(credit_spread(0.0), 0.1512);
        assert_eq!(credit_spread(1_000_000.0), 0.0063);
    }

    #[test]
    fn ratings_track_buckets() {
        assert_eq!(synthetic_rating(18.0), "AAA");
        assert_eq!(synthetic_rating(2.3), "BB");
        assert_eq!(synthetic_rating(-1.0), "D");
    }
}

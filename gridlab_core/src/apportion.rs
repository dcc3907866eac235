//! Largest-remainder apportionment of molar fractions onto grid cells.

/// Converts percentage shares into integer cell counts.
///
/// Each share gets `floor(p / 100 * total)` cells; the leftover units (the
/// rounded difference between the exact and the floored sums) go one each to
/// the shares with the largest fractional remainder, ties broken by position.
///
/// When `percentages` sum to 100 the counts sum to exactly `total`. Zero,
/// negative and non-finite percentages count as 0. Never panics.
pub fn calculate_fractions(total: u64, percentages: &[f64]) -> Vec<u64> {
    let exact: Vec<f64> = percentages
        .iter()
        .map(|&p| if p.is_finite() && p > 0.0 { p * total as f64 / 100.0 } else { 0.0 })
        .collect();

    let mut counts: Vec<u64> = exact.iter().map(|share| share.floor() as u64).collect();

    let exact_sum: f64 = exact.iter().sum();
    let floor_sum: f64 = exact.iter().map(|share| share.floor()).sum();
    let leftover = (exact_sum - floor_sum).round().max(0.0) as usize;
    if leftover == 0 {
        return counts;
    }

    // Stable sort keeps index order among equal remainders
    let mut ranking: Vec<usize> = (0..exact.len()).collect();
    ranking.sort_by(|&a, &b| {
        let ra = exact[a] - exact[a].floor();
        let rb = exact[b] - exact[b].floor();
        rb.total_cmp(&ra)
    });

    for &index in ranking.iter().take(leftover) {
        counts[index] += 1;
    }

    counts
}

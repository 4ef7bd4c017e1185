//! Groupings of signal regions for [`aggregate_me`](super::aggregate_me).
//!
//! [`aggregate_by_corrs`] is a greedy clustering: it processes region pairs by decreasing
//! correlation and grows groups first-fit. The result depends on the pair order and is not
//! optimal in any sense; it is kept deterministic (ties broken by index) so that the same
//! matrix always yields the same groups.
use itertools::Itertools;

use crate::{
    constants::{Aggregation, CovarianceMatrix},
    covariance::correlations,
    massplane_errors::MassPlaneError,
};

/// Parameters of [`aggregate_by_corrs`].
///
/// `drops` and `exclusives` use the same indexing as the output (`zero_indexed`).
#[derive(Debug, Clone, PartialEq)]
pub struct CorrelationAggregation {
    /// Pairs below this correlation are never grouped.
    pub cutoff: f64,
    /// A group reaching this size is closed.
    pub max_group_size: usize,
    /// Regions left out of the output.
    pub drops: Vec<usize>,
    /// Regions always kept alone.
    pub exclusives: Vec<usize>,
    pub zero_indexed: bool,
}

impl Default for CorrelationAggregation {
    fn default() -> Self {
        CorrelationAggregation {
            cutoff: 0.5,
            max_group_size: 5,
            drops: Vec::new(),
            exclusives: Vec::new(),
            zero_indexed: false,
        }
    }
}

/// Group strongly correlated signal regions.
///
/// Pairs `(i, j)` are visited by decreasing correlation, ties by index. The visit stops at
/// the first pair below `cutoff`. A pair touching a dropped, exclusive or closed region is
/// skipped; otherwise both regions join the group of whichever is already grouped, or start
/// a new group. Pairs whose regions already sit in two different groups are skipped. A group
/// reaching `max_group_size` is closed. Ungrouped regions end up alone.
///
/// Return
/// ----------
/// * Groups sorted by their first member, members sorted, 0- or 1-based.
/// * [`MassPlaneError::AggregationIndex`] for a drop or exclusive index outside the matrix,
///   [`MassPlaneError::InvalidCovarianceParameter`] for a non-positive variance.
pub fn aggregate_by_corrs(
    covariance: &CovarianceMatrix,
    params: &CorrelationAggregation,
) -> Result<Aggregation, MassPlaneError> {
    let n = covariance.len();
    let offset = usize::from(!params.zero_indexed);
    let to_internal = |index: usize| {
        index
            .checked_sub(offset)
            .filter(|i| *i < n)
            .ok_or(MassPlaneError::AggregationIndex { index, size: n })
    };
    let mut skipped = vec![false; n];
    let mut dropped = vec![false; n];
    for &index in &params.drops {
        let i = to_internal(index)?;
        dropped[i] = true;
        skipped[i] = true;
    }
    for &index in &params.exclusives {
        skipped[to_internal(index)?] = true;
    }
    if let Some(i) = (0..n).find(|i| covariance[*i][*i] <= 0.0) {
        return Err(MassPlaneError::InvalidCovarianceParameter(format!(
            "variance of region {} is not positive",
            i + offset
        )));
    }

    let corr = correlations(covariance);
    let pairs: Vec<(usize, usize)> = (0..n)
        .tuple_combinations::<(usize, usize)>()
        .sorted_by(|a, b| {
            corr[b.0][b.1]
                .total_cmp(&corr[a.0][a.1])
                .then_with(|| a.cmp(b))
        })
        .collect();

    let mut groups: Vec<Vec<usize>> = Vec::new();
    let mut group_of: Vec<Option<usize>> = vec![None; n];
    let mut closed = vec![false; n];
    for (i, j) in pairs {
        if corr[i][j] < params.cutoff {
            break;
        }
        if skipped[i] || skipped[j] || closed[i] || closed[j] {
            continue;
        }
        let g = match (group_of[i], group_of[j]) {
            (None, None) => {
                if params.max_group_size < 2 {
                    continue;
                }
                groups.push(vec![i, j]);
                groups.len() - 1
            }
            (Some(g), None) => {
                groups[g].push(j);
                g
            }
            (None, Some(g)) => {
                groups[g].push(i);
                g
            }
            (Some(_), Some(_)) => continue,
        };
        for &member in &groups[g] {
            group_of[member] = Some(g);
        }
        if groups[g].len() >= params.max_group_size {
            for &member in &groups[g] {
                closed[member] = true;
            }
        }
    }

    let singletons = (0..n)
        .filter(|i| group_of[*i].is_none() && !dropped[*i])
        .map(|i| vec![i]);
    let mut aggregation: Aggregation = groups.into_iter().chain(singletons).collect();
    for group in aggregation.iter_mut() {
        group.sort_unstable();
        for i in group.iter_mut() {
            *i += offset;
        }
    }
    aggregation.sort_by_key(|g| g[0]);
    log::debug!("aggregated {n} signal regions into {}", aggregation.len());
    Ok(aggregation)
}

/// All `n` regions in a single group.
pub fn aggregate_to_one(n: usize, zero_indexed: bool) -> Aggregation {
    let offset = usize::from(!zero_indexed);
    vec![(offset..n + offset).collect()]
}

#[cfg(test)]
mod aggregators_test {
    use super::*;

    /// Unit variances, so the matrix is its own correlation matrix.
    fn correlated() -> CovarianceMatrix {
        vec![
            vec![1.0, 0.9, 0.1, 0.0],
            vec![0.9, 1.0, 0.6, 0.0],
            vec![0.1, 0.6, 1.0, 0.8],
            vec![0.0, 0.0, 0.8, 1.0],
        ]
    }

    #[test]
    fn test_greedy_order() {
        // (0,1) 0.9 opens a group, (2,3) 0.8 opens another, (1,2) 0.6 joins two groups: skipped
        let groups =
            aggregate_by_corrs(&correlated(), &CorrelationAggregation::default()).unwrap();
        assert_eq!(groups, vec![vec![1, 2], vec![3, 4]]);

        let params = CorrelationAggregation {
            cutoff: 0.85,
            zero_indexed: true,
            ..Default::default()
        };
        assert_eq!(
            aggregate_by_corrs(&correlated(), &params).unwrap(),
            vec![vec![0, 1], vec![2], vec![3]]
        );
    }

    #[test]
    fn test_group_size_and_exclusions() {
        let params = CorrelationAggregation {
            max_group_size: 2,
            exclusives: vec![4],
            ..Default::default()
        };
        // (0,1) closes at size 2, the other pairs touch region 4 or a closed region
        assert_eq!(
            aggregate_by_corrs(&correlated(), &params).unwrap(),
            vec![vec![1, 2], vec![3], vec![4]]
        );

        let params = CorrelationAggregation {
            drops: vec![1],
            ..Default::default()
        };
        // (2,3) opens a group that (1,2) then extends
        assert_eq!(
            aggregate_by_corrs(&correlated(), &params).unwrap(),
            vec![vec![2, 3, 4]]
        );

        let params = CorrelationAggregation {
            drops: vec![0],
            ..Default::default()
        };
        assert_eq!(
            aggregate_by_corrs(&correlated(), &params),
            Err(MassPlaneError::AggregationIndex { index: 0, size: 4 })
        );
    }

    #[test]
    fn test_aggregate_to_one() {
        assert_eq!(aggregate_to_one(3, false), vec![vec![1, 2, 3]]);
        assert_eq!(aggregate_to_one(2, true), vec![vec![0, 1]]);
    }
}

//! 按统计量对簇排序.

use std::str::FromStr;

use ndarray::ArrayView1;
use ordered_float::OrderedFloat;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use super::Cluster;
use crate::error::{MvpaError, MvpaResult};

/// 簇的统计量.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash, Default)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum ClusterStat {
    /// 特征个数.
    #[default]
    Size,

    /// 统计值之和.
    Sum,

    /// 统计值绝对值之和.
    AbsSum,

    /// 统计值的最大值.
    Max,
}

impl FromStr for ClusterStat {
    type Err = MvpaError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "size" => Ok(Self::Size),
            "sum" => Ok(Self::Sum),
            "abs_sum" => Ok(Self::AbsSum),
            "max" => Ok(Self::Max),
            _ => Err(MvpaError::UnknownMethod(s.to_string())),
        }
    }
}

impl ClusterStat {
    fn score(self, cluster: &Cluster, stat_values: ArrayView1<'_, f64>) -> f64 {
        let it = cluster.features().iter().map(|&f| stat_values[f]);
        match self {
            Self::Size => cluster.len() as f64,
            Self::Sum => it.sum(),
            Self::AbsSum => it.map(f64::abs).sum(),
            Self::Max => it.fold(f64::NEG_INFINITY, f64::max),
        }
    }
}

/// 带有统计量的簇.
#[derive(Debug, Clone, PartialEq)]
pub struct RankedCluster {
    /// 统计量.
    pub score: f64,

    /// 簇.
    pub cluster: Cluster,
}

/// 按统计量 `stat` 降序排列 `clusters`. 统计量由 `stat_values` (每个特征一个值) 计算.
///
/// 排序是稳定的, 统计量相同的簇保持输入顺序.
///
/// # 返回值
///
/// 1. 若簇中的特征索引超出 `stat_values` 的范围, 返回 `Err(MvpaError::DimensionMismatch)`;
/// 2. 若簇所用的统计值非有限, 返回 `Err(MvpaError::InvalidInput)`.
pub fn rank_clusters(
    clusters: Vec<Cluster>,
    stat_values: ArrayView1<'_, f64>,
    stat: ClusterStat,
) -> MvpaResult<Vec<RankedCluster>> {
    let n = stat_values.len();
    let mut ans = Vec::with_capacity(clusters.len());
    for cluster in clusters {
        if let Some(&f) = cluster.features().iter().find(|&&f| f >= n) {
            return Err(MvpaError::DimensionMismatch {
                expected: f + 1,
                got: n,
            });
        }
        if let Some(&f) = cluster
            .features()
            .iter()
            .find(|&&f| !stat_values[f].is_finite())
        {
            return Err(MvpaError::InvalidInput(format!(
                "statistic of feature {f} is not finite"
            )));
        }
        let score = stat.score(&cluster, stat_values);
        ans.push(RankedCluster { score, cluster });
    }
    ans.sort_by_key(|r| std::cmp::Reverse(OrderedFloat(r.score)));
    Ok(ans)
}

/// 把簇转换为逐特征的标签: 不属于任何簇的特征为 0,
/// 属于第 `i` 个簇的特征为 `i + 1`.
///
/// 若簇中的特征索引 `>= n_features`, 返回 `Err(MvpaError::DimensionMismatch)`.
pub fn label_map<'a, I>(clusters: I, n_features: usize) -> MvpaResult<Vec<usize>>
where
    I: IntoIterator<Item = &'a Cluster>,
{
    let mut ans = vec![0; n_features];
    for (i, c) in clusters.into_iter().enumerate() {
        for &f in c.features() {
            let Some(slot) = ans.get_mut(f) else {
                return Err(MvpaError::DimensionMismatch {
                    expected: f + 1,
                    got: n_features,
                });
            };
            *slot = i + 1;
        }
    }
    Ok(ans)
}

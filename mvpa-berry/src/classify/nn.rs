use std::collections::HashMap;

use ndarray::{ArrayView1, ArrayView2};
use ordered_float::OrderedFloat;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use super::{check_inputs, Classifier};
use crate::error::{MvpaError, MvpaResult};

/// k 近邻分类器的配置.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct NnConfig {
    k: usize,
}

impl NnConfig {
    /// 以近邻个数 `k` 构建配置. `k == 0` 时返回 `Err(InvalidInput)`.
    pub fn new(k: usize) -> MvpaResult<Self> {
        if k == 0 {
            return Err(MvpaError::InvalidInput("k must be at least 1".into()));
        }
        Ok(Self { k })
    }

    /// 近邻个数.
    #[inline]
    pub fn k(&self) -> usize {
        self.k
    }
}

impl Default for NnConfig {
    /// 最近邻 (`k = 1`).
    fn default() -> Self {
        Self { k: 1 }
    }
}

/// 欧氏距离 k 近邻分类器.
///
/// 取最近的 `k` 个训练样本投票 (`k` 超过训练集大小时取全部).
/// 得票相同时, 选择其中距离测试样本最近的训练样本所属的类别.
/// 距离相同的训练样本按原顺序排列.
#[derive(Copy, Clone, Debug, Default)]
pub struct NearestNeighbor {
    /// 配置.
    pub config: NnConfig,
}

impl NearestNeighbor {
    /// 由配置构建分类器.
    #[inline]
    pub fn new(config: NnConfig) -> Self {
        Self { config }
    }
}

#[inline]
fn sq_dist(a: ArrayView1<'_, f64>, b: ArrayView1<'_, f64>) -> f64 {
    a.iter().zip(b.iter()).map(|(x, y)| (x - y) * (x - y)).sum()
}

impl Classifier for NearestNeighbor {
    fn classify(
        &self,
        train: ArrayView2<'_, f64>,
        targets: &[i32],
        test: ArrayView2<'_, f64>,
    ) -> MvpaResult<Vec<i32>> {
        check_inputs(train, targets, test)?;
        let k = self.config.k.min(train.nrows());

        let mut ans = Vec::with_capacity(test.nrows());
        let mut order: Vec<(OrderedFloat<f64>, usize)> = Vec::with_capacity(train.nrows());
        let mut votes: HashMap<i32, (usize, usize)> = HashMap::new();
        for t in test.rows() {
            order.clear();
            order.extend(
                train
                    .rows()
                    .into_iter()
                    .enumerate()
                    .map(|(i, r)| (OrderedFloat(sq_dist(r, t)), i)),
            );
            order.sort_unstable();

            // 类别 -> (票数, 该类最近样本的名次).
            votes.clear();
            for (rank, &(_, i)) in order[..k].iter().enumerate() {
                votes.entry(targets[i]).or_insert((0, rank)).0 += 1;
            }
            let label = votes
                .iter()
                .max_by_key(|(_, v)| (v.0, std::cmp::Reverse(v.1)))
                .map(|(&label, _)| label)
                .unwrap_or_else(|| unreachable!("k >= 1"));
            ans.push(label);
        }
        Ok(ans)
    }
}

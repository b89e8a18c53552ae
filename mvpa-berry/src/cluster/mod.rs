//! 空间聚类.
//!
//! 在任意邻域关系上求 "活跃" 特征的连通分量. 两个特征属于同一个簇,
//! 当且仅当存在一条沿邻域关系的路径连接二者, 且路径上所有特征
//! (包括两端) 的值都相等且非零. 布尔输入中, "相等且非零" 即 "都为真".
//!
//! 邻域关系按无向图处理: 只要 `b` 是 `a` 的邻居, 或 `a` 是 `b` 的邻居,
//! 二者就视为相邻.

use std::borrow::Cow;
use std::collections::VecDeque;

use either::Either;
use ndarray::{Array1, ArrayView1, ArrayView2, ArrayViewD, Axis, Ix1, Ix2};
use ordered_float::OrderedFloat;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::error::{MvpaError, MvpaResult};
use crate::neighborhood::Neighborhood;

mod rank;

pub use rank::{label_map, rank_clusters, ClusterStat, RankedCluster};

cfg_if::cfg_if! {
    if #[cfg(feature = "rayon")] {
        use rayon::iter::{IntoParallelIterator, ParallelIterator};
    }
}

/// 一个簇: 值相同且相互连通的特征的极大集合.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Cluster {
    value: f64,
    features: Vec<usize>,
}

impl Cluster {
    /// 簇内特征共有的值.
    #[inline]
    pub fn value(&self) -> f64 {
        self.value
    }

    /// 簇内特征索引, 升序.
    #[inline]
    pub fn features(&self) -> &[usize] {
        &self.features
    }

    /// 簇的大小.
    #[inline]
    pub fn len(&self) -> usize {
        self.features.len()
    }

    /// 簇不会为空, 该方法总是返回 `false`.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.features.is_empty()
    }
}

/// 对单行特征值 `values` 聚类.
///
/// # 返回值
///
/// 按 `(簇的值, 簇内最小特征索引)` 升序排列的所有簇. 对相同输入, 输出总是相同.
///
/// 1. `values.len() != nh.len()` 时返回 `Err(MvpaError::DimensionMismatch)`;
/// 2. `values` 含非有限值时返回 `Err(MvpaError::InvalidInput)`.
pub fn clusterize(values: ArrayView1<'_, f64>, nh: &Neighborhood) -> MvpaResult<Vec<Cluster>> {
    check_len(values.len(), nh)?;
    let nh = undirected(nh);
    let ans = clusterize_row(values, &nh)?;
    log::debug!("{} clusters over {} features", ans.len(), values.len());
    Ok(ans)
}

/// 对布尔掩码聚类. 所有簇的值均为 `1.0`.
///
/// `mask.len() != nh.len()` 时返回 `Err(MvpaError::DimensionMismatch)`.
pub fn clusterize_mask(mask: &[bool], nh: &Neighborhood) -> MvpaResult<Vec<Cluster>> {
    let values: Array1<f64> = mask.iter().map(|&m| if m { 1.0 } else { 0.0 }).collect();
    clusterize(values.view(), nh)
}

/// 对 `values` 的每一行 (样本) 独立聚类.
///
/// 打开 `rayon` feature 时各行并行处理, 结果顺序与串行一致.
/// 错误规则同 [`clusterize`], 其中长度指列数.
pub fn clusterize_rows(
    values: ArrayView2<'_, f64>,
    nh: &Neighborhood,
) -> MvpaResult<Vec<Vec<Cluster>>> {
    check_len(values.ncols(), nh)?;
    let nh = undirected(nh);
    let nh = nh.as_ref();

    #[cfg(feature = "rayon")]
    let rows = values.axis_iter(Axis(0)).into_par_iter();
    #[cfg(not(feature = "rayon"))]
    let rows = values.axis_iter(Axis(0));

    rows.map(|row| clusterize_row(row, nh)).collect()
}

/// 根据 `values` 的维数选择 [`clusterize`] (一维) 或 [`clusterize_rows`] (二维).
///
/// 其它维数返回 `Err(MvpaError::InvalidInput)`.
pub fn clusterize_dyn(
    values: ArrayViewD<'_, f64>,
    nh: &Neighborhood,
) -> MvpaResult<Either<Vec<Cluster>, Vec<Vec<Cluster>>>> {
    let to_invalid = |e: ndarray::ShapeError| MvpaError::InvalidInput(e.to_string());
    match values.ndim() {
        1 => {
            let v = values.into_dimensionality::<Ix1>().map_err(to_invalid)?;
            clusterize(v, nh).map(Either::Left)
        }
        2 => {
            let v = values.into_dimensionality::<Ix2>().map_err(to_invalid)?;
            clusterize_rows(v, nh).map(Either::Right)
        }
        n => Err(MvpaError::InvalidInput(format!(
            "cluster values must be a vector or a matrix, got {n} dimension(s)"
        ))),
    }
}

#[inline]
fn check_len(len: usize, nh: &Neighborhood) -> MvpaResult<()> {
    if len != nh.len() {
        return Err(MvpaError::DimensionMismatch {
            expected: nh.len(),
            got: len,
        });
    }
    Ok(())
}

/// 对称的邻域关系可以直接使用.
#[inline]
fn undirected(nh: &Neighborhood) -> Cow<'_, Neighborhood> {
    match nh.is_symmetric() {
        true => Cow::Borrowed(nh),
        false => Cow::Owned(nh.symmetrized()),
    }
}

/// 在对称邻域 `nh` 上做 bfs. 种子按特征索引升序选取,
/// 因此得到的簇天然按最小特征索引排列, 最后按值稳定排序.
fn clusterize_row(values: ArrayView1<'_, f64>, nh: &Neighborhood) -> MvpaResult<Vec<Cluster>> {
    if let Some((f, v)) = values.iter().enumerate().find(|(_, v)| !v.is_finite()) {
        return Err(MvpaError::InvalidInput(format!(
            "feature {f} has non-finite value {v}"
        )));
    }

    let mut ans = Vec::new();
    let mut visited = vec![false; values.len()];
    let mut bfs_q = VecDeque::with_capacity(16);

    for seed in 0..values.len() {
        let value = values[seed];
        if visited[seed] || value == 0.0 {
            continue;
        }
        visited[seed] = true;
        bfs_q.push_back(seed);
        let mut features = Vec::with_capacity(1);
        while let Some(cur) = bfs_q.pop_front() {
            features.push(cur);
            for &n in nh.neighbors(cur) {
                if !visited[n] && values[n] == value {
                    visited[n] = true;
                    bfs_q.push_back(n);
                }
            }
        }
        features.sort_unstable();
        ans.push(Cluster { value, features });
    }

    ans.sort_by_key(|c| OrderedFloat(c.value));
    Ok(ans)
}

#[cfg(test)]
mod tests {
    use super::{clusterize, clusterize_dyn, clusterize_mask, clusterize_rows};
    use crate::data::{Affine, VolumeGeometry};
    use crate::error::MvpaError;
    use crate::neighborhood::{voxel_grid, Connectivity, GridConfig, Neighborhood};
    use ndarray::{array, Array1, Array3, IxDyn};
    use std::collections::HashSet;

    /// 0-1-2 相连, 3 孤立, 4-5 相连.
    fn chain() -> Neighborhood {
        Neighborhood::from_lists(&[vec![1], vec![0, 2], vec![1], vec![], vec![5], vec![4]])
            .unwrap()
    }

    #[test]
    fn test_two_adjacent_features() {
        // 1 与 2 互为邻居, 与其它特征隔离.
        let nh = Neighborhood::from_lists(&[vec![], vec![2], vec![1], vec![]]).unwrap();
        let ans = clusterize_mask(&[false, true, true, false], &nh).unwrap();
        assert_eq!(ans.len(), 1);
        assert_eq!(ans[0].features(), &[1, 2]);
        assert_eq!(ans[0].value(), 1.0);
    }

    #[test]
    fn test_all_false() {
        let ans = clusterize_mask(&[false; 6], &chain()).unwrap();
        assert!(ans.is_empty());
    }

    #[test]
    fn test_length_mismatch() {
        let e = clusterize_mask(&[true; 5], &chain()).unwrap_err();
        assert!(matches!(
            e,
            MvpaError::DimensionMismatch {
                expected: 6,
                got: 5
            }
        ));
        let e = clusterize_rows(ndarray::Array2::zeros((2, 7)).view(), &chain()).unwrap_err();
        assert!(matches!(e, MvpaError::DimensionMismatch { .. }));
    }

    #[test]
    fn test_multi_valued_order() {
        let values = array![2.0, 2.0, 1.0, 1.0, -1.0, 2.0];
        let ans = clusterize(values.view(), &chain()).unwrap();
        let got: Vec<(f64, Vec<usize>)> = ans
            .iter()
            .map(|c| (c.value(), c.features().to_vec()))
            .collect();
        assert_eq!(
            got,
            vec![
                (-1.0, vec![4]),
                (1.0, vec![2]),
                (1.0, vec![3]),
                (2.0, vec![0, 1]),
                (2.0, vec![5]),
            ]
        );
    }

    #[test]
    fn test_directed_edges() {
        // 只有 0 -> 1 一条有向边, 仍视为相邻.
        let nh = Neighborhood::from_lists(&[vec![1], vec![], vec![]]).unwrap();
        let ans = clusterize_mask(&[true, true, true], &nh).unwrap();
        assert_eq!(ans.len(), 2);
        assert_eq!(ans[0].features(), &[0, 1]);
        assert_eq!(ans[1].features(), &[2]);
    }

    #[test]
    fn test_non_finite() {
        let values = array![1.0, f64::NAN, 0.0, 0.0, 0.0, 0.0];
        let e = clusterize(values.view(), &chain()).unwrap_err();
        assert!(matches!(e, MvpaError::InvalidInput(_)));
    }

    #[test]
    fn test_rows_and_dyn() {
        let values = array![
            [1.0, 1.0, 0.0, 1.0, 0.0, 0.0],
            [0.0, 0.0, 0.0, 0.0, 0.0, 0.0],
            [3.0, 3.0, 3.0, 3.0, 3.0, 3.0]
        ];
        let rows = clusterize_rows(values.view(), &chain()).unwrap();
        assert_eq!(rows.iter().map(|r| r.len()).collect::<Vec<_>>(), vec![2, 0, 3]);
        for (i, row) in values.rows().into_iter().enumerate() {
            assert_eq!(clusterize(row, &chain()).unwrap(), rows[i]);
        }

        let d = clusterize_dyn(values.view().into_dyn(), &chain()).unwrap();
        assert_eq!(d.right().unwrap(), rows);

        let d = clusterize_dyn(values.row(0).into_dyn(), &chain()).unwrap();
        assert_eq!(d.left().unwrap(), rows[0]);

        let cube = ndarray::ArrayD::<f64>::zeros(IxDyn(&[1, 1, 6]));
        let e = clusterize_dyn(cube.view(), &chain()).unwrap_err();
        assert!(matches!(e, MvpaError::InvalidInput(_)));
        let scalar = ndarray::ArrayD::<f64>::zeros(IxDyn(&[]));
        assert!(clusterize_dyn(scalar.view(), &chain()).is_err());
    }

    #[test]
    fn test_two_blobs_in_volume() {
        let g = VolumeGeometry::dense((4, 4, 4), Affine::identity());
        let mut vol = Array3::<f64>::zeros((4, 4, 4));
        vol[(0, 0, 0)] = 5.0;
        vol[(1, 0, 0)] = 5.0;
        vol[(3, 3, 2)] = 4.0;
        vol[(3, 3, 3)] = 4.5;
        let mask: Vec<bool> = g.voxels().iter().map(|v| vol[*v] > 3.0).collect();

        let nh = voxel_grid(&g, &GridConfig::new(Connectivity::Face));
        let ans = clusterize_mask(&mask, &nh).unwrap();
        assert_eq!(ans.len(), 2);
        assert!(ans.iter().all(|c| c.len() == 2));
        let all: HashSet<usize> = ans.iter().flat_map(|c| c.features().to_vec()).collect();
        assert_eq!(all.len(), 4);

        let voxels: Vec<_> = ans[0].features().iter().map(|&f| g.voxels()[f]).collect();
        assert_eq!(voxels, vec![(0, 0, 0), (1, 0, 0)]);

        // 原始值不同, 不会连成一个簇.
        let values: Array1<f64> = g.voxels().iter().map(|v| vol[*v]).collect();
        assert_eq!(clusterize(values.view(), &nh).unwrap().len(), 3);
    }
}

//! 体素网格上的邻域关系.

use std::str::FromStr;

use itertools::iproduct;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use super::Neighborhood;
use crate::data::VolumeGeometry;
use crate::error::MvpaError;

/// 三维体素的连通性.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash, Default)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum Connectivity {
    /// 共面, 6-邻域.
    Face,

    /// 共边, 18-邻域.
    Edge,

    /// 共顶点, 26-邻域.
    #[default]
    Vertex,
}

impl Connectivity {
    /// 允许的最大曼哈顿距离. 相邻体素每个坐标之差都在 `[-1, 1]` 内.
    #[inline]
    const fn max_manhattan(self) -> usize {
        match self {
            Self::Face => 1,
            Self::Edge => 2,
            Self::Vertex => 3,
        }
    }

    /// 网格内部一个体素的邻居数.
    #[inline]
    pub const fn neighbor_count(self) -> usize {
        match self {
            Self::Face => 6,
            Self::Edge => 18,
            Self::Vertex => 26,
        }
    }

    /// 所有邻居偏移量.
    fn offsets(self) -> Vec<(isize, isize, isize)> {
        iproduct!(-1isize..=1, -1isize..=1, -1isize..=1)
            .filter(|&(a, b, c)| {
                let d = (a.unsigned_abs()) + (b.unsigned_abs()) + (c.unsigned_abs());
                d > 0 && d <= self.max_manhattan()
            })
            .collect()
    }
}

impl FromStr for Connectivity {
    type Err = MvpaError;

    /// 接受 `face` / `edge` / `vertex`, 或对应的 `1` / `2` / `3`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "face" | "1" => Ok(Self::Face),
            "edge" | "2" => Ok(Self::Edge),
            "vertex" | "3" => Ok(Self::Vertex),
            _ => Err(MvpaError::UnknownMethod(s.to_string())),
        }
    }
}

/// 体素网格邻域的配置.
#[derive(Copy, Clone, Debug, Default, Eq, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct GridConfig {
    /// 连通性, 默认为 26-邻域.
    pub connectivity: Connectivity,
}

impl GridConfig {
    /// 以给定连通性构建配置.
    #[inline]
    pub fn new(connectivity: Connectivity) -> Self {
        Self { connectivity }
    }
}

impl FromStr for GridConfig {
    type Err = MvpaError;

    #[inline]
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Self::new(s.parse()?))
    }
}

/// 在 `geometry` 的体素网格上构建邻域关系.
///
/// 只有同为特征的体素之间才会相邻. 结果总是对称的,
/// 每个特征的邻居按特征索引升序排列.
pub fn voxel_grid(geometry: &VolumeGeometry, config: &GridConfig) -> Neighborhood {
    let lookup = geometry.voxel_lookup();
    let deltas = config.connectivity.offsets();
    let mut offsets = Vec::with_capacity(geometry.n_features() + 1);
    let mut targets = Vec::with_capacity(geometry.n_features() * deltas.len());
    offsets.push(0);

    for &(i, j, k) in geometry.voxels() {
        let start = targets.len();
        for &(di, dj, dk) in deltas.iter() {
            let (Some(ni), Some(nj), Some(nk)) = (
                i.checked_add_signed(di),
                j.checked_add_signed(dj),
                k.checked_add_signed(dk),
            ) else {
                continue;
            };
            if let Some(&f) = lookup.get(&(ni, nj, nk)) {
                targets.push(f);
            }
        }
        targets[start..].sort_unstable();
        offsets.push(targets.len());
    }

    log::debug!(
        "voxel grid neighborhood ({:?}): {} features, {} edges",
        config.connectivity,
        geometry.n_features(),
        targets.len()
    );
    Neighborhood { offsets, targets }
}

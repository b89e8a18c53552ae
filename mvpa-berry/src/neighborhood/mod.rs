//! 特征之间的邻域关系.
//!
//! 邻域关系把每个特征索引映射为与其在空间上相邻的特征索引集合,
//! 是空间聚类所用的邻接图. 按约定它是对称的, 但本模块不强制对称.

use ndarray::ArrayView2;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::error::{MvpaError, MvpaResult};

mod compact;
mod grid;

pub use compact::CompactNeighborhood;
pub use grid::{voxel_grid, Connectivity, GridConfig};

/// 邻域关系, 以压缩行 (CSR) 形式存储.
///
/// 第 `f` 个特征的邻居为 `targets[offsets[f]..offsets[f + 1]]`, 升序且不重复.
///
/// 反序列化时同样完整校验, 非法数据返回错误.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(try_from = "RawNeighborhood"))]
pub struct Neighborhood {
    offsets: Vec<usize>,
    targets: Vec<usize>,
}

/// 未经校验的 CSR 数组, 仅用于反序列化.
#[cfg(feature = "serde")]
#[derive(Deserialize)]
struct RawNeighborhood {
    offsets: Vec<usize>,
    targets: Vec<usize>,
}

#[cfg(feature = "serde")]
impl TryFrom<RawNeighborhood> for Neighborhood {
    type Error = MvpaError;

    fn try_from(raw: RawNeighborhood) -> MvpaResult<Self> {
        Self::from_csr(raw.offsets, raw.targets)
    }
}

impl Neighborhood {
    /// 由邻居列表构建. 第 `f` 个列表为第 `f` 个特征的邻居.
    ///
    /// 每个列表会被排序并去重.
    ///
    /// # 返回值
    ///
    /// 若存在邻居索引 `>= lists.len()`, 返回 `Err(MvpaError::InvalidNeighborhood)`.
    pub fn from_lists<L: AsRef<[usize]>>(lists: &[L]) -> MvpaResult<Self> {
        let n = lists.len();
        let mut offsets = Vec::with_capacity(n + 1);
        let mut targets = Vec::with_capacity(lists.iter().map(|l| l.as_ref().len()).sum());
        offsets.push(0);
        for (f, list) in lists.iter().enumerate() {
            let list = list.as_ref();
            if let Some(bad) = list.iter().find(|&&t| t >= n) {
                return Err(MvpaError::InvalidNeighborhood(format!(
                    "feature {f} lists neighbor {bad}, but there are only {n} features"
                )));
            }
            let start = targets.len();
            targets.extend_from_slice(list);
            targets[start..].sort_unstable();
            let mut kept = start;
            for i in start..targets.len() {
                if kept == start || targets[kept - 1] != targets[i] {
                    targets[kept] = targets[i];
                    kept += 1;
                }
            }
            targets.truncate(kept);
            offsets.push(targets.len());
        }
        Ok(Self { offsets, targets })
    }

    /// 由可能为负的邻居索引列表构建 (例如从外部格式读入的数据).
    ///
    /// 负索引或越界索引返回 `Err(MvpaError::InvalidNeighborhood)`.
    pub fn from_signed_lists<L: AsRef<[i64]>>(lists: &[L]) -> MvpaResult<Self> {
        let lists = lists
            .iter()
            .enumerate()
            .map(|(f, list)| {
                list.as_ref()
                    .iter()
                    .map(|&t| {
                        usize::try_from(t).map_err(|_| {
                            MvpaError::InvalidNeighborhood(format!(
                                "feature {f} lists negative neighbor {t}"
                            ))
                        })
                    })
                    .collect::<MvpaResult<Vec<usize>>>()
            })
            .collect::<MvpaResult<Vec<_>>>()?;
        Self::from_lists(&lists)
    }

    /// 由方阵形式的邻接矩阵构建. `matrix[(a, b)]` 为真表示 `b` 是 `a` 的邻居.
    ///
    /// 矩阵不是方阵时返回 `Err(MvpaError::InvalidNeighborhood)`.
    pub fn from_matrix(matrix: ArrayView2<'_, bool>) -> MvpaResult<Self> {
        let (h, w) = matrix.dim();
        if h != w {
            return Err(MvpaError::InvalidNeighborhood(format!(
                "adjacency matrix must be square, got {h}x{w}"
            )));
        }
        let lists: Vec<Vec<usize>> = matrix
            .rows()
            .into_iter()
            .map(|row| {
                row.iter()
                    .enumerate()
                    .filter_map(|(b, &adj)| adj.then_some(b))
                    .collect()
            })
            .collect();
        Self::from_lists(&lists)
    }

    /// 直接由 CSR 数组构建, 并完整校验.
    pub(crate) fn from_csr(offsets: Vec<usize>, targets: Vec<usize>) -> MvpaResult<Self> {
        let invalid = |msg: &str| Err(MvpaError::InvalidNeighborhood(msg.to_string()));
        let Some(&last) = offsets.last() else {
            return invalid("empty offset table");
        };
        if offsets[0] != 0 || last != targets.len() {
            return invalid("offset table does not cover neighbor table");
        }
        // 先检查整张偏移表, 之后的切片才不会越界.
        if offsets.windows(2).any(|w| w[0] > w[1]) {
            return invalid("offset table is not monotone");
        }
        let n = offsets.len() - 1;
        for w in offsets.windows(2) {
            let list = &targets[w[0]..w[1]];
            if list.iter().any(|&t| t >= n) || list.windows(2).any(|p| p[0] >= p[1]) {
                return invalid("neighbor list is out of range or not strictly ascending");
            }
        }
        Ok(Self { offsets, targets })
    }

    /// 特征个数.
    #[inline]
    pub fn len(&self) -> usize {
        self.offsets.len() - 1
    }

    /// 是否不含任何特征?
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// 有向边的总数.
    #[inline]
    pub fn edge_count(&self) -> usize {
        self.targets.len()
    }

    /// 第 `feature` 个特征的邻居, 升序. 越界时 panic.
    #[inline]
    pub fn neighbors(&self, feature: usize) -> &[usize] {
        &self.targets[self.offsets[feature]..self.offsets[feature + 1]]
    }

    /// 迭代 `(特征索引, 邻居)`.
    pub fn iter(&self) -> impl Iterator<Item = (usize, &[usize])> + '_ {
        (0..self.len()).map(move |f| (f, self.neighbors(f)))
    }

    /// 关系是否对称? 即 `b` 是 `a` 的邻居当且仅当 `a` 是 `b` 的邻居.
    pub fn is_symmetric(&self) -> bool {
        self.iter().all(|(a, ns)| {
            ns.iter()
                .all(|&b| self.neighbors(b).binary_search(&a).is_ok())
        })
    }

    /// 求对称闭包: 若 `b` 是 `a` 的邻居, 则结果中 `a` 也是 `b` 的邻居.
    pub fn symmetrized(&self) -> Self {
        if self.is_symmetric() {
            return self.clone();
        }
        let mut lists: Vec<Vec<usize>> = self.iter().map(|(_, ns)| ns.to_vec()).collect();
        for (a, ns) in self.iter() {
            for &b in ns {
                lists[b].push(a);
            }
        }
        // 索引都来自自身, 不会越界.
        Self::from_lists(&lists).unwrap_or_else(|_| unreachable!())
    }

    /// 压缩存储. 见 [`CompactNeighborhood`].
    pub fn compress(&self) -> MvpaResult<CompactNeighborhood> {
        CompactNeighborhood::new(&self.offsets, &self.targets)
    }
}

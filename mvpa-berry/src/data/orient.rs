//! 体数据的方向代码与方向重排.
//!
//! 方向代码由三个字母组成, 第 `n` 个字母表示第 `n` 个体素索引增大时,
//! 在解剖学意义上移动的方向. 例如 `LPI` 表示 `i` 增大时向左, `j`
//! 增大时向后, `k` 增大时向下.
//!
//! 世界坐标系为 RAS+: `x` 轴正方向向右, `y` 轴正方向向前, `z` 轴正方向向上.
//! 因此单位仿射矩阵对应的方向代码为 `RAS`.

use std::fmt::Formatter;
use std::str::FromStr;

use itertools::iproduct;
use itertools::Itertools;
use nalgebra::Matrix4;
use once_cell::sync::Lazy;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use super::{Affine, VolumeDataset, VolumeGeometry};
use crate::consts::{axis::*, DOMINANCE_RTOL, ORIENTATION_COUNT};
use crate::error::{MvpaError, MvpaResult};

/// 单个体素轴的方向.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum AxisCode {
    /// 向左 (`L`).
    Left,

    /// 向右 (`R`).
    Right,

    /// 向后 (`P`).
    Posterior,

    /// 向前 (`A`).
    Anterior,

    /// 向下 (`I`).
    Inferior,

    /// 向上 (`S`).
    Superior,
}

impl AxisCode {
    /// 从 ASCII 字母解析. 不在字母表中时返回 `None`.
    pub const fn from_letter(c: u8) -> Option<Self> {
        match c {
            LEFT => Some(Self::Left),
            RIGHT => Some(Self::Right),
            POSTERIOR => Some(Self::Posterior),
            ANTERIOR => Some(Self::Anterior),
            INFERIOR => Some(Self::Inferior),
            SUPERIOR => Some(Self::Superior),
            _ => None,
        }
    }

    /// 由世界轴 (0 为 x, 1 为 y, 2 为 z) 和正负方向构建.
    ///
    /// `world_axis >= 3` 时 panic.
    pub const fn from_world(world_axis: usize, positive: bool) -> Self {
        match (world_axis, positive) {
            (0, false) => Self::Left,
            (0, true) => Self::Right,
            (1, false) => Self::Posterior,
            (1, true) => Self::Anterior,
            (2, false) => Self::Inferior,
            (2, true) => Self::Superior,
            _ => panic!("world axis out of range"),
        }
    }

    /// 对应的 ASCII 字母.
    pub const fn letter(self) -> u8 {
        match self {
            Self::Left => LEFT,
            Self::Right => RIGHT,
            Self::Posterior => POSTERIOR,
            Self::Anterior => ANTERIOR,
            Self::Inferior => INFERIOR,
            Self::Superior => SUPERIOR,
        }
    }

    /// 所在的世界轴: 0 为 x (左右), 1 为 y (前后), 2 为 z (上下).
    #[inline]
    pub const fn world_axis(self) -> usize {
        match self {
            Self::Left | Self::Right => 0,
            Self::Posterior | Self::Anterior => 1,
            Self::Inferior | Self::Superior => 2,
        }
    }

    /// 是否指向世界轴正方向?
    #[inline]
    pub const fn is_positive(self) -> bool {
        matches!(self, Self::Right | Self::Anterior | Self::Superior)
    }

    /// 同一世界轴上的相反方向.
    #[inline]
    pub const fn opposite(self) -> Self {
        Self::from_world(self.world_axis(), !self.is_positive())
    }
}

/// 三个体素轴的方向代码, 如 `LPI`, `RAS`.
///
/// 构造时保证三个字母分别落在三个不同的世界轴上, 共 48 种合法取值.
#[derive(Copy, Clone, Eq, PartialEq, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Orientation([AxisCode; 3]);

static ALL_ORIENTATIONS: Lazy<Vec<Orientation>> = Lazy::new(|| {
    let ans: Vec<Orientation> = (0..3)
        .permutations(3)
        .flat_map(|perm| {
            iproduct!([false, true], [false, true], [false, true]).map(move |(s0, s1, s2)| {
                Orientation([
                    AxisCode::from_world(perm[0], s0),
                    AxisCode::from_world(perm[1], s1),
                    AxisCode::from_world(perm[2], s2),
                ])
            })
        })
        .collect();
    debug_assert_eq!(ans.len(), ORIENTATION_COUNT);
    ans
});

/// 压缩为一行, 直接显示方向代码.
impl std::fmt::Debug for Orientation {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "Orientation({self})")
    }
}

impl std::fmt::Display for Orientation {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        for c in self.0 {
            write!(f, "{}", c.letter() as char)?;
        }
        Ok(())
    }
}

impl FromStr for Orientation {
    type Err = MvpaError;

    /// 解析三字母方向代码. 只接受大写字母.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || MvpaError::InvalidOrientation(s.to_string());
        let &[a, b, c] = s.as_bytes() else {
            return Err(invalid());
        };
        let codes = [a, b, c].map(AxisCode::from_letter);
        let [Some(a), Some(b), Some(c)] = codes else {
            return Err(invalid());
        };
        Self::new([a, b, c]).map_err(|_| invalid())
    }
}

impl Orientation {
    /// 由三个轴方向构建. 若有两个方向落在同一世界轴上,
    /// 则返回 `Err(MvpaError::InvalidOrientation)`.
    pub fn new(codes: [AxisCode; 3]) -> MvpaResult<Self> {
        let [a, b, c] = codes.map(AxisCode::world_axis);
        if a == b || b == c || a == c {
            let s: String = codes.iter().map(|c| c.letter() as char).collect();
            return Err(MvpaError::InvalidOrientation(s));
        }
        Ok(Self(codes))
    }

    /// 全部 48 个合法方向代码. 顺序固定: 先按轴排列, 再按符号组合.
    #[inline]
    pub fn all() -> &'static [Orientation] {
        &ALL_ORIENTATIONS
    }

    /// 三个轴方向.
    #[inline]
    pub fn codes(&self) -> [AxisCode; 3] {
        self.0
    }

    /// 由仿射矩阵的旋转部分推导方向代码.
    ///
    /// 对每个体素轴 (仿射矩阵的一列), 绝对值最大的分量所在的世界轴为其主导轴,
    /// 该分量的符号决定方向.
    ///
    /// # 返回值
    ///
    /// 1. 若某一列全为 0, 返回 `Err(MvpaError::InvalidInput)`;
    /// 2. 若某一列的次大分量与最大分量的相对差不超过 `config.dominance_rtol()`,
    ///   或两个体素轴的主导轴相同, 返回 `Err(MvpaError::AmbiguousOrientation)`.
    pub fn from_affine(affine: &Affine, config: &OrientConfig) -> MvpaResult<Self> {
        let mut codes = [AxisCode::Right; 3];
        for (axis, code) in codes.iter_mut().enumerate() {
            let col = affine.column(axis);
            let mags = col.map(f64::abs);
            let (w, m) = mags
                .iter()
                .copied()
                .enumerate()
                .fold((0, 0.0), |acc, cur| if cur.1 > acc.1 { cur } else { acc });
            if m == 0.0 {
                return Err(MvpaError::InvalidInput(format!(
                    "voxel axis {axis} has no world extent"
                )));
            }
            let runner_up = mags
                .iter()
                .enumerate()
                .filter(|(i, _)| *i != w)
                .map(|(_, v)| *v)
                .fold(0.0, f64::max);
            if runner_up >= (1.0 - config.dominance_rtol) * m {
                return Err(MvpaError::AmbiguousOrientation { axis });
            }
            *code = AxisCode::from_world(w, col[w] > 0.0);
        }

        // 主导轴两两不同.
        for (a, b) in (0..3).tuple_combinations() {
            if codes[a].world_axis() == codes[b].world_axis() {
                return Err(MvpaError::AmbiguousOrientation { axis: b });
            }
        }
        Ok(Self(codes))
    }

    /// 求从 `self` 到 `target` 的轴映射.
    ///
    /// 返回值第 `a` 项为 `(b, flip)`: 新的第 `a` 个体素轴来自原第 `b` 个体素轴,
    /// `flip` 表示方向是否反转.
    fn axis_map(&self, target: &Orientation) -> [(usize, bool); 3] {
        target.0.map(|t| {
            let b = self
                .0
                .iter()
                .position(|c| c.world_axis() == t.world_axis())
                .unwrap_or_else(|| unreachable!("orientation covers all world axes"));
            (b, self.0[b] != t)
        })
    }
}

/// 方向推导的配置.
#[derive(Copy, Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct OrientConfig {
    /// 判断主导轴的相对容差, 取值 `[0, 1)`. 默认为 [`DOMINANCE_RTOL`].
    dominance_rtol: f64,
}

impl OrientConfig {
    /// 构建配置. `dominance_rtol` 不在 `[0, 1)` 内时返回 `Err(InvalidInput)`.
    pub fn new(dominance_rtol: f64) -> MvpaResult<Self> {
        if !(0.0..1.0).contains(&dominance_rtol) {
            return Err(MvpaError::InvalidInput(format!(
                "dominance tolerance {dominance_rtol} not in [0, 1)"
            )));
        }
        Ok(Self { dominance_rtol })
    }

    /// 判断主导轴的相对容差.
    #[inline]
    pub fn dominance_rtol(&self) -> f64 {
        self.dominance_rtol
    }
}

impl Default for OrientConfig {
    fn default() -> Self {
        Self {
            dominance_rtol: DOMINANCE_RTOL,
        }
    }
}

/// 将体数据集 `ds` 转换为方向 `target` (三字母方向代码).
///
/// `target` 非法时返回 `Err(MvpaError::InvalidOrientation)`.
/// 其余行为见 [`reorient_to`].
pub fn reorient(ds: &VolumeDataset, target: &str) -> MvpaResult<VolumeDataset> {
    let target: Orientation = target.parse()?;
    reorient_to(ds, target, &OrientConfig::default())
}

/// 将体数据集 `ds` 转换为方向 `target`.
///
/// # 行为
///
/// 1. 新的第 `a` 个体素轴取自与 `target[a]` 同一世界轴的原体素轴 `b`,
///   网格大小 `dims'[a] = dims[b]`;
/// 2. 若方向相反, 体素索引反转: `v'[a] = dims[b] - 1 - v[b]`, 否则 `v'[a] = v[b]`;
/// 3. 新仿射矩阵为 `A * T`, 其中 `T` 把新体素索引映射回原体素索引,
///   因此每个特征的世界坐标保持不变.
///
/// 特征顺序与样本数据不变, 只有每个特征的体素索引和仿射矩阵改变.
/// 因此再转换回原方向时, 数据集与原来完全一致.
///
/// # 返回值
///
/// 无法由仿射矩阵确定当前方向时, 返回 [`Orientation::from_affine`] 的错误.
pub fn reorient_to(
    ds: &VolumeDataset,
    target: Orientation,
    config: &OrientConfig,
) -> MvpaResult<VolumeDataset> {
    let geom = &ds.geometry;
    let current = Orientation::from_affine(geom.affine(), config)?;
    let map = current.axis_map(&target);

    let (di, dj, dk) = geom.dims();
    let old_dims = [di, dj, dk];
    let new_dims = map.map(|(b, _)| old_dims[b]);

    // 新体素索引 -> 原体素索引.
    let mut t = Matrix4::<f64>::zeros();
    t[(3, 3)] = 1.0;
    for (a, &(b, flip)) in map.iter().enumerate() {
        if flip {
            t[(b, a)] = -1.0;
            t[(b, 3)] = old_dims[b] as f64 - 1.0;
        } else {
            t[(b, a)] = 1.0;
        }
    }
    let affine = geom.affine().compose(&t)?;

    let voxels = geom
        .voxels()
        .iter()
        .map(|&(i, j, k)| {
            let old = [i, j, k];
            let [x, y, z] = map.map(|(b, flip)| match flip {
                true => old_dims[b] - 1 - old[b],
                false => old[b],
            });
            (x, y, z)
        })
        .collect();

    log::debug!(
        "reorient {current} -> {target}: dims {:?} -> {:?}",
        geom.dims(),
        new_dims
    );

    let geometry = VolumeGeometry::from_parts_unchecked(
        (new_dims[0], new_dims[1], new_dims[2]),
        affine,
        voxels,
    );
    debug_assert_eq!(
        Orientation::from_affine(geometry.affine(), config).ok(),
        Some(target)
    );
    Ok(VolumeDataset {
        dataset: ds.dataset.clone(),
        geometry,
    })
}

#[cfg(test)]
mod tests {
    use super::{reorient, AxisCode, OrientConfig, Orientation};
    use crate::consts::ORIENTATION_COUNT;
    use crate::data::{Affine, Dataset, VolumeDataset, VolumeGeometry};
    use crate::error::MvpaError;
    use ndarray::Array3;
    use std::collections::HashSet;

    fn f64_eq(a: f64, b: f64) -> bool {
        (a - b).abs() < 1e-5
    }

    /// 4x5x6 的 `LPI` 体数据, 每个体素的值互不相同.
    fn lpi_volume() -> VolumeDataset {
        let affine = Affine::from_spacing([-2.0, -3.0, -4.0], [10.0, 20.0, 30.0]).unwrap();
        let vol = Array3::from_shape_fn((4, 5, 6), |(i, j, k)| (i * 100 + j * 10 + k) as f64);
        VolumeDataset::from_volume(vol, affine)
    }

    #[test]
    fn test_parse_orientation() {
        let o: Orientation = "LPI".parse().unwrap();
        assert_eq!(
            o.codes(),
            [AxisCode::Left, AxisCode::Posterior, AxisCode::Inferior]
        );
        assert_eq!(o.to_string(), "LPI");

        for bad in ["XYZ", "LRS", "LP", "LPIS", "lpi", "", "AAI"] {
            let e = bad.parse::<Orientation>().unwrap_err();
            assert!(matches!(e, MvpaError::InvalidOrientation(ref s) if s == bad));
        }
    }

    #[test]
    fn test_all_orientations() {
        let all = Orientation::all();
        assert_eq!(all.len(), ORIENTATION_COUNT);
        let set: HashSet<_> = all.iter().collect();
        assert_eq!(set.len(), ORIENTATION_COUNT);
        for o in all {
            assert_eq!(o.to_string().parse::<Orientation>().unwrap(), *o);
        }
    }

    #[test]
    fn test_orientation_from_affine() {
        let cfg = OrientConfig::default();
        let o = Orientation::from_affine(&Affine::identity(), &cfg).unwrap();
        assert_eq!(o.to_string(), "RAS");

        let o = Orientation::from_affine(lpi_volume().geometry.affine(), &cfg).unwrap();
        assert_eq!(o.to_string(), "LPI");

        // 轴交换并带轻微倾斜.
        let a = Affine::new([
            [0.1, 0.0, -2.0, 0.0],
            [2.0, 0.0, 0.1, 0.0],
            [0.0, 2.5, 0.0, 0.0],
            [0.0, 0.0, 0.0, 1.0],
        ])
        .unwrap();
        let o = Orientation::from_affine(&a, &cfg).unwrap();
        assert_eq!(o.to_string(), "ASL");
    }

    #[test]
    fn test_orientation_ambiguous() {
        let cfg = OrientConfig::default();
        // 第 0 轴在 x/y 上 45 度.
        let a = Affine::new([
            [1.0, -1.0, 0.0, 0.0],
            [1.0, 1.0, 0.0, 0.0],
            [0.0, 0.0, 1.0, 0.0],
            [0.0, 0.0, 0.0, 1.0],
        ])
        .unwrap();
        let e = Orientation::from_affine(&a, &cfg).unwrap_err();
        assert!(matches!(e, MvpaError::AmbiguousOrientation { axis: 0 }));

        // 两个体素轴的主导轴都是 x.
        let a = Affine::new([
            [1.0, 1.0, 0.0, 0.0],
            [0.0, 0.5, 0.0, 0.0],
            [0.0, 0.0, 1.0, 0.0],
            [0.0, 0.0, 0.0, 1.0],
        ])
        .unwrap();
        let e = Orientation::from_affine(&a, &cfg).unwrap_err();
        assert!(matches!(e, MvpaError::AmbiguousOrientation { axis: 1 }));

        assert!(OrientConfig::new(1.0).is_err());
        assert!(OrientConfig::new(-0.1).is_err());
    }

    #[test]
    fn test_reorient_every_target() {
        let ds = lpi_volume();
        for o in Orientation::all() {
            let out = reorient(&ds, &o.to_string()).unwrap();
            assert_eq!(out.orientation().unwrap(), *o);

            // 世界坐标与样本值不变.
            for f in 0..ds.n_features() {
                let (w0, w1) = (ds.geometry.voxel_to_world(f), out.geometry.voxel_to_world(f));
                assert!((0..3).all(|d| f64_eq(w0[d], w1[d])));
            }
            assert_eq!(out.dataset, ds.dataset);
        }
    }

    #[test]
    fn test_reorient_roundtrip() {
        let ds = lpi_volume();
        for o in Orientation::all() {
            let there = reorient(&ds, &o.to_string()).unwrap();
            let back = reorient(&there, "LPI").unwrap();
            assert_eq!(back.dataset, ds.dataset);
            assert_eq!(back.geometry.dims(), ds.geometry.dims());
            assert_eq!(back.geometry.voxels(), ds.geometry.voxels());
            assert!(back.geometry.affine().max_abs_diff(ds.geometry.affine()) < 1e-5);
        }
    }

    #[test]
    fn test_reorient_lpi_to_ras() {
        let ds = lpi_volume();
        let ras = ds.reorient("RAS").unwrap();
        assert_eq!(ras.geometry.dims(), (4, 5, 6));

        // 原体素 (0, 0, 0) 在 RAS 中位于 (3, 4, 5).
        assert_eq!(ras.geometry.voxels()[0], (3, 4, 5));
        let vol = ras.to_volume(0, f64::NAN);
        assert_eq!(vol[(3, 4, 5)], 0.0);
        assert_eq!(vol[(0, 0, 0)], 345.0);

        // 同一世界坐标处的值不变.
        for xyz in [[10.0, 20.0, 30.0], [4.0, 8.0, 10.0], [8.0, 11.0, 18.0]] {
            let a = ds.value_at_world(0, xyz);
            assert!(a.is_some());
            assert_eq!(a, ras.value_at_world(0, xyz));
        }
    }

    #[test]
    fn test_reorient_permutes_dims() {
        let ds = lpi_volume();
        let out = ds.reorient("SLA").unwrap();
        // S <- k (反转), L <- i, A <- j (反转).
        assert_eq!(out.geometry.dims(), (6, 4, 5));
        assert_eq!(out.geometry.voxels()[0], (5, 0, 4));
    }

    #[test]
    fn test_reorient_invalid() {
        let ds = lpi_volume();
        let e = reorient(&ds, "XYZ").unwrap_err();
        assert!(matches!(e, MvpaError::InvalidOrientation(_)));

        // 稀疏特征也能正常工作.
        let g = VolumeGeometry::new((3, 3, 3), Affine::identity(), vec![(2, 0, 1), (0, 1, 2)])
            .unwrap();
        let sparse = VolumeDataset::new(Dataset::new(ndarray::array![[1.0, 2.0]]), g).unwrap();
        let out = reorient(&sparse, "LPI").unwrap();
        assert_eq!(out.geometry.voxels(), &[(0, 2, 1), (2, 1, 0)]);
    }
}

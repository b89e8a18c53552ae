use std::collections::{HashMap, HashSet};
use std::ops::{Index, IndexMut};
use std::path::Path;

use itertools::iproduct;
use ndarray::{Array2, Array3, Array4, ArrayView2, ArrayViewMut2, Axis, Ix3, Ix4};
use nifti::{IntoNdArray, NiftiObject, ReaderOptions};

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::consts::COORD_TOLERANCE;
use crate::error::{MvpaError, MvpaResult};
use crate::Idx3d;

pub mod affine;
pub mod orient;

pub use affine::Affine;
use orient::{OrientConfig, Orientation};

/// 多变量模式分析的基础数据集.
///
/// `samples` 的每一行是一个样本 (如一次试次或一个时间点),
/// 每一列是一个特征 (如一个体素). 样本属性 `targets` (类别标签) 与
/// `chunks` (独立分块, 如扫描轮次) 存在时, 长度必须与样本数一致.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Dataset {
    samples: Array2<f64>,
    targets: Option<Vec<i32>>,
    chunks: Option<Vec<i32>>,
}

impl Index<(usize, usize)> for Dataset {
    type Output = f64;

    #[inline]
    fn index(&self, index: (usize, usize)) -> &Self::Output {
        &self.samples[index]
    }
}

impl IndexMut<(usize, usize)> for Dataset {
    #[inline]
    fn index_mut(&mut self, index: (usize, usize)) -> &mut Self::Output {
        &mut self.samples[index]
    }
}

impl Dataset {
    /// 由样本矩阵直接创建数据集, 不携带样本属性.
    #[inline]
    pub fn new(samples: Array2<f64>) -> Self {
        Self {
            samples,
            targets: None,
            chunks: None,
        }
    }

    /// 附加类别标签. 长度与样本数不一致时返回 `Err(DimensionMismatch)`.
    pub fn with_targets(mut self, targets: Vec<i32>) -> MvpaResult<Self> {
        self.check_sample_attr(targets.len())?;
        self.targets = Some(targets);
        Ok(self)
    }

    /// 附加分块标签. 长度与样本数不一致时返回 `Err(DimensionMismatch)`.
    pub fn with_chunks(mut self, chunks: Vec<i32>) -> MvpaResult<Self> {
        self.check_sample_attr(chunks.len())?;
        self.chunks = Some(chunks);
        Ok(self)
    }

    #[inline]
    fn check_sample_attr(&self, len: usize) -> MvpaResult<()> {
        match self.n_samples() {
            n if n == len => Ok(()),
            n => Err(MvpaError::DimensionMismatch {
                expected: n,
                got: len,
            }),
        }
    }

    /// 样本个数.
    #[inline]
    pub fn n_samples(&self) -> usize {
        self.samples.nrows()
    }

    /// 特征个数.
    #[inline]
    pub fn n_features(&self) -> usize {
        self.samples.ncols()
    }

    /// 获得样本矩阵的一份不可变 shallow copy.
    #[inline]
    pub fn samples(&self) -> ArrayView2<'_, f64> {
        self.samples.view()
    }

    /// 获得样本矩阵的一份可变 shallow copy.
    #[inline]
    pub fn samples_mut(&mut self) -> ArrayViewMut2<'_, f64> {
        self.samples.view_mut()
    }

    /// 类别标签.
    #[inline]
    pub fn targets(&self) -> Option<&[i32]> {
        self.targets.as_deref()
    }

    /// 分块标签.
    #[inline]
    pub fn chunks(&self) -> Option<&[i32]> {
        self.chunks.as_deref()
    }

    /// 消费自我, 直接获得底层样本矩阵.
    #[inline]
    pub fn into_samples(self) -> Array2<f64> {
        self.samples
    }

    /// 按 `indices` 给出的顺序选取样本, 样本属性随之选取.
    ///
    /// 存在越界索引时程序 panic.
    pub fn select_samples(&self, indices: &[usize]) -> Dataset {
        let pick = |attr: &Option<Vec<i32>>| {
            attr.as_ref()
                .map(|v| indices.iter().map(|&i| v[i]).collect())
        };
        Dataset {
            samples: self.samples.select(Axis(0), indices),
            targets: pick(&self.targets),
            chunks: pick(&self.chunks),
        }
    }

    /// 按 `indices` 给出的顺序选取特征.
    ///
    /// 存在越界索引时程序 panic.
    pub fn select_features(&self, indices: &[usize]) -> Dataset {
        Dataset {
            samples: self.samples.select(Axis(1), indices),
            targets: self.targets.clone(),
            chunks: self.chunks.clone(),
        }
    }
}

/// 体数据的几何信息: 体素网格大小, 仿射矩阵, 以及每个特征对应的体素索引.
///
/// 体素索引从 0 开始, 按 `(i, j, k)` 存储.
#[derive(Debug, Clone, PartialEq)]
pub struct VolumeGeometry {
    dims: Idx3d,
    affine: Affine,
    voxels: Vec<Idx3d>,
}

impl VolumeGeometry {
    /// 构建几何信息.
    ///
    /// 若存在越界体素或重复体素, 返回 `Err(MvpaError::InvalidInput)`.
    pub fn new(dims: Idx3d, affine: Affine, voxels: Vec<Idx3d>) -> MvpaResult<Self> {
        let (ni, nj, nk) = dims;
        if let Some(v) = voxels
            .iter()
            .find(|&&(i, j, k)| i >= ni || j >= nj || k >= nk)
        {
            return Err(MvpaError::InvalidInput(format!(
                "voxel {v:?} out of grid {dims:?}"
            )));
        }
        let mut seen = HashSet::with_capacity(voxels.len());
        if let Some(v) = voxels.iter().find(|v| !seen.insert(**v)) {
            return Err(MvpaError::InvalidInput(format!("duplicate voxel {v:?}")));
        }
        Ok(Self {
            dims,
            affine,
            voxels,
        })
    }

    /// 包含网格内全部体素的几何信息. 特征顺序为 `i` 变化最快, `k` 变化最慢.
    pub fn dense(dims: Idx3d, affine: Affine) -> Self {
        let (ni, nj, nk) = dims;
        let voxels = iproduct!(0..nk, 0..nj, 0..ni)
            .map(|(k, j, i)| (i, j, k))
            .collect();
        Self {
            dims,
            affine,
            voxels,
        }
    }

    /// 体素网格大小.
    #[inline]
    pub fn dims(&self) -> Idx3d {
        self.dims
    }

    /// 仿射矩阵.
    #[inline]
    pub fn affine(&self) -> &Affine {
        &self.affine
    }

    /// 每个特征的体素索引.
    #[inline]
    pub fn voxels(&self) -> &[Idx3d] {
        &self.voxels
    }

    /// 特征个数.
    #[inline]
    pub fn n_features(&self) -> usize {
        self.voxels.len()
    }

    /// 检查索引是否在网格内.
    #[inline]
    pub fn check(&self, (i, j, k): &Idx3d) -> bool {
        let (ni, nj, nk) = self.dims;
        *i < ni && *j < nj && *k < nk
    }

    /// 第 `feature` 个特征的世界坐标. 越界时 panic.
    #[inline]
    pub fn voxel_to_world(&self, feature: usize) -> [f64; 3] {
        self.affine.voxel_to_world(self.voxels[feature])
    }

    /// 求世界坐标 `xyz` 所在的体素索引.
    ///
    /// 若 `xyz` 与最近的体素中心的偏差 (以体素为单位) 超过容差,
    /// 或体素落在网格外, 则返回 `None`.
    pub fn world_to_voxel(&self, xyz: [f64; 3]) -> Option<Idx3d> {
        let v = self.affine.world_to_voxel(xyz);
        let mut ans = [0usize; 3];
        for (a, c) in ans.iter_mut().zip(v) {
            let r = c.round();
            if (c - r).abs() > COORD_TOLERANCE || r < 0.0 {
                return None;
            }
            *a = r as usize;
        }
        let pos = (ans[0], ans[1], ans[2]);
        self.check(&pos).then_some(pos)
    }

    /// 求体素 `voxel` 对应的特征索引. 若该体素不是特征则返回 `None`.
    #[inline]
    pub fn feature_at(&self, voxel: Idx3d) -> Option<usize> {
        self.voxels.iter().position(|v| *v == voxel)
    }

    /// 构建从体素索引到特征索引的查找表.
    pub fn voxel_lookup(&self) -> HashMap<Idx3d, usize> {
        self.voxels
            .iter()
            .enumerate()
            .map(|(f, v)| (*v, f))
            .collect()
    }

    /// 以默认配置由仿射矩阵推导方向代码.
    #[inline]
    pub fn orientation(&self) -> MvpaResult<Orientation> {
        Orientation::from_affine(&self.affine, &OrientConfig::default())
    }

    /// 直接替换内部数据, 由调用方保证不变量.
    #[inline]
    pub(crate) fn from_parts_unchecked(dims: Idx3d, affine: Affine, voxels: Vec<Idx3d>) -> Self {
        debug_assert_eq!(
            voxels.iter().collect::<HashSet<_>>().len(),
            voxels.len()
        );
        Self {
            dims,
            affine,
            voxels,
        }
    }
}

/// 体数据集, 由样本数据和几何信息组成.
///
/// 该结构完全透明, 仅包含两个公开的 `dataset` 和 `geometry` 子结构,
/// 用户可以直接使用它们来实现相关上层功能.
///
/// # 注意
///
/// 通过 [`Self::new`] 构建时会检查两者特征数一致;
/// 直接修改公开字段时, 一致性由用户保证.
#[derive(Debug, Clone, PartialEq)]
pub struct VolumeDataset {
    /// 样本数据.
    pub dataset: Dataset,

    /// 几何信息.
    pub geometry: VolumeGeometry,
}

impl VolumeDataset {
    /// 组合样本数据与几何信息. 特征数不一致时返回 `Err(DimensionMismatch)`.
    pub fn new(dataset: Dataset, geometry: VolumeGeometry) -> MvpaResult<Self> {
        if dataset.n_features() != geometry.n_features() {
            return Err(MvpaError::DimensionMismatch {
                expected: geometry.n_features(),
                got: dataset.n_features(),
            });
        }
        Ok(Self { dataset, geometry })
    }

    /// 由单个 3D 体数据创建只含一个样本的数据集. 网格内所有体素都成为特征,
    /// 顺序为 `i` 变化最快.
    pub fn from_volume(volume: Array3<f64>, affine: Affine) -> Self {
        let (ni, nj, nk) = volume.dim();
        let geometry = VolumeGeometry::dense((ni, nj, nk), affine);
        let samples = Array2::from_shape_fn((1, geometry.n_features()), |(_, f)| {
            volume[geometry.voxels()[f]]
        });
        Self {
            dataset: Dataset::new(samples),
            geometry,
        }
    }

    /// 由 4D 体数据 `(i, j, k, t)` 创建数据集, 第四维成为样本.
    pub fn from_volume4(volume: Array4<f64>, affine: Affine) -> Self {
        let (ni, nj, nk, nt) = volume.dim();
        let geometry = VolumeGeometry::dense((ni, nj, nk), affine);
        let samples = Array2::from_shape_fn((nt, geometry.n_features()), |(t, f)| {
            let (i, j, k) = geometry.voxels()[f];
            volume[(i, j, k, t)]
        });
        Self {
            dataset: Dataset::new(samples),
            geometry,
        }
    }

    /// 打开 nii 文件格式的 3D 或 4D 体数据. `path` 为 nii 文件的本地路径.
    ///
    /// 体数据不是 3D 或 4D 时返回 `Err(MvpaError::InvalidInput)`.
    pub fn open<P: AsRef<Path>>(path: P) -> MvpaResult<Self> {
        let obj = ReaderOptions::new().read_file(path.as_ref())?;
        let affine = Affine::from_header(obj.header())?;
        let data = obj.into_volume().into_ndarray::<f64>()?;
        match data.ndim() {
            3 => {
                let data = data
                    .into_dimensionality::<Ix3>()
                    .map_err(|e| MvpaError::InvalidInput(e.to_string()))?;
                Ok(Self::from_volume(data, affine))
            }
            4 => {
                let data = data
                    .into_dimensionality::<Ix4>()
                    .map_err(|e| MvpaError::InvalidInput(e.to_string()))?;
                Ok(Self::from_volume4(data, affine))
            }
            n => Err(MvpaError::InvalidInput(format!(
                "expected a 3D or 4D volume, got {n}D"
            ))),
        }
    }

    /// 样本个数.
    #[inline]
    pub fn n_samples(&self) -> usize {
        self.dataset.n_samples()
    }

    /// 特征个数.
    #[inline]
    pub fn n_features(&self) -> usize {
        self.dataset.n_features()
    }

    /// 由仿射矩阵推导当前方向代码.
    #[inline]
    pub fn orientation(&self) -> MvpaResult<Orientation> {
        self.geometry.orientation()
    }

    /// 将数据集转换到 `target` 方向. 见 [`orient::reorient`].
    #[inline]
    pub fn reorient(&self, target: &str) -> MvpaResult<Self> {
        orient::reorient(self, target)
    }

    /// 将第 `sample` 个样本还原为稠密的 3D 体数据 (按当前方向索引).
    /// 非特征体素填充为 `fill`.
    ///
    /// `sample` 越界时 panic.
    pub fn to_volume(&self, sample: usize, fill: f64) -> Array3<f64> {
        assert!(sample < self.n_samples(), "样本索引 {sample} 越界");
        let mut vol = Array3::from_elem(self.geometry.dims(), fill);
        let row = self.dataset.samples.row(sample);
        for (v, x) in self.geometry.voxels().iter().zip(row.iter()) {
            vol[*v] = *x;
        }
        vol
    }

    /// 获取第 `sample` 个样本在世界坐标 `xyz` 处的值.
    /// 该位置不是特征时返回 `None`.
    pub fn value_at_world(&self, sample: usize, xyz: [f64; 3]) -> Option<f64> {
        let voxel = self.geometry.world_to_voxel(xyz)?;
        let f = self.geometry.feature_at(voxel)?;
        self.dataset.samples.get((sample, f)).copied()
    }
}

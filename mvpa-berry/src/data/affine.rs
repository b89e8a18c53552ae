//! 体素坐标到世界坐标的 4x4 仿射变换.

use nalgebra::{Matrix4, Vector4};
use nifti::NiftiHeader;

use crate::consts::SINGULAR_DET;
use crate::error::{MvpaError, MvpaResult};
use crate::Idx3d;

/// 4x4 仿射矩阵, 把齐次体素索引 `(i, j, k, 1)` 映射为世界坐标 `(x, y, z, 1)`.
///
/// 构造时保证: 所有元素有限, 最后一行为 `[0, 0, 0, 1]`, 且矩阵可逆.
/// 逆矩阵在构造时一并求出.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct Affine {
    fwd: Matrix4<f64>,
    inv: Matrix4<f64>,
}

impl Affine {
    /// 从按行存储的 4x4 矩阵构建仿射变换.
    ///
    /// 矩阵含非有限值, 最后一行不是 `[0, 0, 0, 1]`, 或不可逆时返回
    /// `Err(MvpaError::InvalidInput)`.
    pub fn new(rows: [[f64; 4]; 4]) -> MvpaResult<Self> {
        let flat: Vec<f64> = rows.iter().flatten().copied().collect();
        Self::from_matrix(Matrix4::from_row_slice(&flat))
    }

    /// 从 `nalgebra` 矩阵构建仿射变换. 校验规则同 [`Self::new`].
    pub fn from_matrix(fwd: Matrix4<f64>) -> MvpaResult<Self> {
        if !fwd.iter().all(|v| v.is_finite()) {
            return Err(MvpaError::InvalidInput(
                "affine contains non-finite entries".into(),
            ));
        }
        let last = [fwd[(3, 0)], fwd[(3, 1)], fwd[(3, 2)], fwd[(3, 3)]];
        if last != [0.0, 0.0, 0.0, 1.0] {
            return Err(MvpaError::InvalidInput(format!(
                "affine last row must be [0, 0, 0, 1], got {last:?}"
            )));
        }
        if fwd.determinant().abs() <= SINGULAR_DET {
            return Err(MvpaError::InvalidInput("affine is not invertible".into()));
        }
        let inv = fwd
            .try_inverse()
            .ok_or_else(|| MvpaError::InvalidInput("affine is not invertible".into()))?;
        Ok(Self { fwd, inv })
    }

    /// 单位变换. 体素索引直接作为世界坐标 (方向为 `RAS`).
    #[inline]
    pub fn identity() -> Self {
        Self {
            fwd: Matrix4::identity(),
            inv: Matrix4::identity(),
        }
    }

    /// 由体素尺寸 (毫米) 和原点构建无旋转的仿射变换.
    ///
    /// 尺寸可以为负, 表示该轴沿世界坐标负方向增长. 任一尺寸为 0
    /// 或非有限时返回 `Err`.
    pub fn from_spacing(spacing: [f64; 3], origin: [f64; 3]) -> MvpaResult<Self> {
        let [sx, sy, sz] = spacing;
        let [ox, oy, oz] = origin;
        Self::new([
            [sx, 0.0, 0.0, ox],
            [0.0, sy, 0.0, oy],
            [0.0, 0.0, sz, oz],
            [0.0, 0.0, 0.0, 1.0],
        ])
    }

    /// 从 nifti 元数据 `header` 中读取仿射变换.
    ///
    /// # 规则
    ///
    /// 1. `sform_code > 0` 时直接使用 `srow_{x, y, z}`;
    /// 2. 否则若 `qform_code > 0`, 由四元数 `quatern_{b, c, d}`,
    ///   平移 `quatern_{x, y, z}` 和 `pixdim` 计算;
    /// 3. 否则退化为由 `pixdim` 构成的对角矩阵.
    pub fn from_header(header: &NiftiHeader) -> MvpaResult<Self> {
        let [qfac, dx, dy, dz, ..] = header.pixdim.map(f64::from);

        if header.sform_code > 0 {
            let row = |r: [f32; 4]| r.map(f64::from);
            return Self::new([
                row(header.srow_x),
                row(header.srow_y),
                row(header.srow_z),
                [0.0, 0.0, 0.0, 1.0],
            ]);
        }
        if header.qform_code <= 0 {
            return Self::from_spacing([dx, dy, dz], [0.0; 3]);
        }

        let (b, c, d) = (
            f64::from(header.quatern_b),
            f64::from(header.quatern_c),
            f64::from(header.quatern_d),
        );
        // 数值误差可能使 `1 - b^2 - c^2 - d^2` 略小于 0.
        let a = (1.0 - b * b - c * c - d * d).max(0.0).sqrt();
        let qfac = if qfac < 0.0 { -1.0 } else { 1.0 };
        let r = [
            [
                a * a + b * b - c * c - d * d,
                2.0 * (b * c - a * d),
                2.0 * (b * d + a * c),
            ],
            [
                2.0 * (b * c + a * d),
                a * a + c * c - b * b - d * d,
                2.0 * (c * d - a * b),
            ],
            [
                2.0 * (b * d - a * c),
                2.0 * (c * d + a * b),
                a * a + d * d - b * b - c * c,
            ],
        ];
        let scale = [dx, dy, dz * qfac];
        let offset = [
            f64::from(header.quatern_x),
            f64::from(header.quatern_y),
            f64::from(header.quatern_z),
        ];
        let mut rows = [[0.0; 4]; 4];
        for (w, row) in rows.iter_mut().take(3).enumerate() {
            for v in 0..3 {
                row[v] = r[w][v] * scale[v];
            }
            row[3] = offset[w];
        }
        rows[3][3] = 1.0;
        Self::new(rows)
    }

    /// 获得底层矩阵.
    #[inline]
    pub fn matrix(&self) -> &Matrix4<f64> {
        &self.fwd
    }

    /// 获得逆矩阵 (世界坐标到体素索引).
    #[inline]
    pub fn inverse(&self) -> &Matrix4<f64> {
        &self.inv
    }

    /// 以行优先的数组形式导出矩阵.
    pub fn to_rows(&self) -> [[f64; 4]; 4] {
        let mut rows = [[0.0; 4]; 4];
        for (r, row) in rows.iter_mut().enumerate() {
            for (c, v) in row.iter_mut().enumerate() {
                *v = self.fwd[(r, c)];
            }
        }
        rows
    }

    /// 第 `axis` 个体素轴在世界坐标中的方向向量 (旋转部分的第 `axis` 列).
    ///
    /// `axis >= 3` 时 panic.
    #[inline]
    pub fn column(&self, axis: usize) -> [f64; 3] {
        assert!(axis < 3);
        [
            self.fwd[(0, axis)],
            self.fwd[(1, axis)],
            self.fwd[(2, axis)],
        ]
    }

    /// 求体素索引 `(i, j, k)` 对应的世界坐标.
    #[inline]
    pub fn voxel_to_world(&self, (i, j, k): Idx3d) -> [f64; 3] {
        self.apply([i as f64, j as f64, k as f64])
    }

    /// 求 (可能非整数的) 体素坐标对应的世界坐标.
    #[inline]
    pub fn apply(&self, [i, j, k]: [f64; 3]) -> [f64; 3] {
        let w = self.fwd * Vector4::new(i, j, k, 1.0);
        [w.x, w.y, w.z]
    }

    /// 求世界坐标对应的 (非整数) 体素坐标.
    #[inline]
    pub fn world_to_voxel(&self, [x, y, z]: [f64; 3]) -> [f64; 3] {
        let v = self.inv * Vector4::new(x, y, z, 1.0);
        [v.x, v.y, v.z]
    }

    /// 右乘体素空间变换 `t`, 即求 `self * t`.
    ///
    /// 若 `t` 把新体素索引映射为旧体素索引,
    /// 则结果把新体素索引映射到与原先相同的世界坐标.
    pub fn compose(&self, t: &Matrix4<f64>) -> MvpaResult<Self> {
        Self::from_matrix(self.fwd * t)
    }

    /// 两个仿射矩阵所有元素差的最大绝对值.
    pub fn max_abs_diff(&self, other: &Affine) -> f64 {
        self.fwd
            .iter()
            .zip(other.fwd.iter())
            .map(|(a, b)| (a - b).abs())
            .fold(0.0, f64::max)
    }
}

impl Default for Affine {
    fn default() -> Self {
        Self::identity()
    }
}

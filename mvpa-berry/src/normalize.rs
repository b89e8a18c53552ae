//! 样本矩阵的归一化.
//!
//! 所有方法都写作 `(x - c) / s` 的形式, 其中 `c` 与 `s` 由归一化方法决定:
//!
//! | 方法 | `c` | `s` |
//! |:-:|:-:|:-:|
//! | `demean` | 均值 | 1 |
//! | `zscore` | 均值 | 标准差 (自由度 `n - 1`) |
//! | `scale_unit` | `(max + min) / 2` | `(max - min) / 2` |
//!
//! `scale_unit` 把每个方向上的 `[min, max]` 映射到 `[-1, 1]`.
//!
//! 结果中出现非有限值 (如标准差为 0 时) 不视为错误, 而是计入 [`Diagnostics`].

use std::fmt::Formatter;
use std::str::FromStr;

use ndarray::{Array1, Array2, ArrayView1, ArrayView2, Axis, Zip};
use num::Float;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::diagnostics::{emit, DiagnosticSink, Diagnostics};
use crate::error::{MvpaError, MvpaResult};

/// 归一化方法.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum NormKind {
    /// 减去均值.
    Demean,

    /// 减去均值后除以标准差.
    ZScore,

    /// 线性映射到 `[-1, 1]`.
    ScaleUnit,
}

impl NormKind {
    fn name(self) -> &'static str {
        match self {
            Self::Demean => "demean",
            Self::ZScore => "zscore",
            Self::ScaleUnit => "scale_unit",
        }
    }

    /// 沿一条向量求 `(c, s)`. 空向量得到非有限值.
    fn center_scale<T: Float>(self, lane: ArrayView1<'_, T>) -> (T, T) {
        let n = T::from(lane.len()).unwrap_or_else(T::nan);
        let mean = || lane.iter().fold(T::zero(), |acc, &x| acc + x) / n;
        match self {
            Self::Demean => (mean(), T::one()),
            Self::ZScore => {
                let m = mean();
                let ss = lane
                    .iter()
                    .fold(T::zero(), |acc, &x| acc + (x - m) * (x - m));
                (m, (ss / (n - T::one())).sqrt())
            }
            Self::ScaleUnit => {
                let (lo, hi) = lane
                    .iter()
                    .fold((T::infinity(), T::neg_infinity()), |(lo, hi), &x| {
                        (lo.min(x), hi.max(x))
                    });
                let two = T::one() + T::one();
                ((hi + lo) / two, (hi - lo) / two)
            }
        }
    }
}

/// 计算统计量的方向.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash, Default)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum NormAxis {
    /// 对每个特征, 跨样本计算统计量 (方法名后缀 `1`).
    ///
    /// 统计量可以从训练集估计, 再用于测试集.
    #[default]
    Samples,

    /// 对每个样本, 跨特征计算统计量 (方法名后缀 `2`).
    Features,
}

impl NormAxis {
    /// 统计量沿 `ndarray` 的哪个轴计算.
    #[inline]
    fn lanes(self) -> Axis {
        match self {
            Self::Samples => Axis(0),
            Self::Features => Axis(1),
        }
    }
}

/// 归一化配置.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct NormalizeConfig {
    /// 方法.
    pub kind: NormKind,

    /// 方向, 默认为 [`NormAxis::Samples`].
    pub axis: NormAxis,
}

impl NormalizeConfig {
    /// 以给定方法和方向构建配置.
    #[inline]
    pub fn new(kind: NormKind, axis: NormAxis) -> Self {
        Self { kind, axis }
    }
}

impl FromStr for NormalizeConfig {
    type Err = MvpaError;

    /// 接受 `demean`, `zscore`, `scale_unit`, 以及带方向后缀 `1` 或 `2` 的形式,
    /// 如 `zscore2`. 无后缀时方向为 `1`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (name, axis) = match s.as_bytes().last() {
            Some(b'1') => (&s[..s.len() - 1], NormAxis::Samples),
            Some(b'2') => (&s[..s.len() - 1], NormAxis::Features),
            _ => (s, NormAxis::Samples),
        };
        let kind = match name {
            "demean" => NormKind::Demean,
            "zscore" => NormKind::ZScore,
            "scale_unit" => NormKind::ScaleUnit,
            _ => return Err(MvpaError::UnknownMethod(s.to_string())),
        };
        Ok(Self { kind, axis })
    }
}

impl std::fmt::Display for NormalizeConfig {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        let suffix = match self.axis {
            NormAxis::Samples => 1,
            NormAxis::Features => 2,
        };
        write!(f, "{}{suffix}", self.kind.name())
    }
}

/// 归一化时估计出的参数.
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct NormParams {
    config: NormalizeConfig,

    /// 每条向量的 `c`.
    center: Array1<f64>,

    /// 每条向量的 `s`.
    scale: Array1<f64>,
}

impl NormParams {
    fn estimate(samples: ArrayView2<'_, f64>, config: NormalizeConfig) -> Self {
        let axis = config.axis.lanes();
        let (center, scale): (Vec<f64>, Vec<f64>) = samples
            .lanes(axis)
            .into_iter()
            .map(|lane| config.kind.center_scale(lane))
            .unzip();
        Self {
            config,
            center: Array1::from(center),
            scale: Array1::from(scale),
        }
    }

    /// 估计参数所用的配置.
    #[inline]
    pub fn config(&self) -> NormalizeConfig {
        self.config
    }

    /// 每条向量的 `c`.
    #[inline]
    pub fn center(&self) -> ArrayView1<'_, f64> {
        self.center.view()
    }

    /// 每条向量的 `s`.
    #[inline]
    pub fn scale(&self) -> ArrayView1<'_, f64> {
        self.scale.view()
    }

    /// 把参数作用于新数据 (如测试集).
    ///
    /// 方向为 [`NormAxis::Samples`] 时直接使用已估计的逐特征参数,
    /// 此时 `samples` 的列数必须与估计时一致, 否则返回 `Err(DimensionMismatch)`.
    /// 方向为 [`NormAxis::Features`] 时逐样本重新估计.
    pub fn apply(&self, samples: ArrayView2<'_, f64>) -> MvpaResult<(Array2<f64>, Diagnostics)> {
        match self.config.axis {
            NormAxis::Samples => {
                if samples.ncols() != self.center.len() {
                    return Err(MvpaError::DimensionMismatch {
                        expected: self.center.len(),
                        got: samples.ncols(),
                    });
                }
                Ok(transform(samples, self))
            }
            NormAxis::Features => Ok(transform(samples, &Self::estimate(samples, self.config))),
        }
    }
}

/// 归一化的结果.
#[derive(Clone, Debug)]
pub struct Normalized {
    /// 归一化后的样本矩阵.
    pub samples: Array2<f64>,

    /// 估计出的参数.
    pub params: NormParams,

    /// 诊断信息.
    pub diagnostics: Diagnostics,
}

fn transform(samples: ArrayView2<'_, f64>, params: &NormParams) -> (Array2<f64>, Diagnostics) {
    let axis = params.config.axis.lanes();
    let mut out = samples.to_owned();
    Zip::from(out.lanes_mut(axis))
        .and(&params.center)
        .and(&params.scale)
        .for_each(|mut lane, &c, &s| lane.mapv_inplace(|x| (x - c) / s));
    let diagnostics = Diagnostics::count_non_finite(out.iter());
    (out, diagnostics)
}

/// 按 `config` 归一化样本矩阵 `samples` (行为样本, 列为特征).
///
/// 结果中的非有限值个数记录在返回值的 `diagnostics` 中.
pub fn normalize(samples: ArrayView2<'_, f64>, config: &NormalizeConfig) -> Normalized {
    let params = NormParams::estimate(samples, *config);
    let (samples, diagnostics) = transform(samples, &params);
    Normalized {
        samples,
        params,
        diagnostics,
    }
}

/// 同 [`normalize`], 并把非空的诊断信息交给 `sink`.
pub fn normalize_with<S: DiagnosticSink + ?Sized>(
    samples: ArrayView2<'_, f64>,
    config: &NormalizeConfig,
    sink: &mut S,
) -> Normalized {
    let ans = normalize(samples, config);
    emit(sink, "normalize", &ans.diagnostics);
    ans
}

/// 按方法名归一化, 如 `"zscore"`, `"demean2"`.
///
/// 方法名未知时返回 `Err(MvpaError::UnknownMethod)`.
pub fn normalize_by_name(samples: ArrayView2<'_, f64>, method: &str) -> MvpaResult<Normalized> {
    let config: NormalizeConfig = method.parse()?;
    Ok(normalize(samples, &config))
}

#[cfg(test)]
mod tests {
    use super::{normalize, normalize_by_name, normalize_with, NormAxis, NormKind, NormalizeConfig};
    use crate::diagnostics::Diagnostics;
    use crate::error::MvpaError;
    use ndarray::{array, Array2};

    fn f64_eq(a: f64, b: f64) -> bool {
        (a - b).abs() < 1e-8
    }

    fn all_eq(a: &Array2<f64>, b: &Array2<f64>) -> bool {
        a.shape() == b.shape() && a.iter().zip(b.iter()).all(|(x, y)| f64_eq(*x, *y))
    }

    #[test]
    fn test_parse_method() {
        let c: NormalizeConfig = "zscore".parse().unwrap();
        assert_eq!(c, NormalizeConfig::new(NormKind::ZScore, NormAxis::Samples));
        let c: NormalizeConfig = "scale_unit2".parse().unwrap();
        assert_eq!(c, NormalizeConfig::new(NormKind::ScaleUnit, NormAxis::Features));
        assert_eq!(c.to_string(), "scale_unit2");
        assert_eq!("demean1".parse::<NormalizeConfig>().unwrap().to_string(), "demean1");

        for bad in ["zscore3", "percentile", "", "1", "ZSCORE"] {
            let e = bad.parse::<NormalizeConfig>().unwrap_err();
            assert!(matches!(e, MvpaError::UnknownMethod(ref s) if s == bad));
        }
        let e = normalize_by_name(array![[1.0]].view(), "robust").unwrap_err();
        assert!(matches!(e, MvpaError::UnknownMethod(_)));
    }

    #[test]
    fn test_demean() {
        let x = array![[1.0, 10.0], [3.0, 20.0], [5.0, 60.0]];
        let ans = normalize_by_name(x.view(), "demean").unwrap();
        assert!(all_eq(
            &ans.samples,
            &array![[-2.0, -20.0], [0.0, -10.0], [2.0, 30.0]]
        ));
        assert!(ans.diagnostics.is_clean());

        let ans = normalize_by_name(x.view(), "demean2").unwrap();
        assert!(all_eq(
            &ans.samples,
            &array![[-4.5, 4.5], [-8.5, 8.5], [-27.5, 27.5]]
        ));
    }

    #[test]
    fn test_zscore() {
        let x = array![[1.0], [2.0], [3.0], [4.0]];
        let ans = normalize_by_name(x.view(), "zscore").unwrap();
        // 样本标准差 sqrt(5 / 3).
        let s = (5.0f64 / 3.0).sqrt();
        let expected = array![[-1.5 / s], [-0.5 / s], [0.5 / s], [1.5 / s]];
        assert!(all_eq(&ans.samples, &expected));
        assert!(f64_eq(ans.params.center()[0], 2.5));
        assert!(f64_eq(ans.params.scale()[0], s));
    }

    #[test]
    fn test_scale_unit() {
        let x = array![[0.0, 4.0, 2.0], [-2.0, -2.0, -2.0]];
        let ans = normalize_by_name(x.view(), "scale_unit2").unwrap();
        assert_eq!(ans.samples.row(0).to_vec(), vec![-1.0, 1.0, 0.0]);
        // 常数行: 0 / 0.
        assert!(ans.samples.row(1).iter().all(|v| v.is_nan()));
        assert_eq!(ans.diagnostics.non_finite, 3);

        let ans = normalize_by_name(array![[1.0], [5.0], [2.0]].view(), "scale_unit").unwrap();
        assert!(all_eq(&ans.samples, &array![[-1.0], [1.0], [-0.5]]));
    }

    #[test]
    fn test_zero_variance_reported() {
        let x = array![[1.0, 2.0], [1.0, 3.0]];
        let mut seen = Diagnostics::default();
        let ans = normalize_with(x.view(), &"zscore".parse().unwrap(), &mut seen);
        assert_eq!(ans.diagnostics.non_finite, 2);
        assert_eq!(seen.non_finite, 2);
        assert!(ans.samples.column(0).iter().all(|v| v.is_nan()));
        assert!(ans.samples.column(1).iter().all(|v| v.is_finite()));
    }

    #[test]
    fn test_apply_to_test_set() {
        let train = array![[1.0, 0.0], [3.0, 4.0]];
        let cfg = "demean".parse().unwrap();
        let ans = normalize(train.view(), &cfg);
        let (test, d) = ans.params.apply(array![[2.0, 2.0], [0.0, 0.0]].view()).unwrap();
        assert!(all_eq(&test, &array![[0.0, 0.0], [-2.0, -2.0]]));
        assert!(d.is_clean());

        let e = ans.params.apply(array![[1.0, 2.0, 3.0]].view()).unwrap_err();
        assert!(matches!(e, MvpaError::DimensionMismatch { expected: 2, got: 3 }));

        // 逐样本方向重新估计.
        let ans = normalize(train.view(), &"demean2".parse().unwrap());
        let (test, _) = ans.params.apply(array![[2.0, 4.0, 6.0]].view()).unwrap();
        assert!(all_eq(&test, &array![[-2.0, 0.0, 2.0]]));
    }
}

use std::collections::BTreeMap;

use ndarray::{Array1, ArrayView2, Axis};

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use super::{check_inputs, Classifier};
use crate::consts::{NB_VAR_FLOOR, NB_VAR_SMOOTHING};
use crate::error::{MvpaError, MvpaResult};

/// 朴素贝叶斯分类器的配置.
#[derive(Copy, Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct NbConfig {
    var_smoothing: f64,
}

impl NbConfig {
    /// 以方差平滑系数 `var_smoothing` 构建配置.
    /// 系数必须为正的有限值, 否则返回 `Err(InvalidInput)`.
    pub fn new(var_smoothing: f64) -> MvpaResult<Self> {
        if !(var_smoothing.is_finite() && var_smoothing > 0.0) {
            return Err(MvpaError::InvalidInput(format!(
                "variance smoothing must be positive, got {var_smoothing}"
            )));
        }
        Ok(Self { var_smoothing })
    }

    /// 方差平滑系数.
    ///
    /// 每个类别每个特征的方差都加上 `var_smoothing * max_var`,
    /// 其中 `max_var` 为训练集各特征 (不分类别) 方差的最大值.
    #[inline]
    pub fn var_smoothing(&self) -> f64 {
        self.var_smoothing
    }

    /// 对训练集 `train` 计算加到每个方差上的平滑量.
    fn epsilon(&self, train: ArrayView2<'_, f64>) -> f64 {
        let max_var = train
            .var_axis(Axis(0), 0.0)
            .fold(0.0_f64, |acc, &v| acc.max(v));
        (self.var_smoothing * max_var).max(NB_VAR_FLOOR)
    }
}

impl Default for NbConfig {
    fn default() -> Self {
        Self {
            var_smoothing: NB_VAR_SMOOTHING,
        }
    }
}

/// 高斯朴素贝叶斯分类器.
///
/// 每个类别的每个特征用独立的正态分布建模 (方差为有偏估计, 再加上平滑量),
/// 先验概率取类别在训练集中的频率. 后验相同时选择较小的标签.
#[derive(Copy, Clone, Debug, Default)]
pub struct NaiveBayes {
    /// 配置.
    pub config: NbConfig,
}

impl NaiveBayes {
    /// 由配置构建分类器.
    #[inline]
    pub fn new(config: NbConfig) -> Self {
        Self { config }
    }
}

/// 单个类别的模型.
struct ClassModel {
    label: i32,
    log_prior: f64,
    mean: Array1<f64>,
    var: Array1<f64>,
}

impl ClassModel {
    fn log_likelihood(&self, x: ndarray::ArrayView1<'_, f64>) -> f64 {
        let ln_2pi = (2.0 * std::f64::consts::PI).ln();
        let ll: f64 = x
            .iter()
            .zip(self.mean.iter().zip(self.var.iter()))
            .map(|(&x, (&m, &v))| -0.5 * (ln_2pi + v.ln() + (x - m) * (x - m) / v))
            .sum();
        self.log_prior + ll
    }
}

impl Classifier for NaiveBayes {
    fn classify(
        &self,
        train: ArrayView2<'_, f64>,
        targets: &[i32],
        test: ArrayView2<'_, f64>,
    ) -> MvpaResult<Vec<i32>> {
        check_inputs(train, targets, test)?;
        if train.iter().chain(test.iter()).any(|v| !v.is_finite()) {
            return Err(MvpaError::InvalidInput(
                "naive bayes requires finite samples".into(),
            ));
        }

        // 标签升序, 保证平票时选择较小的标签.
        let mut groups: BTreeMap<i32, Vec<usize>> = BTreeMap::new();
        for (i, &t) in targets.iter().enumerate() {
            groups.entry(t).or_default().push(i);
        }
        let n = train.nrows() as f64;
        let eps = self.config.epsilon(train);
        let models: Vec<ClassModel> = groups
            .into_iter()
            .map(|(label, rows)| {
                let sub = train.select(Axis(0), &rows);
                let cnt = rows.len() as f64;
                let mean = sub.sum_axis(Axis(0)) / cnt;
                let var = sub
                    .axis_iter(Axis(0))
                    .fold(Array1::<f64>::zeros(train.ncols()), |acc, r| {
                        acc + (&r - &mean).mapv(|d| d * d)
                    })
                    .mapv(|s| s / cnt + eps);
                ClassModel {
                    label,
                    log_prior: (cnt / n).ln(),
                    mean,
                    var,
                }
            })
            .collect();

        let ans = test
            .rows()
            .into_iter()
            .map(|x| {
                let mut best = (f64::NEG_INFINITY, models[0].label);
                for m in models.iter() {
                    let score = m.log_likelihood(x);
                    if score > best.0 {
                        best = (score, m.label);
                    }
                }
                best.1
            })
            .collect();
        Ok(ans)
    }
}

#[cfg(test)]
mod tests {
    use super::{NaiveBayes, NbConfig};
    use crate::classify::Classifier;
    use crate::error::MvpaError;
    use ndarray::array;

    #[test]
    fn test_config() {
        assert!(NbConfig::new(0.0).is_err());
        assert!(NbConfig::new(f64::NAN).is_err());
        assert_eq!(NbConfig::new(0.5).unwrap().var_smoothing(), 0.5);
    }

    #[test]
    fn test_within_class_constant_feature() {
        // 第 2 个特征在类别 1 内为常数, 但几乎不区分类别;
        // 不应压过第 1 个特征 (两类相距 10).
        let train = array![[0.0, 1.0], [10.0, 1.2], [-0.2, 1.0], [10.1, 0.8]];
        let targets = [1, 2, 1, 2];
        let pred = NaiveBayes::default()
            .classify(train.view(), &targets, array![[0.3, 0.9], [9.7, 1.1]].view())
            .unwrap();
        assert_eq!(pred, vec![1, 2]);
    }

    #[test]
    fn test_all_constant_training_set() {
        // 所有特征方差为 0 时使用绝对下限, 结果仍有定义.
        let train = array![[1.0, 2.0], [1.0, 2.0]];
        let pred = NaiveBayes::default()
            .classify(train.view(), &[7, 7], array![[3.0, 3.0]].view())
            .unwrap();
        assert_eq!(pred, vec![7]);
    }

    #[test]
    fn test_prior_and_variance() {
        // 类别 1 方差大, 类别 2 方差小.
        let train = array![[-4.0], [4.0], [0.0], [1.0], [0.9], [1.1]];
        let targets = [1, 1, 1, 2, 2, 2];
        let nb = NaiveBayes::default();
        let pred = nb
            .classify(train.view(), &targets, array![[1.0], [3.0], [-3.0]].view())
            .unwrap();
        assert_eq!(pred, vec![2, 1, 1]);
    }

    #[test]
    fn test_constant_features_and_ties() {
        // 类内方差为 0 时由平滑量兜底, 不产生 NaN.
        let train = array![[1.0, 5.0], [1.0, 5.0], [2.0, 5.0], [2.0, 5.0]];
        let targets = [4, 4, 3, 3];
        let nb = NaiveBayes::new(NbConfig::new(0.01).unwrap());
        let pred = nb
            .classify(train.view(), &targets, array![[1.1, 5.0], [1.5, 5.0]].view())
            .unwrap();
        // 1.5 处两类后验相同, 选较小的标签.
        assert_eq!(pred, vec![4, 3]);

        let e = nb
            .classify(train.view(), &targets, array![[f64::NAN, 5.0]].view())
            .unwrap_err();
        assert!(matches!(e, MvpaError::InvalidInput(_)));
    }
}

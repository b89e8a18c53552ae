//! 原生分类器.
//!
//! 只实现不依赖外部库的简单分类器. 训练与预测合并为一步:
//! 给定训练样本及其类别标签, 直接给出测试样本的预测标签.

use ndarray::ArrayView2;

use crate::error::{MvpaError, MvpaResult};

mod naive_bayes;
mod nn;

pub use naive_bayes::{NaiveBayes, NbConfig};
pub use nn::{NearestNeighbor, NnConfig};

/// 分类器.
pub trait Classifier {
    /// 用 `train` (行为样本) 及其标签 `targets` 训练, 并预测 `test` 每一行的标签.
    ///
    /// # 返回值
    ///
    /// 1. `targets.len() != train.nrows()` 或 `train` 与 `test` 的列数不同时,
    ///   返回 `Err(MvpaError::DimensionMismatch)`;
    /// 2. 训练集为空时返回 `Err(MvpaError::InvalidInput)`.
    fn classify(
        &self,
        train: ArrayView2<'_, f64>,
        targets: &[i32],
        test: ArrayView2<'_, f64>,
    ) -> MvpaResult<Vec<i32>>;
}

/// 各分类器共用的输入校验.
pub(crate) fn check_inputs(
    train: ArrayView2<'_, f64>,
    targets: &[i32],
    test: ArrayView2<'_, f64>,
) -> MvpaResult<()> {
    if targets.len() != train.nrows() {
        return Err(MvpaError::DimensionMismatch {
            expected: train.nrows(),
            got: targets.len(),
        });
    }
    if train.ncols() != test.ncols() {
        return Err(MvpaError::DimensionMismatch {
            expected: train.ncols(),
            got: test.ncols(),
        });
    }
    if train.nrows() == 0 {
        return Err(MvpaError::InvalidInput("empty training set".into()));
    }
    Ok(())
}

#[cfg(test)]
pub(crate) mod tests {
    use super::{check_inputs, Classifier, NaiveBayes, NearestNeighbor};
    use crate::error::MvpaError;
    use ndarray::{array, Array2};

    /// 两个类别在第 0 个特征上分得很开.
    pub(crate) fn separable() -> (Array2<f64>, Vec<i32>, Array2<f64>, Vec<i32>) {
        let train = array![
            [0.0, 1.0],
            [0.5, -1.0],
            [-0.5, 0.2],
            [10.0, 0.8],
            [10.5, -0.9],
            [9.5, 0.1]
        ];
        let test = array![[0.2, 0.0], [9.8, 0.5], [-1.0, -0.5], [11.0, 1.0]];
        (train, vec![1, 1, 1, 2, 2, 2], test, vec![1, 2, 1, 2])
    }

    #[test]
    fn test_check_inputs() {
        let (train, targets, test, _) = separable();
        assert!(check_inputs(train.view(), &targets, test.view()).is_ok());

        let e = check_inputs(train.view(), &targets[1..], test.view()).unwrap_err();
        assert!(matches!(e, MvpaError::DimensionMismatch { expected: 6, got: 5 }));

        let wide = Array2::zeros((1, 3));
        let e = check_inputs(train.view(), &targets, wide.view()).unwrap_err();
        assert!(matches!(e, MvpaError::DimensionMismatch { expected: 2, got: 3 }));

        let empty = Array2::zeros((0, 2));
        let e = check_inputs(empty.view(), &[], test.view()).unwrap_err();
        assert!(matches!(e, MvpaError::InvalidInput(_)));
    }

    #[test]
    fn test_separable_data() {
        let (train, targets, test, expected) = separable();
        let classifiers: [Box<dyn Classifier>; 2] =
            [Box::<NearestNeighbor>::default(), Box::<NaiveBayes>::default()];
        for c in classifiers.iter() {
            let pred = c.classify(train.view(), &targets, test.view()).unwrap();
            assert_eq!(pred, expected);
        }
    }
}

//! 数据集划分与交叉验证.

use std::collections::{BTreeSet, HashSet};

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::classify::Classifier;
use crate::data::Dataset;
use crate::diagnostics::{emit, DiagnosticSink, Diagnostics};
use crate::error::{MvpaError, MvpaResult};
use crate::normalize::{normalize, NormalizeConfig};

/// 一次划分: 训练样本与测试样本的索引.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Fold {
    /// 训练样本索引, 升序.
    pub train: Vec<usize>,

    /// 测试样本索引, 升序.
    pub test: Vec<usize>,
}

/// 留一分块 (n-fold) 划分: 每个不同的分块标签产生一个划分,
/// 该分块的样本作为测试集, 其余样本作为训练集. 划分按分块标签升序排列.
///
/// 不同的分块标签少于两个时返回 `Err(MvpaError::InvalidInput)`.
pub fn nfold(chunks: &[i32]) -> MvpaResult<Vec<Fold>> {
    let unique: BTreeSet<i32> = chunks.iter().copied().collect();
    if unique.len() < 2 {
        return Err(MvpaError::InvalidInput(format!(
            "n-fold partitioning needs at least 2 chunks, got {}",
            unique.len()
        )));
    }
    let folds = unique
        .into_iter()
        .map(|c| {
            let (test, train): (Vec<usize>, Vec<usize>) =
                (0..chunks.len()).partition(|&i| chunks[i] == c);
            Fold { train, test }
        })
        .collect();
    Ok(folds)
}

/// 交叉验证的结果.
#[derive(Debug, Clone, PartialEq)]
pub struct CrossValidation {
    /// 每个样本的预测标签. 从未作为测试样本的为 `None`;
    /// 多次作为测试样本时保留最后一次的预测.
    pub predictions: Vec<Option<i32>>,

    /// 所有被预测样本的正确率.
    pub accuracy: f64,

    /// 归一化过程中累计的诊断信息.
    pub diagnostics: Diagnostics,
}

/// 在划分 `folds` 上交叉验证分类器 `classifier`.
///
/// 若给出 `norm`, 每个划分的训练集与测试集分别按 `norm` 归一化;
/// 方向为逐特征时, 测试集使用训练集估计的参数. 非空诊断信息交给 `sink`.
///
/// # 返回值
///
/// 1. 数据集没有类别标签时返回 `Err(MvpaError::InvalidInput)`;
/// 2. 划分中存在越界索引, 训练集与测试集重叠, 或训练集/测试集为空时,
///   返回 `Err(MvpaError::InvalidInput)`;
/// 3. 分类器的错误直接返回.
pub fn crossvalidate<C, S>(
    ds: &Dataset,
    classifier: &C,
    folds: &[Fold],
    norm: Option<&NormalizeConfig>,
    sink: &mut S,
) -> MvpaResult<CrossValidation>
where
    C: Classifier + ?Sized,
    S: DiagnosticSink + ?Sized,
{
    let targets = ds
        .targets()
        .ok_or_else(|| MvpaError::InvalidInput("dataset has no targets".into()))?;
    for (i, fold) in folds.iter().enumerate() {
        check_fold(i, fold, ds.n_samples())?;
    }

    let mut predictions = vec![None; ds.n_samples()];
    let mut diagnostics = Diagnostics::default();
    for fold in folds {
        let train = ds.select_samples(&fold.train);
        let test = ds.select_samples(&fold.test);
        let train_targets: Vec<i32> = fold.train.iter().map(|&i| targets[i]).collect();

        let pred = match norm {
            Some(cfg) => {
                let trained = normalize(train.samples(), cfg);
                let (test_samples, d) = trained.params.apply(test.samples())?;
                let d = trained.diagnostics + d;
                emit(sink, "crossvalidate", &d);
                diagnostics += d;
                classifier.classify(trained.samples.view(), &train_targets, test_samples.view())?
            }
            None => classifier.classify(train.samples(), &train_targets, test.samples())?,
        };
        for (&i, p) in fold.test.iter().zip(pred) {
            predictions[i] = Some(p);
        }
    }

    let (tested, correct) = predictions
        .iter()
        .zip(targets)
        .filter_map(|(p, t)| p.map(|p| p == *t))
        .fold((0usize, 0usize), |(n, c), ok| (n + 1, c + usize::from(ok)));
    let accuracy = match tested {
        0 => f64::NAN,
        n => correct as f64 / n as f64,
    };
    log::debug!(
        "cross-validation over {} folds: {correct}/{tested} correct",
        folds.len()
    );
    Ok(CrossValidation {
        predictions,
        accuracy,
        diagnostics,
    })
}

fn check_fold(i: usize, fold: &Fold, n_samples: usize) -> MvpaResult<()> {
    let invalid = |msg: String| Err(MvpaError::InvalidInput(format!("fold {i}: {msg}")));
    if fold.train.is_empty() || fold.test.is_empty() {
        return invalid("empty train or test set".into());
    }
    if let Some(s) = fold
        .train
        .iter()
        .chain(fold.test.iter())
        .find(|&&s| s >= n_samples)
    {
        return invalid(format!("sample {s} out of range"));
    }
    let train: HashSet<usize> = fold.train.iter().copied().collect();
    if let Some(s) = fold.test.iter().find(|s| train.contains(s)) {
        return invalid(format!("sample {s} is in both train and test set"));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::{crossvalidate, nfold, Fold};
    use crate::classify::{NaiveBayes, NearestNeighbor};
    use crate::data::Dataset;
    use crate::diagnostics::{Diagnostics, NullSink};
    use crate::error::MvpaError;
    use ndarray::array;

    fn f64_eq(a: f64, b: f64) -> bool {
        (a - b).abs() < 1e-8
    }

    fn two_class() -> Dataset {
        Dataset::new(array![
            [0.0, 1.0],
            [10.0, 1.2],
            [0.3, 0.9],
            [9.7, 1.1],
            [-0.2, 1.0],
            [10.1, 0.8]
        ])
        .with_targets(vec![1, 2, 1, 2, 1, 2])
        .unwrap()
        .with_chunks(vec![0, 0, 1, 1, 2, 2])
        .unwrap()
    }

    #[test]
    fn test_nfold() {
        let folds = nfold(&[3, 1, 3, 1, 2]).unwrap();
        assert_eq!(folds.len(), 3);
        assert_eq!(
            folds[0],
            Fold {
                train: vec![0, 2, 4],
                test: vec![1, 3]
            }
        );
        assert_eq!(folds[1].test, vec![4]);
        assert_eq!(folds[2].train, vec![1, 3, 4]);

        let e = nfold(&[5, 5, 5]).unwrap_err();
        assert!(matches!(e, MvpaError::InvalidInput(_)));
        assert!(nfold(&[]).is_err());
    }

    #[test]
    fn test_crossvalidate() {
        let ds = two_class();
        let folds = nfold(ds.chunks().unwrap()).unwrap();
        let cv = crossvalidate(&ds, &NearestNeighbor::default(), &folds, None, &mut NullSink)
            .unwrap();
        assert!(f64_eq(cv.accuracy, 1.0));
        assert_eq!(
            cv.predictions,
            vec![Some(1), Some(2), Some(1), Some(2), Some(1), Some(2)]
        );

        let cfg = "zscore".parse().unwrap();
        let cv = crossvalidate(&ds, &NaiveBayes::default(), &folds, Some(&cfg), &mut NullSink)
            .unwrap();
        assert!(f64_eq(cv.accuracy, 1.0));
        assert!(cv.diagnostics.is_clean());
    }

    #[test]
    fn test_partial_folds() {
        let ds = two_class();
        let folds = [Fold {
            train: vec![0, 1, 2, 3],
            test: vec![4],
        }];
        let cv = crossvalidate(&ds, &NearestNeighbor::default(), &folds, None, &mut NullSink)
            .unwrap();
        assert_eq!(cv.predictions[4], Some(1));
        assert!(cv.predictions[..4].iter().all(Option::is_none));
        assert!(f64_eq(cv.accuracy, 1.0));
    }

    #[test]
    fn test_non_finite_reported() {
        // 训练集中第 1 个特征为常数, z-score 后为 NaN.
        let ds = Dataset::new(array![[0.0, 1.0], [1.0, 1.0], [5.0, 2.0], [6.0, 2.0]])
            .with_targets(vec![1, 1, 2, 2])
            .unwrap();
        let folds = [Fold {
            train: vec![0, 1],
            test: vec![2, 3],
        }];
        let mut seen = Diagnostics::default();
        let cfg = "zscore".parse().unwrap();
        let cv = crossvalidate(&ds, &NearestNeighbor::default(), &folds, Some(&cfg), &mut seen)
            .unwrap();
        assert_eq!(cv.diagnostics.non_finite, 4);
        assert_eq!(seen, cv.diagnostics);
    }

    #[test]
    fn test_invalid_folds() {
        let ds = two_class();
        let nn = NearestNeighbor::default();
        for folds in [
            vec![Fold {
                train: vec![0, 1],
                test: vec![1],
            }],
            vec![Fold {
                train: vec![0],
                test: vec![6],
            }],
            vec![Fold {
                train: vec![],
                test: vec![0],
            }],
        ] {
            let e = crossvalidate(&ds, &nn, &folds, None, &mut NullSink).unwrap_err();
            assert!(matches!(e, MvpaError::InvalidInput(_)));
        }

        let no_targets = Dataset::new(array![[1.0], [2.0]]);
        let folds = [Fold {
            train: vec![0],
            test: vec![1],
        }];
        let e = crossvalidate(&no_targets, &nn, &folds, None, &mut NullSink).unwrap_err();
        assert!(matches!(e, MvpaError::InvalidInput(_)));
    }
}

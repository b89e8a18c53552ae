#![warn(missing_docs)] // <= 合适时移除它.
// #![warn(clippy::missing_docs_in_private_items)]  // <= too strict.

//! 核心库. 提供 fMRI/MEEG 体数据集的结构化信息和多变量模式分析 (MVPA) 的基础算法.
//!
//! 该 crate 目前仅提供 `safe` 接口.
//!
//! # 注意
//!
//! 1. 体数据的读取只适配 nifti 格式, 写出由外部工具负责.
//! 2. 所有可预期的错误都以 [`MvpaError`] 同步返回, 不产生部分结果.
//!   违反内部不变量时程序会直接 panic, 而不会导致内存错误. As what Rust promises.
//!
//! # 开发计划
//!
//! ### 体数据方向重排 ✅
//!
//! 在 48 种方向代码 (如 `LPI`, `RAS`) 之间转换体数据集,
//! 重新计算仿射矩阵, 且转换回原方向时数据集完全复原.
//!
//! 实现位于 `mvpa-berry/src/data/orient.rs`.
//!
//! ### 空间聚类 ✅
//!
//! 在任意邻域关系上求值相同的非零特征的连通分量, 并按统计量排序.
//!
//! 实现位于 `mvpa-berry/src/cluster`.
//!
//! ### 体素网格邻域 ✅
//!
//! 6/18/26-邻域, 以及邻域关系的压缩存储.
//!
//! 实现位于 `mvpa-berry/src/neighborhood`.
//!
//! ### 归一化 ✅
//!
//! `demean`, `zscore`, `scale_unit` 三种方法, 逐特征或逐样本.
//! 非有限值通过诊断信息报告, 不视为错误.
//!
//! 实现位于 `mvpa-berry/src/normalize.rs`.
//!
//! ### 原生分类器与交叉验证 ✅
//!
//! 1. k 近邻 ✅
//! 2. 高斯朴素贝叶斯 ✅
//! 3. 留一分块 (n-fold) 划分与交叉验证 ✅
//! 4. 外部 SVM 库的适配 ⌛️
//!
//! 实现位于 `mvpa-berry/src/classify` 和 `mvpa-berry/src/partition.rs`.
//!
//! ### 小功能 ✅
//!
//! 1. 通过 sform/qform 读取 nifti 仿射矩阵. ✅
//! 2. Data iterator ✅
//!
//! ### 完善代码文档 ✅
//!
//! 给每个 public API 提供文档, 并视情况给 private
//! API 提供文档.

/// 三维索引, 同时也可一定程度上用作非负整数向量.
pub type Idx3d = (usize, usize, usize);

/// 数据集与体数据的基础数据结构.
mod data;

pub use data::orient::{self, reorient, reorient_to, AxisCode, OrientConfig, Orientation};
pub use data::{Affine, Dataset, VolumeDataset, VolumeGeometry};

pub mod consts;

mod error;

pub use error::{MvpaError, MvpaResult};

pub mod classify;
pub mod cluster;
pub mod dataset;
pub mod diagnostics;
pub mod neighborhood;
pub mod normalize;
pub mod partition;
pub mod prelude;

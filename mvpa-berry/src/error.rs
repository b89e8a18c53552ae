//! 运行时错误.

use thiserror::Error;

/// 数据集校验, 方向重排, 聚类与归一化的运行时错误.
///
/// 所有错误都在校验失败时立即同步返回, 不产生部分结果.
#[derive(Debug, Error)]
pub enum MvpaError {
    /// 方向代码非法 (长度不为 3, 字母不在 `{L,R,P,A,I,S}` 中, 或轴重复).
    #[error("invalid orientation code `{0}`")]
    InvalidOrientation(String),

    /// 仿射矩阵第 `axis` 个体素轴的主导世界轴无法确定.
    #[error("ambiguous dominant world axis for voxel axis {axis}")]
    AmbiguousOrientation {
        /// 出问题的体素轴 (0, 1 或 2).
        axis: usize,
    },

    /// 输入值或形状不合法.
    #[error("invalid input: {0}")]
    InvalidInput(String),

    /// 特征数 (或样本数) 不一致.
    ///
    /// 第一个字段是期望的长度, 第二个字段是实际得到的长度.
    #[error("dimension mismatch: expected {expected}, got {got}")]
    DimensionMismatch {
        /// 期望长度.
        expected: usize,
        /// 实际长度.
        got: usize,
    },

    /// 邻域关系结构不合法.
    #[error("invalid neighborhood: {0}")]
    InvalidNeighborhood(String),

    /// 未知的方法名 (归一化方法, 连通性等).
    #[error("unknown method `{0}`")]
    UnknownMethod(String),

    /// nifti 文件读取错误.
    #[error(transparent)]
    Nifti(#[from] nifti::NiftiError),

    /// 压缩/解压缩错误.
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

/// 本 crate 的运行时结果.
pub type MvpaResult<T> = Result<T, MvpaError>;

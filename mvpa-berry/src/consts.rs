//! 通用常量.

/// 方向代码字母表. 每对字母描述同一世界轴的两个方向.
pub mod axis {
    /// 向左 (世界 x 轴负方向).
    pub const LEFT: u8 = b'L';

    /// 向右 (世界 x 轴正方向).
    pub const RIGHT: u8 = b'R';

    /// 向后 (世界 y 轴负方向).
    pub const POSTERIOR: u8 = b'P';

    /// 向前 (世界 y 轴正方向).
    pub const ANTERIOR: u8 = b'A';

    /// 向下 (世界 z 轴负方向).
    pub const INFERIOR: u8 = b'I';

    /// 向上 (世界 z 轴正方向).
    pub const SUPERIOR: u8 = b'S';
}

/// 合法方向代码的总数: 3! 种轴排列, 每种 2^3 种符号组合.
pub const ORIENTATION_COUNT: usize = 48;

/// 体素坐标与世界坐标互相换算时的容差.
pub const COORD_TOLERANCE: f64 = 1e-5;

/// 仿射矩阵行列式绝对值低于该值时视为不可逆.
pub const SINGULAR_DET: f64 = 1e-12;

/// 判断主导轴时默认的相对容差.
///
/// 若次大分量不小于 `(1 - DOMINANCE_RTOL) * 最大分量`, 主导轴视为不确定.
pub const DOMINANCE_RTOL: f64 = 1e-4;

/// 朴素贝叶斯分类器默认的方差平滑系数.
///
/// 每个类别的方差加上 `NB_VAR_SMOOTHING * 训练集各特征方差的最大值`.
pub const NB_VAR_SMOOTHING: f64 = 1e-2;

/// 朴素贝叶斯分类器方差的绝对下限. 训练集所有特征均为常数时生效.
pub const NB_VAR_FLOOR: f64 = 1e-10;

//! 消融实验依赖的通用组件.

use mvpa_berry::neighborhood::{Connectivity, GridConfig};

pub mod loader;

const SEP: &str = "--------------------------------------------------------";

/// 简单分隔线.
#[inline]
pub fn sep() {
    println!("{SEP}");
}

/// 获得可并行核心数.
pub fn cpus() -> usize {
    std::thread::available_parallelism().map_or_else(|_| num_cpus::get(), usize::from)
}

/// 一般情况下合适的体素聚类邻域: 共面 6-邻域.
#[inline]
pub fn face_grid() -> GridConfig {
    GridConfig::new(Connectivity::Face)
}

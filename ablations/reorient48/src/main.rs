//! 48 种方向代码的往返重排, 以及体素网格聚类的耗时统计.
//!
//! 数据来自 `$MVPA_VOLUME_DIR` 或 `$HOME/dataset/volumes` 下的 `vol-XXX.nii`;
//! 目录不存在时使用内置的合成体数据.

mod profile;
mod result;
mod runner;

fn main() {
    simple_logger::init_with_level(log::Level::Info).expect("Logger initialization error");
    log::info!("{} cpus available", utils::cpus());

    let result = runner::run();
    result.analyze();
}

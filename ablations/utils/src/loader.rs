//! 对 `mvpa-berry::dataset` 的更一层封装. 提供更直接的数据集加载器.

use mvpa_berry::dataset::{self, VolumeLoader};
use mvpa_berry::MvpaResult;
use std::env;
use std::path::{Path, PathBuf};

/// 体数据文件的默认命名: `vol-{index:03}.nii`.
fn default_name(idx: u32) -> String {
    format!("vol-{idx:03}.nii")
}

/// 获取体数据集基本路径.
///
/// 1. 若环境变量 `$MVPA_VOLUME_DIR` 非空, 则返回其值;
/// 2. 否则, 返回 `$HOME/dataset/volumes`.
///
/// 无法确定用户主目录时返回 `None`.
pub fn volume_dir_from_env_or_home() -> Option<PathBuf> {
    match env::var("MVPA_VOLUME_DIR") {
        Ok(d) if !d.is_empty() => Some(PathBuf::from(d)),
        _ => dataset::home_dataset_dir_with(["volumes"]),
    }
}

/// 获取 `path` 下的体数据加载器. 加载 `vol-000.nii` 起连续编号的全部文件.
pub fn volume_loader<P: AsRef<Path>>(path: P) -> MvpaResult<VolumeLoader> {
    let path = path.as_ref();
    let count = (0u32..)
        .take_while(|&i| path.join(default_name(i)).is_file())
        .count() as u32;
    dataset::volume_loader(0..count, path, default_name)
}

/// 从 `$MVPA_VOLUME_DIR` 或者 `$HOME/dataset/volumes` 下加载体数据.
/// 目录不存在时返回 `None`.
#[inline]
pub fn volume_loader_from_env_or_home() -> Option<VolumeLoader> {
    volume_dir_from_env_or_home().and_then(|p| volume_loader(p).ok())
}

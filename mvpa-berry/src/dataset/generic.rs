//! 按编号批量读取同一目录下的 nifti 体数据.

use std::path::{Path, PathBuf};
use std::vec;

use crate::data::VolumeDataset;
use crate::error::{MvpaError, MvpaResult};

/// 由体数据编号得到文件名, 如 `|i| format!("sub-{i:02}.nii")`.
pub type FilenameBuilder = fn(u32) -> String;

/// 在目录 `dir` 下按 `indices` 的顺序依次读取 `builder(index)` 文件.
///
/// 文件在迭代时才打开; 某个文件缺失或损坏只影响对应的那一项.
///
/// # 返回值
///
/// `dir` 不是目录时返回 `Err(MvpaError::InvalidInput)`.
pub fn volume_loader<I: IntoIterator<Item = u32>, P: AsRef<Path>>(
    indices: I,
    dir: P,
    builder: FilenameBuilder,
) -> MvpaResult<VolumeLoader> {
    let dir = dir.as_ref();
    if !dir.is_dir() {
        return Err(MvpaError::InvalidInput(format!(
            "{} is not a directory",
            dir.display()
        )));
    }
    Ok(VolumeLoader {
        dir: dir.to_owned(),
        indices: indices.into_iter().collect::<Vec<_>>().into_iter(),
        builder,
    })
}

/// 体数据迭代器, 每项为 `(编号, 读取结果)`. 见 [`volume_loader`].
#[derive(Debug)]
pub struct VolumeLoader {
    dir: PathBuf,
    indices: vec::IntoIter<u32>,
    builder: FilenameBuilder,
}

impl VolumeLoader {
    /// 所在目录.
    #[inline]
    pub fn dir(&self) -> &Path {
        &self.dir
    }
}

impl Iterator for VolumeLoader {
    type Item = (u32, MvpaResult<VolumeDataset>);

    fn next(&mut self) -> Option<Self::Item> {
        let idx = self.indices.next()?;
        let file = self.dir.join((self.builder)(idx));
        log::debug!("Loading volume {idx} from {}", file.display());
        Some((idx, VolumeDataset::open(file)))
    }

    #[inline]
    fn size_hint(&self) -> (usize, Option<usize>) {
        self.indices.size_hint()
    }
}

impl ExactSizeIterator for VolumeLoader {}

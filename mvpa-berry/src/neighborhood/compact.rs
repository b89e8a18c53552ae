use std::io::{Read, Write};

use flate2::read::ZlibDecoder;
use flate2::write::ZlibEncoder;
use flate2::Compression;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use super::Neighborhood;
use crate::error::{MvpaError, MvpaResult};

/// 压缩存储的 [`Neighborhood`]; 不透明类型.
///
/// 大尺寸体数据的 26-邻域关系占用可观的内存, 不使用时可以压缩保存.
#[derive(Debug, Clone)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct CompactNeighborhood {
    /// 压缩的不透明字节流.
    buf: Vec<u8>,

    /// 特征个数.
    n_features: usize,

    /// 有向边个数.
    n_edges: usize,
}

impl CompactNeighborhood {
    pub(super) fn new(offsets: &[usize], targets: &[usize]) -> MvpaResult<Self> {
        let mut e = ZlibEncoder::new(Vec::with_capacity(8), Compression::best());
        for v in offsets.iter().chain(targets.iter()) {
            e.write_all(&(*v as u64).to_le_bytes())?;
        }
        Ok(Self {
            buf: e.finish()?,
            n_features: offsets.len() - 1,
            n_edges: targets.len(),
        })
    }

    /// 特征个数.
    #[inline]
    pub fn len(&self) -> usize {
        self.n_features
    }

    /// 是否不含任何特征?
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.n_features == 0
    }

    /// 压缩后的字节数.
    #[inline]
    pub fn compressed_size(&self) -> usize {
        self.buf.len()
    }

    /// 解压缩数据. 字节流损坏, 或记录的尺寸与字节流不符时返回 `Err`.
    pub fn decompress(&self) -> MvpaResult<Neighborhood> {
        let bytes = self
            .n_features
            .checked_add(1)
            .and_then(|w| w.checked_add(self.n_edges))
            .and_then(|w| w.checked_mul(8))
            .ok_or_else(|| {
                MvpaError::InvalidNeighborhood(format!(
                    "size overflow: {} features, {} edges",
                    self.n_features, self.n_edges
                ))
            })?;
        // 多读 1 字节, 以发现比记录尺寸更长的字节流.
        let mut d = ZlibDecoder::new(self.buf.as_slice()).take(bytes as u64 + 1);
        let mut raw = Vec::new();
        d.read_to_end(&mut raw)?;
        if raw.len() != bytes {
            return Err(MvpaError::InvalidNeighborhood(format!(
                "expected {bytes} bytes after decompression, got {}",
                raw.len()
            )));
        }
        let mut values = raw.chunks_exact(8).map(|c| {
            let mut b = [0u8; 8];
            b.copy_from_slice(c);
            u64::from_le_bytes(b) as usize
        });
        let offsets: Vec<usize> = values.by_ref().take(self.n_features + 1).collect();
        let targets: Vec<usize> = values.collect();
        Neighborhood::from_csr(offsets, targets)
    }
}

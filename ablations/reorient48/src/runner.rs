//! 程序运行函数.

use crate::profile::Profile;
use crate::result::AblationResult;
use mvpa_berry::cluster::{clusterize_mask, label_map};
use mvpa_berry::neighborhood::voxel_grid;
use mvpa_berry::{reorient_to, Affine, OrientConfig, Orientation, VolumeDataset};
use ndarray::Array3;
use std::thread;
use utils::loader;

/// 实际运行.
pub fn run() -> AblationResult {
    let volumes = load_volumes();
    let vols = volumes.as_slice();
    log::info!("Running ablation studies on {} volume(s)...", vols.len());

    thread::scope(|s| {
        let handles = [roundtrip, clustering].map(|t| s.spawn(move || t(vols)));

        ["roundtrip48", "clustering"]
            .into_iter()
            .zip(
                handles
                    .into_iter()
                    .map(|th| th.join().expect("Thread joining error")),
            )
            .collect()
    })
}

/// 从数据集目录加载体数据; 目录不存在时使用合成体数据.
fn load_volumes() -> Vec<VolumeDataset> {
    let Some(loader) = loader::volume_loader_from_env_or_home() else {
        log::warn!("Volume directory not found, falling back to synthetic volumes");
        return synthetic_volumes();
    };
    loader
        .filter_map(|(idx, r)| match r {
            Ok(v) => Some(v),
            Err(e) => {
                log::warn!("Volume {idx}: {e}");
                None
            }
        })
        .collect()
}

/// 三个不同方向的合成体数据.
fn synthetic_volumes() -> Vec<VolumeDataset> {
    let vol = Array3::from_shape_fn((24, 20, 16), |(i, j, k)| {
        ((i as f64 * 0.4).sin() + (j as f64 * 0.3).cos()) * (k as f64 * 0.2).sin()
    });
    [
        Affine::from_spacing([-2.0, -2.0, -2.5], [48.0, 40.0, 20.0]),
        Affine::from_spacing([3.0, 3.0, 3.0], [-36.0, -30.0, -24.0]),
        Affine::new([
            [0.0, 0.0, -2.0, 16.0],
            [2.0, 0.1, 0.0, -20.0],
            [0.0, 2.0, 0.0, -16.0],
            [0.0, 0.0, 0.0, 1.0],
        ]),
    ]
    .into_iter()
    .filter_map(Result::ok)
    .map(|a| VolumeDataset::from_volume(vol.clone(), a))
    .collect()
}

/// 每个体数据在 48 种方向上往返重排.
fn roundtrip(vols: &[VolumeDataset]) -> Profile {
    let mut profile = Profile::new();
    let cfg = OrientConfig::default();
    for (idx, vol) in vols.iter().enumerate() {
        let Ok(origin) = vol.orientation() else {
            log::warn!("Roundtrip: volume {idx} has no definite orientation");
            profile.count_skipped();
            continue;
        };
        profile.count_volume();
        log::info!("Roundtrip: volume {idx} ({origin})...");
        for &o in Orientation::all() {
            profile.op_start();
            let back = reorient_to(vol, o, &cfg).and_then(|there| reorient_to(&there, origin, &cfg));
            let ok = back.is_ok_and(|b| {
                b.dataset == vol.dataset
                    && b.geometry.voxels() == vol.geometry.voxels()
                    && b.geometry.affine().max_abs_diff(vol.geometry.affine()) < 1e-5
            });
            profile.op_elapsed(ok);
        }
    }
    profile.finish()
}

/// 每个体数据的首个样本按均值阈值化后, 在 6-邻域上聚类.
fn clustering(vols: &[VolumeDataset]) -> Profile {
    let mut profile = Profile::new();
    for (idx, vol) in vols.iter().enumerate() {
        let row = vol.dataset.samples();
        let mean = match vol.n_samples() {
            0 => None,
            _ => row.row(0).mean().filter(|m| m.is_finite()),
        };
        let Some(mean) = mean else {
            profile.count_skipped();
            continue;
        };
        profile.count_volume();
        log::info!("Clustering: volume {idx}...");
        let mask: Vec<bool> = row.row(0).iter().map(|&v| v > mean).collect();

        profile.op_start();
        let nh = voxel_grid(&vol.geometry, &utils::face_grid());
        let ok = clusterize_mask(&mask, &nh).is_ok_and(|clusters| {
            let active = mask.iter().filter(|&&m| m).count();
            let covered: usize = clusters.iter().map(|c| c.len()).sum();
            covered == active && label_map(&clusters, mask.len()).is_ok()
        });
        profile.op_elapsed(ok);
    }
    profile.finish()
}

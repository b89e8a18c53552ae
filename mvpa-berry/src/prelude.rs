//! 🍇欢迎光临🍓
//!
//! 涵盖了本 crate 一系列常用的功能.

pub use crate::Idx3d;

pub use crate::data::orient::{reorient, OrientConfig, Orientation};
pub use crate::data::{Affine, Dataset, VolumeDataset, VolumeGeometry};
pub use crate::error::{MvpaError, MvpaResult};

pub use crate::cluster::{clusterize, clusterize_mask, clusterize_rows, Cluster, ClusterStat};
pub use crate::neighborhood::{voxel_grid, Connectivity, GridConfig, Neighborhood};

pub use crate::classify::{Classifier, NaiveBayes, NearestNeighbor};
pub use crate::diagnostics::{DiagnosticSink, Diagnostics, LogSink};
pub use crate::normalize::{normalize, NormalizeConfig};
pub use crate::partition::{crossvalidate, nfold};

pub use crate::dataset::{self, home_dataset_dir_with};

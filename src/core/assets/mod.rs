pub mod asset_index;
pub mod extra_files;

pub use asset_index::{AssetIndex, AssetManager, AssetObject};
pub use extra_files::{fetch_extra_files, ExtraFile};

mod batch;
mod client;
mod telemetry;

pub use batch::{effective_concurrency, BatchReport};
pub use client::{DownloadTask, Downloader, MirrorHit, UrlInfo};
pub use telemetry::{Sample, SpeedMeter};

mod entry;
mod hash;
mod reconciler;

pub use entry::{retain_contained, safe_relative, EntryCategory, EntryKind, ManifestEntry};
pub use hash::{hash_file, sha1_file, verify_or_remove, HashAlgorithm};
pub use reconciler::BundleReconciler;

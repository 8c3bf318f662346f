// ─── InterfaceOficial Sync Core ───
// Game distribution synchronizer and mod-loader installer.
//
// Architecture:
//   core/
//     config/     — SyncConfig + tagged per-loader options
//     events/     — Progress/terminal event stream
//     archive/    — Jar/zip reading and composition
//     process/    — External processes with graceful termination
//     downloader/ — Concurrent downloads with speed/ETA telemetry
//     bundle/     — Manifest entries, reconciliation, pruning
//     maven/      — Artifact coordinates → paths and URLs
//     version/    — Mojang manifest + version JSON + OS rules
//     assets/     — Asset index, legacy copies, extra files
//     java/       — Managed Java runtime components
//     loaders/    — Forge, NeoForge, Fabric, LegacyFabric, Quilt + patching
//     install/    — Orchestrator, natives, classpath

pub mod archive;
pub mod assets;
pub mod bundle;
pub mod config;
pub mod downloader;
pub mod error;
pub mod events;
pub mod http;
pub mod install;
pub mod java;
pub mod loaders;
pub mod maven;
pub mod process;
pub mod version;

#[cfg(test)]
pub mod test_support;

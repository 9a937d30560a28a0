// ─── mc-launch-core ───
// Provisioning and launch engine for the Minecraft Java client.
//
// Architecture:
//   core/
//     config      — LaunchOptions (paths, memory, window, overrides)
//     auth/       — Identity record consumed by the argument builder
//     version/    — Mojang manifest + version JSON + rule evaluation
//     maven/      — Maven coordinate parsing for name-only libraries
//     downloader/ — Concurrent downloads with retry and SHA-1 checks
//     assets/     — Asset index + content-addressed objects
//     launch/     — Natives, classpath, arguments, process supervision
//     events      — Observer interface for progress and game output

pub mod assets;
pub mod auth;
pub mod config;
pub mod downloader;
pub mod error;
pub mod events;
pub mod http;
pub mod launch;
pub mod maven;
pub mod version;

#[cfg(test)]
pub(crate) mod testing;

pub mod manifest;
pub mod resolver;
pub mod rules;
pub mod version_file;

pub use manifest::{VersionEntry, VersionManifest};
pub use resolver::VersionResolver;
pub use rules::{
    argument_included, library_included, Arch, FeatureSet, OsFamily, OsRule, Platform, Rule,
    RuleAction,
};
pub use version_file::{
    Argument, Arguments, AssetIndexInfo, ConditionalArgument, DownloadArtifact,
    LibDownloadArtifact, Library, LibraryDownloads, ReleaseVersion, VersionDownloads,
    VersionJson,
};

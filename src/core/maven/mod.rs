mod artifact;

pub use artifact::MavenArtifact;

/// Repository used when a library names no `url` of its own.
pub const MOJANG_LIBRARIES: &str = "https://libraries.minecraft.net";

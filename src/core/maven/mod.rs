mod artifact;

pub use artifact::MavenArtifact;


//! ICU Forge Core
//!
//! Data model and filesystem logic shared by both build strategies:
//! build configuration, workspace paths, artifact discovery, packaging
//! into the canonical layout, and postcondition verification.

pub mod artifacts;
pub mod config;
pub mod error;
pub mod manifest;
pub mod packager;
pub mod telemetry;
pub mod verifier;
pub mod workspace;

pub use artifacts::{Artifact, ArtifactKind, ArtifactLocator, ArtifactPattern, ArtifactSet};
pub use config::{Architecture, BuildConfig, DataPackaging, Flavor, StrategyKind};
pub use error::{ForgeError, Postcondition, Result};
pub use manifest::Manifest;
pub use packager::{ArtifactPackager, PackagedBundle};
pub use telemetry::init_tracing;
pub use verifier::{BuildVerifier, VerificationReport};
pub use workspace::{Workspace, MANIFEST_FILE};

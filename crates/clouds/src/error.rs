//! Failure taxonomy of the cloud effect. None of these is fatal to the host.

use procgen::ArtworkError;
use renderer::RenderError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum EffectError {
    /// The rendering engine could not be brought up; the effect falls back to a gradient backdrop.
    #[error("rendering engine unavailable: {0}")]
    EngineLoad(#[source] RenderError),
    /// Optional artwork missing; procedural textures are used alone.
    #[error("cloud artwork unavailable: {0}")]
    AssetLoad(#[from] ArtworkError),
    /// A zone targets a layer that is not present; the zone is skipped.
    #[error("layer '{layer}' is not available for zone '{zone}'")]
    MissingLayer { zone: String, layer: &'static str },
    /// Drawing a frame failed; the frame is dropped.
    #[error("frame render failed: {0}")]
    Render(#[source] RenderError),
    #[error("effect has been destroyed")]
    Destroyed,
}

//! Error types for the engine.

use std::path::PathBuf;

use tessera_ecs::EcsError;

/// Errors produced by asset loading and lookups.
#[derive(Debug, thiserror::Error)]
pub enum AssetError {
    /// No resource with this name has been loaded (or it failed to load).
    #[error("resource not loaded: {name}")]
    NotFound { name: String },

    /// The file could not be read.
    #[error("unable to read resource {url:?}: {source}")]
    Io {
        url: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The file was read but its contents could not be decoded.
    #[error("unable to decode resource {url:?}: {reason}")]
    Decode { url: PathBuf, reason: String },

    /// The extension does not map to any known resource kind.
    #[error("unsupported resource kind '{kind}' for {url:?}")]
    UnsupportedKind { url: PathBuf, kind: String },

    /// `add_directory` was given something that is not a directory.
    #[error("{url:?} is not a directory")]
    NotADirectory { url: PathBuf },
}

/// Errors produced by the engine entry points and the scene manager.
#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    /// A frame rate limit of zero was requested.
    #[error("FPS Limit out of bounds. Requires > 0 (got {limit})")]
    InvalidFpsLimit { limit: u32 },

    /// `set_scene_by_name` was called with a name nobody registered.
    #[error("scene not registered: {name}")]
    SceneNotRegistered { name: String },

    /// An operation needed a current scene, but none is active.
    #[error("no scene is active")]
    NoScene,

    /// Run options could not be parsed or read.
    #[error("invalid run options: {reason}")]
    Config { reason: String },

    /// A window was requested, but the crate was built without the
    /// `renderer` feature.
    #[error("windowed mode requires the `renderer` feature; run headless instead")]
    RendererUnavailable,

    /// Window or event loop creation failed.
    #[error("window error: {0}")]
    Window(String),

    /// GPU adapter, device or surface setup failed.
    #[error("gpu error: {0}")]
    Gpu(String),

    #[error(transparent)]
    Asset(#[from] AssetError),

    #[error(transparent)]
    Ecs(#[from] EcsError),
}

impl From<serde_json::Error> for EngineError {
    fn from(e: serde_json::Error) -> Self {
        EngineError::Config {
            reason: e.to_string(),
        }
    }
}

//! Resource loading.
//!
//! Scenes queue files in their preload hook with [`Loader::add_resource`] or
//! [`Loader::add_directory`]; the scene manager then calls [`Loader::load`],
//! which decodes everything synchronously. A resource is looked up by its
//! file name, and its kind comes from the extension.
//!
//! Loading never fails as a whole: a file that cannot be read or decoded is
//! logged and skipped, and looking it up later returns
//! [`AssetError::NotFound`].

use std::collections::HashMap;
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::error::AssetError;
use crate::render::Texture;

// ---------------------------------------------------------------------------
// Resource kinds
// ---------------------------------------------------------------------------

/// What a file is, by extension.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResourceKind {
    Image,
    Json,
    Sound,
    Font,
}

impl ResourceKind {
    /// The kind for a file extension (without the dot, any case).
    pub fn from_extension(extension: &str) -> Option<Self> {
        match extension.to_ascii_lowercase().as_str() {
            "png" | "jpg" | "jpeg" => Some(Self::Image),
            "json" => Some(Self::Json),
            "wav" | "ogg" | "mp3" | "flac" => Some(Self::Sound),
            "ttf" | "otf" => Some(Self::Font),
            _ => None,
        }
    }
}

/// Raw encoded bytes of a sound or font, shared by every user.
#[derive(Clone, PartialEq, Eq)]
pub struct RawResource {
    name: String,
    bytes: Arc<[u8]>,
}

impl RawResource {
    pub fn new(name: impl Into<String>, bytes: impl Into<Arc<[u8]>>) -> Self {
        Self {
            name: name.into(),
            bytes: bytes.into(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn bytes(&self) -> &Arc<[u8]> {
        &self.bytes
    }
}

impl fmt::Debug for RawResource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RawResource")
            .field("name", &self.name)
            .field("len", &self.bytes.len())
            .finish()
    }
}

/// Encoded audio; decoded by the audio backend when played.
pub type Sound = RawResource;
/// Encoded font file.
pub type Font = RawResource;

#[derive(Debug, Clone)]
enum Resource {
    Image(Texture),
    Json(serde_json::Value),
    Sound(Sound),
    Font(Font),
}

/// A file waiting to be loaded.
#[derive(Debug, Clone, PartialEq)]
struct Queued {
    name: String,
    url: PathBuf,
}

// ---------------------------------------------------------------------------
// Loader
// ---------------------------------------------------------------------------

/// Queues, decodes and stores resources by name.
#[derive(Debug, Default)]
pub struct Loader {
    queue: Vec<Queued>,
    resources: HashMap<String, Resource>,
}

impl Loader {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue a file for the next [`load`](Self::load).
    ///
    /// Files without an extension cannot be typed and are skipped with a
    /// warning.
    pub fn add_resource(&mut self, url: impl AsRef<Path>) {
        let url = url.as_ref();
        let Some(name) = url.file_name().and_then(|n| n.to_str()) else {
            tracing::warn!(url = %url.display(), "resource has no file name; skipped");
            return;
        };
        if url.extension().is_none() {
            tracing::warn!(url = %url.display(), "cannot load extensionless resource; skipped");
            return;
        }
        tracing::debug!(name, url = %url.display(), "resource queued");
        self.queue.push(Queued {
            name: name.to_owned(),
            url: url.to_path_buf(),
        });
    }

    /// Queue every file in `url`, descending into subdirectories when
    /// `recursive` is set.
    pub fn add_directory(&mut self, url: impl AsRef<Path>, recursive: bool) -> Result<(), AssetError> {
        let url = url.as_ref();
        if !url.is_dir() {
            return Err(AssetError::NotADirectory {
                url: url.to_path_buf(),
            });
        }
        let io_err = |source| AssetError::Io {
            url: url.to_path_buf(),
            source,
        };

        let mut entries = std::fs::read_dir(url)
            .map_err(io_err)?
            .collect::<Result<Vec<_>, _>>()
            .map_err(io_err)?;
        entries.sort_by_key(|entry| entry.file_name());

        for entry in entries {
            let path = entry.path();
            if path.is_dir() {
                if recursive {
                    self.add_directory(&path, recursive)?;
                }
            } else {
                self.add_resource(&path);
            }
        }
        Ok(())
    }

    /// Number of files waiting for [`load`](Self::load).
    pub fn queued(&self) -> usize {
        self.queue.len()
    }

    /// Decode every queued file, then call `on_finish`.
    ///
    /// Names that are already loaded are not loaded again. Returns how many
    /// resources were added.
    pub fn load<F: FnOnce()>(&mut self, on_finish: F) -> usize {
        let mut loaded = 0;
        for queued in std::mem::take(&mut self.queue) {
            if self.resources.contains_key(&queued.name) {
                continue;
            }
            match read_resource(&queued.url) {
                Ok(resource) => {
                    self.resources.insert(queued.name, resource);
                    loaded += 1;
                }
                Err(e) => {
                    tracing::warn!(name = %queued.name, error = %e, "error loading resource; skipped");
                }
            }
        }
        tracing::info!(loaded, total = self.resources.len(), "resources loaded");
        on_finish();
        loaded
    }

    /// Decode `bytes` as the resource `name` (whose extension picks the
    /// kind) and store it, replacing any previous resource of that name.
    pub fn add_bytes(&mut self, name: &str, bytes: &[u8]) -> Result<(), AssetError> {
        let resource = decode(Path::new(name), bytes)?;
        self.resources.insert(name.to_owned(), resource);
        Ok(())
    }

    /// Register an already-built texture under `name`.
    pub fn add_image(&mut self, name: impl Into<String>, texture: Texture) {
        self.resources.insert(name.into(), Resource::Image(texture));
    }

    // -- lookups ------------------------------------------------------------

    pub fn is_loaded(&self, name: &str) -> bool {
        self.resources.contains_key(name)
    }

    pub fn image(&self, name: &str) -> Result<Texture, AssetError> {
        match self.resources.get(name) {
            Some(Resource::Image(texture)) => Ok(texture.clone()),
            _ => Err(not_found(name)),
        }
    }

    pub fn json(&self, name: &str) -> Result<&serde_json::Value, AssetError> {
        match self.resources.get(name) {
            Some(Resource::Json(value)) => Ok(value),
            _ => Err(not_found(name)),
        }
    }

    pub fn sound(&self, name: &str) -> Result<Sound, AssetError> {
        match self.resources.get(name) {
            Some(Resource::Sound(sound)) => Ok(sound.clone()),
            _ => Err(not_found(name)),
        }
    }

    pub fn font(&self, name: &str) -> Result<Font, AssetError> {
        match self.resources.get(name) {
            Some(Resource::Font(font)) => Ok(font.clone()),
            _ => Err(not_found(name)),
        }
    }
}

fn not_found(name: &str) -> AssetError {
    AssetError::NotFound {
        name: name.to_owned(),
    }
}

fn read_resource(url: &Path) -> Result<Resource, AssetError> {
    let bytes = std::fs::read(url).map_err(|source| AssetError::Io {
        url: url.to_path_buf(),
        source,
    })?;
    decode(url, &bytes)
}

fn decode(url: &Path, bytes: &[u8]) -> Result<Resource, AssetError> {
    let extension = url
        .extension()
        .and_then(|e| e.to_str())
        .unwrap_or_default();
    let kind = ResourceKind::from_extension(extension).ok_or_else(|| AssetError::UnsupportedKind {
        url: url.to_path_buf(),
        kind: extension.to_owned(),
    })?;
    let decode_err = |reason: String| AssetError::Decode {
        url: url.to_path_buf(),
        reason,
    };
    let name = url
        .file_name()
        .and_then(|n| n.to_str())
        .unwrap_or_default();

    match kind {
        ResourceKind::Image => {
            let image = image::load_from_memory(bytes).map_err(|e| decode_err(e.to_string()))?;
            Ok(Resource::Image(Texture::from_image(image.to_rgba8())))
        }
        ResourceKind::Json => {
            let value = serde_json::from_slice(bytes).map_err(|e| decode_err(e.to_string()))?;
            Ok(Resource::Json(value))
        }
        ResourceKind::Sound => Ok(Resource::Sound(RawResource::new(name, bytes))),
        ResourceKind::Font => Ok(Resource::Font(RawResource::new(name, bytes))),
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

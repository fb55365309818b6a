//! Sound playback.
//!
//! An [`AudioComponent`] names a sound loaded by the asset [`Loader`]. The
//! [`AudioSystem`] creates a [`Player`] for it the first time it updates,
//! keeps its volume in line with the master volume and the camera distance,
//! restarts repeating sounds and drops finished one-shots.
//!
//! Playback goes through an [`AudioBackend`]. With the `audio` feature the
//! default backend drives the default output device through rodio; without
//! it, or when no device can be opened, every sound plays silently.
//!
//! [`Loader`]: crate::assets::Loader

use std::fmt;

use serde::{Deserialize, Serialize};

use tessera_ecs::component::{ComponentBag, Shared};
use tessera_ecs::entity::EntityId;
use tessera_ecs::system::System;
use tessera_ecs::table::EntityTable;

use crate::assets::Sound;
use crate::context::EngineContext;
use crate::geometry::{Point, SpaceComponent};

/// Distance from the camera at which a positioned sound plays at half volume.
pub const DEFAULT_REFERENCE_DISTANCE: f32 = 400.0;

/// Errors from an audio backend.
#[derive(Debug, thiserror::Error)]
pub enum AudioError {
    /// No output device could be opened.
    #[error("no audio output device: {0}")]
    NoDevice(String),

    /// The sound data could not be decoded.
    #[error("unable to decode sound {name}: {reason}")]
    Decode { name: String, reason: String },
}

// ---------------------------------------------------------------------------
// Backend traits
// ---------------------------------------------------------------------------

/// One playing sound.
pub trait Player {
    fn play(&mut self);
    /// Start again from the beginning.
    fn restart(&mut self);
    fn stop(&mut self);
    /// Whether playback reached the end.
    fn is_finished(&self) -> bool;
    /// Set the effective volume, `1.0` being unchanged.
    fn set_volume(&mut self, volume: f32);
}

/// Creates players for sounds.
pub trait AudioBackend {
    fn create_player(&mut self, sound: &Sound) -> Result<Box<dyn Player>, AudioError>;
}

/// A backend that plays nothing. Every sound finishes immediately.
#[derive(Debug, Default, Clone, Copy)]
pub struct NullBackend;

#[derive(Debug, Default)]
struct NullPlayer;

impl Player for NullPlayer {
    fn play(&mut self) {}
    fn restart(&mut self) {}
    fn stop(&mut self) {}
    fn is_finished(&self) -> bool {
        true
    }
    fn set_volume(&mut self, _volume: f32) {}
}

impl AudioBackend for NullBackend {
    fn create_player(&mut self, _sound: &Sound) -> Result<Box<dyn Player>, AudioError> {
        Ok(Box::new(NullPlayer))
    }
}

#[cfg(feature = "audio")]
pub use device::RodioBackend;

#[cfg(feature = "audio")]
mod device {
    use std::io::Cursor;
    use std::sync::Arc;

    use rodio::mixer::Mixer;
    use rodio::{Decoder, OutputStream, OutputStreamBuilder, Sink};

    use super::{AudioBackend, AudioError, Player};
    use crate::assets::Sound;

    /// Plays sounds on the default output device.
    pub struct RodioBackend {
        _stream: OutputStream,
        mixer: Mixer,
    }

    impl RodioBackend {
        pub fn new() -> Result<Self, AudioError> {
            let stream = OutputStreamBuilder::from_default_device()
                .map_err(|e| AudioError::NoDevice(e.to_string()))?
                .open_stream()
                .map_err(|e| AudioError::NoDevice(e.to_string()))?;
            let mixer = stream.mixer().clone();
            Ok(Self {
                _stream: stream,
                mixer,
            })
        }
    }

    struct RodioPlayer {
        name: String,
        bytes: Arc<[u8]>,
        sink: Sink,
    }

    impl RodioPlayer {
        fn append(&self) -> Result<(), AudioError> {
            let source = Decoder::new(Cursor::new(self.bytes.clone())).map_err(|e| {
                AudioError::Decode {
                    name: self.name.clone(),
                    reason: e.to_string(),
                }
            })?;
            self.sink.append(source);
            Ok(())
        }
    }

    impl Player for RodioPlayer {
        fn play(&mut self) {
            self.sink.play();
        }

        fn restart(&mut self) {
            if let Err(e) = self.append() {
                tracing::warn!(error = %e, "sound not restarted");
            }
            self.sink.play();
        }

        fn stop(&mut self) {
            self.sink.stop();
        }

        fn is_finished(&self) -> bool {
            self.sink.empty()
        }

        fn set_volume(&mut self, volume: f32) {
            self.sink.set_volume(volume);
        }
    }

    impl AudioBackend for RodioBackend {
        fn create_player(&mut self, sound: &Sound) -> Result<Box<dyn Player>, AudioError> {
            let player = RodioPlayer {
                name: sound.name().to_owned(),
                bytes: sound.bytes().clone(),
                sink: Sink::connect_new(&self.mixer),
            };
            player.sink.pause();
            player.append()?;
            Ok(Box::new(player))
        }
    }
}

/// The device backend when available, otherwise silence.
pub fn default_backend() -> Box<dyn AudioBackend> {
    #[cfg(feature = "audio")]
    {
        match RodioBackend::new() {
            Ok(backend) => return Box::new(backend),
            Err(e) => tracing::warn!(error = %e, "audio disabled"),
        }
    }
    Box::new(NullBackend)
}

// ---------------------------------------------------------------------------
// Component
// ---------------------------------------------------------------------------

/// A sound attached to an entity.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AudioComponent {
    /// Loader name of the sound.
    pub file: String,
    /// Play again when finished.
    pub repeat: bool,
    /// Ignore the entity's position.
    pub background: bool,
    /// Volume before master volume and distance, `1.0` being unchanged.
    pub volume: f32,
}

impl AudioComponent {
    pub fn new(file: impl Into<String>) -> Self {
        Self {
            file: file.into(),
            repeat: false,
            background: false,
            volume: 1.0,
        }
    }

    pub fn repeating(mut self) -> Self {
        self.repeat = true;
        self
    }

    pub fn background(mut self) -> Self {
        self.background = true;
        self
    }
}

// ---------------------------------------------------------------------------
// AudioSystem
// ---------------------------------------------------------------------------

/// What the audio system tracks per entity.
pub struct AudioEntity {
    pub audio: Shared<AudioComponent>,
    pub space: Shared<SpaceComponent>,
    player: Option<Box<dyn Player>>,
    warned: bool,
}

impl fmt::Debug for AudioEntity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AudioEntity")
            .field("audio", &self.audio)
            .field("space", &self.space)
            .field("playing", &self.player.is_some())
            .finish()
    }
}

/// Plays every tracked entity's sound.
pub struct AudioSystem {
    entities: EntityTable<AudioEntity>,
    backend: Box<dyn AudioBackend>,
    master_volume: f32,
    reference_distance: f32,
}

impl Default for AudioSystem {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for AudioSystem {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AudioSystem")
            .field("entities", &self.entities.len())
            .field("master_volume", &self.master_volume)
            .finish()
    }
}

impl AudioSystem {
    /// A system on the [`default_backend`].
    pub fn new() -> Self {
        Self::with_backend(default_backend())
    }

    pub fn with_backend(backend: Box<dyn AudioBackend>) -> Self {
        Self {
            entities: EntityTable::new(),
            backend,
            master_volume: 1.0,
            reference_distance: DEFAULT_REFERENCE_DISTANCE,
        }
    }

    /// Track `entity`. A second add of the same entity is ignored.
    pub fn add(
        &mut self,
        entity: EntityId,
        audio: Shared<AudioComponent>,
        space: Shared<SpaceComponent>,
    ) -> bool {
        self.entities
            .insert(
                entity,
                AudioEntity {
                    audio,
                    space,
                    player: None,
                    warned: false,
                },
            )
            .is_ok()
    }

    pub fn master_volume(&self) -> f32 {
        self.master_volume
    }

    /// Scale every sound by `volume` (clamped at zero).
    pub fn set_master_volume(&mut self, volume: f32) {
        self.master_volume = volume.max(0.0);
    }

    /// Distance at which positioned sounds play at half volume.
    pub fn set_reference_distance(&mut self, distance: f32) {
        self.reference_distance = distance.max(f32::EPSILON);
    }

    pub fn len(&self) -> usize {
        self.entities.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entities.is_empty()
    }

    /// Gain for a sound `distance` units from the listener.
    pub fn attenuation(&self, distance: f32) -> f32 {
        self.reference_distance / (self.reference_distance + distance.max(0.0))
    }
}

impl System<EngineContext> for AudioSystem {
    fn name(&self) -> &str {
        "audio"
    }

    fn update(&mut self, ctx: &EngineContext, _dt: f32) {
        let listener = {
            let camera = ctx.camera.borrow();
            Point::new(camera.x(), camera.y())
        };
        let master = self.master_volume;
        let reference = self.reference_distance;
        let mut finished = Vec::new();

        for (id, e) in self.entities.iter_mut() {
            let audio = e.audio.borrow().clone();

            if e.player.is_none() {
                let sound = match ctx.assets.borrow().sound(&audio.file) {
                    Ok(sound) => sound,
                    Err(err) => {
                        if !e.warned {
                            tracing::warn!(entity = %id, error = %err, "audio file not loaded");
                            e.warned = true;
                        }
                        continue;
                    }
                };
                match self.backend.create_player(&sound) {
                    Ok(mut player) => {
                        player.play();
                        e.player = Some(player);
                    }
                    Err(err) => {
                        if !e.warned {
                            tracing::warn!(entity = %id, error = %err, "audio player not created");
                            e.warned = true;
                        }
                        continue;
                    }
                }
            }

            let Some(player) = e.player.as_mut() else {
                continue;
            };

            let mut volume = audio.volume * master;
            if !audio.background {
                let distance = e.space.borrow().center().point_distance(listener);
                volume *= reference / (reference + distance);
            }
            player.set_volume(volume);

            if player.is_finished() {
                if audio.repeat {
                    player.restart();
                } else {
                    player.stop();
                    finished.push(id);
                }
            }
        }

        for id in finished {
            tracing::debug!(entity = %id, "sound finished");
            self.entities.remove(id);
        }
    }

    fn remove(&mut self, entity: EntityId) {
        if let Some(mut removed) = self.entities.remove(entity) {
            if let Some(player) = removed.player.as_mut() {
                player.stop();
            }
        }
    }

    fn try_add(&mut self, entity: EntityId, bag: &ComponentBag) -> bool {
        match (bag.get::<AudioComponent>(), bag.get::<SpaceComponent>()) {
            (Some(audio), Some(space)) => self.add(entity, audio, space),
            _ => false,
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

//! Capabilities the body engine consumes from its surroundings.
//!
//! - **Presentation**: toggling visual layers on an actor
//! - **Audio**: positional sound playback for an audience
//! - **Spectating**: moving a mind out of its body

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;

use crate::entities::{EntityId, MindComponent};
use crate::mechanics::VisualLayer;
use crate::world_state::{Placement, SpectateRequest, WorldState};

/// Why a layer toggle was requested.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum LayerContext {
    PartAttached,
    PartDetached,
}

/// Sets visibility of named presentation layers on an actor.
pub trait Presentation {
    fn set_layers_visible(
        &mut self,
        actor: EntityId,
        layers: &[VisualLayer],
        visible: bool,
        permanent: bool,
        context: LayerContext,
    );
}

impl Presentation for WorldState {
    fn set_layers_visible(
        &mut self,
        actor: EntityId,
        layers: &[VisualLayer],
        visible: bool,
        permanent: bool,
        context: LayerContext,
    ) {
        if let Some(appearance) = self.actor_mut(actor).and_then(|a| a.appearance.as_mut()) {
            debug!(actor = %actor, ?layers, visible, ?context, "toggling layers");
            appearance.set_layers_visible(layers, visible, permanent);
        }
    }
}

/// A sound asset reference.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SoundSpec(pub String);

impl SoundSpec {
    pub fn new(path: impl Into<String>) -> Self {
        Self(path.into())
    }
}

/// Playback parameters.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct AudioParams {
    pub volume: f32,
    pub pitch: f32,
    /// Maximum random deviation applied to pitch at playback.
    pub variation: Option<f32>,
}

impl AudioParams {
    pub fn with_variation(mut self, variation: f32) -> Self {
        self.variation = Some(variation);
        self
    }
}

impl Default for AudioParams {
    fn default() -> Self {
        Self {
            volume: 0.0,
            pitch: 1.0,
            variation: None,
        }
    }
}

/// Who hears a sound.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum Audience {
    /// Every observer within `range` of the placement.
    InRange { range: f32 },
}

/// Audio playback failures.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum AudioError {
    #[error("audio device unavailable")]
    DeviceUnavailable,
}

/// Plays sounds at a placement.
pub trait AudioSink {
    fn play(
        &mut self,
        sound: &SoundSpec,
        audience: Audience,
        placement: Placement,
        params: AudioParams,
    ) -> Result<(), AudioError>;
}

/// One recorded playback request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlayedSound {
    pub sound: SoundSpec,
    pub audience: Audience,
    pub placement: Placement,
    pub params: AudioParams,
}

/// Audio sink that queues requests for a client to drain.
#[derive(Debug, Clone, Default)]
pub struct AudioQueue {
    played: Vec<PlayedSound>,
}

impl AudioQueue {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn played(&self) -> &[PlayedSound] {
        &self.played
    }

    pub fn drain(&mut self) -> Vec<PlayedSound> {
        std::mem::take(&mut self.played)
    }
}

impl AudioSink for AudioQueue {
    fn play(
        &mut self,
        sound: &SoundSpec,
        audience: Audience,
        placement: Placement,
        params: AudioParams,
    ) -> Result<(), AudioError> {
        self.played.push(PlayedSound {
            sound: sound.clone(),
            audience,
            placement,
            params,
        });
        Ok(())
    }
}

/// Moves minds out of bodies.
pub trait SpectatorService {
    fn request_spectate(&mut self, body: EntityId, mind: &MindComponent);
}

impl SpectatorService for WorldState {
    fn request_spectate(&mut self, body: EntityId, mind: &MindComponent) {
        debug!(body = %body, mind = %mind.id, "spectate requested");
        let requested_at = self.time.now;
        self.spectate_requests.push(SpectateRequest {
            mind: mind.id,
            body,
            can_return: mind.can_return,
            requested_at,
        });
    }
}

//! Playback engine and session state
//!
//! Layered as: [`controller`] drives the audio device for one track at a
//! time; [`engine`] owns queue, history and playlist-follow semantics on
//! top of it; [`serializer`] funnels all engine mutation through a single
//! worker so command interleaving cannot corrupt session state.

pub mod controller;
pub mod engine;
pub mod history;
pub mod queue;
pub mod reconcile;
pub mod selection;
pub mod serializer;
pub mod session;

pub use controller::{PlaybackController, PlayerEvent, TransportState};
pub use engine::PlayerEngine;
pub use queue::{Queue, TrackRef};
pub use reconcile::ChangedSong;
pub use serializer::CommandSerializer;
pub use session::{PlaybackSession, SessionSnapshot};

//! Audio playback for synthesized speech.
//!
//! [`AudioPlayer`] opens a fresh `rodio` output stream per utterance and
//! blocks until the clip ends or [`AudioPlayer::stop`] is called from another
//! thread.

pub mod player;

pub use player::{AudioError, AudioPlayer};

//! Polydub - Automated Video Dubbing Pipeline
//!
//! Produces a single deliverable video carrying the original streams plus
//! one subtitle track and one dubbed audio track per requested language,
//! using external transcription, translation, and speech services together
//! with ffmpeg for all media work.

pub mod cli;
pub mod config;
pub mod error;
pub mod lang;
pub mod media;
pub mod mux;
pub mod pipeline;
pub mod providers;
pub mod reconcile;
pub mod scope;
pub mod storage;
pub mod subtitle;
pub mod track;

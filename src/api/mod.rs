//! HTTP API endpoints
//!
//! Provides REST APIs for:
//! - Play API (verification of play attempts)
//! - Web API (statistics, catalog, health)

pub mod play;
pub mod web;

pub use play::{
    PlayApiState, TrackKey, VerifyPlayRequest, VerifyPlayResponse,
    create_router as create_play_router,
};
pub use web::{WebApiState, create_router as create_web_router};

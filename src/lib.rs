//! ComfyUI job worker
//!
//! This library drives image-generation jobs against a local ComfyUI
//! instance: it validates the request, waits for the backend, uploads input
//! images, queues the workflow, polls for completion and returns the
//! generated images, recording every state change in Redis.

pub mod app_state;
pub mod config;
pub mod models;
pub mod routes;
pub mod services;

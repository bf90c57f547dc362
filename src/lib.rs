//! Cycle report server library.
//!
//! Records E2E test cycles reported by runners, classifies failing cases against
//! declared known issues and recent history, and keeps spec and cycle counters current.

pub mod api;
pub mod config;
pub mod db;
pub mod entity;
pub mod error;
pub mod middleware;
pub mod migration;
pub mod models;
pub mod services;

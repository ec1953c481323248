// LunaTrack Domain
// This crate contains the cycle prediction and notification scheduling logic

// Configuration and ambient setup
pub mod config;
pub mod logging;

// Wall clock abstraction
pub mod clock;

// Time-of-day helpers
pub mod time_window;

// Domain entities
pub mod entities;

// Services that implement business logic
pub mod services;

// Local notification scheduling
pub mod notifications;

// Health checks and system status
pub mod health;

// Test doubles for the storage and notification seams
pub mod testing;

// Re-export the data crate for hosts that only depend on the domain
pub use luna_track_data as data;

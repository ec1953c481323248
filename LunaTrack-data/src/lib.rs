// LunaTrack Data
// This crate owns the persisted models and everything that talks to the key-value store

// Key-value store seam and the in-memory implementation
pub mod store;

// Repository implementations for data access
pub mod repository;

// Data storage models
pub mod models;

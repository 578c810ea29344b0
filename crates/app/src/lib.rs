#![deny(unsafe_code)]

/// Composition root wiring the store to its views.
pub mod app;
/// View components that read from and write to the messaging store.
pub mod chat;
/// Settings persistence.
pub mod settings;

//! Venue module - signed REST access to the futures venue

pub mod auth;
pub mod messages;
pub mod profile;
pub mod rest;
pub mod retry;

pub use profile::VenueProfile;
pub use rest::VenueHttpClient;

pub mod api;
pub mod config;
pub mod crypto;
pub mod error;
pub mod hasher;
pub mod http;
pub mod merkle;
pub mod provider;
pub mod receipt;
pub mod verify;

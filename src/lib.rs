// src/lib.rs — Library root for chatgate

pub mod audio;
pub mod cli;
pub mod core;
pub mod gateway;
pub mod imagegen;
pub mod infra;
pub mod integrations;
pub mod provider;

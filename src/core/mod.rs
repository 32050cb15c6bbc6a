// src/core/mod.rs — Session model and conversation routing

pub mod flow;
pub mod router;
pub mod session;
pub mod types;

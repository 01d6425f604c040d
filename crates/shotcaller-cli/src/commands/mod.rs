pub mod config;
pub mod session;
pub mod techniques;
pub mod voices;

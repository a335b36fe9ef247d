pub mod audio;
pub mod config;
pub mod error;
pub mod logging;
pub mod pose;
pub mod session;
pub mod skeleton;

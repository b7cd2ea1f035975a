// Historical Document Harvest - Server Core
//
// Environment configuration, logging setup and the chat HTTP surface shared by
// the `server` and `harvest` binaries. Pipeline logic lives in the `harvest`
// library.

pub mod config;
pub mod server;
pub mod telemetry;

pub use config::*;

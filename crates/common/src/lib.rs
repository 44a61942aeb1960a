//! Common utilities and shared types for the federation core.

pub mod broadcast;
pub mod config;
pub mod crypto;
pub mod error;
pub mod id;

pub use broadcast::{BroadcastMessage, Broadcaster, MessageType, NullBroadcaster};
pub use config::Config;
pub use crypto::{generate_rsa_keypair, RsaKeypair};
pub use error::{AppError, AppResult};
pub use id::IdGenerator;

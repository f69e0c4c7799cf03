//! smsc3 is an SMSC simulator speaking SMPP v3.4.
//!
//! ESMEs bind over TCP and become named sessions; submitted messages are
//! acknowledged and answered with fabricated delivery receipts; an HTTP
//! endpoint injects Mobile Terminated deliveries into any live session,
//! with GSM 03.38/UCS2 encoding and multipart segmentation handled by the
//! text codec engine.

pub mod address;
pub mod codec;
pub mod config;
pub mod connection;
pub mod datatypes;
pub mod dumper;
pub mod frame;
pub mod http;
pub mod message;
pub mod pdutext;
pub mod registry;
pub mod server;
pub mod session;

pub use address::Address;
pub use config::Config;
pub use frame::Frame;
pub use http::HttpServer;
pub use message::Message;
pub use registry::Registry;
pub use server::SmppServer;
pub use session::{Session, SessionError};

/// Error type for binary-level plumbing where precise matching is not
/// needed; the per-layer error enums stay typed.
pub type Error = Box<dyn std::error::Error + Send + Sync>;

/// Convenience result alias.
pub type Result<T> = std::result::Result<T, Error>;

//! Streaming transport to the speech recognition service.

pub mod client;
pub mod credentials;
pub mod frame;
pub mod probe;
pub mod state;

pub use client::{TransportClient, TransportHandle, listen_url};
pub use credentials::{CredentialProvider, EnvCredentialProvider, StaticToken};
pub use frame::ResultFrame;
pub use probe::check_reachable;
pub use state::{ConnectionState, StateCell};

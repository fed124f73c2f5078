pub mod domain;
pub mod repository;
pub mod service;

pub use domain::{IssuedCode, LinkOutcome, PairingCode, PairingError};
pub use repository::{DynPairingRepository, PairingRepository, SqlitePairingRepository};
pub use service::PairingService;

pub mod factory;
pub mod keyset;

pub use factory::build_security_config;
pub use keyset::{KeySetError, KeySetVerifier, ValidationSettings};

pub mod access;

pub use access::{AuthLayer, apply};

pub mod emitter;
pub mod serde_helpers;

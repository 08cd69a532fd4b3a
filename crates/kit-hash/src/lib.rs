//! Hash computation and object identity for the kit version-control engine.
//!
//! This crate provides the core `ObjectId` type, SHA-1 hash computation, and
//! hex encoding/decoding used throughout the engine.

mod error;
pub mod hex;
mod algorithm;
mod oid;
pub mod hasher;

pub use algorithm::HashAlgorithm;
pub use error::HashError;
pub use oid::ObjectId;

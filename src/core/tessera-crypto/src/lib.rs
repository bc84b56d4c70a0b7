//! # Tessera Crypto
//!
//! Core cryptographic primitives for Nubster Tessera.
//!
//! This crate provides the low-level operations the KMS engine is built on:
//! - Authenticated encryption (AES-256-GCM) with a detached nonce
//! - Secure random generation
//! - Key types with automatic memory zeroization

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod aead;
pub mod error;
pub mod keys;
pub mod random;

pub use error::CryptoError;
pub use keys::SymmetricKey;

//! Authentication-boundary utilities for the storefront backend: password
//! credential hashing and reversible order-id tokens. This crate is
//! deliberately small and transparent so the HTTP layer never touches raw
//! key material or hand-rolled crypto.

pub mod config;
pub mod crypto;
pub mod policy;

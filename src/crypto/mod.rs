//! Cryptography module covering the two leaf utilities consumed by the HTTP
//! layer: password credentials (one-way) and order-id tokens (reversible).
//! Each submodule focuses on a single responsibility so the security model
//! stays simple and auditable.

pub mod credentials;
pub mod order_tokens;

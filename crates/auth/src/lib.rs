//! `comptrack-auth` — pure credential model (username + password digest).
//!
//! This crate is intentionally decoupled from storage; the credential file
//! lives in `comptrack-infra`.

pub mod credential;

pub use credential::{CredentialRecord, DEFAULT_PASSWORD, DEFAULT_USERNAME, PasswordHash};

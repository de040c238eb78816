//! Pairing Session
//!
//! One local client pairs once and receives a bearer token; every device
//! method checks it.

use adbridge_core::error::AppError;
use std::fmt::Write;
use std::sync::{Mutex, PoisonError};
use tracing::info;

const TOKEN_BYTES: usize = 32;

/// Holds at most one pairing token for the lifetime of the daemon
#[derive(Default)]
pub struct SessionState {
    token: Mutex<Option<String>>,
}

impl SessionState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Issue the token; a second pairing is refused
    pub fn pair(&self) -> Result<String, AppError> {
        let mut slot = self.token.lock().unwrap_or_else(PoisonError::into_inner);
        if slot.is_some() {
            return Err(AppError::Conflict(
                "a client is already paired with this daemon".to_string(),
            ));
        }

        let token = generate_token();
        *slot = Some(token.clone());
        info!("Client paired");
        Ok(token)
    }

    pub fn is_paired(&self) -> bool {
        self.token
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .is_some()
    }

    pub fn verify(&self, candidate: &str) -> bool {
        if candidate.is_empty() {
            return false;
        }
        let slot = self.token.lock().unwrap_or_else(PoisonError::into_inner);
        match slot.as_deref() {
            Some(token) => constant_shape_eq(token.as_bytes(), candidate.as_bytes()),
            None => false,
        }
    }

    pub fn authorize(&self, candidate: &str) -> Result<(), AppError> {
        if self.verify(candidate) {
            Ok(())
        } else {
            Err(AppError::Unauthorized(
                "missing or invalid session token, call pair.v1 first".to_string(),
            ))
        }
    }
}

fn generate_token() -> String {
    let bytes: [u8; TOKEN_BYTES] = rand::random();
    bytes.iter().fold(String::with_capacity(TOKEN_BYTES * 2), |mut out, b| {
        let _ = write!(out, "{b:02x}");
        out
    })
}

// Visits every byte regardless of where the first mismatch is
fn constant_shape_eq(a: &[u8], b: &[u8]) -> bool {
    if a.len() != b.len() {
        return false;
    }
    a.iter().zip(b).fold(0u8, |acc, (x, y)| acc | (x ^ y)) == 0
}

//! Listening port selection
//!
//! The port doubles as the pairing code shown to the user, so it is drawn
//! at random from a fixed range instead of a well-known default.

use rand::Rng;
use std::net::TcpListener;
use std::ops::RangeInclusive;
use tracing::{debug, warn};

pub const PORT_RANGE: RangeInclusive<u16> = 35000..=49151;
pub const MAX_ATTEMPTS: usize = 20;

/// A currently free port from `PORT_RANGE`, or 0 (OS-assigned) after
/// `MAX_ATTEMPTS` collisions
pub fn pick_port(host: &str) -> u16 {
    let mut rng = rand::thread_rng();
    for attempt in 1..=MAX_ATTEMPTS {
        let port = rng.gen_range(PORT_RANGE);
        match TcpListener::bind((host, port)) {
            Ok(_) => return port,
            Err(e) => debug!(port, attempt, error = %e, "Port unavailable"),
        }
    }

    warn!(attempts = MAX_ATTEMPTS, "No free port in range, letting the OS choose");
    0
}

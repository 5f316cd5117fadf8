//! Custom validation functions for configuration.

use std::net::SocketAddr;

use validator::ValidationError;

/// Validate that a bind address parses as `host:port`.
pub fn validate_bind_addr(addr: &str) -> Result<(), ValidationError> {
    addr.parse::<SocketAddr>()
        .map(|_| ())
        .map_err(|_| ValidationError::new("invalid_bind_addr"))
}

//! Port resolution and validation.
//!
//! Pure functions: no sockets are touched here. A port that is zero or
//! negative means "that listener is disabled"; disabling both is a valid
//! way to turn the service off through configuration alone.

use thiserror::Error;

use crate::config::schema::{
    HTTP_BIND_PORT, HTTP_BIND_PORT_DEFAULT, HTTP_BIND_SECURE_PORT, HTTP_BIND_SECURE_PORT_DEFAULT,
};
use crate::config::store::PropertyStore;

/// Caller-correctable port misconfiguration.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum InvalidConfiguration {
    #[error("plain and secure ports must be distinct (both set to {0})")]
    AmbiguousBind(i64),
}

/// Effective plain and secure ports, with defaults applied where no
/// override is configured.
pub fn resolve(settings: &PropertyStore) -> (i64, i64) {
    (
        settings.get_int(HTTP_BIND_PORT, HTTP_BIND_PORT_DEFAULT),
        settings.get_int(HTTP_BIND_SECURE_PORT, HTTP_BIND_SECURE_PORT_DEFAULT),
    )
}

/// Reject a port pair that cannot be bound unambiguously.
///
/// Two enabled listeners on the same port is the only rejected shape;
/// non-positive ports merely disable their listener.
pub fn validate(plain: i64, secure: i64) -> Result<(), InvalidConfiguration> {
    if plain == secure && plain > 0 {
        return Err(InvalidConfiguration::AmbiguousBind(plain));
    }
    Ok(())
}

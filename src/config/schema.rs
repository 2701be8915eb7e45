//! Setting names and compiled-in defaults for the HTTP-Bind service.

/// Whether the HTTP-Bind service is administratively enabled.
pub const HTTP_BIND_ENABLED: &str = "httpbind.enabled";

pub const HTTP_BIND_ENABLED_DEFAULT: bool = true;

/// Port of the plaintext listener. Zero or negative disables it.
pub const HTTP_BIND_PORT: &str = "httpbind.port.plain";

pub const HTTP_BIND_PORT_DEFAULT: i64 = 8080;

/// Port of the TLS listener. Zero or negative disables it.
pub const HTTP_BIND_SECURE_PORT: &str = "httpbind.port.secure";

pub const HTTP_BIND_SECURE_PORT_DEFAULT: i64 = 8483;

/// Network interface (address) the listeners bind to. Unset means all
/// interfaces.
pub const BIND_INTERFACE: &str = "network.interface";

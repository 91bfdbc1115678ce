//! Compile-time capacities for the router's bounded tables.
//!
//! These feed the `heapless` containers in `iface`; pick them for the
//! largest deployment the binary has to serve.

/// Maximum number of interfaces a router owns.
pub const ROUTER_MAX_IFACE_COUNT: usize = 8;

/// Maximum number of routing table entries.
pub const ROUTER_MAX_ROUTE_COUNT: usize = 16;

/// Maximum length of an interface name, in bytes.
pub const IFACE_NAME_MAX_LEN: usize = 16;

/*! The IP layer of a software router.

_smolroute_ decides, for every incoming IPv4 datagram, whether to accept,
forward or drop it, and drives the address resolution and link-layer
transmission needed to actually deliver it. It is built for event-driven
routers: one call to [`iface::Router::handle_datagram`] runs a received
datagram through the whole validate → classify → route → deliver pipeline
to completion, with every outcome (a forwarded frame, a queued datagram,
an ICMP reply) expressed as a side effect on a collaborator.

The crate is split into the same layers a full network stack would use:

  * The `wire` module provides access to the Ethernet, IPv4 and ICMPv4
    wire representations: field-level accessors over untrusted octet
    buffers, and high-level `Repr` values for the messages the router
    composes itself.
  * The `iface` module owns the router's configuration (interfaces and
    routes) and implements the forwarding engine on top of it.
  * The `phy` module declares the contract to the link layer.

Everything the router does not do itself is reached through a narrow
trait: address resolution ([`iface::Resolver`]), parking datagrams that
wait on resolution ([`iface::PendingQueue`]) and frame transmission
([`phy::Device`]). The routing table and interface set are populated once
at startup and read-only while forwarding, so the engine needs no locks
and no internal timers; retry and expiry policy for resolution belongs
entirely to the resolver implementation.

IPv6, fragmentation and reassembly, IP options and multicast forwarding
are out of scope: datagrams carrying options are dropped, and the other
cases never reach this layer.
*/

#![cfg_attr(not(any(test, feature = "std")), no_std)]

extern crate alloc;

use core::fmt;

#[macro_use]
mod macros;

mod config;

pub mod iface;
pub mod phy;
pub mod wire;

/// The error type for datagram parsing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Error {
    /// A field could not be read because it lies beyond the end of the
    /// underlying buffer.
    Truncated,
    /// An incoming packet could not be recognized and was dropped.
    /// E.g. an ICMP message with an unknown type.
    Unrecognized,
    /// An incoming packet had an incorrect checksum and was dropped.
    Checksum,
}

/// The result type for datagram parsing.
pub type Result<T> = core::result::Result<T, Error>;

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Error::Truncated => write!(f, "truncated packet"),
            Error::Unrecognized => write!(f, "unrecognized packet"),
            Error::Checksum => write!(f, "checksum error"),
        }
    }
}

#[cfg(feature = "std")]
impl std::error::Error for Error {}

use alloc::vec::Vec;

use crate::iface::Interface;
use crate::wire::{EthernetAddress, Ipv4Address};

/// An answer to a next-hop resolution request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Answer {
    /// The link-layer address is known right now.
    Resolved(EthernetAddress),
    /// A resolution request is in flight; the datagram has to wait.
    Pending,
    /// Resolution gave this next hop up for unreachable.
    Failed,
}

impl Answer {
    /// Returns whether a link-layer address was found.
    pub fn resolved(&self) -> bool {
        matches!(self, Answer::Resolved(_))
    }
}

/// Address resolution for next hops, as provided by the neighbor
/// subsystem.
///
/// Cache storage, the request wire exchange, retries and entry expiry
/// are all the implementor's business; the router only consumes the
/// three-way [`Answer`]. A `Pending` answer is expected to have issued a
/// resolution request as its side effect.
pub trait Resolver {
    fn resolve(&mut self, next_hop: Ipv4Address, iface: &Interface) -> Answer;
}

/// Storage for datagrams parked on an unresolved next hop.
///
/// Replaying queued datagrams once resolution completes is the
/// implementor's business, and runs the forwarding pipeline afresh from
/// the outside. `drain` exists so the router can fail every datagram
/// parked behind a next hop that turned out unreachable.
pub trait PendingQueue {
    /// Park a datagram until `next_hop` resolves.
    fn enqueue(&mut self, next_hop: Ipv4Address, iface_name: &str, datagram: Vec<u8>);

    /// Remove and return every datagram parked behind `next_hop`.
    fn drain(&mut self, next_hop: Ipv4Address, iface: &Interface) -> Vec<Vec<u8>>;
}

/*! The router: interface and route bookkeeping, and the forwarding
engine that runs every datagram through the validate → classify → route →
deliver pipeline. */

mod interface;
mod neighbor;
mod route;
mod router;

pub use self::interface::{Interface, InterfaceName, InterfaceTableFull, Interfaces};
pub use self::neighbor::{Answer, PendingQueue, Resolver};
pub use self::route::{Route, RouteTableFull, Routes};
pub use self::router::{DatagramBuf, IcmpSource, Router};

use core::fmt;

use heapless::{String, Vec};

use crate::config::{IFACE_NAME_MAX_LEN, ROUTER_MAX_IFACE_COUNT};
use crate::wire::{EthernetAddress, Ipv4Address};

/// A bounded interface name, e.g. `"eth0"`.
pub type InterfaceName = String<IFACE_NAME_MAX_LEN>;

pub(crate) fn interface_name(name: &str) -> InterfaceName {
    let mut owned = InterfaceName::new();
    owned.push_str(name).expect("interface name too long");
    owned
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct InterfaceTableFull;

impl fmt::Display for InterfaceTableFull {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Interface table full")
    }
}

#[cfg(feature = "std")]
impl std::error::Error for InterfaceTableFull {}

/// A network interface owned by the router.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Interface {
    name: InterfaceName,
    addr: Ipv4Address,
    hardware_addr: EthernetAddress,
}

impl Interface {
    /// Create an interface descriptor.
    ///
    /// # Panics
    /// This function panics if `name` is longer than
    /// `IFACE_NAME_MAX_LEN` bytes.
    pub fn new(name: &str, addr: Ipv4Address, hardware_addr: EthernetAddress) -> Interface {
        Interface {
            name: interface_name(name),
            addr,
            hardware_addr,
        }
    }

    /// Return the interface name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Return the assigned IPv4 address.
    pub fn addr(&self) -> Ipv4Address {
        self.addr
    }

    /// Return the link-layer address.
    pub fn hardware_addr(&self) -> EthernetAddress {
        self.hardware_addr
    }
}

impl fmt::Display for Interface {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} addr={} hw={}",
            self.name(),
            self.addr,
            self.hardware_addr
        )
    }
}

/// The set of interfaces a router owns.
///
/// Populated once at startup; read-only while datagrams are being
/// forwarded.
#[derive(Debug)]
pub struct Interfaces {
    storage: Vec<Interface, ROUTER_MAX_IFACE_COUNT>,
}

impl Interfaces {
    /// Create an empty interface set.
    pub fn new() -> Interfaces {
        Interfaces {
            storage: Vec::new(),
        }
    }

    /// Add an interface to the set.
    pub fn add(&mut self, iface: Interface) -> Result<(), InterfaceTableFull> {
        self.storage.push(iface).map_err(|_| InterfaceTableFull)
    }

    /// Look an interface up by name.
    pub fn get(&self, name: &str) -> Option<&Interface> {
        self.storage.iter().find(|iface| iface.name() == name)
    }

    /// Query whether `addr` is assigned to any interface in the set.
    pub fn has_addr(&self, addr: Ipv4Address) -> bool {
        self.storage.iter().any(|iface| iface.addr == addr)
    }

    /// Iterate over the interfaces, in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = &Interface> {
        self.storage.iter()
    }
}

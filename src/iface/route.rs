use core::fmt;

use heapless::Vec;

use crate::config::ROUTER_MAX_ROUTE_COUNT;
use crate::iface::interface::{interface_name, InterfaceName};
use crate::wire::Ipv4Address;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct RouteTableFull;

impl fmt::Display for RouteTableFull {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Route table full")
    }
}

#[cfg(feature = "std")]
impl std::error::Error for RouteTableFull {}

/// A destination prefix reached through a gateway on a named interface.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Route {
    pub dest: Ipv4Address,
    pub mask: Ipv4Address,
    pub gateway: Ipv4Address,
    pub iface: InterfaceName,
}

impl Route {
    /// Create a route entry.
    ///
    /// # Panics
    /// This function panics if `iface` is longer than
    /// `IFACE_NAME_MAX_LEN` bytes.
    pub fn new(dest: Ipv4Address, mask: Ipv4Address, gateway: Ipv4Address, iface: &str) -> Route {
        Route {
            dest,
            mask,
            gateway,
            iface: interface_name(iface),
        }
    }

    /// Returns a route to 0.0.0.0/0 via the `gateway` on `iface` (ie.
    /// "ip route add 0.0.0.0/0 via `gateway`").
    pub fn new_default_gateway(gateway: Ipv4Address, iface: &str) -> Route {
        Route::new(
            Ipv4Address::UNSPECIFIED,
            Ipv4Address::UNSPECIFIED,
            gateway,
            iface,
        )
    }

    fn masks(&self, addr: Ipv4Address) -> u32 {
        addr.to_bits() & self.mask.to_bits()
    }

    fn matches(&self, addr: Ipv4Address) -> bool {
        self.masks(self.dest) == self.masks(addr)
    }
}

impl fmt::Display for Route {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}/{} via {} dev {}",
            self.dest, self.mask, self.gateway, self.iface
        )
    }
}

/// A routing table.
///
/// Populated once at startup; read-only while datagrams are being
/// forwarded. The table does not need to be kept sorted.
#[derive(Debug)]
pub struct Routes {
    storage: Vec<Route, ROUTER_MAX_ROUTE_COUNT>,
}

impl Routes {
    /// Creates a new empty routing table.
    pub fn new() -> Routes {
        Routes {
            storage: Vec::new(),
        }
    }

    /// Add a route to the table.
    pub fn add(&mut self, route: Route) -> Result<(), RouteTableFull> {
        self.storage.push(route).map_err(|_| RouteTableFull)
    }

    /// Update the routes of this router.
    pub fn update<F: FnOnce(&mut Vec<Route, ROUTER_MAX_ROUTE_COUNT>)>(&mut self, f: F) {
        f(&mut self.storage);
    }

    /// Iterate over the route entries, in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = &Route> {
        self.storage.iter()
    }

    /// Find the most specific route toward `addr`.
    ///
    /// Every entry whose masked destination equals the masked target is
    /// a candidate; among candidates the one with the numerically
    /// largest masked target wins, which selects the longest matching
    /// prefix. `max_by_key` keeps the last maximal candidate, so on a
    /// tie later entries win.
    pub(crate) fn lookup(&self, addr: Ipv4Address) -> Option<&Route> {
        self.storage
            .iter()
            .filter(|route| route.matches(addr))
            .max_by_key(|route| route.masks(addr))
    }
}

#[cfg(test)]
mod test {
    use super::*;

    fn table() -> Routes {
        let mut routes = Routes::new();
        routes
            .add(Route::new(
                Ipv4Address::new(10, 0, 0, 0),
                Ipv4Address::new(255, 0, 0, 0),
                Ipv4Address::new(10, 0, 0, 100),
                "eth1",
            ))
            .unwrap();
        routes
            .add(Route::new(
                Ipv4Address::new(10, 0, 1, 0),
                Ipv4Address::new(255, 255, 255, 0),
                Ipv4Address::new(10, 0, 1, 100),
                "eth2",
            ))
            .unwrap();
        routes
    }

    #[test]
    fn test_longest_prefix_wins() {
        let routes = table();

        let route = routes.lookup(Ipv4Address::new(10, 0, 1, 5)).unwrap();
        assert_eq!(route.gateway, Ipv4Address::new(10, 0, 1, 100));

        let route = routes.lookup(Ipv4Address::new(10, 0, 2, 5)).unwrap();
        assert_eq!(route.gateway, Ipv4Address::new(10, 0, 0, 100));
    }

    #[test]
    fn test_no_match() {
        let routes = table();
        assert!(routes.lookup(Ipv4Address::new(192, 168, 1, 1)).is_none());
    }

    #[test]
    fn test_tie_keeps_later_entry() {
        let mut routes = table();
        routes
            .add(Route::new(
                Ipv4Address::new(10, 0, 1, 0),
                Ipv4Address::new(255, 255, 255, 0),
                Ipv4Address::new(10, 0, 1, 200),
                "eth3",
            ))
            .unwrap();

        let route = routes.lookup(Ipv4Address::new(10, 0, 1, 5)).unwrap();
        assert_eq!(route.gateway, Ipv4Address::new(10, 0, 1, 200));
    }

    #[test]
    fn test_default_route_is_least_specific() {
        let mut routes = table();
        routes
            .add(Route::new_default_gateway(
                Ipv4Address::new(192, 0, 2, 254),
                "eth0",
            ))
            .unwrap();

        let route = routes.lookup(Ipv4Address::new(10, 0, 1, 5)).unwrap();
        assert_eq!(route.gateway, Ipv4Address::new(10, 0, 1, 100));

        let route = routes.lookup(Ipv4Address::new(172, 16, 3, 3)).unwrap();
        assert_eq!(route.gateway, Ipv4Address::new(192, 0, 2, 254));
    }

    #[test]
    fn test_table_full() {
        let mut routes = Routes::new();
        for i in 0..ROUTER_MAX_ROUTE_COUNT {
            routes
                .add(Route::new(
                    Ipv4Address::new(10, i as u8, 0, 0),
                    Ipv4Address::new(255, 255, 0, 0),
                    Ipv4Address::new(10, i as u8, 0, 1),
                    "eth0",
                ))
                .unwrap();
        }
        assert_eq!(
            routes.add(Route::new_default_gateway(
                Ipv4Address::new(192, 0, 2, 254),
                "eth0"
            )),
            Err(RouteTableFull)
        );
    }
}

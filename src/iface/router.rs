use core::cmp;

use alloc::{vec, vec::Vec};

use crate::iface::interface::{Interface, Interfaces};
use crate::iface::neighbor::{Answer, PendingQueue, Resolver};
use crate::iface::route::Routes;
use crate::phy::Device;
use crate::wire::*;

macro_rules! check {
    ($e:expr) => {
        match $e {
            Ok(x) => x,
            Err(_) => {
                // concat!/stringify! doesn't work with defmt macros
                #[cfg(not(feature = "defmt"))]
                net_trace!(concat!("router: malformed ", stringify!($e)));
                #[cfg(feature = "defmt")]
                net_trace!("router: malformed");
                return Default::default();
            }
        }
    };
}

/// Initial TTL for datagrams this router originates.
const DEFAULT_TTL: u8 = 64;

/// How much of an offending datagram an ICMP error message quotes: its
/// IP header plus this many leading payload octets.
const ICMP_QUOTE_PAYLOAD_LEN: usize = 8;

/// An IPv4 datagram in flight.
///
/// A datagram that arrived over the wire keeps riding the Ethernet frame
/// it came in, so forwarding it costs only a rewrite of the link-layer
/// addressing. A locally composed datagram (an ICMP message) is a bare
/// buffer until the dispatcher frames it.
///
/// The enum replaces a pair of aliased raw buffers: the datagram octets
/// are reachable only through [`ip`][Self::ip] and, for the TTL and
/// checksum update, [`ip_mut`][Self::ip_mut].
#[derive(Debug)]
pub enum DatagramBuf<'a> {
    /// A datagram inside its received Ethernet frame.
    Framed { frame: &'a mut [u8], ip_len: usize },
    /// A bare datagram, not yet framed.
    Bare(&'a mut [u8]),
}

impl<'a> DatagramBuf<'a> {
    /// Wrap a received Ethernet frame carrying a datagram of `ip_len`
    /// octets.
    ///
    /// # Panics
    /// This function panics if `frame` is too short to hold a frame
    /// header followed by `ip_len` octets.
    pub fn framed(frame: &'a mut [u8], ip_len: usize) -> DatagramBuf<'a> {
        assert!(
            frame.len() >= ETHERNET_HEADER_LEN + ip_len,
            "frame shorter than the datagram it carries"
        );
        DatagramBuf::Framed { frame, ip_len }
    }

    /// Wrap a bare datagram.
    pub fn bare(datagram: &'a mut [u8]) -> DatagramBuf<'a> {
        DatagramBuf::Bare(datagram)
    }

    /// The datagram octets.
    pub fn ip(&self) -> &[u8] {
        match self {
            DatagramBuf::Framed { frame, ip_len } => {
                &frame[ETHERNET_HEADER_LEN..ETHERNET_HEADER_LEN + ip_len]
            }
            DatagramBuf::Bare(datagram) => &datagram[..],
        }
    }

    /// Exclusive access to the datagram octets.
    pub fn ip_mut(&mut self) -> &mut [u8] {
        match self {
            DatagramBuf::Framed { frame, ip_len } => {
                &mut frame[ETHERNET_HEADER_LEN..ETHERNET_HEADER_LEN + *ip_len]
            }
            DatagramBuf::Bare(datagram) => &mut datagram[..],
        }
    }
}

/// Source address policy for locally originated ICMP messages.
///
/// When the router composes an error message there is no triggering
/// interface context to borrow an address from, so one of its
/// interfaces has to lend its own.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum IcmpSource {
    /// The address of the first configured interface.
    #[default]
    FirstInterface,
    /// The address of the interface the message leaves through.
    EgressInterface,
}

/// An IPv4 forwarding engine.
///
/// The router owns its configuration (the interface set and the routing
/// table, both populated at startup and read-only afterwards) and its
/// address-resolution collaborators; the link-layer device is borrowed
/// per call. Each datagram handed to [`handle_datagram`] runs the whole
/// validate → classify → route → deliver pipeline to completion before
/// the call returns.
///
/// [`handle_datagram`]: #method.handle_datagram
pub struct Router<R, Q> {
    interfaces: Interfaces,
    routes: Routes,
    resolver: R,
    pending: Q,
    icmp_source: IcmpSource,
}

impl<R: Resolver, Q: PendingQueue> Router<R, Q> {
    /// Create a router from its startup configuration and resolution
    /// collaborators.
    pub fn new(interfaces: Interfaces, routes: Routes, resolver: R, pending: Q) -> Router<R, Q> {
        Router {
            interfaces,
            routes,
            resolver,
            pending,
            icmp_source: IcmpSource::default(),
        }
    }

    /// Return the interface set.
    pub fn interfaces(&self) -> &Interfaces {
        &self.interfaces
    }

    /// Return the routing table.
    pub fn routes(&self) -> &Routes {
        &self.routes
    }

    /// Return a mutable handle on the routing table.
    pub fn routes_mut(&mut self) -> &mut Routes {
        &mut self.routes
    }

    /// Set the source address policy for locally originated ICMP
    /// messages.
    pub fn set_icmp_source(&mut self, policy: IcmpSource) {
        self.icmp_source = policy;
    }

    /// Process one received IPv4 datagram.
    ///
    /// This is the entry point the link-layer receive path invokes, once
    /// per datagram; `ingress` names the interface the datagram arrived
    /// on. It never reports an error: every outcome — a forwarded frame,
    /// a queued datagram, an ICMP reply, a silent drop — is a side
    /// effect on the device, the resolver or the pending queue.
    pub fn handle_datagram<D: Device>(&mut self, device: &mut D, ingress: &str, buf: DatagramBuf<'_>) {
        let (src_addr, dst_addr, ttl, protocol) = {
            let packet = check!(Ipv4Packet::new_checked(buf.ip()));
            if should_drop(&packet) {
                net_trace!("router: dropping datagram from {}", packet.src_addr());
                return;
            }
            (
                packet.src_addr(),
                packet.dst_addr(),
                packet.ttl(),
                packet.protocol(),
            )
        };

        if self.interfaces.has_addr(dst_addr) {
            self.process_local(device, ingress, buf, src_addr, dst_addr, protocol)
        } else if ttl > 1 {
            self.forward(device, buf, dst_addr)
        } else {
            // Not ours, and forwarding would put a spent TTL on the wire.
            net_debug!("router: TTL expired in transit, from {}", src_addr);
            self.send_time_exceeded(device, buf.ip())
        }
    }

    /// Deliver a datagram to `next_hop` through the named egress
    /// interface.
    ///
    /// This is where the TTL comes down and the header checksum is
    /// rebuilt, exactly once per hop.
    ///
    /// # Panics
    /// This function panics if the datagram's TTL is already zero
    /// (classification must not let that happen) or if `iface_name`
    /// does not name a configured interface.
    pub fn deliver<D: Device>(
        &mut self,
        device: &mut D,
        next_hop: Ipv4Address,
        iface_name: &str,
        mut buf: DatagramBuf<'_>,
    ) {
        {
            let mut packet = Ipv4Packet::new_unchecked(buf.ip_mut());
            let ttl = packet.ttl();
            assert!(ttl != 0, "delivering a datagram with an expired TTL");
            packet.set_ttl(ttl - 1);
            packet.fill_checksum();
        }

        let iface = self
            .interfaces
            .get(iface_name)
            .expect("route names an interface that is not configured")
            .clone();

        match self.resolver.resolve(next_hop, &iface) {
            Answer::Resolved(hardware_addr) => dispatch(device, &iface, hardware_addr, buf),
            Answer::Pending => {
                net_trace!("router: {} unresolved, queueing datagram", next_hop);
                self.pending
                    .enqueue(next_hop, iface.name(), Vec::from(buf.ip()));
            }
            Answer::Failed => {
                net_debug!("router: next hop {} is unreachable", next_hop);
                self.resolution_failed(device, next_hop, &iface, buf);
            }
        }
    }

    /// Compose an IPv4 datagram around an ICMP message and deliver it
    /// toward `dst`, lending a source address per the configured
    /// [`IcmpSource`] policy.
    ///
    /// Without a route toward `dst` there is nobody to send the message
    /// through, and nobody to report that to either: it is silently
    /// discarded.
    ///
    /// # Panics
    /// This function panics if `payload` is shorter than
    /// `ICMPV4_MSG_MIN_LEN` or `dst` is unspecified.
    pub fn send_icmp<D: Device>(&mut self, device: &mut D, payload: &[u8], dst: Ipv4Address) {
        assert!(payload.len() >= ICMPV4_MSG_MIN_LEN, "undersized ICMP message");
        assert!(!dst.is_unspecified(), "unspecified ICMP destination");

        let (next_hop, iface_name) = match self.routes.lookup(dst) {
            Some(route) => (route.gateway, route.iface.clone()),
            None => {
                net_trace!("router: no route to deliver ICMP message to {}", dst);
                return;
            }
        };
        let src = match self.icmp_source {
            IcmpSource::FirstInterface => {
                self.interfaces
                    .iter()
                    .next()
                    .expect("no interfaces configured")
                    .addr()
            }
            IcmpSource::EgressInterface => {
                self.interfaces
                    .get(&iface_name)
                    .expect("route names an interface that is not configured")
                    .addr()
            }
        };
        self.compose_and_deliver(device, payload, src, dst, next_hop, &iface_name);
    }

    /// Like [`send_icmp`](#method.send_icmp), with an explicit source
    /// address.
    ///
    /// # Panics
    /// This function panics if `payload` is shorter than
    /// `ICMPV4_MSG_MIN_LEN` or either address is unspecified.
    pub fn send_icmp_from<D: Device>(
        &mut self,
        device: &mut D,
        payload: &[u8],
        dst: Ipv4Address,
        src: Ipv4Address,
    ) {
        assert!(payload.len() >= ICMPV4_MSG_MIN_LEN, "undersized ICMP message");
        assert!(!dst.is_unspecified(), "unspecified ICMP destination");
        assert!(!src.is_unspecified(), "unspecified ICMP source");

        let (next_hop, iface_name) = match self.routes.lookup(dst) {
            Some(route) => (route.gateway, route.iface.clone()),
            None => {
                net_trace!("router: no route to deliver ICMP message to {}", dst);
                return;
            }
        };
        self.compose_and_deliver(device, payload, src, dst, next_hop, &iface_name);
    }

    fn process_local<D: Device>(
        &mut self,
        device: &mut D,
        ingress: &str,
        buf: DatagramBuf<'_>,
        src_addr: Ipv4Address,
        dst_addr: Ipv4Address,
        protocol: IpProtocol,
    ) {
        if protocol == IpProtocol::Icmp {
            let (msg_type, checksum_ok) = {
                let ip = Ipv4Packet::new_unchecked(buf.ip());
                let icmp = check!(Icmpv4Packet::new_checked(ip.payload()));
                (icmp.msg_type(), icmp.verify_checksum())
            };
            if !checksum_ok {
                net_trace!("router: bad ICMP checksum from {}", src_addr);
                return;
            }
            if msg_type == Icmpv4Type::EchoRequest {
                if !src_addr.is_unicast() {
                    net_trace!("router: no echo reply to non-unicast {}", src_addr);
                    return;
                }
                net_trace!("router: echo request from {}", src_addr);
                return self.echo_reply(device, ingress, buf);
            }
        }
        // The router terminates nothing but ICMP echo; everything else
        // addressed to it is answered with a protocol unreachable.
        net_debug!("router: cannot deliver {} locally", protocol);
        self.send_unreachable(
            device,
            buf.ip(),
            Icmpv4DstUnreachable::ProtoUnreachable,
            Some(dst_addr),
        );
    }

    /// Answer an echo request, re-using the received frame's addressing
    /// when there is a frame to re-use.
    fn echo_reply<D: Device>(&mut self, device: &mut D, ingress: &str, mut buf: DatagramBuf<'_>) {
        match &mut buf {
            DatagramBuf::Framed { frame, ip_len } => {
                let frame_len = ETHERNET_HEADER_LEN + *ip_len;
                let mut eth = EthernetFrame::new_unchecked(&mut frame[..frame_len]);
                let (eth_src, eth_dst) = (eth.src_addr(), eth.dst_addr());
                eth.set_src_addr(eth_dst);
                eth.set_dst_addr(eth_src);
                {
                    let mut ip = Ipv4Packet::new_unchecked(eth.payload_mut());
                    let (orig_src, orig_dst) = (ip.src_addr(), ip.dst_addr());
                    ip.set_src_addr(orig_dst);
                    ip.set_dst_addr(orig_src);
                    ip.set_ttl(DEFAULT_TTL);
                    ip.fill_checksum();
                    let mut icmp = Icmpv4Packet::new_unchecked(ip.payload_mut());
                    icmp.set_msg_type(Icmpv4Type::EchoReply);
                    icmp.fill_checksum();
                }
                device.transmit(ingress, eth.into_inner());
            }
            DatagramBuf::Bare(datagram) => {
                // No frame to re-use; route the reply like any other
                // locally originated message.
                let (orig_src, orig_dst, mut reply) = {
                    let ip = Ipv4Packet::new_unchecked(&datagram[..]);
                    (ip.src_addr(), ip.dst_addr(), Vec::from(ip.payload()))
                };
                {
                    let mut icmp = Icmpv4Packet::new_unchecked(&mut reply[..]);
                    icmp.set_msg_type(Icmpv4Type::EchoReply);
                    icmp.fill_checksum();
                }
                self.send_icmp_from(device, &reply, orig_src, orig_dst);
            }
        }
    }

    fn forward<D: Device>(&mut self, device: &mut D, buf: DatagramBuf<'_>, dst_addr: Ipv4Address) {
        let (next_hop, iface_name) = match self.routes.lookup(dst_addr) {
            Some(route) => (route.gateway, route.iface.clone()),
            None => {
                net_debug!("router: no route to {}", dst_addr);
                self.send_unreachable(device, buf.ip(), Icmpv4DstUnreachable::NetUnreachable, None);
                return;
            }
        };
        self.deliver(device, next_hop, &iface_name, buf);
    }

    /// Fail the datagram whose next hop proved unreachable, and every
    /// datagram already parked behind the same next hop.
    fn resolution_failed<D: Device>(
        &mut self,
        device: &mut D,
        next_hop: Ipv4Address,
        iface: &Interface,
        buf: DatagramBuf<'_>,
    ) {
        self.send_unreachable(device, buf.ip(), Icmpv4DstUnreachable::HostUnreachable, None);
        let drained = self.pending.drain(next_hop, iface);
        net_debug!(
            "router: failing {} queued datagrams for {}",
            drained.len(),
            next_hop
        );
        for datagram in drained {
            self.send_unreachable(
                device,
                &datagram,
                Icmpv4DstUnreachable::HostUnreachable,
                None,
            );
        }
    }

    fn send_unreachable<D: Device>(
        &mut self,
        device: &mut D,
        original: &[u8],
        reason: Icmpv4DstUnreachable,
        src: Option<Ipv4Address>,
    ) {
        let Some((dst, quoted)) = quote_original(original) else {
            return;
        };
        let repr = Icmpv4Repr::DstUnreachable {
            reason,
            data: quoted,
        };
        let mut payload = vec![0; repr.buffer_len()];
        repr.emit(&mut Icmpv4Packet::new_unchecked(&mut payload[..]));
        match src {
            Some(src) => self.send_icmp_from(device, &payload, dst, src),
            None => self.send_icmp(device, &payload, dst),
        }
    }

    fn send_time_exceeded<D: Device>(&mut self, device: &mut D, original: &[u8]) {
        let Some((dst, quoted)) = quote_original(original) else {
            return;
        };
        let repr = Icmpv4Repr::TimeExceeded {
            reason: Icmpv4TimeExceeded::TtlExpired,
            data: quoted,
        };
        let mut payload = vec![0; repr.buffer_len()];
        repr.emit(&mut Icmpv4Packet::new_unchecked(&mut payload[..]));
        self.send_icmp(device, &payload, dst);
    }

    fn compose_and_deliver<D: Device>(
        &mut self,
        device: &mut D,
        payload: &[u8],
        src: Ipv4Address,
        dst: Ipv4Address,
        next_hop: Ipv4Address,
        iface_name: &str,
    ) {
        let total_len = IPV4_HEADER_LEN + payload.len();
        let mut datagram = vec![0; total_len];
        {
            let mut packet = Ipv4Packet::new_unchecked(&mut datagram[..]);
            packet.set_version(4);
            packet.set_header_len(IPV4_HEADER_LEN as u8);
            packet.set_dscp(0);
            packet.set_ecn(0);
            packet.set_total_len(total_len as u16);
            packet.set_ident(0);
            packet.set_dont_frag(false);
            packet.set_more_frags(false);
            packet.set_frag_offset(0);
            packet.set_ttl(DEFAULT_TTL);
            packet.set_protocol(IpProtocol::Icmp);
            packet.set_src_addr(src);
            packet.set_dst_addr(dst);
            packet.fill_checksum();
            packet.payload_mut().copy_from_slice(payload);
        }
        self.deliver(device, next_hop, iface_name, DatagramBuf::bare(&mut datagram));
        // `datagram` goes away here, whatever the dispatch outcome was.
    }
}

/// The drop predicate for received headers: a too-short total length, a
/// version other than 4, options present, or a checksum mismatch.
/// Malformed datagrams are discarded without a word to the sender.
fn should_drop<T: AsRef<[u8]>>(packet: &Ipv4Packet<T>) -> bool {
    if packet.total_len() < IPV4_HEADER_LEN as u16 {
        return true;
    }
    if packet.version() != 4 {
        return true;
    }
    if packet.header_len() as usize > IPV4_HEADER_LEN {
        return true;
    }
    !packet.verify_checksum()
}

/// Put a framed or freshly framed datagram on the wire.
fn dispatch<D: Device>(
    device: &mut D,
    iface: &Interface,
    dst_hardware_addr: EthernetAddress,
    mut buf: DatagramBuf<'_>,
) {
    match &mut buf {
        DatagramBuf::Framed { frame, ip_len } => {
            let frame_len = ETHERNET_HEADER_LEN + *ip_len;
            let mut eth = EthernetFrame::new_unchecked(&mut frame[..frame_len]);
            eth.set_dst_addr(dst_hardware_addr);
            eth.set_src_addr(iface.hardware_addr());
            eth.set_ethertype(EthernetProtocol::Ipv4);
            device.transmit(iface.name(), eth.into_inner());
        }
        DatagramBuf::Bare(datagram) => {
            let mut frame = vec![0; EthernetFrame::<&[u8]>::buffer_len(datagram.len())];
            let mut eth = EthernetFrame::new_unchecked(&mut frame[..]);
            eth.set_dst_addr(dst_hardware_addr);
            eth.set_src_addr(iface.hardware_addr());
            eth.set_ethertype(EthernetProtocol::Ipv4);
            eth.payload_mut().copy_from_slice(&datagram[..]);
            device.transmit(iface.name(), &frame);
        }
    }
}

/// The eligibility check plus the quoted prefix (IP header and leading
/// payload octets) of a datagram an ICMP error message would be about.
///
/// `None` means no error message may be sent: the datagram is
/// unparseable, comes from a non-unicast source, or is itself an ICMP
/// error message (RFC 1122).
fn quote_original(original: &[u8]) -> Option<(Ipv4Address, &[u8])> {
    let ip = Ipv4Packet::new_checked(original).ok()?;
    if !ip.src_addr().is_unicast() {
        return None;
    }
    if ip.protocol() == IpProtocol::Icmp {
        match Icmpv4Packet::new_checked(ip.payload()) {
            Ok(icmp) if !icmp.msg_type().is_error() => (),
            _ => return None,
        }
    }
    let quoted_len = cmp::min(
        original.len(),
        ip.header_len() as usize + ICMP_QUOTE_PAYLOAD_LEN,
    );
    Some((ip.src_addr(), &original[..quoted_len]))
}

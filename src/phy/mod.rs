/*! Access to link-layer transmission.

The router's only demand on the link layer is taking a fully framed
Ethernet payload and putting it on the wire. Receiving is the embedder's
side: whatever owns the link hands received IPv4 datagrams to
[`Router::handle_datagram`][crate::iface::Router::handle_datagram].
*/

/// A handle to the transmit side of the link layer.
///
/// The router performs all framing itself, either by rewriting the
/// link-layer addressing of the frame a datagram arrived in, or by
/// wrapping a freshly composed datagram into a new frame. Implementors
/// only see finished frames.
pub trait Device {
    /// Transmit `frame` on the interface called `iface_name`.
    fn transmit(&mut self, iface_name: &str, frame: &[u8]);
}

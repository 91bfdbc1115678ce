/*! Low-level packet access and construction.

The `wire` module deals with the packet *representation*. It provides two
levels of functionality.

 * First, it provides functions to extract fields from sequences of
   octets, and to insert fields into sequences of octets. This happens
   through the `Packet` family of structures, e.g. [EthernetFrame] or
   [Ipv4Packet].
 * Second, in cases where the space of valid field values is much smaller
   than the space of possible field values, it provides a compact,
   high-level representation of packet data that can be parsed from and
   emitted into a sequence of octets. This happens through the `Repr`
   family of structs and enums, e.g. [Icmpv4Repr].

[EthernetFrame]: struct.EthernetFrame.html
[Ipv4Packet]: struct.Ipv4Packet.html
[Icmpv4Repr]: enum.Icmpv4Repr.html

The `Packet` family of data structures guarantees that, if the
`Packet::check_len()` method returned `Ok(())`, then no accessor or
setter method will panic; however, the guarantee provided by
`Packet::check_len()` may no longer hold after changing certain fields,
which are listed in the documentation for the specific packet.

The `Packet::new_checked` method is a shorthand for a combination of
`Packet::new_unchecked` and `Packet::check_len`. When parsing untrusted
input, it is *necessary* to use `Packet::new_checked()`; so long as the
buffer is not modified, no accessor will fail. When emitting output,
though, it is *incorrect* to use `Packet::new_checked()`; the length
check is likely to succeed on a zeroed buffer, but fail on a buffer
filled with data from a previous packet.
*/

mod field {
    pub type Field = ::core::ops::Range<usize>;
    pub type Rest = ::core::ops::RangeFrom<usize>;
}

pub(crate) mod checksum {
    use byteorder::{ByteOrder, NetworkEndian};

    fn propagate_carries(word: u32) -> u16 {
        let sum = (word >> 16) + (word & 0xffff);
        ((sum >> 16) as u16) + (sum as u16)
    }

    /// Compute an RFC 1071 compliant checksum (without the final
    /// complement).
    pub fn data(data: &[u8]) -> u16 {
        let mut accum: u32 = 0;
        let mut i = 0;
        while i < data.len() {
            let word;
            if i + 2 <= data.len() {
                word = NetworkEndian::read_u16(&data[i..i + 2]) as u32
            } else {
                word = (data[i] as u32) << 8
            }
            accum += word;
            i += 2;
        }
        propagate_carries(accum)
    }
}

mod ethernet;
mod icmpv4;
mod ipv4;

pub use self::ethernet::{
    Address as EthernetAddress, EtherType as EthernetProtocol, Frame as EthernetFrame,
    Repr as EthernetRepr, HEADER_LEN as ETHERNET_HEADER_LEN,
};

pub use self::ipv4::{
    Address as Ipv4Address, Packet as Ipv4Packet, Protocol as IpProtocol,
    HEADER_LEN as IPV4_HEADER_LEN,
};

pub use self::icmpv4::{
    DstUnreachable as Icmpv4DstUnreachable, Packet as Icmpv4Packet, Repr as Icmpv4Repr,
    TimeExceeded as Icmpv4TimeExceeded, Type as Icmpv4Type, MSG_MIN_LEN as ICMPV4_MSG_MIN_LEN,
};

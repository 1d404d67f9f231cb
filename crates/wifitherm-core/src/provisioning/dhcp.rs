//! DHCP answers for clients of the captive-portal access point
//!
//! Only as much of the protocol as a phone needs to join the portal network:
//! DISCOVER gets an OFFER and REQUEST gets an ACK, both naming the portal as
//! router and DNS server. Every other message is ignored. Leases are handed
//! out from a small pool following the portal address and are never expired;
//! when the pool is full the oldest client's slot is reused.

use heapless::Vec;
use log::debug;

pub const DHCP_SERVER_PORT: u16 = 67;
pub const DHCP_CLIENT_PORT: u16 = 68;

/// Largest DHCP message a client must accept.
pub const MAX_DHCP_MESSAGE: usize = 576;

/// Number of clients that can hold a lease at once.
pub const LEASE_POOL_SIZE: usize = 8;

const LEASE_SECS: u32 = 3600;
const SUBNET_MASK: [u8; 4] = [255, 255, 255, 0];
const MAGIC_COOKIE: [u8; 4] = [99, 130, 83, 99];
const OPTIONS_OFFSET: usize = 240;
/// Replies are padded to the minimum BOOTP message size.
const MIN_MESSAGE_LEN: usize = 300;

const BOOT_REQUEST: u8 = 1;
const BOOT_REPLY: u8 = 2;
const HTYPE_ETHERNET: u8 = 1;
const MAC_LEN: u8 = 6;

const OPT_PAD: u8 = 0;
const OPT_SUBNET_MASK: u8 = 1;
const OPT_ROUTER: u8 = 3;
const OPT_DNS: u8 = 6;
const OPT_LEASE_TIME: u8 = 51;
const OPT_MESSAGE_TYPE: u8 = 53;
const OPT_SERVER_ID: u8 = 54;
const OPT_END: u8 = 255;

/// DHCP message types this server reads or writes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DhcpMessageType {
    Discover = 1,
    Offer = 2,
    Request = 3,
    Ack = 5,
}

impl DhcpMessageType {
    fn from_code(code: u8) -> Option<Self> {
        match code {
            1 => Some(Self::Discover),
            2 => Some(Self::Offer),
            3 => Some(Self::Request),
            5 => Some(Self::Ack),
            _ => None,
        }
    }
}

/// The fields of a client message the reply is built from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DhcpRequest {
    pub message_type: DhcpMessageType,
    pub xid: [u8; 4],
    pub flags: [u8; 2],
    pub chaddr: [u8; 16],
    pub server_id: Option<[u8; 4]>,
}

impl DhcpRequest {
    pub fn mac(&self) -> [u8; 6] {
        let mut mac = [0u8; 6];
        mac.copy_from_slice(&self.chaddr[..6]);
        mac
    }
}

fn find_option(options: &[u8], code: u8) -> Option<&[u8]> {
    let mut i = 0;
    while i < options.len() {
        match options[i] {
            OPT_PAD => i += 1,
            OPT_END => return None,
            current => {
                let len = usize::from(*options.get(i + 1)?);
                let value = options.get(i + 2..i + 2 + len)?;
                if current == code {
                    return Some(value);
                }
                i += 2 + len;
            }
        }
    }
    None
}

/// Parse a BOOTREQUEST from an Ethernet client.
pub fn parse_request(packet: &[u8]) -> Option<DhcpRequest> {
    if packet.len() < OPTIONS_OFFSET
        || packet[0] != BOOT_REQUEST
        || packet[1] != HTYPE_ETHERNET
        || packet[2] != MAC_LEN
        || packet[236..240] != MAGIC_COOKIE
    {
        return None;
    }

    let options = &packet[OPTIONS_OFFSET..];
    let message_type = match find_option(options, OPT_MESSAGE_TYPE)? {
        [code] => DhcpMessageType::from_code(*code)?,
        _ => return None,
    };
    let server_id = find_option(options, OPT_SERVER_ID).and_then(|id| id.try_into().ok());

    let mut request = DhcpRequest {
        message_type,
        xid: [0; 4],
        flags: [0; 2],
        chaddr: [0; 16],
        server_id,
    };
    request.xid.copy_from_slice(&packet[4..8]);
    request.flags.copy_from_slice(&packet[10..12]);
    request.chaddr.copy_from_slice(&packet[28..44]);
    Some(request)
}

/// Addresses handed out to portal clients, keyed by MAC.
#[derive(Debug)]
pub struct LeasePool {
    server: [u8; 4],
    clients: Vec<[u8; 6], LEASE_POOL_SIZE>,
    next_reuse: usize,
}

impl LeasePool {
    pub const fn new(server: [u8; 4]) -> Self {
        Self {
            server,
            clients: Vec::new(),
            next_reuse: 0,
        }
    }

    /// The address leased to `mac`, assigning one if it has none.
    pub fn lease_for(&mut self, mac: [u8; 6]) -> [u8; 4] {
        let slot = match self.clients.iter().position(|client| *client == mac) {
            Some(slot) => slot,
            None => match self.clients.push(mac) {
                Ok(()) => self.clients.len() - 1,
                Err(mac) => {
                    let slot = self.next_reuse;
                    self.clients[slot] = mac;
                    self.next_reuse = (slot + 1) % LEASE_POOL_SIZE;
                    slot
                }
            },
        };

        let mut address = self.server;
        address[3] = self.server[3].wrapping_add(1 + slot as u8);
        address
    }
}

fn put_option(out: &mut [u8], pos: usize, code: u8, value: &[u8]) -> usize {
    out[pos] = code;
    out[pos + 1] = value.len() as u8;
    out[pos + 2..pos + 2 + value.len()].copy_from_slice(value);
    pos + 2 + value.len()
}

/// Answers DISCOVER and REQUEST messages on the portal network.
#[derive(Debug)]
pub struct DhcpServer {
    server: [u8; 4],
    pool: LeasePool,
}

impl DhcpServer {
    pub const fn new(server: [u8; 4]) -> Self {
        Self {
            server,
            pool: LeasePool::new(server),
        }
    }

    /// Write the reply to `packet` into `out`, returning its length.
    ///
    /// `None` means the message needs no answer: it is not a DISCOVER or
    /// REQUEST, it is addressed to another server, or `out` is too small.
    pub fn reply(&mut self, packet: &[u8], out: &mut [u8]) -> Option<usize> {
        let request = parse_request(packet)?;
        let reply_type = match request.message_type {
            DhcpMessageType::Discover => DhcpMessageType::Offer,
            DhcpMessageType::Request
                if request.server_id.is_none_or(|id| id == self.server) =>
            {
                DhcpMessageType::Ack
            }
            _ => return None,
        };
        if out.len() < MIN_MESSAGE_LEN {
            return None;
        }

        let address = self.pool.lease_for(request.mac());
        debug!(
            "DHCP {:?} for {:02x?}: {}.{}.{}.{}",
            reply_type,
            request.mac(),
            address[0],
            address[1],
            address[2],
            address[3]
        );

        out[..MIN_MESSAGE_LEN].fill(0);
        out[0] = BOOT_REPLY;
        out[1] = HTYPE_ETHERNET;
        out[2] = MAC_LEN;
        out[4..8].copy_from_slice(&request.xid);
        out[10..12].copy_from_slice(&request.flags);
        out[16..20].copy_from_slice(&address);
        out[20..24].copy_from_slice(&self.server);
        out[28..44].copy_from_slice(&request.chaddr);
        out[236..240].copy_from_slice(&MAGIC_COOKIE);

        let mut pos = OPTIONS_OFFSET;
        pos = put_option(out, pos, OPT_MESSAGE_TYPE, &[reply_type as u8]);
        pos = put_option(out, pos, OPT_SERVER_ID, &self.server);
        pos = put_option(out, pos, OPT_LEASE_TIME, &LEASE_SECS.to_be_bytes());
        pos = put_option(out, pos, OPT_SUBNET_MASK, &SUBNET_MASK);
        pos = put_option(out, pos, OPT_ROUTER, &self.server);
        pos = put_option(out, pos, OPT_DNS, &self.server);
        out[pos] = OPT_END;

        Some(MIN_MESSAGE_LEN.max(pos + 1))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const PORTAL: [u8; 4] = [192, 168, 4, 1];
    const PHONE: [u8; 6] = [0x02, 0xaa, 0xbb, 0xcc, 0xdd, 0xee];

    fn client_message(message_type: u8, mac: [u8; 6], extra: &[u8]) -> alloc::vec::Vec<u8> {
        let mut packet = alloc::vec![0u8; OPTIONS_OFFSET];
        packet[0] = BOOT_REQUEST;
        packet[1] = HTYPE_ETHERNET;
        packet[2] = MAC_LEN;
        packet[4..8].copy_from_slice(&[0xde, 0xad, 0xbe, 0xef]);
        packet[10] = 0x80;
        packet[28..34].copy_from_slice(&mac);
        packet[236..240].copy_from_slice(&MAGIC_COOKIE);
        packet.extend_from_slice(&[OPT_MESSAGE_TYPE, 1, message_type]);
        packet.extend_from_slice(extra);
        packet.push(OPT_END);
        packet
    }

    #[test]
    fn test_discover_gets_offer_pointing_at_portal() {
        let mut server = DhcpServer::new(PORTAL);
        let mut out = [0u8; MAX_DHCP_MESSAGE];

        let len = server.reply(&client_message(1, PHONE, &[]), &mut out).unwrap();

        assert_eq!(len, MIN_MESSAGE_LEN);
        assert_eq!(out[0], BOOT_REPLY);
        assert_eq!(out[4..8], [0xde, 0xad, 0xbe, 0xef]);
        assert_eq!(out[10], 0x80);
        assert_eq!(out[16..20], [192, 168, 4, 2]);
        assert_eq!(out[28..34], PHONE);

        let options = &out[OPTIONS_OFFSET..len];
        assert_eq!(find_option(options, OPT_MESSAGE_TYPE), Some(&[2u8][..]));
        assert_eq!(find_option(options, OPT_SERVER_ID), Some(&PORTAL[..]));
        assert_eq!(find_option(options, OPT_ROUTER), Some(&PORTAL[..]));
        assert_eq!(find_option(options, OPT_DNS), Some(&PORTAL[..]));
        assert_eq!(find_option(options, OPT_SUBNET_MASK), Some(&SUBNET_MASK[..]));
    }

    #[test]
    fn test_request_gets_ack_with_same_address() {
        let mut server = DhcpServer::new(PORTAL);
        let mut out = [0u8; MAX_DHCP_MESSAGE];
        server.reply(&client_message(1, PHONE, &[]), &mut out).unwrap();

        let request = client_message(3, PHONE, &[OPT_SERVER_ID, 4, 192, 168, 4, 1]);
        let len = server.reply(&request, &mut out).unwrap();

        let options = &out[OPTIONS_OFFSET..len];
        assert_eq!(find_option(options, OPT_MESSAGE_TYPE), Some(&[5u8][..]));
        assert_eq!(out[16..20], [192, 168, 4, 2]);
    }

    #[test]
    fn test_request_for_other_server_is_ignored() {
        let mut server = DhcpServer::new(PORTAL);
        let mut out = [0u8; MAX_DHCP_MESSAGE];

        let request = client_message(3, PHONE, &[OPT_SERVER_ID, 4, 10, 0, 0, 1]);
        assert_eq!(server.reply(&request, &mut out), None);
    }

    #[test]
    fn test_other_messages_are_ignored() {
        let mut server = DhcpServer::new(PORTAL);
        let mut out = [0u8; MAX_DHCP_MESSAGE];

        // DHCPRELEASE
        assert_eq!(server.reply(&client_message(7, PHONE, &[]), &mut out), None);
        assert_eq!(server.reply(&[0u8; 20], &mut out), None);

        let mut reply = client_message(1, PHONE, &[]);
        reply[0] = BOOT_REPLY;
        assert_eq!(server.reply(&reply, &mut out), None);
    }

    #[test]
    fn test_pool_assigns_distinct_addresses_and_reuses_when_full() {
        let mut pool = LeasePool::new(PORTAL);

        let first = pool.lease_for([1; 6]);
        let second = pool.lease_for([2; 6]);
        assert_eq!(first, [192, 168, 4, 2]);
        assert_eq!(second, [192, 168, 4, 3]);
        assert_eq!(pool.lease_for([1; 6]), first);

        for n in 3..=LEASE_POOL_SIZE as u8 {
            pool.lease_for([n; 6]);
        }
        // Pool is full; the oldest slot goes to the newcomer.
        assert_eq!(pool.lease_for([0xff; 6]), first);
    }

    #[test]
    fn test_option_parsing_skips_padding_and_stops_at_truncation() {
        let options = [OPT_PAD, OPT_PAD, OPT_ROUTER, 4, 1, 2, 3, 4, OPT_DNS, 4, 1];
        assert_eq!(find_option(&options, OPT_ROUTER), Some(&[1u8, 2, 3, 4][..]));
        assert_eq!(find_option(&options, OPT_DNS), None);
    }
}

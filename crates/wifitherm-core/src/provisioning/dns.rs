//! Captive DNS: every name resolves to the portal
//!
//! Phones check a well-known host after joining a network; answering every A
//! query with the portal address makes them open the sign-in page.

pub const DNS_PORT: u16 = 53;

/// Largest DNS message over UDP without EDNS.
pub const MAX_DNS_MESSAGE: usize = 512;

const HEADER_LEN: usize = 12;
const ANSWER_LEN: usize = 16;
const ANSWER_TTL_SECS: u32 = 60;

const TYPE_A: u16 = 1;
const TYPE_ANY: u16 = 255;
const CLASS_IN: u16 = 1;

const FLAG_RESPONSE: u8 = 0x80;
const FLAG_AUTHORITATIVE: u8 = 0x04;
const FLAG_RECURSION_DESIRED: u8 = 0x01;
const FLAG_RECURSION_AVAILABLE: u8 = 0x80;
const OPCODE_MASK: u8 = 0x78;

/// Byte offset just past the first question's QNAME.
fn question_name_end(packet: &[u8]) -> Option<usize> {
    let mut pos = HEADER_LEN;
    loop {
        let len = usize::from(*packet.get(pos)?);
        if len == 0 {
            return Some(pos + 1);
        }
        // Compression pointers never appear in a question.
        if len & 0xc0 != 0 {
            return None;
        }
        pos += 1 + len;
    }
}

/// Write the answer to `query` into `out`, returning its length.
///
/// A and ANY questions in class IN get one record pointing at `address`;
/// other question types get an empty NOERROR answer. Responses, non-standard
/// opcodes and malformed packets return `None`.
pub fn dns_reply(query: &[u8], address: [u8; 4], out: &mut [u8]) -> Option<usize> {
    if query.len() < HEADER_LEN
        || query[2] & FLAG_RESPONSE != 0
        || query[2] & OPCODE_MASK != 0
        || u16::from_be_bytes([query[4], query[5]]) == 0
    {
        return None;
    }

    let name_end = question_name_end(query)?;
    let question_end = name_end + 4;
    let fields = query.get(name_end..question_end)?;
    let qtype = u16::from_be_bytes([fields[0], fields[1]]);
    let qclass = u16::from_be_bytes([fields[2], fields[3]]);
    let answered = matches!(qtype, TYPE_A | TYPE_ANY) && qclass == CLASS_IN;

    let len = question_end + if answered { ANSWER_LEN } else { 0 };
    if out.len() < len {
        return None;
    }

    out[..question_end].copy_from_slice(&query[..question_end]);
    out[2] = FLAG_RESPONSE | FLAG_AUTHORITATIVE | (query[2] & FLAG_RECURSION_DESIRED);
    out[3] = FLAG_RECURSION_AVAILABLE;
    // One question echoed, nothing in authority or additional.
    out[4..6].copy_from_slice(&1u16.to_be_bytes());
    out[6..8].copy_from_slice(&u16::from(answered).to_be_bytes());
    out[8..12].fill(0);

    if answered {
        let answer = &mut out[question_end..len];
        // Name is a pointer back to the question at offset 12.
        answer[0..2].copy_from_slice(&[0xc0, HEADER_LEN as u8]);
        answer[2..4].copy_from_slice(&TYPE_A.to_be_bytes());
        answer[4..6].copy_from_slice(&CLASS_IN.to_be_bytes());
        answer[6..10].copy_from_slice(&ANSWER_TTL_SECS.to_be_bytes());
        answer[10..12].copy_from_slice(&4u16.to_be_bytes());
        answer[12..16].copy_from_slice(&address);
    }

    Some(len)
}

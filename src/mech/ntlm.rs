use byteorder::{ByteOrder, LittleEndian};

use crate::crypto::{des_long, lm_hash, ntlm_hash};
use crate::error::AuthError;
use crate::mech::{Context, Mechanism, Step};

const SIGNATURE: [u8; 8] = *b"NTLMSSP\0";

// negotiate unicode + oem + request target + NTLM + domain & workstation supplied
const TYPE1_FLAGS: u32 = 0x0000_3207;
// negotiate unicode + NTLM
const TYPE3_FLAGS: u32 = 0x0000_0201;

/// NTLM over SASL, NTLMv1 semantics: a client-first Type-1 negotiate
/// message, the server's Type-2 challenge, and a Type-3 authenticate message
/// carrying the DES-encrypted LM and NTLM responses.
///
/// The credential's domain field is the NTLM domain; the session's
/// `target_host` is the workstation name. Type-1 carries no secret material
/// and is emitted even when username or password are empty; the exchange
/// then fails at Type-3 time.
#[derive(Default)]
pub struct Ntlm {
    negotiated: bool,
}

impl Mechanism for Ntlm {
    fn client_first(&self) -> bool {
        true
    }

    fn step(&mut self, ctx: &Context<'_>, challenge: &[u8]) -> Result<Step, AuthError> {
        if !self.negotiated {
            self.negotiated = true;
            let domain = ctx.credential.domain().unwrap_or("");
            let workstation = ctx.target_host.unwrap_or("");
            return Ok(Step::Continue(type1(domain, workstation)));
        }

        let server_challenge = match parse_type2(challenge) {
            Some(server_challenge) => server_challenge,
            None => {
                tracing::warn!("malformed NTLM Type-2 message");
                return Ok(Step::Reject);
            }
        };

        let (username, password) = match (ctx.credential.username(), ctx.credential.password()) {
            (Some(u), Some(p)) => (u, p),
            _ => return Ok(Step::Reject),
        };
        let domain = ctx.credential.domain().unwrap_or("");
        let workstation = ctx.target_host.unwrap_or("");

        Ok(Step::Done(type3(
            username,
            password,
            domain,
            workstation,
            &server_challenge,
        )))
    }

    fn reset(&mut self) {
        self.negotiated = false;
    }
}

/// Type-1 negotiate: OEM-encoded, uppercased workstation then domain names
/// behind their security buffers.
fn type1(domain: &str, workstation: &str) -> Vec<u8> {
    let domain = domain.to_uppercase().into_bytes();
    let workstation = workstation.to_uppercase().into_bytes();

    let workstation_offset = 32;
    let domain_offset = workstation_offset + workstation.len();

    let mut msg = Vec::with_capacity(domain_offset + domain.len());
    msg.extend_from_slice(&SIGNATURE);
    msg.extend_from_slice(&1u32.to_le_bytes());
    msg.extend_from_slice(&TYPE1_FLAGS.to_le_bytes());
    put_secbuf(&mut msg, domain.len(), domain_offset);
    put_secbuf(&mut msg, workstation.len(), workstation_offset);
    msg.extend_from_slice(&workstation);
    msg.extend_from_slice(&domain);
    msg
}

/// Pull the 8-byte server challenge out of a Type-2 message.
fn parse_type2(msg: &[u8]) -> Option<[u8; 8]> {
    if msg.len() < 32 || msg[..8] != SIGNATURE {
        return None;
    }
    if LittleEndian::read_u32(&msg[8..12]) != 2 {
        return None;
    }
    let mut challenge = [0u8; 8];
    challenge.copy_from_slice(&msg[24..32]);
    Some(challenge)
}

/// Type-3 authenticate: UTF-16LE domain/username/workstation plus the 24-byte
/// LM and NTLM challenge responses; the session key buffer is left empty.
fn type3(
    username: &str,
    password: &str,
    domain: &str,
    workstation: &str,
    server_challenge: &[u8; 8],
) -> Vec<u8> {
    let domain = utf16le(&domain.to_uppercase());
    let username = utf16le(username);
    let workstation = utf16le(&workstation.to_uppercase());
    let lm_response = des_long(&lm_hash(password), server_challenge);
    let nt_response = des_long(&ntlm_hash(password), server_challenge);

    const HEADER_LEN: usize = 64;
    let domain_offset = HEADER_LEN;
    let username_offset = domain_offset + domain.len();
    let workstation_offset = username_offset + username.len();
    let lm_offset = workstation_offset + workstation.len();
    let nt_offset = lm_offset + lm_response.len();
    let session_key_offset = nt_offset + nt_response.len();

    let mut msg = Vec::with_capacity(session_key_offset);
    msg.extend_from_slice(&SIGNATURE);
    msg.extend_from_slice(&3u32.to_le_bytes());
    put_secbuf(&mut msg, lm_response.len(), lm_offset);
    put_secbuf(&mut msg, nt_response.len(), nt_offset);
    put_secbuf(&mut msg, domain.len(), domain_offset);
    put_secbuf(&mut msg, username.len(), username_offset);
    put_secbuf(&mut msg, workstation.len(), workstation_offset);
    put_secbuf(&mut msg, 0, session_key_offset);
    msg.extend_from_slice(&TYPE3_FLAGS.to_le_bytes());
    msg.extend_from_slice(&domain);
    msg.extend_from_slice(&username);
    msg.extend_from_slice(&workstation);
    msg.extend_from_slice(&lm_response);
    msg.extend_from_slice(&nt_response);
    msg
}

/// length / allocated length / offset triple prefixing each payload field.
fn put_secbuf(msg: &mut Vec<u8>, len: usize, offset: usize) {
    msg.extend_from_slice(&(len as u16).to_le_bytes());
    msg.extend_from_slice(&(len as u16).to_le_bytes());
    msg.extend_from_slice(&(offset as u32).to_le_bytes());
}

fn utf16le(s: &str) -> Vec<u8> {
    s.encode_utf16().flat_map(u16::to_le_bytes).collect()
}

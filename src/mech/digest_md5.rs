use std::collections::HashMap;

use nom::{
    branch::alt,
    bytes::complete::{is_not, take, take_while1},
    character::complete::{char, multispace0},
    combinator::{all_consuming, map},
    multi::{fold_many0, separated_list0},
    sequence::{delimited, preceded, separated_pair},
    IResult,
};
use rand::RngCore;
use zeroize::{Zeroize, ZeroizeOnDrop};

use crate::crypto::{md5, md5_hex};
use crate::error::AuthError;
use crate::mech::{Context, Mechanism, Step};

const NC: &[u8] = b"00000001";
const QOP: &[u8] = b"auth";

/// DIGEST-MD5 (RFC 2831), client side, `qop=auth` only.
///
/// Round one parses the server's comma-separated challenge directives and
/// answers with the digest-response; round two verifies the server's
/// `rspauth` (mutual authentication) and finishes with an empty response.
/// A fixed client nonce can be injected through the session for
/// deterministic exchanges.
#[derive(Default)]
pub struct DigestMd5 {
    state: State,
}

#[derive(Default)]
enum State {
    #[default]
    Start,
    /// The digest-response went out; everything needed to check `rspauth`
    /// is carried over to the next round.
    ResponseSent(Pending),
}

#[derive(Zeroize, ZeroizeOnDrop)]
struct Pending {
    ha1_hex: String,
    nonce: Vec<u8>,
    cnonce: Vec<u8>,
    digest_uri: String,
}

impl Mechanism for DigestMd5 {
    fn client_first(&self) -> bool {
        false
    }

    fn step(&mut self, ctx: &Context<'_>, challenge: &[u8]) -> Result<Step, AuthError> {
        match std::mem::take(&mut self.state) {
            State::Start => self.round_one(ctx, challenge),
            State::ResponseSent(pending) => Ok(round_two(pending, challenge)),
        }
    }

    fn reset(&mut self) {
        // Dropping a pending state zeroizes the derived key material.
        self.state = State::Start;
    }
}

impl DigestMd5 {
    fn round_one(&mut self, ctx: &Context<'_>, challenge: &[u8]) -> Result<Step, AuthError> {
        let service = ctx.service_name.ok_or(AuthError::ServiceNameRequired)?;

        let (username, password) = match (ctx.credential.username(), ctx.credential.password()) {
            (Some(u), Some(p)) => (u, p),
            _ => return Ok(Step::Reject),
        };

        let fields = match parse_challenge(challenge) {
            Some(fields) => fields,
            None => {
                tracing::warn!("unparseable DIGEST-MD5 challenge");
                return Ok(Step::Reject);
            }
        };

        // algorithm=md5-sess is required; anything else is an unsupported
        // HTTP-Digest variant.
        if fields.get("algorithm").map(Vec::as_slice) != Some(b"md5-sess".as_slice()) {
            tracing::warn!("DIGEST-MD5 challenge without algorithm=md5-sess");
            return Ok(Step::Reject);
        }

        let utf8 = fields
            .get("charset")
            .is_some_and(|v| v.eq_ignore_ascii_case(b"utf-8"));

        let nonce = match fields.get("nonce") {
            Some(nonce) => nonce.clone(),
            None => return Ok(Step::Reject),
        };
        // qop-options are ignored beyond their presence; we only do "auth".
        if !fields.contains_key("qop") {
            return Ok(Step::Reject);
        }

        // A challenge without a realm falls back to the credential's domain
        // as the default realm.
        let realm = match fields.get("realm") {
            Some(realm) => realm.clone(),
            None => ctx.credential.domain().unwrap_or("").as_bytes().to_vec(),
        };

        let cnonce = match ctx.cnonce {
            Some(cnonce) => cnonce.to_vec(),
            None => {
                let mut seed = [0u8; 16];
                rand::thread_rng().fill_bytes(&mut seed);
                hex::encode(seed).into_bytes()
            }
        };

        let host = ctx.target_host.or(ctx.credential.domain()).unwrap_or("");
        let digest_uri = format!("{}/{}", service, host);

        let username_bytes = encode_charset(username, utf8);
        let password_bytes = encode_charset(password, utf8);

        // A1 = H(username:realm:password) : nonce : cnonce
        let mut secret = Vec::new();
        secret.extend_from_slice(&username_bytes);
        secret.push(b':');
        secret.extend_from_slice(&realm);
        secret.push(b':');
        secret.extend_from_slice(&password_bytes);
        let mut a1 = md5(&secret).to_vec();
        secret.zeroize();
        a1.push(b':');
        a1.extend_from_slice(&nonce);
        a1.push(b':');
        a1.extend_from_slice(&cnonce);
        let ha1_hex = md5_hex(&a1);
        a1.zeroize();

        let mut a2 = b"AUTHENTICATE:".to_vec();
        a2.extend_from_slice(digest_uri.as_bytes());
        let response_hex = kd(&ha1_hex, &nonce, &cnonce, &md5_hex(&a2));

        let mut out = Vec::with_capacity(0x200);
        if utf8 {
            out.extend_from_slice(b"charset=utf-8,");
        }
        out.extend_from_slice(b"username=\"");
        out.extend_from_slice(&username_bytes);
        out.extend_from_slice(b"\",realm=\"");
        out.extend_from_slice(&realm);
        out.extend_from_slice(b"\",nonce=\"");
        out.extend_from_slice(&nonce);
        out.extend_from_slice(b"\",nc=");
        out.extend_from_slice(NC);
        out.extend_from_slice(b",cnonce=\"");
        out.extend_from_slice(&cnonce);
        out.extend_from_slice(b"\",digest-uri=\"");
        out.extend_from_slice(digest_uri.as_bytes());
        out.extend_from_slice(b"\",response=");
        out.extend_from_slice(response_hex.as_bytes());
        out.extend_from_slice(b",qop=");
        out.extend_from_slice(QOP);

        self.state = State::ResponseSent(Pending {
            ha1_hex,
            nonce,
            cnonce,
            digest_uri,
        });

        Ok(Step::Continue(out))
    }
}

/// Verify the server's `rspauth` confirmation. The expected value is the
/// same KD construction with the `AUTHENTICATE` prefix dropped from A2
/// (RFC 2831 §2.1.3).
fn round_two(pending: Pending, challenge: &[u8]) -> Step {
    let rspauth = match parse_challenge(challenge).and_then(|mut f| f.remove("rspauth")) {
        Some(rspauth) => rspauth,
        None => {
            tracing::warn!("DIGEST-MD5 server did not confirm with rspauth");
            return Step::Reject;
        }
    };

    let mut a2 = b":".to_vec();
    a2.extend_from_slice(pending.digest_uri.as_bytes());
    let expected = kd(&pending.ha1_hex, &pending.nonce, &pending.cnonce, &md5_hex(&a2));

    if rspauth == expected.as_bytes() {
        Step::Done(Vec::new())
    } else {
        tracing::warn!("DIGEST-MD5 rspauth does not match, server does not know the secret");
        Step::Reject
    }
}

/// `HEX(KD(ha1-hex, nonce:nc:cnonce:qop:ha2-hex))` of RFC 2831 §2.1.2.1.
fn kd(ha1_hex: &str, nonce: &[u8], cnonce: &[u8], ha2_hex: &str) -> String {
    let mut buf = Vec::with_capacity(0x100);
    buf.extend_from_slice(ha1_hex.as_bytes());
    buf.push(b':');
    buf.extend_from_slice(nonce);
    buf.push(b':');
    buf.extend_from_slice(NC);
    buf.push(b':');
    buf.extend_from_slice(cnonce);
    buf.push(b':');
    buf.extend_from_slice(QOP);
    buf.push(b':');
    buf.extend_from_slice(ha2_hex.as_bytes());
    md5_hex(&buf)
}

/// Without `charset=utf-8` the server expects ISO-8859-1 (RFC 2831 §2.1.1);
/// characters outside it are replaced.
fn encode_charset(s: &str, utf8: bool) -> Vec<u8> {
    if utf8 {
        s.as_bytes().to_vec()
    } else {
        s.chars()
            .map(|c| if (c as u32) < 0x100 { c as u8 } else { b'?' })
            .collect()
    }
}

// ---------------------
// challenge grammar: comma-separated `key=value` directives, values either
// tokens or quoted strings with backslash escapes

fn is_token_char(c: u8) -> bool {
    !matches!(c, b',' | b'=' | b'"' | b' ' | b'\t' | b'\r' | b'\n')
}

fn quoted_value(input: &[u8]) -> IResult<&[u8], Vec<u8>> {
    delimited(
        char('"'),
        fold_many0(
            alt((preceded(char('\\'), take(1usize)), is_not("\\\""))),
            Vec::new,
            |mut acc, chunk: &[u8]| {
                acc.extend_from_slice(chunk);
                acc
            },
        ),
        char('"'),
    )(input)
}

fn token_value(input: &[u8]) -> IResult<&[u8], Vec<u8>> {
    map(take_while1(is_token_char), <[u8]>::to_vec)(input)
}

fn attr_pair(input: &[u8]) -> IResult<&[u8], (&[u8], Vec<u8>)> {
    separated_pair(
        take_while1(is_token_char),
        char('='),
        alt((quoted_value, token_value)),
    )(input)
}

fn parse_challenge(input: &[u8]) -> Option<HashMap<String, Vec<u8>>> {
    let fields = all_consuming(separated_list0(
        char(','),
        delimited(multispace0, attr_pair, multispace0),
    ))(input)
    .ok()?
    .1;

    Some(
        fields
            .into_iter()
            .map(|(k, v)| (String::from_utf8_lossy(k).to_ascii_lowercase(), v))
            .collect(),
    )
}

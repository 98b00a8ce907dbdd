//! The pluggable mechanism contract and the six built-in mechanisms.

pub mod anonymous;
pub mod cram_md5;
pub mod digest_md5;
pub mod login;
pub mod ntlm;
pub mod plain;

use crate::error::AuthError;
use crate::types::Credential;

/// Outcome of one mechanism round.
///
/// A refused exchange carries no response by construction: there is no
/// `Reject` payload, which is how the "Failed implies absent response"
/// invariant is enforced.
#[derive(Debug)]
pub enum Step {
    /// Send this response and wait for another server challenge.
    Continue(Vec<u8>),
    /// Send this response (possibly empty); the exchange succeeded.
    Done(Vec<u8>),
    /// The exchange failed (empty required field, server refusal, malformed
    /// challenge). Nothing is sent.
    Reject,
}

/// Per-call view of the session's credential and mechanism extras.
///
/// Mechanisms receive their inputs through this context on every round
/// instead of holding their own copies, so the only state a mechanism keeps
/// between rounds is its mid-negotiation data.
pub struct Context<'a> {
    pub credential: &'a Credential,
    /// GSSAPI-style service name (e.g. `imap`, `smtp`), required by
    /// DIGEST-MD5 for the digest-uri binding.
    pub service_name: Option<&'a str>,
    /// Local workstation (NTLM) or service host (DIGEST-MD5 digest-uri).
    pub target_host: Option<&'a str>,
    /// Externally supplied client nonce, for deterministic DIGEST-MD5
    /// exchanges. Freshly generated when absent.
    pub cnonce: Option<&'a [u8]>,
}

/// One SASL mechanism implementation.
///
/// The surrounding [`Session`](crate::flow::Session) owns the credential and
/// enforces the exchange lifecycle; implementations only map a server
/// challenge to the next [`Step`] and keep their own round-to-round state.
pub trait Mechanism: Send {
    /// True when the mechanism produces its first message without waiting
    /// for a server challenge.
    fn client_first(&self) -> bool;

    /// Run one round against `challenge` (empty for the initial round of a
    /// client-first mechanism).
    ///
    /// Configuration preconditions (unset service name) surface as errors;
    /// empty-but-present credential fields surface as [`Step::Reject`].
    fn step(&mut self, ctx: &Context<'_>, challenge: &[u8]) -> Result<Step, AuthError>;

    /// Drop all mid-negotiation state, scrubbing any derived key material,
    /// so the next `step` starts the exchange over.
    fn reset(&mut self);
}

use std::fmt;

use zeroize::{Zeroize, ZeroizeOnDrop};

/// Progress of a single authentication exchange.
///
/// The only legal transitions are `Init -> Continuing* -> Succeeded` and
/// `Init -> Continuing* -> Failed`. Both `Succeeded` and `Failed` are
/// terminal: exchanging again once they are reached is a caller bug, not a
/// protocol failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Status {
    /// No exchange round has run yet.
    Init,
    /// The mechanism expects at least one more server challenge.
    Continuing,
    /// The negotiation completed and the server accepted the credential.
    Succeeded,
    /// The negotiation completed and authentication was refused, or a
    /// required credential field was empty. Always paired with an absent
    /// client response.
    Failed,
}

impl Status {
    pub fn is_terminal(&self) -> bool {
        matches!(self, Status::Succeeded | Status::Failed)
    }
}

/// A username/password/domain triple bound to a mechanism for one exchange.
///
/// Every field may legitimately be absent or empty: mechanisms check for
/// emptiness and fail the exchange rather than assume well-formed input.
/// The domain field is overloaded the way the classic APIs overload it:
/// NTLM domain, DIGEST-MD5 default realm, PLAIN authorization identity.
///
/// The buffers are wiped when the credential is dropped.
#[derive(Clone, Default, Zeroize, ZeroizeOnDrop)]
pub struct Credential {
    username: Option<String>,
    password: Option<String>,
    domain: Option<String>,
}

impl Credential {
    pub fn new(username: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            username: Some(username.into()),
            password: Some(password.into()),
            domain: None,
        }
    }

    pub fn with_domain(mut self, domain: impl Into<String>) -> Self {
        self.domain = Some(domain.into());
        self
    }

    /// Username, or `None` when unset *or* empty.
    pub fn username(&self) -> Option<&str> {
        non_empty(&self.username)
    }

    /// Password, or `None` when unset *or* empty.
    pub fn password(&self) -> Option<&str> {
        non_empty(&self.password)
    }

    /// Domain / realm / authzid, or `None` when unset or empty.
    pub fn domain(&self) -> Option<&str> {
        non_empty(&self.domain)
    }
}

fn non_empty(field: &Option<String>) -> Option<&str> {
    field.as_deref().filter(|v| !v.is_empty())
}

impl fmt::Debug for Credential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credential")
            .field("username", &self.username)
            .field("password", &self.password.as_ref().map(|_| "***"))
            .field("domain", &self.domain)
            .finish()
    }
}

use zeroize::Zeroize;

use crate::error::AuthError;
use crate::mech::{Context, Mechanism, Step};
use crate::types::{Credential, Status};

/// One authentication exchange: a mechanism instance plus the bookkeeping
/// every mechanism shares (credential, extras, status, disposal).
///
/// The session enforces the call protocol: `exchange` is legal only while
/// the status is `Init` or `Continuing`, `initial_response` only as the very
/// first call of a client-first mechanism. Violations are errors, distinct
/// from an authentication refusal which is the `(Failed, None)` outcome.
///
/// Calls are strictly sequential; nothing here blocks. Waiting for the next
/// server challenge happens in the transport, between calls.
pub struct Session {
    name: String,
    plain_text: bool,
    mech: Box<dyn Mechanism>,
    credential: Option<Credential>,
    service_name: Option<String>,
    target_host: Option<String>,
    cnonce: Option<Vec<u8>>,
    status: Status,
    disposed: bool,
}

impl Session {
    pub(crate) fn new(name: String, plain_text: bool, mech: Box<dyn Mechanism>) -> Self {
        Self {
            name,
            plain_text,
            mech,
            credential: None,
            service_name: None,
            target_host: None,
            cnonce: None,
            status: Status::Init,
            disposed: false,
        }
    }

    /// Canonical mechanism name this session was created under.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Static capability: does this mechanism expose the password in clear?
    pub fn is_plain_text(&self) -> bool {
        self.plain_text
    }

    /// True when the mechanism sends the first message of the exchange.
    pub fn client_first(&self) -> bool {
        self.mech.client_first()
    }

    pub fn status(&self) -> Result<Status, AuthError> {
        self.check_disposed()?;
        Ok(self.status)
    }

    /// Bind the credential used for the rest of the exchange.
    pub fn set_credential(&mut self, credential: Credential) -> Result<(), AuthError> {
        self.check_disposed()?;
        self.credential = Some(credential);
        Ok(())
    }

    pub fn credential(&self) -> Result<Option<&Credential>, AuthError> {
        self.check_disposed()?;
        Ok(self.credential.as_ref())
    }

    /// Service name (e.g. `imap`) for mechanisms that bind their response to
    /// the service, see <https://www.iana.org/assignments/gssapi-service-names>.
    pub fn set_service_name(&mut self, service_name: impl Into<String>) {
        self.service_name = Some(service_name.into());
    }

    /// Local workstation / target host name, used by NTLM and as the
    /// DIGEST-MD5 digest-uri host.
    pub fn set_target_host(&mut self, target_host: impl Into<String>) {
        self.target_host = Some(target_host.into());
    }

    /// Inject a fixed client nonce instead of a random one. Survives
    /// [`initialize`](Self::initialize) so a replayed exchange reproduces
    /// byte-identical responses.
    pub fn set_cnonce(&mut self, cnonce: impl Into<Vec<u8>>) {
        self.cnonce = Some(cnonce.into());
    }

    /// Reset the exchange to its initial state, keeping credential and
    /// extras, so the same session can run a fresh negotiation.
    pub fn initialize(&mut self) -> Result<(), AuthError> {
        self.check_disposed()?;
        self.status = Status::Init;
        self.mech.reset();
        Ok(())
    }

    /// First message of a client-first mechanism, produced before any server
    /// challenge exists.
    pub fn initial_response(&mut self) -> Result<(Status, Option<Vec<u8>>), AuthError> {
        self.check_disposed()?;
        if self.status.is_terminal() {
            return Err(AuthError::ExchangeCompleted);
        }
        if !self.mech.client_first() || self.status != Status::Init {
            return Err(AuthError::InitialResponseUnsupported);
        }
        self.exchange(&[])
    }

    /// Feed the server's challenge to the mechanism and get the next client
    /// response. A `(Failed, None)` return is a completed, refused exchange,
    /// not an error.
    pub fn exchange(&mut self, challenge: &[u8]) -> Result<(Status, Option<Vec<u8>>), AuthError> {
        self.check_disposed()?;
        if self.status.is_terminal() {
            return Err(AuthError::ExchangeCompleted);
        }

        let credential = self
            .credential
            .as_ref()
            .ok_or(AuthError::CredentialRequired)?;
        let ctx = Context {
            credential,
            service_name: self.service_name.as_deref(),
            target_host: self.target_host.as_deref(),
            cnonce: self.cnonce.as_deref(),
        };

        let (status, response) = match self.mech.step(&ctx, challenge)? {
            Step::Continue(resp) => (Status::Continuing, Some(resp)),
            Step::Done(resp) => (Status::Succeeded, Some(resp)),
            Step::Reject => (Status::Failed, None),
        };

        self.status = status;
        if status.is_terminal() {
            // Mid-negotiation state (derived keys, nonces) is no longer
            // needed once the exchange is decided.
            self.mech.reset();
        }
        tracing::debug!(mechanism = %self.name, status = ?status, "exchange made progress");

        Ok((status, response))
    }

    /// Scrub all secret material and make every further call fail with
    /// [`AuthError::Disposed`]. Dropping the session scrubs as well.
    pub fn dispose(&mut self) {
        self.mech.reset();
        self.credential = None;
        if let Some(cnonce) = self.cnonce.as_mut() {
            cnonce.zeroize();
        }
        self.cnonce = None;
        self.service_name = None;
        self.target_host = None;
        self.disposed = true;
    }

    fn check_disposed(&self) -> Result<(), AuthError> {
        if self.disposed {
            Err(AuthError::Disposed)
        } else {
            Ok(())
        }
    }
}

impl Drop for Session {
    fn drop(&mut self) {
        // Credential and cnonce wipe through their own drops; the mechanism
        // is asked to scrub whatever negotiation state it still holds.
        self.mech.reset();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Minimal client-first mechanism: echoes the round number once.
    struct Stub {
        client_first: bool,
        rounds: u8,
    }

    impl Mechanism for Stub {
        fn client_first(&self) -> bool {
            self.client_first
        }

        fn step(&mut self, _ctx: &Context<'_>, _challenge: &[u8]) -> Result<Step, AuthError> {
            self.rounds += 1;
            match self.rounds {
                1 => Ok(Step::Continue(vec![self.rounds])),
                _ => Ok(Step::Done(vec![self.rounds])),
            }
        }

        fn reset(&mut self) {
            self.rounds = 0;
        }
    }

    fn session(client_first: bool) -> Session {
        Session::new(
            "X-STUB".into(),
            false,
            Box::new(Stub {
                client_first,
                rounds: 0,
            }),
        )
    }

    #[test]
    fn credential_is_required_before_any_round() {
        let mut session = session(true);
        assert!(matches!(
            session.exchange(b""),
            Err(AuthError::CredentialRequired)
        ));
    }

    #[test]
    fn initial_response_rejected_on_server_first() {
        let mut session = session(false);
        session.set_credential(Credential::new("a", "b")).unwrap();
        assert!(matches!(
            session.initial_response(),
            Err(AuthError::InitialResponseUnsupported)
        ));
    }

    #[test]
    fn initial_response_rejected_mid_exchange() {
        let mut session = session(true);
        session.set_credential(Credential::new("a", "b")).unwrap();
        let (status, _) = session.initial_response().unwrap();
        assert_eq!(status, Status::Continuing);
        assert!(matches!(
            session.initial_response(),
            Err(AuthError::InitialResponseUnsupported)
        ));
    }

    #[test]
    fn exchange_after_terminal_state_is_a_usage_error() {
        let mut session = session(true);
        session.set_credential(Credential::new("a", "b")).unwrap();
        session.exchange(b"").unwrap();
        let (status, _) = session.exchange(b"x").unwrap();
        assert_eq!(status, Status::Succeeded);
        assert!(matches!(
            session.exchange(b"y"),
            Err(AuthError::ExchangeCompleted)
        ));
    }

    #[test]
    fn initialize_restarts_the_exchange() {
        let mut session = session(true);
        session.set_credential(Credential::new("a", "b")).unwrap();
        let first = session.exchange(b"").unwrap();
        session.exchange(b"").unwrap();
        session.initialize().unwrap();
        assert_eq!(session.status().unwrap(), Status::Init);
        assert_eq!(session.exchange(b"").unwrap(), first);
    }

    #[test]
    fn disposed_session_refuses_everything() {
        let mut session = session(true);
        session.set_credential(Credential::new("a", "b")).unwrap();
        session.dispose();
        assert!(matches!(session.status(), Err(AuthError::Disposed)));
        assert!(matches!(session.credential(), Err(AuthError::Disposed)));
        assert!(matches!(session.exchange(b""), Err(AuthError::Disposed)));
        assert!(matches!(
            session.initial_response(),
            Err(AuthError::Disposed)
        ));
        assert!(matches!(session.initialize(), Err(AuthError::Disposed)));
    }
}

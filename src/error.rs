use thiserror::Error;

/// Errors raised by the registry and the exchange state machine.
///
/// An authentication *refusal* is not an error: it surfaces as
/// [`Status::Failed`](crate::types::Status) with no client response, because
/// it is an expected outcome of a normal negotiation. Everything below is
/// either a caller contract violation or a configuration problem detected
/// before any network round-trip.
#[derive(Debug, Error)]
pub enum AuthError {
    /// No mechanism registered under this name.
    #[error("mechanism {0:?} is not supported")]
    MechanismNotSupported(String),

    /// A descriptor that cannot be registered (e.g. empty mechanism name).
    #[error("invalid mechanism registration: {0}")]
    InvalidMechanism(&'static str),

    /// A registered constructor failed; the underlying cause is wrapped so
    /// implementation-specific error types never escape the registry.
    #[error("cannot instantiate mechanism {name:?}")]
    Instantiation {
        name: String,
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    /// `exchange` or `initial_response` called after `Succeeded` or `Failed`.
    #[error("exchange already reached a terminal state")]
    ExchangeCompleted,

    /// `initial_response` called on a server-first mechanism, or when the
    /// exchange has already started.
    #[error("initial response is not supported by this mechanism at this point")]
    InitialResponseUnsupported,

    /// A credential must be bound to the session before exchanging.
    #[error("credential is required but was not set")]
    CredentialRequired,

    /// The mechanism binds its response to a service name that was not set.
    #[error("service name is required but was not set")]
    ServiceNameRequired,

    /// The session was disposed; its secrets are gone.
    #[error("session has been disposed")]
    Disposed,
}

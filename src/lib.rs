//! Client-side SASL authentication, independent of any carrier protocol.
//!
//! The caller owns the wire: it reads challenges off its protocol (IMAP,
//! SMTP, POP3, ...), hands the decoded bytes to a [`Session`], and writes the
//! returned response back out. This crate only computes what to send.
//!
//! ## Trace
//!
//! ```text
//! S: * OK IMAP4rev1 server ready
//! C: a AUTHENTICATE CRAM-MD5
//! S: + PDE4OTYuNjk3MTcwOTUyQHBvc3RvZmZpY2UucmVzdG9uLm1jaS5uZXQ+
//! C: dGltIGI5MTNhNjAyYzdlZGE3YTQ5NWI0ZTZlNzMzNGQzODkw
//! S: a OK CRAM authentication successful
//! ```
//!
//! ```no_run
//! use sasl_client::{Credential, Registry, Status};
//!
//! # fn main() -> Result<(), sasl_client::AuthError> {
//! let registry = Registry::default();
//! let mut session = registry.create("CRAM-MD5")?;
//! session.set_credential(Credential::new("tim", "tanstaaftanstaaf"))?;
//!
//! let challenge: Vec<u8> = todo!("base64-decoded challenge from the server");
//! let (status, response) = session.exchange(&challenge)?;
//! assert_eq!(status, Status::Succeeded);
//! # Ok(())
//! # }
//! ```
//!
//! ## RFC References
//!
//! SASL framework - https://datatracker.ietf.org/doc/html/rfc4422
//!
//! ANONYMOUS - https://datatracker.ietf.org/doc/html/rfc4505
//! PLAIN - https://datatracker.ietf.org/doc/html/rfc4616
//! CRAM-MD5 - https://datatracker.ietf.org/doc/html/rfc2195
//! DIGEST-MD5 - https://datatracker.ietf.org/doc/html/rfc2831
//! NTLM - http://davenport.sourceforge.net/ntlm.html

pub mod crypto;
pub mod error;
pub mod flow;
pub mod mech;
pub mod registry;
pub mod types;

pub use error::AuthError;
pub use flow::Session;
pub use mech::{Context, Mechanism, Step};
pub use registry::{ConstructorError, MechanismDescriptor, Registry};
pub use types::{Credential, Status};

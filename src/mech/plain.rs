use crate::error::AuthError;
use crate::mech::{Context, Mechanism, Step};

/// PLAIN (RFC 4616): one client-first round with the NUL-joined
/// `authzid \0 authcid \0 password` triple. The credential's domain field is
/// the optional authorization identity.
pub struct Plain;

impl Mechanism for Plain {
    fn client_first(&self) -> bool {
        true
    }

    fn step(&mut self, ctx: &Context<'_>, _challenge: &[u8]) -> Result<Step, AuthError> {
        let (authcid, password) = match (ctx.credential.username(), ctx.credential.password()) {
            (Some(u), Some(p)) => (u, p),
            _ => return Ok(Step::Reject),
        };
        let authzid = ctx.credential.domain().unwrap_or("");

        let mut response = Vec::with_capacity(authzid.len() + authcid.len() + password.len() + 2);
        response.extend_from_slice(authzid.as_bytes());
        response.push(0);
        response.extend_from_slice(authcid.as_bytes());
        response.push(0);
        response.extend_from_slice(password.as_bytes());

        Ok(Step::Done(response))
    }

    fn reset(&mut self) {}
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{Credential, Status};

    fn exchange(credential: Credential) -> (Status, Option<Vec<u8>>) {
        let mut session = crate::Registry::default().create("PLAIN").unwrap();
        session.set_credential(credential).unwrap();
        session.initial_response().unwrap()
    }

    #[test]
    fn without_authzid() {
        let (status, response) = exchange(Credential::new("tim", "tanstaaftanstaaf"));
        assert_eq!(status, Status::Succeeded);
        assert_eq!(response.as_deref(), Some(&b"\0tim\0tanstaaftanstaaf"[..]));
    }

    #[test]
    fn with_authzid() {
        let (status, response) =
            exchange(Credential::new("Kurt", "xipj3plmq").with_domain("Ursel"));
        assert_eq!(status, Status::Succeeded);
        assert_eq!(response.as_deref(), Some(&b"Ursel\0Kurt\0xipj3plmq"[..]));
    }

    #[test]
    fn missing_username_fails() {
        let (status, response) = exchange(Credential::new("", "pass"));
        assert_eq!(status, Status::Failed);
        assert_eq!(response, None);
    }

    #[test]
    fn missing_password_fails() {
        let (status, response) = exchange(Credential::new("user", ""));
        assert_eq!(status, Status::Failed);
        assert_eq!(response, None);
    }
}

use crate::crypto::hmac_md5;
use crate::error::AuthError;
use crate::mech::{Context, Mechanism, Step};

/// CRAM-MD5 (RFC 2195): one server-first round. The response is the
/// username, a space, and the lowercase hex HMAC-MD5 of the challenge keyed
/// with the password.
pub struct CramMd5;

impl Mechanism for CramMd5 {
    fn client_first(&self) -> bool {
        false
    }

    fn step(&mut self, ctx: &Context<'_>, challenge: &[u8]) -> Result<Step, AuthError> {
        let (username, password) = match (ctx.credential.username(), ctx.credential.password()) {
            (Some(u), Some(p)) => (u, p),
            _ => return Ok(Step::Reject),
        };

        let digest = hmac_md5(password.as_bytes(), challenge);
        let response = format!("{} {}", username, hex::encode(digest));
        Ok(Step::Done(response.into_bytes()))
    }

    fn reset(&mut self) {}
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{Credential, Status};
    use base64::engine::general_purpose::STANDARD as BASE64;
    use base64::Engine;

    #[test]
    fn rfc2195_vector() {
        let mut session = crate::Registry::default().create("CRAM-MD5").unwrap();
        session
            .set_credential(Credential::new("tim", "tanstaaftanstaaf"))
            .unwrap();

        let challenge = BASE64
            .decode("PDE4OTYuNjk3MTcwOTUyQHBvc3RvZmZpY2UucmVzdG9uLm1jaS5uZXQ+")
            .unwrap();
        let (status, response) = session.exchange(&challenge).unwrap();

        assert_eq!(status, Status::Succeeded);
        assert_eq!(
            BASE64.encode(response.unwrap()),
            "dGltIGI5MTNhNjAyYzdlZGE3YTQ5NWI0ZTZlNzMzNGQzODkw"
        );
    }

    #[test]
    fn no_initial_response() {
        let mut session = crate::Registry::default().create("CRAM-MD5").unwrap();
        session.set_credential(Credential::new("tim", "x")).unwrap();
        assert!(matches!(
            session.initial_response(),
            Err(AuthError::InitialResponseUnsupported)
        ));
    }

    #[test]
    fn empty_credential_fields_fail_without_digesting() {
        for credential in [Credential::new("", "pass"), Credential::new("user", "")] {
            let mut session = crate::Registry::default().create("CRAM-MD5").unwrap();
            session.set_credential(credential).unwrap();
            let (status, response) = session.exchange(b"<challenge@host>").unwrap();
            assert_eq!(status, Status::Failed);
            assert_eq!(response, None);
        }
    }
}

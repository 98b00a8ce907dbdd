use crate::error::AuthError;
use crate::mech::{Context, Mechanism, Step};

/// ANONYMOUS (RFC 4505): a single client-first round carrying the trace
/// token (the username field). The password is ignored.
pub struct Anonymous;

impl Mechanism for Anonymous {
    fn client_first(&self) -> bool {
        true
    }

    fn step(&mut self, ctx: &Context<'_>, _challenge: &[u8]) -> Result<Step, AuthError> {
        match ctx.credential.username() {
            Some(trace) => Ok(Step::Done(trace.as_bytes().to_vec())),
            None => Ok(Step::Reject),
        }
    }

    fn reset(&mut self) {}
}

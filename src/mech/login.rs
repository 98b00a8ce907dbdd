use crate::error::AuthError;
use crate::mech::{Context, Mechanism, Step};

/// LOGIN (historic, pre-RFC): two client-first rounds sending the bare
/// username then the bare password. The server's `Username:`/`Password:`
/// prompts are ignored.
#[derive(Default)]
pub struct Login {
    password_sent: bool,
}

impl Mechanism for Login {
    fn client_first(&self) -> bool {
        true
    }

    fn step(&mut self, ctx: &Context<'_>, _challenge: &[u8]) -> Result<Step, AuthError> {
        if !self.password_sent {
            self.password_sent = true;
            match ctx.credential.username() {
                Some(username) => Ok(Step::Continue(username.as_bytes().to_vec())),
                None => Ok(Step::Reject),
            }
        } else {
            match ctx.credential.password() {
                Some(password) => Ok(Step::Done(password.as_bytes().to_vec())),
                None => Ok(Step::Reject),
            }
        }
    }

    fn reset(&mut self) {
        self.password_sent = false;
    }
}

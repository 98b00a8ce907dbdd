use crate::error::AuthError;
use crate::flow::Session;
use crate::mech::{
    anonymous::Anonymous, cram_md5::CramMd5, digest_md5::DigestMd5, login::Login, ntlm::Ntlm,
    plain::Plain, Mechanism,
};

/// Error type a mechanism constructor may fail with; the registry wraps it
/// into [`AuthError::Instantiation`] so callers only ever see the framework's
/// own error type.
pub type ConstructorError = Box<dyn std::error::Error + Send + Sync>;

type Constructor = Box<dyn Fn() -> Result<Box<dyn Mechanism>, ConstructorError> + Send + Sync>;

/// A registry entry: the mechanism's SASL name, its static plaintext
/// capability, and how to build a fresh instance.
pub struct MechanismDescriptor {
    name: String,
    plain_text: bool,
    construct: Constructor,
}

impl MechanismDescriptor {
    pub fn new(
        name: impl Into<String>,
        plain_text: bool,
        construct: impl Fn() -> Result<Box<dyn Mechanism>, ConstructorError> + Send + Sync + 'static,
    ) -> Result<Self, AuthError> {
        let name = name.into();
        if name.is_empty() {
            return Err(AuthError::InvalidMechanism("mechanism name is empty"));
        }
        Ok(Self {
            name,
            plain_text,
            construct: Box::new(construct),
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Whether the mechanism transfers the password in clear; callers use
    /// this to refuse running it over an unencrypted channel.
    pub fn is_plain_text(&self) -> bool {
        self.plain_text
    }
}

/// The mechanism name → descriptor table.
///
/// [`Registry::default`] seeds the six built-ins. Registration order is
/// preserved; registering a name again (case-insensitively) replaces the
/// previous entry, which is how tests and vendor extensions override a
/// built-in.
pub struct Registry {
    mechs: Vec<MechanismDescriptor>,
}

impl Default for Registry {
    fn default() -> Self {
        let mut registry = Self::empty();
        registry.register(builtin("ANONYMOUS", true, || Box::new(Anonymous)));
        registry.register(builtin("PLAIN", true, || Box::new(Plain)));
        registry.register(builtin("LOGIN", true, || Box::<Login>::default()));
        registry.register(builtin("CRAM-MD5", false, || Box::new(CramMd5)));
        registry.register(builtin("DIGEST-MD5", false, || Box::<DigestMd5>::default()));
        registry.register(builtin("NTLM", false, || Box::<Ntlm>::default()));
        registry
    }
}

fn builtin(
    name: &'static str,
    plain_text: bool,
    construct: fn() -> Box<dyn Mechanism>,
) -> MechanismDescriptor {
    MechanismDescriptor {
        name: name.into(),
        plain_text,
        construct: Box::new(move || Ok(construct())),
    }
}

impl Registry {
    /// A registry with no mechanisms at all.
    pub fn empty() -> Self {
        Self { mechs: Vec::new() }
    }

    /// Insert or replace the entry for the descriptor's name.
    pub fn register(&mut self, descriptor: MechanismDescriptor) {
        match self.position(&descriptor.name) {
            Some(i) => {
                tracing::debug!(name = %descriptor.name, "replacing mechanism registration");
                self.mechs[i] = descriptor;
            }
            None => self.mechs.push(descriptor),
        }
    }

    /// Build a fresh exchange session for the named mechanism.
    ///
    /// Lookup is case-insensitive per SASL convention. A failing constructor
    /// is reported as [`AuthError::Instantiation`] with the cause attached.
    pub fn create(&self, name: &str) -> Result<Session, AuthError> {
        let descriptor = self.lookup(name)?;
        let mech = (descriptor.construct)().map_err(|source| AuthError::Instantiation {
            name: descriptor.name.clone(),
            source,
        })?;
        Ok(Session::new(
            descriptor.name.clone(),
            descriptor.plain_text,
            mech,
        ))
    }

    /// All registered names, in registration order.
    pub fn available_mechanisms(&self) -> Vec<&str> {
        self.mechs.iter().map(|d| d.name.as_str()).collect()
    }

    /// Answer from static metadata only; no instance is created.
    pub fn is_plain_text(&self, name: &str) -> Result<bool, AuthError> {
        Ok(self.lookup(name)?.plain_text)
    }

    fn lookup(&self, name: &str) -> Result<&MechanismDescriptor, AuthError> {
        self.mechs
            .iter()
            .find(|d| d.name.eq_ignore_ascii_case(name))
            .ok_or_else(|| {
                tracing::warn!(name, "unknown SASL mechanism requested");
                AuthError::MechanismNotSupported(name.to_string())
            })
    }

    fn position(&self, name: &str) -> Option<usize> {
        self.mechs
            .iter()
            .position(|d| d.name.eq_ignore_ascii_case(name))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mech::{Context, Step};
    use crate::types::Status;

    #[test]
    fn builtins_are_available() {
        let registry = Registry::default();
        let names = registry.available_mechanisms();
        for name in ["ANONYMOUS", "PLAIN", "LOGIN", "CRAM-MD5", "DIGEST-MD5", "NTLM"] {
            assert!(names.contains(&name), "{name} missing from {names:?}");
        }
    }

    #[test]
    fn create_is_case_insensitive() {
        let registry = Registry::default();
        for name in ["NTLM", "ntlm", "digest-md5", "Cram-Md5"] {
            let session = registry.create(name).unwrap();
            assert_eq!(session.status().unwrap(), Status::Init);
            assert!(!session.is_plain_text());
        }
    }

    #[test]
    fn create_keeps_the_canonical_name() {
        let registry = Registry::default();
        assert_eq!(registry.create("digest-md5").unwrap().name(), "DIGEST-MD5");
    }

    #[test]
    fn unknown_name_is_not_supported() {
        let registry = Registry::default();
        assert!(matches!(
            registry.create("X-UNKNOWN"),
            Err(AuthError::MechanismNotSupported(_))
        ));
        assert!(matches!(
            registry.is_plain_text("X-UNKNOWN"),
            Err(AuthError::MechanismNotSupported(_))
        ));
    }

    #[test]
    fn plaintext_classification() {
        let registry = Registry::default();
        for (name, plain) in [
            ("ANONYMOUS", true),
            ("PLAIN", true),
            ("LOGIN", true),
            ("CRAM-MD5", false),
            ("DIGEST-MD5", false),
            ("NTLM", false),
        ] {
            assert_eq!(registry.is_plain_text(name).unwrap(), plain, "{name}");
            assert_eq!(registry.create(name).unwrap().is_plain_text(), plain);
        }
    }

    #[test]
    fn empty_name_cannot_be_registered() {
        assert!(matches!(
            MechanismDescriptor::new("", true, || Err("nope".into())),
            Err(AuthError::InvalidMechanism(_))
        ));
    }

    #[test]
    fn constructor_failure_is_wrapped() {
        let mut registry = Registry::default();
        registry.register(
            MechanismDescriptor::new("X-THROWS", true, || Err("boom".into())).unwrap(),
        );
        let err = registry.create("X-THROWS").err().expect("create must fail");
        match err {
            AuthError::Instantiation { name, source } => {
                assert_eq!(name, "X-THROWS");
                assert_eq!(source.to_string(), "boom");
            }
            other => panic!("expected Instantiation error, got {other:?}"),
        }
    }

    /// Replacing LOGIN leaves a single entry and `create` returns the newest
    /// implementation.
    #[test]
    fn re_registration_replaces_builtin() {
        struct Fixed;
        impl Mechanism for Fixed {
            fn client_first(&self) -> bool {
                true
            }
            fn step(&mut self, _: &Context<'_>, _: &[u8]) -> Result<Step, AuthError> {
                Ok(Step::Done(b"fixed".to_vec()))
            }
            fn reset(&mut self) {}
        }

        let mut registry = Registry::default();
        registry
            .register(MechanismDescriptor::new("login", true, || Ok(Box::new(Fixed))).unwrap());

        let count = registry
            .available_mechanisms()
            .iter()
            .filter(|n| n.eq_ignore_ascii_case("login"))
            .count();
        assert_eq!(count, 1);

        let mut session = registry.create("LOGIN").unwrap();
        session
            .set_credential(crate::types::Credential::new("u", "p"))
            .unwrap();
        let (status, response) = session.exchange(b"").unwrap();
        assert_eq!(status, Status::Succeeded);
        assert_eq!(response.as_deref(), Some(&b"fixed"[..]));
    }
}

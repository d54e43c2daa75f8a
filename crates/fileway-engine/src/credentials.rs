//! Credentials and the credentials capability facet.

use std::fmt;
use std::path::PathBuf;
use std::sync::Arc;

use crate::engine::Engine;
use crate::error::{FilesError, FilesResult};

/// Authentication material handed to `new_file_system`.
///
/// Secrets never show up in `Debug` output.
#[derive(Clone, PartialEq, Eq, Hash, Default)]
pub enum Credential {
    /// Whatever the adaptor considers the ambient identity.
    #[default]
    Default,
    /// Username and password.
    Password { username: String, password: String },
    /// Certificate (private key) file, optionally protected by a passphrase.
    Certificate {
        username: String,
        certfile: PathBuf,
        keyfile: Option<PathBuf>,
        passphrase: Option<String>,
    },
    /// Kerberos keytab.
    Keytab { username: String, keytab_file: PathBuf },
}

impl Credential {
    /// Short kind name, used in logs and errors.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Default => "default",
            Self::Password { .. } => "password",
            Self::Certificate { .. } => "certificate",
            Self::Keytab { .. } => "keytab",
        }
    }

    /// The user this credential authenticates, if it names one.
    pub fn username(&self) -> Option<&str> {
        match self {
            Self::Default => None,
            Self::Password { username, .. }
            | Self::Certificate { username, .. }
            | Self::Keytab { username, .. } => Some(username),
        }
    }
}

impl fmt::Debug for Credential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Default => f.write_str("Default"),
            Self::Password { username, .. } => f
                .debug_struct("Password")
                .field("username", username)
                .field("password", &"<redacted>")
                .finish(),
            Self::Certificate {
                username,
                certfile,
                keyfile,
                passphrase,
            } => f
                .debug_struct("Certificate")
                .field("username", username)
                .field("certfile", certfile)
                .field("keyfile", keyfile)
                .field("passphrase", &passphrase.as_ref().map(|_| "<redacted>"))
                .finish(),
            Self::Keytab {
                username,
                keytab_file,
            } => f
                .debug_struct("Keytab")
                .field("username", username)
                .field("keytab_file", keytab_file)
                .finish(),
        }
    }
}

/// Credentials capability of an adaptor.
///
/// Every constructor defaults to `Unsupported`; adaptors override the kinds
/// they accept.
pub trait CredentialsAdaptor: Send + Sync {
    /// Name of the adaptor offering this facet.
    fn adaptor_name(&self) -> &str;

    /// The ambient credential for `scheme`.
    fn default_credential(&self, _scheme: &str) -> FilesResult<Credential> {
        Ok(Credential::Default)
    }

    /// Build a password credential.
    fn new_password_credential(
        &self,
        _scheme: &str,
        _username: &str,
        _password: &str,
    ) -> FilesResult<Credential> {
        Err(FilesError::unsupported(self.adaptor_name(), "password credentials"))
    }

    /// Build a certificate credential.
    fn new_certificate_credential(
        &self,
        _scheme: &str,
        _username: &str,
        _certfile: PathBuf,
        _passphrase: Option<&str>,
    ) -> FilesResult<Credential> {
        Err(FilesError::unsupported(self.adaptor_name(), "certificate credentials"))
    }

    /// Build a keytab credential.
    fn new_keytab_credential(
        &self,
        _scheme: &str,
        _username: &str,
        _keytab_file: PathBuf,
    ) -> FilesResult<Credential> {
        Err(FilesError::unsupported(self.adaptor_name(), "keytab credentials"))
    }
}

/// Routes credential construction to the adaptor owning a scheme.
#[derive(Clone)]
pub struct Credentials {
    engine: Arc<Engine>,
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials").finish_non_exhaustive()
    }
}

impl Credentials {
    pub(crate) fn new(engine: Arc<Engine>) -> Self {
        Self { engine }
    }

    fn facet(&self, scheme: &str) -> FilesResult<Arc<dyn CredentialsAdaptor>> {
        self.engine.adaptor_for(scheme)?.credentials()
    }

    /// The ambient credential for `scheme`.
    pub fn default_credential(&self, scheme: &str) -> FilesResult<Credential> {
        self.facet(scheme)?.default_credential(scheme)
    }

    /// Build a password credential for `scheme`.
    pub fn new_password_credential(
        &self,
        scheme: &str,
        username: &str,
        password: &str,
    ) -> FilesResult<Credential> {
        self.facet(scheme)?
            .new_password_credential(scheme, username, password)
    }

    /// Build a certificate credential for `scheme`.
    pub fn new_certificate_credential(
        &self,
        scheme: &str,
        username: &str,
        certfile: impl Into<PathBuf>,
        passphrase: Option<&str>,
    ) -> FilesResult<Credential> {
        self.facet(scheme)?
            .new_certificate_credential(scheme, username, certfile.into(), passphrase)
    }

    /// Build a keytab credential for `scheme`.
    pub fn new_keytab_credential(
        &self,
        scheme: &str,
        username: &str,
        keytab_file: impl Into<PathBuf>,
    ) -> FilesResult<Credential> {
        self.facet(scheme)?
            .new_keytab_credential(scheme, username, keytab_file.into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_debug_redacts_secrets() {
        let cred = Credential::Password {
            username: "amy".into(),
            password: "hunter2".into(),
        };
        let shown = format!("{cred:?}");
        assert!(shown.contains("amy"));
        assert!(!shown.contains("hunter2"));

        let cert = Credential::Certificate {
            username: "amy".into(),
            certfile: "/home/amy/.ssh/id_ed25519".into(),
            keyfile: None,
            passphrase: Some("s3cret".into()),
        };
        assert!(!format!("{cert:?}").contains("s3cret"));
    }

    #[test]
    fn test_value_equality() {
        let a = Credential::Keytab {
            username: "amy".into(),
            keytab_file: "/etc/krb5.keytab".into(),
        };
        assert_eq!(a.clone(), a);
        assert_eq!(a.username(), Some("amy"));
        assert_eq!(a.kind(), "keytab");
        assert_eq!(Credential::default(), Credential::Default);
    }
}

//! Driver configuration and authentication tokens.

use std::fmt;

use bolt_protocol::{Map, Value};

/// The user agent announced to servers when none is configured.
pub(crate) const DEFAULT_USER_AGENT: &str = concat!("bolt-client/", env!("CARGO_PKG_VERSION"));

/// An authentication token, passed to the server unchanged.
#[derive(Clone, PartialEq, Eq)]
pub struct AuthToken {
    /// The authentication scheme, e.g. `basic`.
    pub scheme: String,

    /// The principal to authenticate as, e.g. a user name.
    pub principal: String,

    /// The credentials proving the principal, e.g. a password.
    pub credentials: String,
}

impl AuthToken {
    pub(crate) fn as_map(&self) -> Map {
        let mut map = Map::new();
        map.insert("scheme".into(), Value::String(self.scheme.clone()));
        map.insert("principal".into(), Value::String(self.principal.clone()));
        map.insert("credentials".into(), Value::String(self.credentials.clone()));
        map
    }
}

// credentials stay out of debug output
impl fmt::Debug for AuthToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AuthToken")
            .field("scheme", &self.scheme)
            .field("principal", &self.principal)
            .finish_non_exhaustive()
    }
}

/// Generates a basic auth token for a given user and password.
pub fn basic_auth(user: &str, password: &str) -> AuthToken {
    AuthToken {
        scheme: String::from("basic"),
        principal: user.to_owned(),
        credentials: password.to_owned(),
    }
}

/// How the identity of a server is verified when connecting over TLS.
#[non_exhaustive]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Trust {
    /// Trust the certificate a server presents on first contact.
    ///
    /// Deprecated; use [`Trust::AllCertificates`] instead. This mode is not
    /// compatible with routing.
    #[default]
    OnFirstUse,

    /// Verify against a pinned server certificate.
    ///
    /// Deprecated; use [`Trust::SystemCaSigned`] instead.
    SignedCertificates,

    /// Accept any certificate without verification.
    AllCertificates,

    /// Verify against the system's certificate authorities.
    SystemCaSigned,

    /// Verify against a custom certificate authority. Not implemented.
    CustomCaSigned,
}

/// Configuration for a [`Driver`](crate::Driver).
///
/// Built with a [`ConfigBuilder`]; the default configuration carries no auth
/// token and encrypts when TLS support is compiled in.
#[derive(Debug, Clone, Default)]
pub struct Config {
    pub(crate) auth: Option<AuthToken>,
    pub(crate) encrypted: Option<bool>,
    pub(crate) trust: Trust,
    pub(crate) der_encoded_server_certificate: Option<Vec<u8>>,
    pub(crate) user_agent: Option<String>,
}

/// Builder for [`Config`] objects.
#[derive(Debug, Clone, Default)]
pub struct ConfigBuilder {
    auth: Option<AuthToken>,
    encrypted: Option<bool>,
    trust: Trust,
    der_encoded_server_certificate: Option<Vec<u8>>,
    user_agent: Option<String>,
}

impl ConfigBuilder {
    /// Creates a new builder with default values for the various fields.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the auth token presented to servers.
    pub fn auth(&mut self, auth: AuthToken) -> &mut Self {
        self.auth = Some(auth);
        self
    }

    /// Forces encryption on or off instead of using the default.
    pub fn encrypted(&mut self, encrypted: bool) -> &mut Self {
        self.encrypted = Some(encrypted);
        self
    }

    /// Sets how server certificates are verified.
    pub fn trust(&mut self, trust: Trust) -> &mut Self {
        self.trust = trust;
        self
    }

    /// Sets a DER-encoded server certificate for pinned-certificate flows.
    pub fn der_encoded_server_certificate(&mut self, certificate: Vec<u8>) -> &mut Self {
        self.der_encoded_server_certificate = Some(certificate);
        self
    }

    /// Sets the user agent announced to servers.
    pub fn user_agent(&mut self, user_agent: String) -> &mut Self {
        self.user_agent = Some(user_agent);
        self
    }

    /// Consumes this builder and turns it into a [`Config`].
    pub fn build(&self) -> Config {
        Config {
            auth: self.auth.clone(),
            encrypted: self.encrypted,
            trust: self.trust,
            der_encoded_server_certificate: self.der_encoded_server_certificate.clone(),
            user_agent: self.user_agent.clone(),
        }
    }
}

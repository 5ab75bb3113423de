//! Resolution of encryption and trust settings into a connection security
//! plan.

use std::sync::atomic::{AtomicBool, Ordering};
#[cfg(feature = "tls")]
use std::sync::Arc;

use tracing::warn;

use crate::config::{Config, Trust};
use crate::error::ClientError;


/// Whether TLS support was compiled into this build.
pub(crate) const TLS_AVAILABLE: bool = cfg!(feature = "tls");

static INSECURE_DEFAULT_WARNED: AtomicBool = AtomicBool::new(false);

/// The default for the `encrypted` setting, warning once per process when
/// the default has to fall back to unencrypted traffic.
fn encryption_default() -> bool {
    if !TLS_AVAILABLE
        && INSECURE_DEFAULT_WARNED
            .compare_exchange(false, true, Ordering::Relaxed, Ordering::Relaxed)
            .is_ok()
    {
        warn!("TLS support is not compiled in, so communications are not secure");
    }
    TLS_AVAILABLE
}

/// The resolved security settings shared by every connection of a driver.
#[derive(Clone)]
pub struct SecurityPlan {
    encrypted: bool,
    #[cfg(feature = "tls")]
    tls_config: Option<Arc<rustls::ClientConfig>>,
    routing_compatible: bool,
}

impl SecurityPlan {
    /// Resolves a driver configuration into a security plan.
    pub fn build(config: &Config) -> Result<Self, ClientError> {
        let encrypted = config.encrypted.unwrap_or_else(encryption_default);
        if encrypted && !TLS_AVAILABLE {
            return Err(ClientError::Configuration(String::from(
                "encryption was requested, but TLS support is not compiled in",
            )));
        }

        // trust modes only come into play on encrypted connections; a
        // plaintext plan carries no TLS config and skips them entirely
        #[cfg(feature = "tls")]
        let tls_config = if encrypted {
            match config.trust {
                Trust::OnFirstUse => warn!(
                    "trust on first use is deprecated, please use all-certificates trust instead"
                ),
                Trust::SignedCertificates => warn!(
                    "signed-certificates trust is deprecated, please use system CA trust instead"
                ),
                _ => {}
            }
            Some(Arc::new(tls_client_config(config)?))
        } else {
            None
        };

        Ok(Self {
            encrypted,
            #[cfg(feature = "tls")]
            tls_config,
            routing_compatible: config.trust != Trust::OnFirstUse,
        })
    }

    /// Whether connections made under this plan are encrypted.
    pub fn encrypted(&self) -> bool {
        self.encrypted
    }

    /// Whether this plan can be used with a routing driver.
    pub fn routing_compatible(&self) -> bool {
        self.routing_compatible
    }

    #[cfg(feature = "tls")]
    pub(crate) fn tls_config(&self) -> Option<&Arc<rustls::ClientConfig>> {
        self.tls_config.as_ref()
    }
}

#[cfg(feature = "tls")]
fn tls_client_config(config: &Config) -> Result<rustls::ClientConfig, ClientError> {
    use rustls::pki_types::CertificateDer;
    use rustls::RootCertStore;

    match config.trust {
        Trust::CustomCaSigned => Err(ClientError::Configuration(String::from(
            "custom CA support is not implemented",
        ))),
        Trust::OnFirstUse | Trust::AllCertificates => Ok(rustls::ClientConfig::builder()
            .dangerous()
            .with_custom_certificate_verifier(Arc::new(danger::AcceptAnyServerCert))
            .with_no_client_auth()),
        Trust::SignedCertificates | Trust::SystemCaSigned => {
            let mut roots = RootCertStore::empty();
            roots.extend(webpki_roots::TLS_SERVER_ROOTS.iter().cloned());
            if let Some(certificate) = &config.der_encoded_server_certificate {
                roots
                    .add(CertificateDer::from(certificate.clone()))
                    .map_err(|err| {
                        ClientError::Configuration(format!(
                            "invalid pinned server certificate: {err}"
                        ))
                    })?;
            }
            Ok(rustls::ClientConfig::builder()
                .with_root_certificates(roots)
                .with_no_client_auth())
        }
    }
}

#[cfg(feature = "tls")]
mod danger {
    use rustls::client::danger::{HandshakeSignatureValid, ServerCertVerified, ServerCertVerifier};
    use rustls::pki_types::{CertificateDer, ServerName, UnixTime};
    use rustls::{DigitallySignedStruct, Error, SignatureScheme};

    /// Accepts any server certificate, for the trust modes that disable
    /// peer verification.
    #[derive(Debug)]
    pub(super) struct AcceptAnyServerCert;

    impl ServerCertVerifier for AcceptAnyServerCert {
        fn verify_server_cert(
            &self,
            _end_entity: &CertificateDer<'_>,
            _intermediates: &[CertificateDer<'_>],
            _server_name: &ServerName<'_>,
            _ocsp_response: &[u8],
            _now: UnixTime,
        ) -> Result<ServerCertVerified, Error> {
            Ok(ServerCertVerified::assertion())
        }

        fn verify_tls12_signature(
            &self,
            _message: &[u8],
            _cert: &CertificateDer<'_>,
            _dss: &DigitallySignedStruct,
        ) -> Result<HandshakeSignatureValid, Error> {
            Ok(HandshakeSignatureValid::assertion())
        }

        fn verify_tls13_signature(
            &self,
            _message: &[u8],
            _cert: &CertificateDer<'_>,
            _dss: &DigitallySignedStruct,
        ) -> Result<HandshakeSignatureValid, Error> {
            Ok(HandshakeSignatureValid::assertion())
        }

        fn supported_verify_schemes(&self) -> Vec<SignatureScheme> {
            rustls::crypto::ring::default_provider()
                .signature_verification_algorithms
                .supported_schemes()
        }
    }
}

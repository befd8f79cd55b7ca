use x509_parser::prelude::{FromDer, X509Certificate};

/// Identity of the peer on the other end of an mTLS connection. Added to every
/// request's extensions by [`crate::ClientIdentityAcceptor`].
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct ClientIdentity {
    /// Subject common name of the client's leaf certificate.
    pub common_name: String,
}

impl ClientIdentity {
    /// Creates an identity with the given common name.
    pub fn new(common_name: impl Into<String>) -> Self {
        Self {
            common_name: common_name.into(),
        }
    }

    /// Reads the subject common name from a DER encoded certificate.
    #[must_use]
    pub fn from_der(der: &[u8]) -> Option<Self> {
        let (_, certificate) = X509Certificate::from_der(der).ok()?;
        let common_name = certificate
            .subject()
            .iter_common_name()
            .next()?
            .as_str()
            .ok()?;

        Some(Self::new(common_name))
    }
}

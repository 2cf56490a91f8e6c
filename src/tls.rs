use std::{
    fmt::{self, Debug, Formatter},
    fs::File,
    io::Read,
    path::{Path, PathBuf},
};

use openssl::{
    ssl::{ConnectConfiguration, SslConnector, SslConnectorBuilder, SslMethod, SslVerifyMode},
    x509::{store::X509StoreBuilder, X509},
};
use serde::{Deserialize, Serialize};
use snafu::{ResultExt, Snafu};

const PEM_START_MARKER: &str = "-----BEGIN ";

#[derive(Debug, Snafu)]
pub enum TlsError {
    #[snafu(display("Could not open {} file {:?}: {}", note, filename, source))]
    FileOpenFailed {
        note: &'static str,
        filename: PathBuf,
        source: std::io::Error,
    },
    #[snafu(display("Could not read {} file {:?}: {}", note, filename, source))]
    FileReadFailed {
        note: &'static str,
        filename: PathBuf,
        source: std::io::Error,
    },
    #[snafu(display("Could not parse certificate in {:?}: {}", filename, source))]
    CertificateParse {
        filename: PathBuf,
        source: openssl::error::ErrorStack,
    },
    #[snafu(display("Could not create the TLS connector: {}", source))]
    CreateConnector { source: openssl::error::ErrorStack },
    #[snafu(display("Could not build certificate store: {}", source))]
    NewStoreBuilder { source: openssl::error::ErrorStack },
    #[snafu(display("Could not add certificate to store: {}", source))]
    AddCertToStore { source: openssl::error::ErrorStack },
    #[snafu(display("Could not set the verification certificate: {}", source))]
    SetVerifyCert { source: openssl::error::ErrorStack },
}

pub type Result<T> = std::result::Result<T, TlsError>;

/// TLS options for the client side of the health connection.
#[derive(Clone, Debug, Default, Deserialize, Serialize)]
pub struct TlsOptions {
    pub verify_certificate: Option<bool>,
    pub verify_hostname: Option<bool>,
    #[serde(alias = "ca_path")]
    pub ca_file: Option<PathBuf>,
}

/// Directly usable settings for TLS connectors.
#[derive(Clone, Default)]
pub struct TlsSettings {
    verify_certificate: bool,
    verify_hostname: bool,
    authorities: Vec<X509>,
}

impl TlsSettings {
    /// Generate a filled out settings struct from the given optional option
    /// set, interpreted as client options. If `options` is `None`, the
    /// result verifies everything against the system roots.
    pub fn from_options(options: &Option<TlsOptions>) -> Result<Self> {
        let default = TlsOptions::default();
        let options = options.as_ref().unwrap_or(&default);

        if options.verify_certificate == Some(false) {
            warn!("`verify_certificate` is DISABLED, this may lead to security vulnerabilities.");
        }
        if options.verify_hostname == Some(false) {
            warn!("`verify_hostname` is DISABLED, this may lead to security vulnerabilities.");
        }

        Ok(Self {
            verify_certificate: options.verify_certificate.unwrap_or(true),
            verify_hostname: options.verify_hostname.unwrap_or(true),
            authorities: options.load_authorities()?,
        })
    }

    fn apply_context(&self, context: &mut SslConnectorBuilder) -> Result<()> {
        context.set_verify(if self.verify_certificate {
            SslVerifyMode::PEER | SslVerifyMode::FAIL_IF_NO_PEER_CERT
        } else {
            SslVerifyMode::NONE
        });

        if self.authorities.is_empty() {
            debug!("Using system root certificates.");
        } else {
            let mut store = X509StoreBuilder::new().context(NewStoreBuilderSnafu)?;
            for authority in &self.authorities {
                store
                    .add_cert(authority.clone())
                    .context(AddCertToStoreSnafu)?;
            }
            context
                .set_verify_cert_store(store.build())
                .context(SetVerifyCertSnafu)?;
        }

        Ok(())
    }

    pub fn apply_connect_configuration(&self, connection: &mut ConnectConfiguration) {
        connection.set_verify_hostname(self.verify_hostname);
    }
}

impl TlsOptions {
    fn load_authorities(&self) -> Result<Vec<X509>> {
        match &self.ca_file {
            None => Ok(vec![]),
            Some(filename) => {
                let (data, filename) = open_read(filename, "certificate")?;
                der_or_pem(
                    data,
                    |der| X509::from_der(&der).map(|x509| vec![x509]),
                    |pem| {
                        pem.match_indices(PEM_START_MARKER)
                            .map(|(start, _)| X509::from_pem(pem[start..].as_bytes()))
                            .collect()
                    },
                )
                .with_context(|_| CertificateParseSnafu { filename })
            }
        }
    }
}

pub(crate) fn tls_connector_builder(settings: &TlsSettings) -> Result<SslConnectorBuilder> {
    let mut builder = SslConnector::builder(SslMethod::tls()).context(CreateConnectorSnafu)?;
    settings.apply_context(&mut builder)?;
    Ok(builder)
}

/// Parse the data one way if it looks like a DER file, and the other if it
/// looks like a PEM file. For the content to be treated as PEM, it must
/// parse as valid UTF-8 and contain a PEM start marker.
fn der_or_pem<T>(data: Vec<u8>, der_fn: impl Fn(Vec<u8>) -> T, pem_fn: impl Fn(String) -> T) -> T {
    match String::from_utf8(data) {
        Ok(text) => match text.find(PEM_START_MARKER) {
            Some(_) => pem_fn(text),
            None => der_fn(text.into_bytes()),
        },
        Err(err) => der_fn(err.into_bytes()),
    }
}

/// Open the named file and read its entire contents into memory. If the
/// file "name" contains a PEM start marker, it is assumed to contain inline
/// data and is used directly instead of opening a file.
fn open_read(filename: &Path, note: &'static str) -> Result<(Vec<u8>, PathBuf)> {
    if let Some(filename) = filename.to_str() {
        if filename.contains(PEM_START_MARKER) {
            return Ok((Vec::from(filename), "inline text".into()));
        }
    }

    let mut text = Vec::<u8>::new();

    File::open(filename)
        .with_context(|_| FileOpenFailedSnafu { note, filename })?
        .read_to_end(&mut text)
        .with_context(|_| FileReadFailedSnafu { note, filename })?;

    Ok((text, filename.into()))
}

impl Debug for TlsSettings {
    fn fmt(&self, f: &mut Formatter) -> fmt::Result {
        f.debug_struct("TlsSettings")
            .field("verify_certificate", &self.verify_certificate)
            .field("verify_hostname", &self.verify_hostname)
            .finish()
    }
}

// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Decode the JSON certificate data files written by syno-cli. Each file
//! holds the Base64 encoded private key, certificate and issuer certificate
//! for one certificate. These can be written out as individual PEM files or
//! packaged together as a PKCS#12 file.

use log::info;
use openssl::error::ErrorStack;
use std::{
    fs, io,
    path::{Path, PathBuf},
};
use thiserror::Error;

pub mod bundle;
pub mod config;
pub mod pem;
pub mod pkcs12;
pub mod secret;
pub mod util;

pub use bundle::CertificateBundle;
pub use config::Field;
pub use pem::write_pem_files;
pub use pkcs12::{build_pkcs12, Pkcs12Options};

#[derive(Error, Debug)]
pub enum Error {
    #[error("failed to parse JSON data file")]
    Parse(#[from] serde_json::Error),

    #[error("JSON data file has no \"{0}\" field")]
    MissingField(Field),

    #[error("field \"{field}\" is not valid Base64")]
    Decode {
        field: Field,
        source: base64::DecodeError,
    },

    #[error("failed to parse private key PEM")]
    KeyParse(#[source] Box<dyn std::error::Error + Send + Sync>),

    #[error("failed to parse certificate PEM from \"{field}\"")]
    CertParse { field: Field, source: ErrorStack },

    #[error("wrong or missing passphrase for encrypted private key")]
    WrongPassphrase,

    #[error("failed to create PKCS#12")]
    Pkcs12(#[source] ErrorStack),

    #[error("I/O error on {}", path.display())]
    Io { path: PathBuf, source: io::Error },
}

/// Build a PKCS#12 file from `bundle` and write it to `output_file`. Nothing
/// is written if the container can't be built.
pub fn write_pkcs12<P: AsRef<Path>>(
    bundle: &CertificateBundle,
    options: &Pkcs12Options,
    output_file: P,
) -> Result<(), Error> {
    let output_file = output_file.as_ref();
    let der = build_pkcs12(bundle, options)?;

    info!("Writing {} data now...", output_file.display());
    fs::write(output_file, der).map_err(|e| Error::Io {
        path: output_file.to_path_buf(),
        source: e,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pkcs12::tests::{bundle_json, self_signed};
    use anyhow::Result;
    use openssl::pkcs12::Pkcs12;
    use tempfile::TempDir;

    #[test]
    fn test_write_pkcs12() -> Result<()> {
        let (pkey, cert) = self_signed("myservice.mydomain.com")?;
        let json = bundle_json(
            &pkey.private_key_to_pem_pkcs8()?,
            &cert.to_pem()?,
            &cert.to_pem()?,
        );
        let dir = TempDir::new()?;
        let input = dir.path().join("myservice.mydomain.com.json");
        fs::write(&input, json)?;

        let bundle = CertificateBundle::decode(&input)?;
        let output = dir.path().join("myservice.mydomain.com.pfx");
        write_pkcs12(&bundle, &Pkcs12Options::default(), &output)?;

        let parsed = Pkcs12::from_der(&fs::read(&output)?)?.parse2("")?;
        assert!(parsed.pkey.is_some());
        assert!(parsed.cert.is_some());
        Ok(())
    }

    #[test]
    fn test_write_pkcs12_nothing_written_on_failure() -> Result<()> {
        let (_, cert) = self_signed("myservice.mydomain.com")?;
        let json = bundle_json(b"not a key", &cert.to_pem()?, b"");
        let bundle = CertificateBundle::from_json("svc", &json)?;

        let dir = TempDir::new()?;
        let output = dir.path().join("svc.pfx");
        let err = write_pkcs12(&bundle, &Pkcs12Options::default(), &output)
            .expect_err("PKCS#12 built from bad key");
        assert!(matches!(err, Error::KeyParse(_)));
        assert!(!output.exists());
        Ok(())
    }

    #[test]
    fn test_error_messages_name_field() {
        assert_eq!(
            Error::MissingField(Field::IssuerCertificate).to_string(),
            "JSON data file has no \"issuer_certificate\" field"
        );
    }
}

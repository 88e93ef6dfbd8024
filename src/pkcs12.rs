// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

use base64::{engine::general_purpose::STANDARD, Engine};
use der::{
    asn1::{AnyRef, OctetStringRef},
    Decode, Sequence,
};
use log::{debug, info};
use openssl::{
    pkcs12::Pkcs12,
    pkey::{PKey, Private},
    stack::Stack,
    x509::X509,
};
use zeroize::Zeroizing;

use crate::{bundle::CertificateBundle, config::Field, pem, Error};

// legacy (OpenSSL "traditional") encrypted keys carry this header
const PROC_TYPE_ENCRYPTED: &[u8] = b"Proc-Type: 4,ENCRYPTED";
const PKCS8_ENCRYPTED_LABEL: &str = "ENCRYPTED PRIVATE KEY";
const DEK_INFO: &str = "DEK-Info:";
// smallest block size of the ciphers used for legacy encrypted keys
const LEGACY_BLOCK_SIZE: usize = 8;

// RFC 5958 EncryptedPrivateKeyInfo. The encryption algorithm is left opaque,
// OpenSSL decides whether it supports it.
#[derive(Sequence)]
struct EncryptedPrivateKeyInfo<'a> {
    encryption_algorithm: AnyRef<'a>,
    encrypted_data: OctetStringRef<'a>,
}

/// Parameters for assembling a PKCS#12 container.
///
/// The passphrase that unlocks the input private key and the passphrase
/// protecting the output container are independent. Use
/// `Pkcs12Options::from_shared` to use one secret for both.
#[derive(Clone, Default)]
pub struct Pkcs12Options {
    /// Unlocks the private key from the bundle if it's encrypted. Ignored
    /// for unencrypted keys.
    pub key_passphrase: Option<Zeroizing<String>>,

    /// Protects the container. `None` produces a container with an empty
    /// password.
    pub export_passphrase: Option<Zeroizing<String>>,

    /// Add the issuer certificate(s) to the container as the CA chain.
    pub include_issuer: bool,

    /// Friendly name of the key / cert entry. Defaults to the bundle stem.
    pub friendly_name: Option<String>,
}

impl Pkcs12Options {
    pub fn from_shared(passphrase: Option<Zeroizing<String>>) -> Self {
        Self {
            key_passphrase: passphrase.clone(),
            export_passphrase: passphrase,
            ..Default::default()
        }
    }
}

/// Returns true if the PEM private key is encrypted, either as PKCS#8
/// `ENCRYPTED PRIVATE KEY` or with a legacy `Proc-Type` header.
pub fn is_encrypted(key_pem: &[u8]) -> bool {
    pem::pem_label(key_pem) == Some(PKCS8_ENCRYPTED_LABEL)
        || key_pem
            .windows(PROC_TYPE_ENCRYPTED.len())
            .any(|w| w == PROC_TYPE_ENCRYPTED)
}

/// Parse a PEM private key, unlocking it with `passphrase` if encrypted.
pub fn load_private_key(
    key_pem: &[u8],
    passphrase: Option<&str>,
) -> Result<PKey<Private>, Error> {
    if is_encrypted(key_pem) {
        debug!("private key is encrypted");
        // a well formed key that fails to decrypt has the wrong passphrase
        check_encrypted_key(key_pem)?;
        let passphrase = passphrase.ok_or(Error::WrongPassphrase)?;
        PKey::private_key_from_pem_passphrase(key_pem, passphrase.as_bytes())
            .map_err(|_| Error::WrongPassphrase)
    } else {
        // an empty password from the callback keeps OpenSSL from prompting
        // on the terminal if the key is encrypted in a way we don't detect
        PKey::private_key_from_pem_callback(key_pem, |_| Ok(0))
            .map_err(|e| Error::KeyParse(e.into()))
    }
}

/// Check the structure of an encrypted private key w/o decrypting it.
fn check_encrypted_key(key_pem: &[u8]) -> Result<(), Error> {
    if pem::pem_label(key_pem) != Some(PKCS8_ENCRYPTED_LABEL) {
        return check_legacy_key(key_pem);
    }

    let (_, der) = pem_rfc7468::decode_vec(key_pem)
        .map_err(|e| Error::KeyParse(e.into()))?;
    let info = EncryptedPrivateKeyInfo::from_der(&der)
        .map_err(|e| Error::KeyParse(e.into()))?;
    debug!(
        "PKCS#8 encrypted key w/ {} bytes of ciphertext",
        info.encrypted_data.as_bytes().len()
    );

    Ok(())
}

// Legacy keys carry RFC 1421 headers that RFC 7468 parsers reject, so the
// body is pulled out by hand: every non-header line between the boundaries.
fn check_legacy_key(key_pem: &[u8]) -> Result<(), Error> {
    let text =
        std::str::from_utf8(key_pem).map_err(|e| Error::KeyParse(e.into()))?;

    let lines = text
        .lines()
        .map(str::trim)
        .skip_while(|l| !l.starts_with("-----BEGIN "))
        .skip(1);

    let mut dek_info = false;
    let mut body = String::new();
    for line in lines {
        if line.starts_with("-----END ") {
            break;
        } else if line.starts_with(DEK_INFO) {
            dek_info = true;
        } else if !line.contains(':') {
            body.push_str(line);
        }
    }

    if !dek_info {
        return Err(Error::KeyParse(
            "encrypted private key has no DEK-Info header".into(),
        ));
    }

    let ciphertext = STANDARD
        .decode(&body)
        .map_err(|e| Error::KeyParse(e.into()))?;
    if ciphertext.is_empty() || ciphertext.len() % LEGACY_BLOCK_SIZE != 0 {
        return Err(Error::KeyParse(
            "encrypted private key body is not a whole number of blocks".into(),
        ));
    }
    debug!("legacy encrypted key w/ {} bytes of ciphertext", ciphertext.len());

    Ok(())
}

/// Parse one or more concatenated PEM certificates from `field`.
pub fn load_certificates(field: Field, pem: &[u8]) -> Result<Vec<X509>, Error> {
    match X509::stack_from_pem(pem) {
        Ok(certs) if !certs.is_empty() => Ok(certs),
        // no PEM blocks at all, get an error for it from the strict parser
        Ok(_) => X509::from_pem(pem)
            .map(|c| vec![c])
            .map_err(|e| Error::CertParse { field, source: e }),
        Err(e) => Err(Error::CertParse { field, source: e }),
    }
}

/// Assemble the private key and certificate from `bundle` into a DER
/// encoded PKCS#12 container.
pub fn build_pkcs12(
    bundle: &CertificateBundle,
    options: &Pkcs12Options,
) -> Result<Vec<u8>, Error> {
    let key_passphrase = options.key_passphrase.as_deref().map(String::as_str);
    let pkey = load_private_key(bundle.private_key(), key_passphrase)?;

    let cert = X509::from_pem(bundle.certificate()).map_err(|e| {
        Error::CertParse {
            field: Field::Certificate,
            source: e,
        }
    })?;

    let name = options
        .friendly_name
        .as_deref()
        .unwrap_or_else(|| bundle.stem());
    debug!("PKCS#12 friendly name: {}", name);

    let mut builder = Pkcs12::builder();
    builder.name(name).pkey(&pkey).cert(&cert);

    if options.include_issuer {
        let issuers = load_certificates(
            Field::IssuerCertificate,
            bundle.issuer_certificate(),
        )?;
        debug!("adding {} issuer certificate(s) as CA chain", issuers.len());

        let mut ca = Stack::new().map_err(Error::Pkcs12)?;
        for issuer in issuers {
            ca.push(issuer).map_err(Error::Pkcs12)?;
        }
        builder.ca(ca);
    }

    let export_passphrase =
        options.export_passphrase.as_deref().map(String::as_str);
    if export_passphrase.is_none() {
        info!("no export passphrase, PKCS#12 will have an empty password");
    }

    let p12 = builder
        .build2(export_passphrase.unwrap_or(""))
        .map_err(Error::Pkcs12)?;

    p12.to_der().map_err(Error::Pkcs12)
}

// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

use base64::{engine::general_purpose::STANDARD, Engine};
use log::debug;
use serde_json::{Map, Value};
use std::{fs, path::Path};
use zeroize::Zeroizing;

use crate::{config::Field, Error};

/// The decoded contents of a syno-cli JSON data file.
#[derive(Clone)]
pub struct CertificateBundle {
    stem: String,
    private_key: Zeroizing<Vec<u8>>,
    certificate: Vec<u8>,
    issuer_certificate: Vec<u8>,
}

impl CertificateBundle {
    /// Read the JSON data file at `path` and decode the three Base64
    /// encoded artifacts. The file stem of `path` is kept to name output
    /// files.
    pub fn decode<P: AsRef<Path>>(path: P) -> Result<Self, Error> {
        let path = path.as_ref();
        let json = Zeroizing::new(fs::read(path).map_err(|e| Error::Io {
            path: path.to_path_buf(),
            source: e,
        })?);

        let stem = path
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_default();
        debug!("decoding bundle from {} w/ stem {}", path.display(), stem);

        Self::from_slice(stem, &json)
    }

    /// Decode a bundle from JSON text. `stem` is used only when naming
    /// output files.
    pub fn from_json(stem: impl Into<String>, json: &str) -> Result<Self, Error> {
        Self::from_slice(stem, json.as_bytes())
    }

    /// Decode a bundle from the raw bytes of a JSON data file. Bytes that
    /// aren't UTF-8 JSON are an `Error::Parse`.
    pub fn from_slice(
        stem: impl Into<String>,
        json: &[u8],
    ) -> Result<Self, Error> {
        let mut doc: Map<String, Value> = serde_json::from_slice(json)?;

        // every field must be present before any is decoded, the first
        // missing one in `Field::ALL` order is reported
        let [private_key, certificate, issuer_certificate] = Field::ALL
            .map(|f| doc.remove(f.name()).ok_or(Error::MissingField(f)));
        let private_key = private_key?;
        let certificate = certificate?;
        let issuer_certificate = issuer_certificate?;

        let bundle = Self {
            stem: stem.into(),
            private_key: Zeroizing::new(decode_value(
                Field::PrivateKey,
                private_key,
            )?),
            certificate: decode_value(Field::Certificate, certificate)?,
            issuer_certificate: decode_value(
                Field::IssuerCertificate,
                issuer_certificate,
            )?,
        };

        for (field, data) in bundle.iter() {
            debug!("decoded {}: {} bytes", field, data.len());
        }

        Ok(bundle)
    }

    /// File stem of the JSON data file this bundle was decoded from.
    pub fn stem(&self) -> &str {
        &self.stem
    }

    pub fn get(&self, field: Field) -> &[u8] {
        match field {
            Field::PrivateKey => &self.private_key,
            Field::Certificate => &self.certificate,
            Field::IssuerCertificate => &self.issuer_certificate,
        }
    }

    pub fn private_key(&self) -> &[u8] {
        self.get(Field::PrivateKey)
    }

    pub fn certificate(&self) -> &[u8] {
        self.get(Field::Certificate)
    }

    pub fn issuer_certificate(&self) -> &[u8] {
        self.get(Field::IssuerCertificate)
    }

    /// Iterate over the decoded artifacts in `Field::ALL` order.
    pub fn iter(&self) -> impl Iterator<Item = (Field, &[u8])> {
        Field::ALL.into_iter().map(move |f| (f, self.get(f)))
    }
}

// A present field that isn't a JSON string (including `null`) is a parse
// error, not a missing field.
fn decode_value(field: Field, value: Value) -> Result<Vec<u8>, Error> {
    let encoded: Zeroizing<String> = serde_json::from_value(value)?;
    decode_field(field, &encoded)
}

// Line breaks inside the encoded value are tolerated. Anything else outside
// the standard alphabet is an error.
fn decode_field(field: Field, encoded: &str) -> Result<Vec<u8>, Error> {
    let compact: Zeroizing<String> = Zeroizing::new(
        encoded.chars().filter(|c| !c.is_ascii_whitespace()).collect(),
    );

    STANDARD
        .decode(compact.as_bytes())
        .map_err(|e| Error::Decode { field, source: e })
}

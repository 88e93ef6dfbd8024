// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

use std::fmt::{self, Display, Formatter};

/// Version reported by the `version` subcommand.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

// string for environment variable used to pass in the path to the JSON
// data file written by syno-cli
pub const ENV_JSON_FILE: &str = "SYNO_JSON_FILE";
// string for environment variable used to pass in the passphrase shared by
// the input private key and the output PKCS#12 container
pub const ENV_PASSPHRASE: &str = "SYNO_PASSPHRASE";

pub const PEM_EXT: &str = ".pem";
pub const DEFAULT_OUTPUT_PATH: &str = "./";

/// The three artifacts serialized in a syno-cli JSON data file. The order
/// of the variants is the order they're decoded and written in.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum Field {
    PrivateKey,
    Certificate,
    IssuerCertificate,
}

impl Field {
    pub const ALL: [Field; 3] =
        [Field::PrivateKey, Field::Certificate, Field::IssuerCertificate];

    /// NOTE: These strings are both the JSON keys and the suffix of the PEM
    /// file names, so they don't follow a single naming convention.
    pub fn name(&self) -> &'static str {
        match self {
            Field::PrivateKey => "privateKey",
            Field::Certificate => "certificate",
            Field::IssuerCertificate => "issuer_certificate",
        }
    }
}

impl Display for Field {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_field_names() {
        let names: Vec<String> = Field::ALL.iter().map(|f| f.to_string()).collect();
        assert_eq!(names, ["privateKey", "certificate", "issuer_certificate"]);
    }

    #[test]
    fn test_version() {
        assert_eq!(VERSION, "1.0.0");
    }
}

// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

use anyhow::Result;
use clap::Args;
use log::debug;
use zeroize::Zeroizing;

use crate::{config::ENV_PASSPHRASE, pkcs12::Pkcs12Options};

const PASSPHRASE_PROMPT: &str = "Enter passphrase: ";

pub trait PassphraseReader {
    fn read(&mut self, prompt: &str) -> Result<Zeroizing<String>>;
}

/// Read a passphrase from the terminal w/o echo.
#[derive(Default)]
pub struct StdioPassphraseReader {}

impl PassphraseReader for StdioPassphraseReader {
    fn read(&mut self, prompt: &str) -> Result<Zeroizing<String>> {
        Ok(Zeroizing::new(rpassword::prompt_password(prompt)?))
    }
}

#[derive(Args, Clone, Debug, Default, PartialEq)]
pub struct PassphraseArgs {
    /// The passphrase to use for both the private key and the PKCS#12 file
    /// (leave empty if not needed).
    #[clap(long, env = ENV_PASSPHRASE, hide_env_values = true)]
    passphrase: Option<String>,

    /// Prompt for the shared passphrase. The answer takes precedence over
    /// `--passphrase` and its environment variable.
    #[clap(long)]
    ask_passphrase: bool,

    /// Passphrase that unlocks the private key, overrides `--passphrase`.
    #[clap(long)]
    key_passphrase: Option<String>,

    /// Passphrase that protects the PKCS#12 file, overrides `--passphrase`.
    #[clap(long)]
    export_passphrase: Option<String>,
}

// an empty passphrase is the same as no passphrase
fn non_empty(p: Option<String>) -> Option<Zeroizing<String>> {
    p.filter(|p| !p.is_empty()).map(Zeroizing::new)
}

impl PassphraseArgs {
    /// Resolve the key and export passphrases. The shared passphrase
    /// applies to whichever side has no passphrase of its own. When asked
    /// for, the prompted passphrase replaces `--passphrase` so that an
    /// exported `SYNO_PASSPHRASE` doesn't get in the way of the prompt.
    pub fn into_options(
        self,
        reader: &mut dyn PassphraseReader,
    ) -> Result<Pkcs12Options> {
        let shared = if self.ask_passphrase {
            Some(reader.read(PASSPHRASE_PROMPT)?).filter(|p| !p.is_empty())
        } else {
            non_empty(self.passphrase)
        };

        let key_passphrase = non_empty(self.key_passphrase);
        let export_passphrase = non_empty(self.export_passphrase);
        debug!(
            "passphrases: shared {}, key {}, export {}",
            shared.is_some(),
            key_passphrase.is_some(),
            export_passphrase.is_some()
        );

        Ok(Pkcs12Options {
            key_passphrase: key_passphrase.or_else(|| shared.clone()),
            export_passphrase: export_passphrase.or(shared),
            ..Default::default()
        })
    }
}

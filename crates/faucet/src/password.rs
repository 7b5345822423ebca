//! Where keystore passwords come from.

use std::{
    collections::HashMap,
    path::{Path, PathBuf},
};

use zeroize::Zeroizing;

use crate::error::PasswordError;

/// Supplies the password protecting a chain's keystore.
pub trait PasswordSource: Send + Sync {
    /// Password of the existing keystore of `chain`.
    fn password_for(&self, chain: &str) -> Result<Zeroizing<String>, PasswordError>;

    /// Password for a keystore about to be created for `chain`.
    fn new_password_for(&self, chain: &str) -> Result<Zeroizing<String>, PasswordError> {
        self.password_for(chain)
    }
}

/// Asks on the controlling terminal without echoing.
#[derive(Debug, Default, Clone, Copy)]
pub struct PromptPassword;

impl PromptPassword {
    fn prompt(message: &str) -> Result<Zeroizing<String>, PasswordError> {
        rpassword::prompt_password(message)
            .map(Zeroizing::new)
            .map_err(PasswordError::Prompt)
    }
}

impl PasswordSource for PromptPassword {
    fn password_for(&self, chain: &str) -> Result<Zeroizing<String>, PasswordError> {
        Self::prompt(&format!("Password for {chain}: "))
    }

    fn new_password_for(&self, chain: &str) -> Result<Zeroizing<String>, PasswordError> {
        let password = Self::prompt(&format!("New password for {chain}: "))?;
        let repeated = Self::prompt(&format!("Repeat password for {chain}: "))?;
        if *password != *repeated {
            return Err(PasswordError::Mismatch(chain.to_string()));
        }
        Ok(password)
    }
}

/// Passwords read from a TOML file mapping chain names to passwords.
///
/// ```toml
/// dev = "hunter2"
/// ```
pub struct PasswordFile {
    path: PathBuf,
    passwords: HashMap<String, Zeroizing<String>>,
}

impl std::fmt::Debug for PasswordFile {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PasswordFile")
            .field("path", &self.path)
            .field("chains", &self.passwords.keys().collect::<Vec<_>>())
            .finish()
    }
}

impl PasswordFile {
    /// Loads the file at `path` and checks it has an entry for every chain in
    /// `chains`, so a missing password fails before any keystore is touched.
    pub fn load<'a>(
        path: impl AsRef<Path>,
        chains: impl IntoIterator<Item = &'a str>,
    ) -> Result<Self, PasswordError> {
        let path = path.as_ref().to_path_buf();
        let file_error = |reason: String| PasswordError::File {
            path: path.clone(),
            reason,
        };

        let content = Zeroizing::new(
            std::fs::read_to_string(&path).map_err(|e| file_error(e.to_string()))?,
        );
        let passwords: HashMap<String, String> =
            toml::from_str(&content).map_err(|e| file_error(e.to_string()))?;
        let passwords: HashMap<_, _> = passwords
            .into_iter()
            .map(|(chain, password)| (chain, Zeroizing::new(password)))
            .collect();

        for chain in chains {
            if !passwords.contains_key(chain) {
                return Err(PasswordError::Missing(chain.to_string()));
            }
        }

        Ok(Self { path, passwords })
    }
}

impl PasswordSource for PasswordFile {
    fn password_for(&self, chain: &str) -> Result<Zeroizing<String>, PasswordError> {
        self.passwords
            .get(chain)
            .cloned()
            .ok_or_else(|| PasswordError::Missing(chain.to_string()))
    }
}

//! Encrypted bearer-token persistence
//!
//! The session token is the only state kept on disk. It is sealed with
//! XChaCha20-Poly1305 under a per-install key that never leaves the data dir.

use anyhow::{anyhow, bail, Context, Result};
use chacha20poly1305::{
    aead::{Aead, KeyInit, OsRng},
    XChaCha20Poly1305, XNonce,
};
use rand_core::RngCore;
use serde::{Deserialize, Serialize};
use std::fs::{self, File, OpenOptions};
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use zeroize::Zeroizing;

const TOKEN_FILE: &str = "session.token";
const KEY_FILE: &str = ".key";

/// On-disk token record
#[derive(Serialize, Deserialize)]
struct EncryptedToken {
    /// XChaCha20-Poly1305 nonce (192-bit)
    nonce: Vec<u8>,
    ciphertext: Vec<u8>,
    /// Unencrypted metadata
    created_at: String,
}

pub struct TokenStore {
    dir: PathBuf,
    encryption_key: Zeroizing<[u8; 32]>,
}

impl TokenStore {
    /// Open the store under `dir`, creating the directory and key if needed
    pub fn open(dir: &Path) -> Result<Self> {
        fs::create_dir_all(dir).context("Failed to create session directory")?;
        let key_path = dir.join(KEY_FILE);
        let encryption_key = match create_key(&key_path) {
            Ok(key) => {
                log::info!("Generated new token encryption key");
                key
            }
            Err(e) if e.kind() == io::ErrorKind::AlreadyExists => load_key(&key_path)?,
            Err(e) => return Err(e).context("Failed to write encryption key"),
        };
        Ok(Self {
            dir: dir.to_path_buf(),
            encryption_key,
        })
    }

    fn token_path(&self) -> PathBuf {
        self.dir.join(TOKEN_FILE)
    }

    /// Seal and persist the token, replacing any previous one
    pub fn save(&self, token: &str) -> Result<()> {
        let cipher = XChaCha20Poly1305::new((&*self.encryption_key).into());

        let mut nonce_bytes = [0u8; 24];
        OsRng.fill_bytes(&mut nonce_bytes);
        let nonce = XNonce::from(nonce_bytes);

        let ciphertext = cipher
            .encrypt(&nonce, token.as_bytes())
            .map_err(|e| anyhow!("Encryption failed: {:?}", e))?;

        let record = EncryptedToken {
            nonce: nonce_bytes.to_vec(),
            ciphertext,
            created_at: chrono::Utc::now().to_rfc3339(),
        };

        let path = self.token_path();
        let json = serde_json::to_string_pretty(&record).context("Failed to serialize token")?;
        let mut options = OpenOptions::new();
        options.write(true).create(true).truncate(true);
        let mut file = open_private(&mut options, &path).context("Failed to open token file")?;
        file.write_all(json.as_bytes()).context("Failed to write token file")?;

        log::info!("Session token saved");
        Ok(())
    }

    /// Stored token, or None if nothing was saved
    pub fn load(&self) -> Result<Option<Zeroizing<String>>> {
        let path = self.token_path();
        if !path.exists() {
            return Ok(None);
        }

        let json = fs::read_to_string(&path).context("Failed to read token file")?;
        let record: EncryptedToken =
            serde_json::from_str(&json).context("Failed to parse token file")?;

        if record.nonce.len() != 24 {
            bail!("Invalid nonce length");
        }
        let nonce = XNonce::from_slice(&record.nonce);

        let cipher = XChaCha20Poly1305::new((&*self.encryption_key).into());
        let mut plaintext = Zeroizing::new(
            cipher
                .decrypt(nonce, record.ciphertext.as_ref())
                .map_err(|e| anyhow!("Decryption failed: {:?}", e))?,
        );

        let token = String::from_utf8(std::mem::take(&mut *plaintext))
            .context("Token is not valid UTF-8")?;
        log::debug!("Session token loaded (saved {})", record.created_at);
        Ok(Some(Zeroizing::new(token)))
    }

    /// Remove the stored token. Returns whether one existed.
    pub fn clear(&self) -> Result<bool> {
        let path = self.token_path();
        if !path.exists() {
            return Ok(false);
        }
        fs::remove_file(&path).context("Failed to remove token file")?;
        log::info!("Session token cleared");
        Ok(true)
    }
}

/// Open with owner-only permissions from the moment the file exists. A file
/// left behind with wider permissions is tightened before anything is written.
fn open_private(options: &mut OpenOptions, path: &Path) -> io::Result<File> {
    #[cfg(unix)]
    {
        use std::os::unix::fs::OpenOptionsExt;
        options.mode(0o600);
    }
    let file = options.open(path)?;
    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        file.set_permissions(fs::Permissions::from_mode(0o600))?;
    }
    Ok(file)
}

/// Fresh random key. Fails with `AlreadyExists` if a key is already on disk.
fn create_key(path: &Path) -> io::Result<Zeroizing<[u8; 32]>> {
    let mut options = OpenOptions::new();
    options.write(true).create_new(true);
    let mut file = open_private(&mut options, path)?;
    let mut key = Zeroizing::new([0u8; 32]);
    OsRng.fill_bytes(&mut *key);
    if let Err(e) = file.write_all(&*key).and_then(|()| file.sync_all()) {
        // Never leave a short key behind
        let _ = fs::remove_file(path);
        return Err(e);
    }
    Ok(key)
}

fn load_key(path: &Path) -> Result<Zeroizing<[u8; 32]>> {
    let bytes = Zeroizing::new(fs::read(path).context("Failed to read encryption key")?);
    let key: [u8; 32] = bytes
        .as_slice()
        .try_into()
        .map_err(|_| anyhow!("Encryption key must be 32 bytes, found {}", bytes.len()))?;
    Ok(Zeroizing::new(key))
}

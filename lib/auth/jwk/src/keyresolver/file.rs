//  FILE.rs
//    by Lut99
//
//  Created:
//    15 Oct 2026, 11:30:17
//  Last edited:
//    15 Oct 2026, 12:58:40
//  Auto updated?
//    Yes
//
//  Description:
//!   Implements a resolver that reads a static public key from disk.
//

use std::path::{Path, PathBuf};

use jsonwebtoken::DecodingKey;
use thiserror::Error;
use tracing::debug;

use super::KeyResolver;


/***** ERRORS *****/
/// Defines the errors originating from the [`FileKeyResolver`].
#[derive(Debug, Error)]
pub enum Error {
    /// Failed to read the key file.
    #[error("Failed to read public key file {:?}", path.display())]
    FileRead {
        path: PathBuf,
        #[source]
        err:  std::io::Error,
    },
    /// The key file did not contain a PEM-encoded RSA public key.
    #[error("Public key file {:?} does not contain a PEM-encoded RSA public key", path.display())]
    KeyParse {
        path: PathBuf,
        #[source]
        err:  jsonwebtoken::errors::Error,
    },
}





/***** LIBRARY *****/
/// Resolves the key from a PEM file on disk.
///
/// The file is re-read on every resolve, so replacing it on disk rotates the key at the next
/// refresh.
#[derive(Clone, Debug)]
pub struct FileKeyResolver {
    /// The path to the PEM file.
    path: PathBuf,
}
impl FileKeyResolver {
    /// Constructor for the FileKeyResolver.
    ///
    /// # Arguments
    /// - `path`: The path where the PEM-encoded public key is stored on disk.
    ///
    /// # Returns
    /// A new FileKeyResolver. Note that the file is not touched until it is resolved.
    #[inline]
    pub fn new(path: impl Into<PathBuf>) -> Self { Self { path: path.into() } }

    /// Returns the path of the key file.
    #[inline]
    pub fn path(&self) -> &Path { &self.path }
}
impl KeyResolver for FileKeyResolver {
    type Error = Error;

    async fn resolve(&self) -> Result<Vec<DecodingKey>, Self::Error> {
        debug!("Reading public key file {:?}...", self.path.display());
        let raw: Vec<u8> = tokio::fs::read(&self.path).await.map_err(|err| Error::FileRead { path: self.path.clone(), err })?;
        let key: DecodingKey = DecodingKey::from_rsa_pem(&raw).map_err(|err| Error::KeyParse { path: self.path.clone(), err })?;
        Ok(vec![key])
    }
}





/***** TESTS *****/
#[cfg(test)]
mod tests {
    use super::*;

    fn keys_dir() -> PathBuf { PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("tests").join("keys") }

    #[tokio::test]
    async fn reads_pem_public_key() {
        let resv = FileKeyResolver::new(keys_dir().join("primary.pub.pem"));
        assert_eq!(resv.resolve().await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn missing_file_is_an_error() {
        let resv = FileKeyResolver::new(keys_dir().join("does-not-exist.pem"));
        assert!(matches!(resv.resolve().await, Err(Error::FileRead { .. })));
    }

    #[tokio::test]
    async fn non_pem_file_is_an_error() {
        let resv = FileKeyResolver::new(keys_dir().join("jwks.json"));
        assert!(matches!(resv.resolve().await, Err(Error::KeyParse { .. })));
    }
}

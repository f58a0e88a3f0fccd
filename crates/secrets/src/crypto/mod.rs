//! Cipher unit, master-key handling, and key fingerprints.

mod cipher;
mod fingerprint;
mod keys;

pub use cipher::{BLOB_VERSION, EncryptedBlob, NONCE_LEN, TAG_LEN, decrypt, encrypt};
pub use fingerprint::KeyFingerprint;
pub use keys::{KEY_LEN, MASTER_KEY_ENV, MasterKey};

use bip39::{Language, Mnemonic};
use rand::RngCore;
use zeroize::Zeroize;

use crate::error::WalletError;

/// Generate a new 24-word BIP-39 mnemonic (256 bits of entropy)
pub fn generate_mnemonic() -> Result<String, WalletError> {
    let mut entropy = [0u8; 32];
    rand::rngs::OsRng.fill_bytes(&mut entropy);
    let mnemonic = Mnemonic::from_entropy_in(Language::English, &entropy)
        .map_err(|e| WalletError::InvalidMnemonic(e.to_string()))?;
    entropy.zeroize();
    Ok(mnemonic.to_string())
}

/// Validate a mnemonic phrase
pub fn validate_mnemonic(phrase: &str) -> bool {
    Mnemonic::parse_in_normalized(Language::English, phrase).is_ok()
}

/// Derive seed bytes from mnemonic + optional passphrase
/// Returns 64-byte seed. Caller MUST zeroize the returned seed when done.
pub fn mnemonic_to_seed(phrase: &str, passphrase: &str) -> Result<Vec<u8>, WalletError> {
    let mnemonic = Mnemonic::parse_in_normalized(Language::English, phrase)
        .map_err(|e| WalletError::InvalidMnemonic(e.to_string()))?;

    let seed = mnemonic.to_seed(passphrase);
    Ok(seed.to_vec())
}

/// Mnemonic phrase that is wiped from memory on drop.
#[derive(Clone)]
pub struct ZeroizingMnemonic {
    phrase: String,
}

impl ZeroizingMnemonic {
    pub fn new(phrase: &str) -> Result<Self, WalletError> {
        let normalized = phrase.split_whitespace().collect::<Vec<_>>().join(" ");
        if !validate_mnemonic(&normalized) {
            return Err(WalletError::InvalidMnemonic("Invalid mnemonic phrase".into()));
        }
        Ok(Self { phrase: normalized })
    }

    pub fn as_str(&self) -> &str {
        &self.phrase
    }

    pub fn to_seed(&self, passphrase: &str) -> Result<Vec<u8>, WalletError> {
        mnemonic_to_seed(&self.phrase, passphrase)
    }
}

impl Drop for ZeroizingMnemonic {
    fn drop(&mut self) {
        self.phrase.zeroize();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const TEST_MNEMONIC: &str = "abandon abandon abandon abandon abandon abandon abandon abandon abandon abandon abandon about";

    #[test]
    fn test_generate_mnemonic_24_words() {
        let mnemonic = generate_mnemonic().unwrap();
        assert_eq!(mnemonic.split_whitespace().count(), 24);
        assert!(validate_mnemonic(&mnemonic));
    }

    #[test]
    fn test_validate_invalid_mnemonic() {
        assert!(!validate_mnemonic("invalid mnemonic phrase here"));
    }

    #[test]
    fn test_bip39_test_vector() {
        // Official BIP-39 test vector, passphrase "TREZOR".
        let seed = mnemonic_to_seed(TEST_MNEMONIC, "TREZOR").unwrap();
        assert_eq!(
            hex::encode(&seed),
            "c55257c360c07c72029aebc1b53c05ed0362ada38ead3e3e9efa3708e53495531f09a6987599d18264c1e1c92f2cf141630c7a3c4ab7c81b2f001698e7463b04"
        );
    }

    #[test]
    fn test_passphrase_changes_seed() {
        let seed_no_pass = mnemonic_to_seed(TEST_MNEMONIC, "").unwrap();
        let seed_with_pass = mnemonic_to_seed(TEST_MNEMONIC, "mypassphrase").unwrap();
        assert_ne!(seed_no_pass, seed_with_pass);
        assert_eq!(seed_no_pass.len(), 64);
    }

    #[test]
    fn test_zeroizing_mnemonic_normalizes_whitespace() {
        let spaced = TEST_MNEMONIC.replace(' ', "  ");
        let mnemonic = ZeroizingMnemonic::new(&format!(" {spaced}\n")).unwrap();
        assert_eq!(mnemonic.as_str(), TEST_MNEMONIC);
        assert!(ZeroizingMnemonic::new("abandon abandon").is_err());
    }
}

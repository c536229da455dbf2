use bip32::{DerivationPath, XPrv};
use k256::ecdsa::SigningKey;
use zeroize::Zeroize;

use crate::error::WalletError;

/// BIP-44 path for Ethereum accounts: m/44'/60'/account'/0/index
pub fn ethereum_path(account: u32, index: u32) -> String {
    format!("m/44'/60'/{}'/0/{}", account, index)
}

/// Derive a secp256k1 private key from seed using BIP-32
pub fn derive_secp256k1_key(seed: &[u8], path_str: &str) -> Result<DerivedKey, WalletError> {
    let path: DerivationPath = path_str
        .parse()
        .map_err(|e: bip32::Error| WalletError::DerivationFailed(e.to_string()))?;

    let xprv = XPrv::derive_from_path(seed, &path)
        .map_err(|e| WalletError::DerivationFailed(e.to_string()))?;

    let mut private_key_bytes: [u8; 32] = xprv.to_bytes().into();
    let signing_key = SigningKey::from_bytes(&private_key_bytes.into())
        .map_err(|e| WalletError::DerivationFailed(e.to_string()));
    private_key_bytes.zeroize();

    Ok(DerivedKey {
        signing_key: signing_key?,
        derivation_path: path_str.to_string(),
    })
}

/// Derived secp256k1 key and the path it came from.
///
/// `SigningKey` zeroizes its scalar on drop.
pub struct DerivedKey {
    pub signing_key: SigningKey,
    pub derivation_path: String,
}

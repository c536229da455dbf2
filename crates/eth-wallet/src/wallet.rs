use std::fmt;

use alloy_primitives::{Address, B256, U256};
use eth_core::address::{pubkey_to_address, to_checksum};
use eth_core::hash::keccak256;
use eth_core::transaction::{encode_signed, signing_hash, Signature, SignedTransaction, TransactionRequest};
use k256::ecdsa::signature::hazmat::PrehashSigner;
use k256::ecdsa::{RecoveryId, Signature as EcdsaSignature, SigningKey, VerifyingKey};
use zeroize::Zeroize;

use crate::error::WalletError;
use crate::hd_derivation::{derive_secp256k1_key, ethereum_path, DerivedKey};
use crate::mnemonic::{generate_mnemonic, ZeroizingMnemonic};

/// A local account: one secp256k1 key and the address derived from it.
///
/// Signing is a pure function of the key and the payload, so a wallet built
/// from a mnemonic and one built from the derived raw key sign identically.
#[derive(Clone)]
pub struct Wallet {
    signing_key: SigningKey,
    address: Address,
    mnemonic: Option<ZeroizingMnemonic>,
    derivation_path: Option<String>,
}

impl Wallet {
    /// Creates a wallet from a fresh 24-word mnemonic (first account).
    pub fn random() -> Result<Self, WalletError> {
        let mut phrase = generate_mnemonic()?;
        let wallet = Self::from_phrase(&phrase);
        phrase.zeroize();
        wallet
    }

    /// Derives the account at `m/44'/60'/0'/0/0` with an empty passphrase.
    pub fn from_phrase(phrase: &str) -> Result<Self, WalletError> {
        Self::from_phrase_with_path(phrase, "", &ethereum_path(0, 0))
    }

    /// Derives the account at `path` from `phrase` and `passphrase`.
    pub fn from_phrase_with_path(phrase: &str, passphrase: &str, path: &str) -> Result<Self, WalletError> {
        let mnemonic = ZeroizingMnemonic::new(phrase)?;
        let mut seed = mnemonic.to_seed(passphrase)?;
        let derived = derive_secp256k1_key(&seed, path);
        seed.zeroize();
        let DerivedKey {
            signing_key,
            derivation_path,
        } = derived?;

        let mut wallet = Self::from_signing_key(signing_key)?;
        wallet.mnemonic = Some(mnemonic);
        wallet.derivation_path = Some(derivation_path);
        Ok(wallet)
    }

    pub fn from_private_key(private_key: &[u8; 32]) -> Result<Self, WalletError> {
        let signing_key = SigningKey::from_bytes(private_key.into())
            .map_err(|e| WalletError::InvalidPrivateKey(e.to_string()))?;
        Self::from_signing_key(signing_key)
    }

    /// Parses a 64-digit hex private key, `0x` prefix optional.
    pub fn from_hex(private_key: &str) -> Result<Self, WalletError> {
        let digits = private_key.strip_prefix("0x").unwrap_or(private_key);
        if digits.len() != 64 {
            return Err(WalletError::InvalidPrivateKey(format!(
                "expected 64 hex characters, got {}",
                digits.len()
            )));
        }
        let mut bytes = [0u8; 32];
        hex::decode_to_slice(digits, &mut bytes)
            .map_err(|e| WalletError::InvalidPrivateKey(e.to_string()))?;
        let wallet = Self::from_private_key(&bytes);
        bytes.zeroize();
        wallet
    }

    fn from_signing_key(signing_key: SigningKey) -> Result<Self, WalletError> {
        let address = address_of(signing_key.verifying_key())?;
        Ok(Self {
            signing_key,
            address,
            mnemonic: None,
            derivation_path: None,
        })
    }

    pub fn address(&self) -> Address {
        self.address
    }

    /// The mnemonic, for wallets created from one.
    pub fn phrase(&self) -> Option<&str> {
        self.mnemonic.as_ref().map(ZeroizingMnemonic::as_str)
    }

    pub fn derivation_path(&self) -> Option<&str> {
        self.derivation_path.as_deref()
    }

    /// Signs a 32-byte digest.
    pub fn sign_hash(&self, hash: &B256) -> Result<Signature, WalletError> {
        let (signature, recovery_id): (EcdsaSignature, RecoveryId) = self
            .signing_key
            .sign_prehash(hash.as_slice())
            .map_err(|e| WalletError::SigningFailed(e.to_string()))?;

        Ok(Signature {
            r: U256::from_be_slice(&signature.r().to_bytes()),
            s: U256::from_be_slice(&signature.s().to_bytes()),
            y_parity: recovery_id.is_y_odd(),
        })
    }

    /// Signs `message` using EIP-191 personal_sign.
    pub fn sign_message(&self, message: impl AsRef<[u8]>) -> Result<Signature, WalletError> {
        self.sign_hash(&hash_message(message))
    }

    /// Signs a fully populated transaction.
    ///
    /// Fails if `tx.from` is set to an address other than this wallet's.
    pub fn sign_transaction(&self, tx: &TransactionRequest) -> Result<SignedTransaction, WalletError> {
        if let Some(from) = tx.from {
            if from != self.address {
                return Err(WalletError::SenderMismatch {
                    expected: to_checksum(&from),
                    actual: to_checksum(&self.address),
                });
            }
        }
        let hash = signing_hash(tx)?;
        let signature = self.sign_hash(&hash)?;
        Ok(encode_signed(tx, &signature)?)
    }
}

impl fmt::Debug for Wallet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Wallet")
            .field("address", &to_checksum(&self.address))
            .field("derivation_path", &self.derivation_path)
            .finish_non_exhaustive()
    }
}

/// keccak256("\x19Ethereum Signed Message:\n" + len(message) + message)
pub fn hash_message(message: impl AsRef<[u8]>) -> B256 {
    let message = message.as_ref();
    let mut preimage = format!("\x19Ethereum Signed Message:\n{}", message.len()).into_bytes();
    preimage.extend_from_slice(message);
    keccak256(preimage)
}

/// Recovers the address that produced `signature` over `hash`.
pub fn recover_address(hash: &B256, signature: &Signature) -> Result<Address, WalletError> {
    let mut rs = [0u8; 64];
    rs[..32].copy_from_slice(&signature.r.to_be_bytes::<32>());
    rs[32..].copy_from_slice(&signature.s.to_be_bytes::<32>());
    let ecdsa = EcdsaSignature::from_slice(&rs)
        .map_err(|e| WalletError::RecoveryFailed(e.to_string()))?;
    let recovery_id = RecoveryId::new(signature.y_parity, false);

    let key = VerifyingKey::recover_from_prehash(hash.as_slice(), &ecdsa, recovery_id)
        .map_err(|e| WalletError::RecoveryFailed(e.to_string()))?;
    address_of(&key)
}

/// Recovers the signer of an EIP-191 personal message.
pub fn recover_message_signer(message: impl AsRef<[u8]>, signature: &Signature) -> Result<Address, WalletError> {
    recover_address(&hash_message(message), signature)
}

fn address_of(key: &VerifyingKey) -> Result<Address, WalletError> {
    let uncompressed: [u8; 65] = key
        .to_encoded_point(false)
        .as_bytes()
        .try_into()
        .map_err(|_| WalletError::DerivationFailed("Invalid uncompressed public key".into()))?;
    Ok(pubkey_to_address(&uncompressed)?)
}

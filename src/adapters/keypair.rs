//! XRP Ledger keys: family seeds, classic addresses and transaction signatures.
//!
//! Seeds come from the faucet in one of two encodings. `s...` seeds are
//! secp256k1 family seeds (root key plus the account 0 intermediate key);
//! `sEd...` seeds are ed25519 where the secret is the first half of
//! SHA-512 over the entropy.

use crate::utils::error::{LedgerError, LedgerResult};
use ed25519_dalek::Signer as _;
use k256::ecdsa::signature::hazmat::PrehashSigner;
use k256::elliptic_curve::sec1::ToEncodedPoint;
use ripemd::Ripemd160;
use sha2::{Digest, Sha256, Sha512};

const ACCOUNT_ID_PREFIX: u8 = 0x00;
const SECP256K1_SEED_PREFIX: u8 = 0x21;
const ED25519_SEED_PREFIX: [u8; 3] = [0x01, 0xE1, 0x4B];
const ED25519_KEY_PREFIX: u8 = 0xED;
const SEED_ENTROPY_LEN: usize = 16;
const CHECKSUM_LEN: usize = 4;

/// SHA-512 的前 32 bytes
pub fn sha512_half(data: &[u8]) -> [u8; 32] {
    let digest = Sha512::digest(data);
    let mut half = [0u8; 32];
    half.copy_from_slice(&digest[..32]);
    half
}

fn checksum(payload: &[u8]) -> [u8; CHECKSUM_LEN] {
    let digest = Sha256::digest(Sha256::digest(payload));
    let mut sum = [0u8; CHECKSUM_LEN];
    sum.copy_from_slice(&digest[..CHECKSUM_LEN]);
    sum
}

fn encode_checked(payload: &[u8]) -> String {
    let mut bytes = payload.to_vec();
    bytes.extend_from_slice(&checksum(payload));
    bs58::encode(bytes)
        .with_alphabet(bs58::Alphabet::RIPPLE)
        .into_string()
}

fn decode_checked(kind: &str, encoded: &str) -> LedgerResult<Vec<u8>> {
    let bytes = bs58::decode(encoded)
        .with_alphabet(bs58::Alphabet::RIPPLE)
        .into_vec()
        .map_err(|e| LedgerError::Signing(format!("invalid {} '{}': {}", kind, encoded, e)))?;

    if bytes.len() <= CHECKSUM_LEN {
        return Err(LedgerError::Signing(format!("{} '{}' is too short", kind, encoded)));
    }

    let (payload, sum) = bytes.split_at(bytes.len() - CHECKSUM_LEN);
    if checksum(payload) != sum {
        return Err(LedgerError::Signing(format!("{} '{}' has a bad checksum", kind, encoded)));
    }
    Ok(payload.to_vec())
}

/// classic address (`r...`) 轉 20 bytes account ID
pub fn decode_address(address: &str) -> LedgerResult<[u8; 20]> {
    let payload = decode_checked("address", address)?;
    match payload.split_first() {
        Some((&ACCOUNT_ID_PREFIX, id)) if id.len() == 20 => {
            let mut account_id = [0u8; 20];
            account_id.copy_from_slice(id);
            Ok(account_id)
        }
        _ => Err(LedgerError::Signing(format!("'{}' is not a classic address", address))),
    }
}

pub fn encode_address(account_id: &[u8; 20]) -> String {
    let mut payload = vec![ACCOUNT_ID_PREFIX];
    payload.extend_from_slice(account_id);
    encode_checked(&payload)
}

enum SigningKey {
    Secp256k1(k256::ecdsa::SigningKey),
    Ed25519(ed25519_dalek::SigningKey),
}

/// 由 seed 推導出的簽章金鑰與 33 bytes 公鑰
pub struct Keypair {
    key: SigningKey,
    public_key: Vec<u8>,
}

impl Keypair {
    pub fn from_seed(seed: &str) -> LedgerResult<Self> {
        let payload = decode_checked("seed", seed)?;

        match payload.as_slice() {
            [a, b, c, entropy @ ..]
                if [*a, *b, *c] == ED25519_SEED_PREFIX && entropy.len() == SEED_ENTROPY_LEN =>
            {
                let key = ed25519_dalek::SigningKey::from_bytes(&sha512_half(entropy));
                let mut public_key = vec![ED25519_KEY_PREFIX];
                public_key.extend_from_slice(key.verifying_key().as_bytes());
                Ok(Self {
                    key: SigningKey::Ed25519(key),
                    public_key,
                })
            }
            [prefix, entropy @ ..]
                if *prefix == SECP256K1_SEED_PREFIX && entropy.len() == SEED_ENTROPY_LEN =>
            {
                let secret = derive_secp256k1(entropy)?;
                let public_key = secret
                    .public_key()
                    .to_encoded_point(true)
                    .as_bytes()
                    .to_vec();
                Ok(Self {
                    key: SigningKey::Secp256k1(k256::ecdsa::SigningKey::from(secret)),
                    public_key,
                })
            }
            _ => Err(LedgerError::Signing("unsupported seed encoding".to_string())),
        }
    }

    pub fn public_key(&self) -> &[u8] {
        &self.public_key
    }

    /// RIPEMD160(SHA256(public key)) 編碼成 classic address
    pub fn address(&self) -> String {
        let digest = Ripemd160::digest(Sha256::digest(&self.public_key));
        let mut account_id = [0u8; 20];
        account_id.copy_from_slice(&digest);
        encode_address(&account_id)
    }

    /// secp256k1 簽 SHA-512 half 並輸出 low-S DER；ed25519 直接簽整段訊息
    pub fn sign(&self, message: &[u8]) -> LedgerResult<Vec<u8>> {
        match &self.key {
            SigningKey::Secp256k1(key) => {
                let signature: k256::ecdsa::Signature = key
                    .sign_prehash(&sha512_half(message))
                    .map_err(|e| LedgerError::Signing(e.to_string()))?;
                let signature = signature.normalize_s().unwrap_or(signature);
                Ok(signature.to_der().as_bytes().to_vec())
            }
            SigningKey::Ed25519(key) => Ok(key.sign(message).to_bytes().to_vec()),
        }
    }
}

fn derive_secp256k1(entropy: &[u8]) -> LedgerResult<k256::SecretKey> {
    let root = first_valid_scalar(|i| [entropy, &i.to_be_bytes()].concat())?;
    let root_public = root.public_key().to_encoded_point(true);

    // account index 固定為 0
    let tweak = first_valid_scalar(|i| {
        [root_public.as_bytes(), &0u32.to_be_bytes(), &i.to_be_bytes()].concat()
    })?;

    let scalar = *root.to_nonzero_scalar() + *tweak.to_nonzero_scalar();
    k256::SecretKey::from_bytes(&scalar.to_bytes())
        .map_err(|_| LedgerError::Signing("derived secp256k1 key is invalid".to_string()))
}

fn first_valid_scalar(input: impl Fn(u32) -> Vec<u8>) -> LedgerResult<k256::SecretKey> {
    (0..=u32::MAX)
        .find_map(|i| k256::SecretKey::from_slice(&sha512_half(&input(i))).ok())
        .ok_or_else(|| LedgerError::Signing("no valid secp256k1 scalar".to_string()))
}

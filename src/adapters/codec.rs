//! XRP Ledger binary transaction format.
//!
//! Each field is written as a field ID (type code and field code) followed by
//! its value, sorted by (type code, field code). The signing payload is the
//! same encoding without `TxnSignature`, prefixed with `STX\0`; the
//! transaction ID is SHA-512 half over `TXN\0` plus the signed blob.

use crate::adapters::keypair::{decode_address, sha512_half, Keypair};
use crate::domain::model::{IssuedAmount, PreparedTransaction, SignedTransaction, Transaction};
use crate::utils::error::{LedgerError, LedgerResult};
use rust_decimal::Decimal;
use std::str::FromStr;

const SIGNING_PREFIX: [u8; 4] = *b"STX\0";
const TRANSACTION_ID_PREFIX: [u8; 4] = *b"TXN\0";

const TYPE_UINT16: u8 = 1;
const TYPE_UINT32: u8 = 2;
const TYPE_AMOUNT: u8 = 6;
const TYPE_BLOB: u8 = 7;
const TYPE_ACCOUNT: u8 = 8;

const MIN_MANTISSA: u128 = 1_000_000_000_000_000;
const MAX_MANTISSA: u128 = 9_999_999_999_999_999;
const MIN_EXPONENT: i32 = -96;
const MAX_EXPONENT: i32 = 80;
const MAX_DROPS: u64 = 100_000_000_000_000_000;

fn transaction_type_code(transaction: &Transaction) -> u16 {
    match transaction {
        Transaction::Payment(_) => 0,
        Transaction::AccountSet(_) => 3,
        Transaction::TrustSet(_) => 20,
        Transaction::AmmCreate(_) => 35,
    }
}

/// 尚未排序的欄位集合
#[derive(Default)]
struct Fields(Vec<(u8, u8, Vec<u8>)>);

impl Fields {
    fn uint16(&mut self, nth: u8, value: u16) {
        self.0.push((TYPE_UINT16, nth, value.to_be_bytes().to_vec()));
    }

    fn uint32(&mut self, nth: u8, value: u32) {
        self.0.push((TYPE_UINT32, nth, value.to_be_bytes().to_vec()));
    }

    fn amount(&mut self, nth: u8, value: Vec<u8>) {
        self.0.push((TYPE_AMOUNT, nth, value));
    }

    fn blob(&mut self, nth: u8, value: &[u8]) {
        let mut bytes = vl_prefix(value.len());
        bytes.extend_from_slice(value);
        self.0.push((TYPE_BLOB, nth, bytes));
    }

    fn account(&mut self, nth: u8, address: &str) -> LedgerResult<()> {
        let mut bytes = vl_prefix(20);
        bytes.extend_from_slice(&decode_address(address)?);
        self.0.push((TYPE_ACCOUNT, nth, bytes));
        Ok(())
    }

    fn serialize(mut self) -> Vec<u8> {
        self.0.sort_by_key(|(type_code, nth, _)| (*type_code, *nth));
        let mut out = Vec::new();
        for (type_code, nth, value) in self.0 {
            out.extend(field_id(type_code, nth));
            out.extend(value);
        }
        out
    }
}

fn field_id(type_code: u8, nth: u8) -> Vec<u8> {
    if nth < 16 {
        vec![type_code << 4 | nth]
    } else {
        vec![type_code << 4, nth]
    }
}

fn vl_prefix(len: usize) -> Vec<u8> {
    if len <= 192 {
        vec![len as u8]
    } else {
        let rest = len - 193;
        vec![193 + (rest >> 8) as u8, (rest & 0xff) as u8]
    }
}

fn xrp_amount(drops: &str) -> LedgerResult<Vec<u8>> {
    let value = drops
        .parse::<u64>()
        .ok()
        .filter(|d| *d <= MAX_DROPS)
        .ok_or_else(|| LedgerError::Signing(format!("invalid XRP drops '{}'", drops)))?;
    Ok((value | 0x4000_0000_0000_0000).to_be_bytes().to_vec())
}

/// 代幣金額：64 bits 數值 + 20 bytes 幣別 + 20 bytes 發行者
fn issued_amount(amount: &IssuedAmount) -> LedgerResult<Vec<u8>> {
    let mut bytes = issued_value(&amount.value)?.to_be_bytes().to_vec();
    bytes.extend_from_slice(&currency_bytes(&amount.currency)?);
    bytes.extend_from_slice(&decode_address(&amount.issuer)?);
    Ok(bytes)
}

fn issued_value(value: &str) -> LedgerResult<u64> {
    let invalid = |reason: &str| LedgerError::Signing(format!("cannot encode amount '{}': {}", value, reason));

    let decimal = Decimal::from_str(value).map_err(|_| invalid("not a decimal"))?;
    if decimal.is_zero() {
        return Ok(0x8000_0000_0000_0000);
    }

    let mut mantissa = decimal.mantissa().unsigned_abs();
    let mut exponent = -(decimal.scale() as i32);

    while mantissa < MIN_MANTISSA {
        mantissa *= 10;
        exponent -= 1;
    }
    while mantissa > MAX_MANTISSA {
        if mantissa % 10 != 0 {
            return Err(invalid("more than 16 significant digits"));
        }
        mantissa /= 10;
        exponent += 1;
    }
    if !(MIN_EXPONENT..=MAX_EXPONENT).contains(&exponent) {
        return Err(invalid("exponent out of range"));
    }

    let sign = if decimal.is_sign_negative() { 0 } else { 1u64 << 62 };
    Ok(1u64 << 63 | sign | ((exponent + 97) as u64) << 54 | mantissa as u64)
}

/// 40 位 hex 直接解碼；三字元代碼放在第 12..15 bytes
fn currency_bytes(currency: &str) -> LedgerResult<[u8; 20]> {
    let mut bytes = [0u8; 20];
    if currency.len() == 40 {
        hex::decode_to_slice(currency, &mut bytes)
            .map_err(|e| LedgerError::Signing(format!("invalid currency '{}': {}", currency, e)))?;
    } else if currency.len() == 3 && currency.is_ascii() && currency != "XRP" {
        bytes[12..15].copy_from_slice(currency.as_bytes());
    } else {
        return Err(LedgerError::Signing(format!("invalid currency '{}'", currency)));
    }
    Ok(bytes)
}

fn transaction_fields(prepared: &PreparedTransaction, public_key: &[u8]) -> LedgerResult<Fields> {
    let mut fields = Fields::default();
    let transaction = &prepared.transaction;

    fields.uint16(2, transaction_type_code(transaction));
    fields.uint32(4, prepared.sequence);
    fields.uint32(27, prepared.last_ledger_sequence);
    if let Some(network_id) = prepared.network_id {
        fields.uint32(1, network_id);
    }
    fields.amount(8, xrp_amount(&prepared.fee)?);
    fields.blob(3, public_key);
    fields.account(1, transaction.account())?;

    match transaction {
        Transaction::AccountSet(tx) => fields.uint32(33, tx.set_flag),
        Transaction::TrustSet(tx) => fields.amount(3, issued_amount(&tx.limit_amount)?),
        Transaction::Payment(tx) => {
            fields.amount(1, issued_amount(&tx.amount)?);
            fields.account(3, &tx.destination)?;
        }
        Transaction::AmmCreate(tx) => {
            fields.amount(1, issued_amount(&tx.amount)?);
            fields.amount(11, xrp_amount(&tx.amount2)?);
            fields.uint16(5, tx.trading_fee);
        }
    }

    Ok(fields)
}

/// 簽章的原始訊息 (`STX\0` + 不含 TxnSignature 的序列化)
pub fn signing_data(prepared: &PreparedTransaction, public_key: &[u8]) -> LedgerResult<Vec<u8>> {
    let mut data = SIGNING_PREFIX.to_vec();
    data.extend(transaction_fields(prepared, public_key)?.serialize());
    Ok(data)
}

pub fn transaction_hash(blob: &[u8]) -> String {
    let mut data = TRANSACTION_ID_PREFIX.to_vec();
    data.extend_from_slice(blob);
    hex::encode_upper(sha512_half(&data))
}

pub fn sign_transaction(prepared: &PreparedTransaction, keypair: &Keypair) -> LedgerResult<SignedTransaction> {
    let signature = keypair.sign(&signing_data(prepared, keypair.public_key())?)?;

    let mut fields = transaction_fields(prepared, keypair.public_key())?;
    fields.blob(4, &signature);
    let blob = fields.serialize();

    Ok(SignedTransaction {
        hash: transaction_hash(&blob),
        tx_blob: hex::encode_upper(blob),
        last_ledger_sequence: prepared.last_ledger_sequence,
    })
}

use crate::utils::error::{ConfigError, ConfigResult};
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use std::fmt;

pub const CURRENCY_CODE_LEN: usize = 40;

/// 代幣名稱最多 20 個 ASCII 字元 (160 bits)
pub const MAX_TOKEN_NAME_LEN: usize = CURRENCY_CODE_LEN / 2;

pub const DROPS_PER_XRP: u64 = 1_000_000;

/// 40 字元的非標準貨幣代碼：名稱的 ASCII hex，右側補 '0'，全大寫
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CurrencyCode(String);

impl CurrencyCode {
    pub fn from_token_name(name: &str) -> ConfigResult<Self> {
        if name.is_empty() || name.len() > MAX_TOKEN_NAME_LEN {
            return Err(ConfigError::InvalidConfigValueError {
                field: "pool.token_name".to_string(),
                value: name.to_string(),
                reason: format!("Token name must be 1 to {} characters", MAX_TOKEN_NAME_LEN),
            });
        }

        if !name.bytes().all(|b| b.is_ascii_alphanumeric()) {
            return Err(ConfigError::InvalidConfigValueError {
                field: "pool.token_name".to_string(),
                value: name.to_string(),
                reason: "Token name must be ASCII letters and digits".to_string(),
            });
        }

        if name.eq_ignore_ascii_case("XRP") {
            return Err(ConfigError::InvalidConfigValueError {
                field: "pool.token_name".to_string(),
                value: name.to_string(),
                reason: "XRP is reserved for the native currency".to_string(),
            });
        }

        let code = format!(
            "{:0<width$}",
            hex::encode_upper(name.as_bytes()),
            width = CURRENCY_CODE_LEN
        );
        Ok(Self(code))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for CurrencyCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// XRP 轉 drops 字串，最多 6 位小數
pub fn xrp_to_drops(xrp: Decimal) -> ConfigResult<String> {
    let invalid = |reason: &str| ConfigError::InvalidConfigValueError {
        field: "pool.xrp_amount".to_string(),
        value: xrp.to_string(),
        reason: reason.to_string(),
    };

    if xrp <= Decimal::ZERO {
        return Err(invalid("XRP amount must be positive"));
    }

    let drops = xrp * Decimal::from(DROPS_PER_XRP);
    if !drops.fract().is_zero() {
        return Err(invalid("XRP amount has more than 6 decimal places"));
    }

    drops
        .to_u64()
        .map(|d| d.to_string())
        .ok_or_else(|| invalid("XRP amount is out of range"))
}

pub fn drops_to_xrp(drops: u64) -> Decimal {
    (Decimal::from(drops) / Decimal::from(DROPS_PER_XRP)).normalize()
}

/// 代幣金額在交易中的字串表示 (去掉尾端的 0)
pub fn format_token_value(value: Decimal) -> String {
    value.normalize().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    #[test]
    fn test_currency_code_for_retreat() {
        let code = CurrencyCode::from_token_name("RETREAT").unwrap();
        assert_eq!(code.as_str(), "5245545245415400000000000000000000000000");
        assert_eq!(code.as_str().len(), CURRENCY_CODE_LEN);
    }

    #[test]
    fn test_currency_code_shape() {
        for name in ["A", "RETREAT", "Futura2050", "ABCDEFGHIJKLMNOPQRST"] {
            let code = CurrencyCode::from_token_name(name).unwrap();
            let code = code.as_str();
            assert_eq!(code.len(), 40);
            assert!(code.chars().all(|c| c.is_ascii_hexdigit()));
            assert_eq!(code, code.to_uppercase());

            let prefix = hex::encode_upper(name.as_bytes());
            assert!(code.starts_with(&prefix));
            assert!(code[prefix.len()..].chars().all(|c| c == '0'));
        }
    }

    #[test]
    fn test_currency_code_rejects_invalid_names() {
        assert!(CurrencyCode::from_token_name("").is_err());
        assert!(CurrencyCode::from_token_name("ABCDEFGHIJKLMNOPQRSTU").is_err());
        assert!(CurrencyCode::from_token_name("RÉTREAT").is_err());
        assert!(CurrencyCode::from_token_name("xrp").is_err());
    }

    #[test]
    fn test_xrp_to_drops() {
        assert_eq!(xrp_to_drops(Decimal::from(20)).unwrap(), "20000000");
        assert_eq!(xrp_to_drops(Decimal::from(40)).unwrap(), "40000000");
        assert_eq!(
            xrp_to_drops(Decimal::from_str("0.000001").unwrap()).unwrap(),
            "1"
        );
        assert!(xrp_to_drops(Decimal::from_str("0.0000001").unwrap()).is_err());
        assert!(xrp_to_drops(Decimal::ZERO).is_err());
        assert!(xrp_to_drops(Decimal::from(-5)).is_err());
    }

    #[test]
    fn test_drops_to_xrp() {
        assert_eq!(drops_to_xrp(100_000_000), Decimal::from(100));
        assert_eq!(
            drops_to_xrp(1_500_000),
            Decimal::from_str("1.5").unwrap()
        );
    }

    #[test]
    fn test_format_token_value() {
        assert_eq!(format_token_value(Decimal::from_str("20.00").unwrap()), "20");
        assert_eq!(format_token_value(Decimal::from_str("50.5").unwrap()), "50.5");
    }
}

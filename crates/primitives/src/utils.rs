//! Misc utils

use crate::error::{AccountError, AccountResult};
use ethers::{
    types::{Address, Bytes, U256},
    utils::to_checksum,
};

/// Converts address to checksum address
pub fn as_checksum_addr<S>(val: &Address, s: S) -> Result<S::Ok, S::Error>
where
    S: serde::Serializer,
{
    s.serialize_str(&to_checksum(val, None))
}

/// If possible, parses address from the first 20 bytes
pub fn get_address(buf: &[u8]) -> Option<Address> {
    if buf.len() >= 20 {
        Some(Address::from_slice(&buf[0..20]))
    } else {
        None
    }
}

/// Init code of a user operation: factory address followed by the factory call
pub fn pack_init_code(factory: Address, factory_data: &[u8]) -> Bytes {
    if factory.is_zero() {
        Bytes::default()
    } else {
        [factory.as_bytes(), factory_data].concat().into()
    }
}

/// Splits init code into the factory address and the factory call
pub fn unpack_init_code(init_code: &[u8]) -> (Address, Bytes) {
    if init_code.len() >= 20 {
        (Address::from_slice(&init_code[0..20]), Bytes::from(init_code[20..].to_vec()))
    } else {
        (Address::default(), Bytes::default())
    }
}

/// Intrinsic gas charged for transaction calldata
pub fn calldata_gas(data: &[u8], gtx_data_zero: u64, gtx_data_non_zero: u64) -> u64 {
    data.iter().map(|byte| if *byte == 0 { gtx_data_zero } else { gtx_data_non_zero }).sum()
}

/// `10^decimals`, or an error when it does not fit in 256 bits (more than 77 decimals)
fn unit(decimals: u32) -> AccountResult<U256> {
    U256::from(10).checked_pow(decimals.into()).ok_or_else(|| {
        AccountError::InvalidIntent(format!("{decimals} decimals do not fit in 256 bits"))
    })
}

/// Parses a decimal amount ("1.5") into base units
///
/// Fractional digits beyond `decimals` are truncated.
pub fn parse_amount(amount: &str, decimals: u32) -> AccountResult<U256> {
    let invalid =
        |reason: &str| AccountError::InvalidIntent(format!("invalid amount {amount:?}: {reason}"));
    let unit = unit(decimals)?;
    let trimmed = amount.trim().replace('_', "");
    let (integer, fraction) = trimmed.split_once('.').unwrap_or((trimmed.as_str(), ""));
    if integer.is_empty() && fraction.is_empty() {
        return Err(invalid("no digits"));
    }
    if !integer.chars().chain(fraction.chars()).all(|c| c.is_ascii_digit()) {
        return Err(invalid("not a non-negative decimal number"));
    }

    let fraction = &fraction[..fraction.len().min(decimals as usize)];
    let parse = |digits: &str| -> AccountResult<U256> {
        if digits.is_empty() {
            Ok(U256::zero())
        } else {
            U256::from_dec_str(digits).map_err(|err| invalid(&err.to_string()))
        }
    };
    let integer = parse(integer)?;
    let fraction = parse(fraction)? * (unit / U256::from(10).pow(fraction.len().into()));

    integer
        .checked_mul(unit)
        .and_then(|integer| integer.checked_add(fraction))
        .ok_or_else(|| invalid("does not fit in 256 bits"))
}

/// Formats base units as a decimal amount with `precision` fractional digits (rounded down)
pub fn format_amount(amount: U256, decimals: u32, precision: usize) -> AccountResult<String> {
    let unit = unit(decimals)?;
    let integer = amount / unit;
    if precision == 0 {
        return Ok(integer.to_string());
    }
    let fraction = format!("{:0>width$}", (amount % unit).to_string(), width = decimals as usize);
    let mut fraction: String = fraction.chars().take(precision).collect();
    while fraction.len() < precision {
        fraction.push('0');
    }
    Ok(format!("{integer}.{fraction}"))
}

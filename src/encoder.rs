// SPDX-License-Identifier: MIT
//
// Copyright (C) 2026 TradeLayer

//! TradeLayer payload encoder.
//!
//! Deterministic base-36 string formatter for the overlay protocol's
//! OP_RETURN payloads. Purely mechanical: every encoder maps a validated,
//! tagged request to a `tl`-prefixed string. The transaction builder treats
//! the result as opaque bytes.

use rust_decimal::prelude::ToPrimitive;
use rust_decimal::{Decimal, RoundingStrategy};
use serde::Deserialize;

use crate::builder::utxo::COIN;
use crate::error::RelayError;

/// Payload marker shared by all transaction families.
const MARKER: &str = "tl";

/// Addresses longer than this are replaced by a `ref:<n>` back-reference.
const MAX_LITERAL_ADDRESS_LEN: usize = 42;

/// Fraction digits emitted for non-integer base-36 amounts.
const MAX_FRACTION_DIGITS: usize = 10;

const ALPHABET: &[u8; 36] = b"0123456789abcdefghijklmnopqrstuvwxyz";

/// One value or a list of values. Several encoders accept both.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum OneOrMany<T> {
    One(T),
    Many(Vec<T>),
}

/// A property id: numeric, or a synthetic `s-<collateral>-<contract>` pair.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum PropertyId {
    Number(u64),
    Synthetic(String),
}

/// Tagged encoder request, validated at the boundary.
#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase", rename_all_fields = "camelCase")]
pub enum PayloadRequest {
    ActivateTradeLayer {
        tx_type_to_activate: OneOrMany<String>,
        code_hash: String,
    },
    TokenIssue {
        initial_amount: Decimal,
        ticker: String,
        whitelists: Vec<u64>,
        managed: bool,
        backup_address: String,
        nft: bool,
    },
    Send {
        is_colored_output: bool,
        #[serde(default)]
        send_all: Option<bool>,
        #[serde(default)]
        property_id: Option<OneOrMany<PropertyId>>,
        #[serde(default)]
        amount: Option<OneOrMany<Decimal>>,
        #[serde(default)]
        address: Option<String>,
    },
    #[serde(rename = "tradeTokenForUTXO")]
    TradeTokenForUtxo {
        property_id: u64,
        amount: Decimal,
        column_a: String,
        sats_expected: Decimal,
        token_output: String,
        pay_to_address: String,
        is_colored_output: bool,
    },
    Commit {
        property_id: u64,
        amount: Decimal,
        channel_address: String,
        pay_enabled: bool,
        #[serde(default)]
        clear_lists: Option<Vec<u64>>,
        is_colored_output: bool,
        #[serde(default, rename = "ref")]
        reference: Option<u64>,
    },
    Transfer {
        property_id: u64,
        amount: Decimal,
        is_column_a: bool,
        destination_addr: String,
        #[serde(default, rename = "ref")]
        reference: Option<u64>,
    },
    Attestation {
        revoke: u64,
        id: u64,
        target_address: String,
        meta_data: String,
    },
}

/// Encode a request into its payload string.
pub fn encode(request: &PayloadRequest) -> Result<String, RelayError> {
    match request {
        PayloadRequest::ActivateTradeLayer {
            tx_type_to_activate,
            code_hash,
        } => encode_activate(tx_type_to_activate, code_hash),
        PayloadRequest::TokenIssue {
            initial_amount,
            ticker,
            whitelists,
            managed,
            backup_address,
            nft,
        } => encode_token_issue(initial_amount, ticker, whitelists, *managed, backup_address, *nft),
        PayloadRequest::Send {
            is_colored_output,
            send_all,
            property_id,
            amount,
            address,
        } => encode_send(
            *is_colored_output,
            *send_all,
            property_id.as_ref(),
            amount.as_ref(),
            address.as_deref(),
        ),
        PayloadRequest::TradeTokenForUtxo {
            property_id,
            amount,
            column_a,
            sats_expected,
            token_output,
            pay_to_address,
            is_colored_output,
        } => {
            let payload = [
                base36(*property_id as u128),
                scaled_base36(*amount)?,
                column_a.clone(),
                scaled_base36(*sats_expected)?,
                token_output.clone(),
                pay_to_address.clone(),
                flag(*is_colored_output),
            ];
            Ok(format!("{MARKER}3{}", payload.join(",")))
        }
        PayloadRequest::Commit {
            property_id,
            amount,
            channel_address,
            pay_enabled,
            clear_lists,
            is_colored_output,
            reference,
        } => {
            let clear = match clear_lists {
                Some(list) => format!(
                    "[{}]",
                    list.iter()
                        .map(|n| base36(*n as u128))
                        .collect::<Vec<_>>()
                        .join(",")
                ),
                None => String::new(),
            };
            let payload = [
                base36(*property_id as u128),
                scaled_base36(*amount)?,
                address_or_ref(channel_address, *reference),
                flag(*pay_enabled),
                clear,
                flag(*is_colored_output),
            ];
            Ok(format!("{MARKER}4{}", payload.join(",")))
        }
        PayloadRequest::Transfer {
            property_id,
            amount,
            is_column_a,
            destination_addr,
            reference,
        } => {
            let payload = [
                base36(*property_id as u128),
                scaled_base36(*amount)?,
                flag(*is_column_a),
                address_or_ref(destination_addr, *reference),
            ];
            Ok(format!("{MARKER}22{}", payload.join(",")))
        }
        PayloadRequest::Attestation {
            revoke,
            id,
            target_address,
            meta_data,
        } => {
            let payload = [
                base36(*revoke as u128),
                base36(*id as u128),
                target_address.clone(),
                meta_data.clone(),
            ];
            Ok(format!("{MARKER}9{}", payload.join(",")))
        }
    }
}

fn encode_activate(
    tx_types: &OneOrMany<String>,
    code_hash: &str,
) -> Result<String, RelayError> {
    let encoded_types = match tx_types {
        OneOrMany::One(value) => value.clone(),
        OneOrMany::Many(values) => values.join(";"),
    };
    let hash36 = hex_to_base36(code_hash)?;
    Ok(format!("{MARKER}0{encoded_types},{hash36}"))
}

fn encode_token_issue(
    initial_amount: &Decimal,
    ticker: &str,
    whitelists: &[u64],
    managed: bool,
    backup_address: &str,
    nft: bool,
) -> Result<String, RelayError> {
    let payload = [
        decimal_base36(*initial_amount)?,
        ticker.to_string(),
        whitelists
            .iter()
            .map(|n| base36(*n as u128))
            .collect::<Vec<_>>()
            .join(","),
        flag(managed),
        backup_address.to_string(),
        flag(nft),
    ];
    Ok(format!("{MARKER}1{}", payload.join(",")))
}

fn encode_send(
    is_colored: bool,
    send_all: Option<bool>,
    property_id: Option<&OneOrMany<PropertyId>>,
    amount: Option<&OneOrMany<Decimal>>,
    address: Option<&str>,
) -> Result<String, RelayError> {
    let colored = flag(is_colored);

    let payload = if send_all == Some(true) {
        let address = address
            .ok_or_else(|| RelayError::MalformedPayload("sendAll requires an address".into()))?;
        vec!["1".to_string(), address.to_string(), colored]
    } else {
        match (property_id, amount) {
            (Some(OneOrMany::Many(ids)), Some(OneOrMany::Many(amounts))) => {
                if ids.len() != amounts.len() {
                    return Err(RelayError::MalformedPayload(
                        "multi-send needs one amount per property id".into(),
                    ));
                }
                let encoded_ids = ids
                    .iter()
                    .map(encode_property_id)
                    .collect::<Result<Vec<_>, _>>()?
                    .join(",");
                let encoded_amounts = amounts
                    .iter()
                    .map(|a| decimal_base36(*a))
                    .collect::<Result<Vec<_>, _>>()?
                    .join(",");
                // address is omitted for multi-send
                vec![
                    "0".to_string(),
                    String::new(),
                    encoded_ids,
                    encoded_amounts,
                    colored,
                ]
            }
            (Some(OneOrMany::One(id)), Some(OneOrMany::One(amount))) => {
                let address = address.ok_or_else(|| {
                    RelayError::MalformedPayload("send requires an address".into())
                })?;
                vec![
                    "0".to_string(),
                    address.to_string(),
                    encode_property_id(id)?,
                    decimal_base36(*amount)?,
                    colored,
                ]
            }
            _ => {
                return Err(RelayError::MalformedPayload(
                    "send requires propertyId and amount, matched in shape".into(),
                ))
            }
        }
    };

    Ok(format!("{MARKER}2{}", payload.join(";")))
}

/// Encode a property id; synthetic `s-<collateral>-<contract>` ids encode
/// each component.
pub fn encode_property_id(id: &PropertyId) -> Result<String, RelayError> {
    match id {
        PropertyId::Number(n) => Ok(base36(*n as u128)),
        PropertyId::Synthetic(raw) => {
            let parts: Vec<&str> = raw.split('-').collect();
            if parts.len() != 3 || parts[0] != "s" {
                return Err(RelayError::MalformedPayload(format!(
                    "synthetic property id {raw} must look like s-<collateral>-<contract>"
                )));
            }
            let collateral: u64 = parts[1].parse().map_err(|_| {
                RelayError::MalformedPayload(format!("bad collateral id in {raw}"))
            })?;
            let contract: u64 = parts[2].parse().map_err(|_| {
                RelayError::MalformedPayload(format!("bad contract id in {raw}"))
            })?;
            Ok(format!(
                "s-{}-{}",
                base36(collateral as u128),
                base36(contract as u128)
            ))
        }
    }
}

fn flag(value: bool) -> String {
    if value { "1" } else { "0" }.to_string()
}

fn address_or_ref(address: &str, reference: Option<u64>) -> String {
    if address.len() > MAX_LITERAL_ADDRESS_LEN {
        format!("ref:{}", reference.unwrap_or(0))
    } else {
        address.to_string()
    }
}

/// Base-36 digits of an unsigned integer, lowercase.
fn base36(mut value: u128) -> String {
    if value == 0 {
        return "0".to_string();
    }
    let mut digits = Vec::new();
    while value > 0 {
        digits.push(ALPHABET[(value % 36) as usize]);
        value /= 36;
    }
    digits.reverse();
    String::from_utf8(digits).expect("alphabet is ascii")
}

/// Base-36 of a coin-unit amount scaled to satoshis.
fn scaled_base36(amount: Decimal) -> Result<String, RelayError> {
    let sats = (amount * COIN).round_dp_with_strategy(0, RoundingStrategy::MidpointAwayFromZero);
    let value = sats
        .to_u128()
        .ok_or_else(|| RelayError::MalformedPayload(format!("amount out of range: {amount}")))?;
    Ok(base36(value))
}

/// Base-36 of an unscaled decimal, with a fractional part when present.
fn decimal_base36(value: Decimal) -> Result<String, RelayError> {
    if value.is_sign_negative() {
        return Err(RelayError::MalformedPayload(format!(
            "negative amount: {value}"
        )));
    }
    let integer = value
        .trunc()
        .to_u128()
        .ok_or_else(|| RelayError::MalformedPayload(format!("amount out of range: {value}")))?;
    let mut out = base36(integer);

    let mut fraction = value.fract();
    if !fraction.is_zero() {
        let mut digits = Vec::with_capacity(MAX_FRACTION_DIGITS);
        for _ in 0..MAX_FRACTION_DIGITS {
            if fraction.is_zero() {
                break;
            }
            fraction *= Decimal::from(36u32);
            let digit = fraction.trunc().to_u128().unwrap_or(0) as usize;
            digits.push(ALPHABET[digit.min(35)]);
            fraction = fraction.fract();
        }
        while digits.last() == Some(&b'0') {
            digits.pop();
        }
        if !digits.is_empty() {
            out.push('.');
            out.push_str(&String::from_utf8(digits).expect("alphabet is ascii"));
        }
    }
    Ok(out)
}

/// Base-36 of an arbitrary-length hex string (code hashes exceed u128).
fn hex_to_base36(hex_str: &str) -> Result<String, RelayError> {
    let cleaned = hex_str.trim_start_matches("0x");
    let padded = if cleaned.len() % 2 == 1 {
        format!("0{cleaned}")
    } else {
        cleaned.to_string()
    };
    let mut bytes = hex::decode(&padded)
        .map_err(|e| RelayError::MalformedPayload(format!("code hash: {e}")))?;

    // Repeated division of the big-endian byte string by 36.
    let mut out = Vec::new();
    while bytes.iter().any(|&b| b != 0) {
        let mut remainder: u32 = 0;
        for byte in bytes.iter_mut() {
            let acc = (remainder << 8) | u32::from(*byte);
            *byte = (acc / 36) as u8;
            remainder = acc % 36;
        }
        out.push(ALPHABET[remainder as usize]);
    }
    if out.is_empty() {
        out.push(b'0');
    }
    out.reverse();
    Ok(String::from_utf8(out).expect("alphabet is ascii"))
}

// SPDX-License-Identifier: MIT
//
// Copyright (C) 2026 TradeLayer

//! Litecoin-family network parameters and address/script conversion.
//!
//! Named constant sets carrying the base58 version bytes, bech32 HRP and
//! extended-key version bytes for mainnet (`LTC`) and testnet (`LTCTEST`).
//! These are consumed only by the script/PSBT layer — coin selection never
//! looks at them.

use bech32::{segwit, Fe32, Hrp};
use bitcoin::hashes::{sha256, Hash};
use bitcoin::script::Script;
use bitcoin::{PubkeyHash, ScriptBuf, ScriptHash, WPubkeyHash, WScriptHash};

use crate::error::RelayError;

/// Version bytes and prefixes for one network.
#[derive(Debug, Clone, Copy)]
pub struct NetworkParams {
    /// Network name as used on the wire ("LTC", "LTCTEST").
    pub name: &'static str,
    /// Base58 version byte for pay-to-pubkey-hash addresses.
    pub p2pkh_prefix: u8,
    /// Base58 version byte for pay-to-script-hash addresses.
    pub p2sh_prefix: u8,
    /// Deprecated P2SH version byte still accepted on decode.
    pub p2sh_prefix_legacy: Option<u8>,
    /// Human-readable part for segwit addresses.
    pub bech32_hrp: &'static str,
    /// BIP32 extended public key version bytes.
    pub xpub_version: u32,
    /// BIP32 extended private key version bytes.
    pub xprv_version: u32,
}

/// Litecoin mainnet.
pub const LTC: NetworkParams = NetworkParams {
    name: "LTC",
    p2pkh_prefix: 0x30,
    p2sh_prefix: 0x32,
    p2sh_prefix_legacy: Some(0x05),
    bech32_hrp: "ltc",
    xpub_version: 0x019D_A462,
    xprv_version: 0x019D_9CFE,
};

/// Litecoin testnet.
pub const LTCTEST: NetworkParams = NetworkParams {
    name: "LTCTEST",
    p2pkh_prefix: 0x6F,
    p2sh_prefix: 0x3A,
    p2sh_prefix_legacy: Some(0xC4),
    bech32_hrp: "tltc",
    xpub_version: 0x0436_F6E1,
    xprv_version: 0x0436_EF7D,
};

/// Resolve a network by its wire name. Case-insensitive.
pub fn params_for(name: &str) -> Result<&'static NetworkParams, RelayError> {
    match name.to_ascii_uppercase().as_str() {
        "LTC" => Ok(&LTC),
        "LTCTEST" => Ok(&LTCTEST),
        other => Err(RelayError::InvalidAddress(format!(
            "unknown network: {other}"
        ))),
    }
}

/// Decode an address into its output script.
///
/// Accepts bech32 v0 (p2wpkh/p2wsh) under the network HRP and base58check
/// p2pkh/p2sh under the network version bytes. Anything else is an
/// [`RelayError::InvalidAddress`].
pub fn script_for_address(address: &str, net: &NetworkParams) -> Result<ScriptBuf, RelayError> {
    let lowered = address.to_ascii_lowercase();
    if lowered.starts_with(&format!("{}1", net.bech32_hrp)) {
        return script_for_segwit(address, net);
    }
    script_for_base58(address, net)
}

fn script_for_segwit(address: &str, net: &NetworkParams) -> Result<ScriptBuf, RelayError> {
    let (hrp, version, program) = segwit::decode(address)
        .map_err(|e| RelayError::InvalidAddress(format!("{address}: {e}")))?;
    if hrp.to_string().to_lowercase() != net.bech32_hrp {
        return Err(RelayError::InvalidAddress(format!(
            "{address}: wrong HRP for {}",
            net.name
        )));
    }
    if version != Fe32::Q {
        return Err(RelayError::InvalidAddress(format!(
            "{address}: unsupported witness version {}",
            version.to_u8()
        )));
    }
    match program.len() {
        20 => {
            let bytes: [u8; 20] = program.try_into().expect("length checked");
            Ok(ScriptBuf::new_p2wpkh(&WPubkeyHash::from_byte_array(bytes)))
        }
        32 => {
            let bytes: [u8; 32] = program.try_into().expect("length checked");
            Ok(ScriptBuf::new_p2wsh(&WScriptHash::from_byte_array(bytes)))
        }
        n => Err(RelayError::InvalidAddress(format!(
            "{address}: invalid witness program length {n}"
        ))),
    }
}

fn script_for_base58(address: &str, net: &NetworkParams) -> Result<ScriptBuf, RelayError> {
    let decoded = bitcoin::base58::decode_check(address)
        .map_err(|e| RelayError::InvalidAddress(format!("{address}: {e}")))?;
    if decoded.len() != 21 {
        return Err(RelayError::InvalidAddress(format!(
            "{address}: invalid payload length {}",
            decoded.len()
        )));
    }
    let version = decoded[0];
    let hash: [u8; 20] = decoded[1..].try_into().expect("length checked");

    if version == net.p2pkh_prefix {
        Ok(ScriptBuf::new_p2pkh(&PubkeyHash::from_byte_array(hash)))
    } else if version == net.p2sh_prefix || net.p2sh_prefix_legacy == Some(version) {
        Ok(ScriptBuf::new_p2sh(&ScriptHash::from_byte_array(hash)))
    } else {
        Err(RelayError::InvalidAddress(format!(
            "{address}: version byte {version:#04x} not valid for {}",
            net.name
        )))
    }
}

/// Encode a witness script into its p2wsh address under the network HRP.
pub fn p2wsh_address(script: &Script, net: &NetworkParams) -> Result<String, RelayError> {
    let hrp = Hrp::parse(net.bech32_hrp)
        .map_err(|e| RelayError::InvalidAddress(format!("bad HRP {}: {e}", net.bech32_hrp)))?;
    let program = sha256::Hash::hash(script.as_bytes());
    segwit::encode(hrp, Fe32::Q, program.as_byte_array())
        .map_err(|e| RelayError::InvalidAddress(format!("bech32 encode: {e}")))
}

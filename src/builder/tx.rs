// SPDX-License-Identifier: MIT
//
// Copyright (C) 2026 TradeLayer

//! Unsigned raw-transaction construction.
//!
//! Turns selected inputs and computed outputs into consensus-serialized
//! hex. Script and serialization work is delegated to the `bitcoin` crate;
//! this layer only decides output order and embeds the OP_RETURN payload.
//! Signing never happens here.

use bitcoin::absolute::LockTime;
use bitcoin::opcodes::all::OP_RETURN;
use bitcoin::script::PushBytesBuf;
use bitcoin::transaction::Version;
use bitcoin::{
    Amount, OutPoint, ScriptBuf, Sequence, Transaction, TxIn, TxOut, Txid, Witness,
};
use rust_decimal::Decimal;

use super::utxo::{to_sats, UnspentOutput};
use crate::error::RelayError;
use crate::networks::{script_for_address, NetworkParams};

/// Standard-policy ceiling for null-data payloads.
const MAX_OP_RETURN_BYTES: usize = 80;

/// Destination legs of a transaction, in emission order. Amounts are coin
/// units and must be positive.
pub type OutputLeg = (String, Decimal);

/// Build the unsigned transaction and return its consensus hex.
///
/// Emits one output per leg, then a zero-value OP_RETURN output when a
/// payload is present. Inputs keep the selection order.
pub fn build_raw_transaction(
    inputs: &[UnspentOutput],
    legs: &[OutputLeg],
    payload: Option<&str>,
    net: &NetworkParams,
) -> Result<String, RelayError> {
    if inputs.is_empty() {
        return Err(RelayError::Assembly("no inputs selected".into()));
    }
    if legs.is_empty() && payload.is_none() {
        return Err(RelayError::Assembly("no outputs to emit".into()));
    }

    let mut tx_inputs = Vec::with_capacity(inputs.len());
    for input in inputs {
        let txid: Txid = input
            .txid
            .parse()
            .map_err(|e| RelayError::Assembly(format!("txid {}: {e}", input.txid)))?;
        tx_inputs.push(TxIn {
            previous_output: OutPoint::new(txid, input.vout),
            script_sig: ScriptBuf::new(),
            sequence: Sequence::MAX,
            witness: Witness::new(),
        });
    }

    let mut tx_outputs = Vec::with_capacity(legs.len() + 1);
    for (address, amount) in legs {
        if *amount <= Decimal::ZERO {
            return Err(RelayError::Assembly(format!(
                "non-positive output amount {amount} for {address}"
            )));
        }
        tx_outputs.push(TxOut {
            value: Amount::from_sat(to_sats(*amount)?),
            script_pubkey: script_for_address(address, net)?,
        });
    }

    if let Some(payload) = payload {
        tx_outputs.push(TxOut {
            value: Amount::from_sat(0),
            script_pubkey: op_return_script(payload)?,
        });
    }

    let tx = Transaction {
        version: Version::TWO,
        lock_time: LockTime::ZERO,
        input: tx_inputs,
        output: tx_outputs,
    };

    Ok(bitcoin::consensus::encode::serialize_hex(&tx))
}

/// Null-data script carrying the payload bytes.
fn op_return_script(payload: &str) -> Result<ScriptBuf, RelayError> {
    if payload.is_empty() {
        return Err(RelayError::MalformedPayload("empty payload".into()));
    }
    let bytes = payload.as_bytes().to_vec();
    if bytes.len() > MAX_OP_RETURN_BYTES {
        return Err(RelayError::MalformedPayload(format!(
            "payload exceeds {MAX_OP_RETURN_BYTES} bytes"
        )));
    }

    let data = PushBytesBuf::try_from(bytes)
        .map_err(|e| RelayError::MalformedPayload(format!("payload: {e}")))?;
    let mut script = ScriptBuf::new();
    script.push_opcode(OP_RETURN);
    script.push_slice(data);
    Ok(script)
}

/// Decode consensus hex back into a transaction.
pub fn parse_raw_transaction(raw_hex: &str) -> Result<Transaction, RelayError> {
    let bytes =
        hex::decode(raw_hex).map_err(|e| RelayError::Assembly(format!("raw tx hex: {e}")))?;
    bitcoin::consensus::encode::deserialize(&bytes)
        .map_err(|e| RelayError::Assembly(format!("raw tx: {e}")))
}

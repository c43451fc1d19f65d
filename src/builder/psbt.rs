// SPDX-License-Identifier: MIT
//
// Copyright (C) 2026 TradeLayer

//! PSBT assembly, multisig derivation and finalization.
//!
//! The assembled container embeds everything a signer needs to compute
//! sighashes offline: previous output script and value per input, plus the
//! witness script for script-path spends. Outputs are copied from the raw
//! transaction unchanged.

use bitcoin::psbt::Psbt;
use bitcoin::script::{Instruction, PushBytesBuf, Script};
use bitcoin::{Amount, ScriptBuf, TxOut, Witness};
use serde::Serialize;
use utoipa::ToSchema;

use super::tx::parse_raw_transaction;
use super::utxo::{to_sats, UnspentOutput};
use crate::error::RelayError;
use crate::networks::{p2wsh_address, NetworkParams};

/// CHECKMULTISIG accepts at most 16 keys through OP_PUSHNUM encoding.
const MAX_MULTISIG_KEYS: usize = 16;

/// Result of a multisig derivation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct MultisigSpec {
    /// P2WSH address under the network's HRP.
    pub address: String,
    /// Hex-encoded witness script (`OP_m <keys> OP_n OP_CHECKMULTISIG`).
    pub redeem_script: String,
}

/// Wrap a raw transaction into a PSBT, attaching per-input metadata from
/// the selected UTXOs. Returns the PSBT as hex.
pub fn assemble(
    raw_hex: &str,
    inputs: &[UnspentOutput],
    _net: &NetworkParams,
) -> Result<String, RelayError> {
    let tx = parse_raw_transaction(raw_hex)?;
    let mut psbt =
        Psbt::from_unsigned_tx(tx).map_err(|e| RelayError::Assembly(format!("psbt: {e}")))?;

    let outpoints: Vec<_> = psbt
        .unsigned_tx
        .input
        .iter()
        .map(|i| i.previous_output)
        .collect();

    for (index, outpoint) in outpoints.iter().enumerate() {
        let meta = inputs
            .iter()
            .find(|u| {
                u.vout == outpoint.vout && u.txid == outpoint.txid.to_string()
            })
            .ok_or_else(|| {
                RelayError::Assembly(format!("no metadata for input {outpoint}"))
            })?;

        let script = hex::decode(&meta.script_pub_key)
            .map_err(|e| RelayError::Assembly(format!("input {index} script: {e}")))?;
        psbt.inputs[index].witness_utxo = Some(TxOut {
            value: Amount::from_sat(to_sats(meta.amount)?),
            script_pubkey: ScriptBuf::from_bytes(script),
        });

        if let Some(redeem) = &meta.redeem_script {
            let witness_script = hex::decode(redeem)
                .map_err(|e| RelayError::Assembly(format!("input {index} redeem: {e}")))?;
            psbt.inputs[index].witness_script = Some(ScriptBuf::from_bytes(witness_script));
        }
    }

    Ok(hex::encode(psbt.serialize()))
}

/// Decode a PSBT from hex or base64.
pub fn parse_psbt(encoded: &str) -> Result<Psbt, RelayError> {
    let trimmed = encoded.trim();
    let bytes = if trimmed.len() % 2 == 0 && trimmed.chars().all(|c| c.is_ascii_hexdigit()) {
        hex::decode(trimmed).map_err(|e| RelayError::MalformedPayload(format!("psbt hex: {e}")))?
    } else {
        use base64::{engine::general_purpose::STANDARD, Engine};
        STANDARD
            .decode(trimmed)
            .map_err(|e| RelayError::MalformedPayload(format!("psbt base64: {e}")))?
    };
    Psbt::deserialize(&bytes).map_err(|e| RelayError::MalformedPayload(format!("psbt: {e}")))
}

/// Derive the m-of-n CHECKMULTISIG witness script and its P2WSH address.
///
/// Pure and idempotent: identical inputs yield an identical address and
/// script. Key order is preserved as given.
pub fn compute_multisig(
    threshold: usize,
    pubkeys: &[String],
    net: &NetworkParams,
) -> Result<MultisigSpec, RelayError> {
    if threshold < 1 {
        return Err(RelayError::InvalidMultisigParams(
            "threshold must be at least 1".into(),
        ));
    }
    if pubkeys.len() < threshold {
        return Err(RelayError::InvalidMultisigParams(format!(
            "{} keys cannot satisfy a threshold of {threshold}",
            pubkeys.len()
        )));
    }
    if pubkeys.len() > MAX_MULTISIG_KEYS {
        return Err(RelayError::InvalidMultisigParams(format!(
            "at most {MAX_MULTISIG_KEYS} keys supported"
        )));
    }

    let mut builder = bitcoin::script::Builder::new().push_int(threshold as i64);
    for (index, key) in pubkeys.iter().enumerate() {
        let bytes = hex::decode(key).map_err(|e| {
            RelayError::InvalidMultisigParams(format!("pubkey {index}: {e}"))
        })?;
        if bytes.len() != 33 || !(bytes[0] == 0x02 || bytes[0] == 0x03) {
            return Err(RelayError::InvalidMultisigParams(format!(
                "pubkey {index}: expected 33-byte compressed key"
            )));
        }
        let push = PushBytesBuf::try_from(bytes).expect("33 bytes fit a push");
        builder = builder.push_slice(push);
    }
    let script = builder
        .push_int(pubkeys.len() as i64)
        .push_opcode(bitcoin::opcodes::all::OP_CHECKMULTISIG)
        .into_script();

    Ok(MultisigSpec {
        address: p2wsh_address(&script, net)?,
        redeem_script: hex::encode(script.as_bytes()),
    })
}

/// Apply available signature data and extract the fully signed transaction.
///
/// Handles inputs already carrying final script data, single-sig p2wpkh
/// inputs, and p2wsh multisig inputs whose witness script is embedded.
/// Fails with [`RelayError::Finalization`] when any input lacks enough
/// signature data.
pub fn finalize(psbt_encoded: &str, _net: &NetworkParams) -> Result<String, RelayError> {
    let mut psbt = parse_psbt(psbt_encoded)?;

    for index in 0..psbt.inputs.len() {
        let input = &psbt.inputs[index];
        if input.final_script_witness.is_some() || input.final_script_sig.is_some() {
            continue;
        }

        let witness = if let Some(witness_script) = input.witness_script.clone() {
            finalize_multisig(index, input, &witness_script)?
        } else {
            finalize_single_sig(index, input)?
        };

        let input = &mut psbt.inputs[index];
        input.final_script_witness = Some(witness);
        input.partial_sigs.clear();
        input.witness_script = None;
        input.redeem_script = None;
        input.bip32_derivation.clear();
    }

    let tx = psbt
        .extract_tx()
        .map_err(|e| RelayError::Finalization(format!("extract: {e}")))?;
    Ok(bitcoin::consensus::encode::serialize_hex(&tx))
}

/// `<sig> <pubkey>` witness for a p2wpkh input.
fn finalize_single_sig(
    index: usize,
    input: &bitcoin::psbt::Input,
) -> Result<Witness, RelayError> {
    let (pubkey, signature) = input.partial_sigs.iter().next().ok_or_else(|| {
        RelayError::Finalization(format!("input {index}: no signature data"))
    })?;

    let mut witness = Witness::new();
    witness.push(signature.serialize().to_vec());
    witness.push(pubkey.to_bytes());
    Ok(witness)
}

/// `<empty> <sig...> <script>` witness for a p2wsh CHECKMULTISIG input,
/// with signatures ordered by key position in the witness script.
fn finalize_multisig(
    index: usize,
    input: &bitcoin::psbt::Input,
    witness_script: &Script,
) -> Result<Witness, RelayError> {
    let threshold = multisig_threshold(witness_script).ok_or_else(|| {
        RelayError::Finalization(format!("input {index}: witness script is not multisig"))
    })?;

    let mut signatures = Vec::new();
    for key in script_pubkeys(witness_script) {
        if let Some((_, signature)) = input
            .partial_sigs
            .iter()
            .find(|(pubkey, _)| pubkey.to_bytes() == key)
        {
            signatures.push(signature.serialize().to_vec());
        }
    }
    if signatures.len() < threshold {
        return Err(RelayError::Finalization(format!(
            "input {index}: {}/{threshold} signatures",
            signatures.len()
        )));
    }

    let mut witness = Witness::new();
    witness.push([]);
    for signature in signatures.iter().take(threshold) {
        witness.push(signature);
    }
    witness.push(witness_script.as_bytes());
    Ok(witness)
}

/// Threshold encoded by the leading OP_PUSHNUM of a CHECKMULTISIG script.
fn multisig_threshold(script: &Script) -> Option<usize> {
    match script.as_bytes().first() {
        Some(&op) if (0x51..=0x60).contains(&op) => Some((op - 0x50) as usize),
        _ => None,
    }
}

/// Public keys pushed by a script, in order.
fn script_pubkeys(script: &Script) -> Vec<Vec<u8>> {
    script
        .instructions()
        .filter_map(|inst| match inst {
            Ok(Instruction::PushBytes(push)) if push.len() == 33 || push.len() == 65 => {
                Some(push.as_bytes().to_vec())
            }
            _ => None,
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::builder::tx::build_raw_transaction;
    use crate::networks::LTCTEST;
    use bitcoin::secp256k1::{Message, Secp256k1, SecretKey};
    use rust_decimal_macros::dec;

    fn pubkey_hex(secret: u8) -> String {
        let secp = Secp256k1::new();
        let sk = SecretKey::from_slice(&[secret; 32]).unwrap();
        let pk = bitcoin::secp256k1::PublicKey::from_secret_key(&secp, &sk);
        hex::encode(pk.serialize())
    }

    fn signature_for(secret: u8) -> bitcoin::ecdsa::Signature {
        let secp = Secp256k1::new();
        let sk = SecretKey::from_slice(&[secret; 32]).unwrap();
        let msg = Message::from_digest([0x42; 32]);
        bitcoin::ecdsa::Signature::sighash_all(secp.sign_ecdsa(&msg, &sk))
    }

    fn sample_inputs() -> Vec<UnspentOutput> {
        vec![
            UnspentOutput {
                txid: "7967a5185e907a25225574544c31f7b059c1a191d65b53dcc1554d339c4f9efc"
                    .into(),
                vout: 0,
                amount: dec!(0.5),
                confirmations: 2,
                script_pub_key: "0014".to_string() + &"11".repeat(20),
                redeem_script: None,
                pubkey: None,
            },
            UnspentOutput {
                txid: "9dcbf5a86b4e70be97fc5c953ad4111dfe0a94ea6768286e5efd6c35fd9ec9d1"
                    .into(),
                vout: 1,
                amount: dec!(0.3),
                confirmations: 5,
                script_pub_key: "0014".to_string() + &"22".repeat(20),
                redeem_script: None,
                pubkey: None,
            },
        ]
    }

    fn sample_raw_tx(inputs: &[UnspentOutput]) -> String {
        let addr = crate::networks::p2wsh_address(
            &ScriptBuf::from_bytes(vec![0x51]),
            &LTCTEST,
        )
        .unwrap();
        build_raw_transaction(
            inputs,
            &[(addr.clone(), dec!(0.6)), (addr, dec!(0.19996))],
            Some("tl20,test"),
            &LTCTEST,
        )
        .unwrap()
    }

    #[test]
    fn assemble_embeds_witness_utxo_per_input() {
        let inputs = sample_inputs();
        let raw = sample_raw_tx(&inputs);
        let encoded = assemble(&raw, &inputs, &LTCTEST).unwrap();

        let psbt = parse_psbt(&encoded).unwrap();
        assert_eq!(psbt.inputs.len(), 2);
        for (psbt_input, meta) in psbt.inputs.iter().zip(&inputs) {
            let utxo = psbt_input.witness_utxo.as_ref().unwrap();
            assert_eq!(utxo.value, Amount::from_sat(to_sats(meta.amount).unwrap()));
            assert_eq!(hex::encode(utxo.script_pubkey.as_bytes()), meta.script_pub_key);
        }
        // outputs copied unchanged, OP_RETURN included
        assert_eq!(psbt.unsigned_tx.output.len(), 3);
    }

    #[test]
    fn assemble_attaches_witness_script_for_multisig_inputs() {
        let mut inputs = sample_inputs();
        let spec =
            compute_multisig(2, &[pubkey_hex(1), pubkey_hex(2), pubkey_hex(3)], &LTCTEST)
                .unwrap();
        inputs[0].redeem_script = Some(spec.redeem_script.clone());

        let raw = sample_raw_tx(&inputs);
        let psbt = parse_psbt(&assemble(&raw, &inputs, &LTCTEST).unwrap()).unwrap();
        let script = psbt.inputs[0].witness_script.as_ref().unwrap();
        assert_eq!(hex::encode(script.as_bytes()), spec.redeem_script);
        assert!(psbt.inputs[1].witness_script.is_none());
    }

    #[test]
    fn assemble_fails_without_input_metadata() {
        let inputs = sample_inputs();
        let raw = sample_raw_tx(&inputs);
        assert!(matches!(
            assemble(&raw, &inputs[..1], &LTCTEST),
            Err(RelayError::Assembly(_))
        ));
    }

    #[test]
    fn psbt_parses_from_hex_and_base64() {
        use base64::{engine::general_purpose::STANDARD, Engine};

        let inputs = sample_inputs();
        let encoded = assemble(&sample_raw_tx(&inputs), &inputs, &LTCTEST).unwrap();
        let psbt = parse_psbt(&encoded).unwrap();

        let b64 = STANDARD.encode(psbt.serialize());
        let reparsed = parse_psbt(&b64).unwrap();
        assert_eq!(psbt.serialize(), reparsed.serialize());
    }

    #[test]
    fn multisig_derivation_is_idempotent() {
        let keys = vec![pubkey_hex(1), pubkey_hex(2), pubkey_hex(3)];
        let a = compute_multisig(2, &keys, &LTCTEST).unwrap();
        let b = compute_multisig(2, &keys, &LTCTEST).unwrap();
        assert_eq!(a, b);
        assert!(a.address.starts_with("tltc1"));
        // OP_2 ... OP_3 OP_CHECKMULTISIG
        let script = hex::decode(&a.redeem_script).unwrap();
        assert_eq!(script[0], 0x52);
        assert_eq!(script[script.len() - 2], 0x53);
        assert_eq!(script[script.len() - 1], 0xae);
    }

    #[test]
    fn multisig_rejects_bad_parameters() {
        let keys = vec![pubkey_hex(1), pubkey_hex(2)];
        assert!(matches!(
            compute_multisig(0, &keys, &LTCTEST),
            Err(RelayError::InvalidMultisigParams(_))
        ));
        assert!(matches!(
            compute_multisig(3, &keys, &LTCTEST),
            Err(RelayError::InvalidMultisigParams(_))
        ));
        assert!(matches!(
            compute_multisig(1, &["zz".into()], &LTCTEST),
            Err(RelayError::InvalidMultisigParams(_))
        ));
    }

    #[test]
    fn finalize_passes_through_already_final_inputs() {
        // Round trip: build -> assemble -> (signer finalizes) -> finalize.
        // Inputs/outputs of the extracted tx match the built tx exactly.
        let inputs = sample_inputs();
        let raw = sample_raw_tx(&inputs);
        let mut psbt = parse_psbt(&assemble(&raw, &inputs, &LTCTEST).unwrap()).unwrap();

        for input in &mut psbt.inputs {
            let mut witness = Witness::new();
            witness.push(signature_for(7).serialize().to_vec());
            witness.push(hex::decode(pubkey_hex(7)).unwrap());
            input.final_script_witness = Some(witness);
        }

        let final_hex = finalize(&hex::encode(psbt.serialize()), &LTCTEST).unwrap();
        let final_tx = crate::builder::tx::parse_raw_transaction(&final_hex).unwrap();
        let original = crate::builder::tx::parse_raw_transaction(&raw).unwrap();

        assert_eq!(final_tx.output, original.output);
        let final_outpoints: Vec<_> =
            final_tx.input.iter().map(|i| i.previous_output).collect();
        let original_outpoints: Vec<_> =
            original.input.iter().map(|i| i.previous_output).collect();
        assert_eq!(final_outpoints, original_outpoints);
    }

    #[test]
    fn finalize_builds_p2wpkh_witness_from_partial_sig() {
        let inputs = sample_inputs();
        let raw = sample_raw_tx(&inputs);
        let mut psbt = parse_psbt(&assemble(&raw, &inputs, &LTCTEST).unwrap()).unwrap();

        let secp = Secp256k1::new();
        for input in &mut psbt.inputs {
            let sk = SecretKey::from_slice(&[9; 32]).unwrap();
            let pk = bitcoin::PublicKey::new(
                bitcoin::secp256k1::PublicKey::from_secret_key(&secp, &sk),
            );
            input.partial_sigs.insert(pk, signature_for(9));
        }

        let final_hex = finalize(&hex::encode(psbt.serialize()), &LTCTEST).unwrap();
        let final_tx = crate::builder::tx::parse_raw_transaction(&final_hex).unwrap();
        for txin in &final_tx.input {
            assert_eq!(txin.witness.len(), 2);
        }
    }

    #[test]
    fn finalize_orders_multisig_signatures_by_script_key_order() {
        let keys = vec![pubkey_hex(1), pubkey_hex(2), pubkey_hex(3)];
        let spec = compute_multisig(2, &keys, &LTCTEST).unwrap();

        let mut inputs = sample_inputs();
        inputs.truncate(1);
        inputs[0].redeem_script = Some(spec.redeem_script.clone());
        let addr = crate::networks::p2wsh_address(
            &ScriptBuf::from_bytes(vec![0x51]),
            &LTCTEST,
        )
        .unwrap();
        let raw = build_raw_transaction(&inputs, &[(addr, dec!(0.49))], None, &LTCTEST)
            .unwrap();
        let mut psbt = parse_psbt(&assemble(&raw, &inputs, &LTCTEST).unwrap()).unwrap();

        // Insert sigs for keys 3 and 1; witness must order them 1 then 3.
        let secp = Secp256k1::new();
        for secret in [3u8, 1u8] {
            let sk = SecretKey::from_slice(&[secret; 32]).unwrap();
            let pk = bitcoin::PublicKey::new(
                bitcoin::secp256k1::PublicKey::from_secret_key(&secp, &sk),
            );
            psbt.inputs[0].partial_sigs.insert(pk, signature_for(secret));
        }

        let final_hex = finalize(&hex::encode(psbt.serialize()), &LTCTEST).unwrap();
        let final_tx = crate::builder::tx::parse_raw_transaction(&final_hex).unwrap();
        let witness: Vec<_> = final_tx.input[0].witness.iter().collect();

        // <empty> <sig1> <sig3> <script>
        assert_eq!(witness.len(), 4);
        assert!(witness[0].is_empty());
        assert_eq!(witness[1], signature_for(1).serialize().to_vec().as_slice());
        assert_eq!(witness[2], signature_for(3).serialize().to_vec().as_slice());
        assert_eq!(hex::encode(witness[3]), spec.redeem_script);
    }

    #[test]
    fn finalize_fails_when_signatures_are_missing() {
        let inputs = sample_inputs();
        let raw = sample_raw_tx(&inputs);
        let encoded = assemble(&raw, &inputs, &LTCTEST).unwrap();

        assert!(matches!(
            finalize(&encoded, &LTCTEST),
            Err(RelayError::Finalization(_))
        ));
    }

    #[test]
    fn finalize_rejects_undersigned_multisig() {
        let keys = vec![pubkey_hex(1), pubkey_hex(2), pubkey_hex(3)];
        let spec = compute_multisig(2, &keys, &LTCTEST).unwrap();

        let mut inputs = sample_inputs();
        inputs.truncate(1);
        inputs[0].redeem_script = Some(spec.redeem_script);
        let raw = sample_raw_tx(&inputs[..1]);
        let mut psbt = parse_psbt(&assemble(&raw, &inputs, &LTCTEST).unwrap()).unwrap();

        let secp = Secp256k1::new();
        let sk = SecretKey::from_slice(&[2; 32]).unwrap();
        let pk = bitcoin::PublicKey::new(
            bitcoin::secp256k1::PublicKey::from_secret_key(&secp, &sk),
        );
        psbt.inputs[0].partial_sigs.insert(pk, signature_for(2));

        assert!(matches!(
            finalize(&hex::encode(psbt.serialize()), &LTCTEST),
            Err(RelayError::Finalization(_))
        ));
    }
}

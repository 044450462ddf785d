use bitcoin::{
    absolute::LockTime,
    consensus::encode,
    ecdsa,
    hashes::Hash,
    psbt::Psbt,
    script::PushBytesBuf,
    secp256k1::{All, Message, Secp256k1},
    sighash::{EcdsaSighashType, SighashCache},
    transaction::Version,
    Address, Amount, CompressedPublicKey, PublicKey, ScriptBuf, Sequence, Transaction, TxIn,
    TxOut, Witness,
};

use crate::{
    constants::DUST_THRESHOLD_SATS,
    error::AppError,
    host::KeyMaterial,
    types::{MemoPayload, SelectionPlan, SignedTransaction},
};

// 署名に必要な情報を一時的に保持するための構造体
struct SigningInfo {
    input_index: usize,
    sighash_message: Message,
}

/// 未署名トランザクション (PSBT) を組み立てる。
///
/// 出力の順序は固定: デポジット → メモ (任意) → おつり (任意)。
pub fn assemble(
    plan: &SelectionPlan,
    deposit_address: &Address,
    memo: &MemoPayload,
    change_address: &Address,
) -> Result<Psbt, AppError> {
    log::info!("トランザクション構築処理を開始します。");

    let mut outputs = vec![TxOut {
        value: plan.deposit_value(),
        script_pubkey: deposit_address.script_pubkey(),
    }];
    log::debug!("デポジット出力追加: address={}, value={}", deposit_address, plan.deposit_value());

    if !memo.is_empty() {
        let data = PushBytesBuf::try_from(memo.as_bytes().to_vec()).map_err(|_| {
            AppError::MemoEncoding(format!("メモ {} バイトを OP_RETURN に格納できません", memo.len()))
        })?;
        outputs.push(TxOut {
            value: Amount::ZERO,
            script_pubkey: ScriptBuf::new_op_return(&data),
        });
        log::debug!("メモ出力追加: {}", memo.to_hex());
    }

    if plan.change > Amount::ZERO {
        if plan.change.to_sat() < DUST_THRESHOLD_SATS {
            log::warn!(
                "おつり {} はダスト閾値 {} sats 未満です。リレーに拒否される可能性があります。",
                plan.change,
                DUST_THRESHOLD_SATS
            );
        }
        outputs.push(TxOut {
            value: plan.change,
            script_pubkey: change_address.script_pubkey(),
        });
        log::debug!("おつり出力追加: address={}, value={}", change_address, plan.change);
    }

    let inputs = plan
        .chosen
        .iter()
        .map(|utxo| TxIn {
            previous_output: utxo.out_point,
            script_sig: ScriptBuf::new(),
            // RBF を有効にする (0xfffffffd)
            sequence: Sequence::ENABLE_RBF_NO_LOCKTIME,
            witness: Witness::new(),
        })
        .collect();

    let unsigned_tx = Transaction {
        version: Version::TWO,
        lock_time: LockTime::ZERO,
        input: inputs,
        output: outputs,
    };

    let mut psbt = Psbt::from_unsigned_tx(unsigned_tx)
        .map_err(|e| AppError::Finalize(format!("PSBT の作成に失敗: {}", e)))?;
    for (psbt_input, utxo) in psbt.inputs.iter_mut().zip(plan.chosen.iter()) {
        psbt_input.witness_utxo = Some(utxo.tx_out());
    }

    log::info!(
        "未署名トランザクションを構築しました: 入力 {} 件, 出力 {} 件",
        psbt.inputs.len(),
        psbt.outputs.len()
    );
    Ok(psbt)
}

/// 全入力を単一の鍵で署名し、witness を確定してシリアライズする。
///
/// いずれかの入力が署名できない場合は全体を失敗とする。
pub fn sign_and_finalize(
    mut psbt: Psbt,
    keys: &KeyMaterial,
    secp: &Secp256k1<All>,
) -> Result<SignedTransaction, AppError> {
    log::info!("トランザクション署名処理を開始します。");

    let derived = CompressedPublicKey::from_private_key(secp, &keys.private_key)
        .map_err(|e| AppError::KeyMaterialInvalid(e.to_string()))?;
    if derived != keys.public_key {
        return Err(AppError::KeyMaterialInvalid(
            "秘密鍵と公開鍵が対応していません".to_string(),
        ));
    }
    let expected_script = ScriptBuf::new_p2wpkh(&keys.public_key.wpubkey_hash());

    // 1. 署名ハッシュ計算フェーズ
    let mut signing_infos: Vec<SigningInfo> = Vec::new();
    {
        let mut sighash_cache = SighashCache::new(&psbt.unsigned_tx);

        for (input_index, input) in psbt.inputs.iter().enumerate() {
            let witness_utxo = input.witness_utxo.as_ref().ok_or_else(|| AppError::Signing {
                input_index,
                reason: "witness_utxo が設定されていません".to_string(),
            })?;
            if witness_utxo.script_pubkey != expected_script {
                return Err(AppError::Signing {
                    input_index,
                    reason: format!(
                        "scriptPubKey {} は署名鍵と一致しません",
                        witness_utxo.script_pubkey.to_hex_string()
                    ),
                });
            }

            let sighash = sighash_cache
                .p2wpkh_signature_hash(
                    input_index,
                    &witness_utxo.script_pubkey,
                    witness_utxo.value,
                    EcdsaSighashType::All,
                )
                .map_err(|e| AppError::Signing {
                    input_index,
                    reason: e.to_string(),
                })?;
            log::debug!("入力 {} の署名ハッシュ: {}", input_index, sighash);

            signing_infos.push(SigningInfo {
                input_index,
                sighash_message: Message::from_digest(sighash.to_byte_array()),
            });
        }
    }

    // 2. 署名生成と適用フェーズ
    let public_key = PublicKey::from(keys.public_key);
    for info in signing_infos {
        let signature = ecdsa::Signature::sighash_all(
            secp.sign_ecdsa(&info.sighash_message, &keys.private_key.inner),
        );
        psbt.inputs[info.input_index]
            .partial_sigs
            .insert(public_key, signature);
        log::debug!("入力 {} の署名完了。", info.input_index);
    }

    finalize_inputs(&mut psbt, &public_key)?;

    let transaction = psbt
        .extract_tx()
        .map_err(|e| AppError::Finalize(e.to_string()))?;
    let hex = encode::serialize_hex(&transaction);
    log::info!("全ての入力の署名と確定が完了しました: txid={}", transaction.compute_txid());

    Ok(SignedTransaction { transaction, hex })
}

fn finalize_inputs(psbt: &mut Psbt, public_key: &PublicKey) -> Result<(), AppError> {
    for (input_index, input) in psbt.inputs.iter_mut().enumerate() {
        let signature = input.partial_sigs.get(public_key).ok_or_else(|| AppError::Signing {
            input_index,
            reason: "部分署名がありません".to_string(),
        })?;

        let mut witness = Witness::new();
        witness.push(signature.to_vec());
        witness.push(public_key.to_bytes());

        input.final_script_witness = Some(witness);
        input.partial_sigs.clear();
        input.sighash_type = None;
        input.bip32_derivation.clear();
    }
    Ok(())
}

use async_trait::async_trait;
use bitcoin::{Address, Amount, OutPoint, ScriptBuf, Txid};

use crate::{
    error::AppError,
    types::{BridgeNetwork, PreviousTransaction, UnspentOutput, UtxoListing},
};

#[async_trait]
pub trait UtxoSource: Send + Sync {
    /// アドレスの未使用出力一覧。空でもエラーではない。
    async fn list_spendable(
        &self,
        address: &Address,
        network: BridgeNetwork,
    ) -> Result<Vec<UtxoListing>, AppError>;

    /// witness 入力に必要な scriptPubKey を得るための元トランザクション。
    async fn fetch_previous_transaction(
        &self,
        txid: &Txid,
        network: BridgeNetwork,
    ) -> Result<PreviousTransaction, AppError>;
}

fn to_unspent(listing: &UtxoListing, previous: &PreviousTransaction) -> Result<UnspentOutput, String> {
    if previous.txid != listing.txid {
        return Err(format!("txid が一致しません: {}", previous.txid));
    }
    let output = previous
        .vout
        .get(listing.vout as usize)
        .ok_or_else(|| format!("vout {} が存在しません", listing.vout))?;
    if output.value != listing.value {
        return Err(format!(
            "金額が一致しません: 一覧 {} sats, 元トランザクション {} sats",
            listing.value, output.value
        ));
    }
    let script = hex::decode(&output.scriptpubkey)
        .map_err(|e| format!("scriptPubKeyHexのデコード失敗: {}", e))?;

    Ok(UnspentOutput {
        out_point: OutPoint::new(listing.txid, listing.vout),
        value: Amount::from_sat(output.value),
        script_pubkey: ScriptBuf::from_bytes(script),
    })
}

/// 一覧の各 UTXO に元トランザクションの scriptPubKey を付与する。
///
/// 元トランザクションを取得・検証できなかった UTXO は候補から外す。
pub async fn resolve_candidates(
    source: &dyn UtxoSource,
    listings: &[UtxoListing],
    network: BridgeNetwork,
) -> Vec<UnspentOutput> {
    let mut candidates = Vec::with_capacity(listings.len());
    for listing in listings {
        let previous = match source.fetch_previous_transaction(&listing.txid, network).await {
            Ok(previous) => previous,
            Err(e) => {
                log::warn!(
                    "元トランザクションを取得できないため候補から除外します: {}:{} ({})",
                    listing.txid,
                    listing.vout,
                    e
                );
                continue;
            }
        };
        match to_unspent(listing, &previous) {
            Ok(utxo) => {
                log::debug!(
                    "候補UTXO追加: txid={}, vout={}, value={}",
                    listing.txid,
                    listing.vout,
                    utxo.value
                );
                candidates.push(utxo);
            }
            Err(reason) => {
                log::warn!("UTXO {}:{} を候補から除外します: {}", listing.txid, listing.vout, reason);
            }
        }
    }
    candidates
}

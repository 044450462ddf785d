//! BTC → ZetaChain のクロスチェーン送金を最初から最後まで実行する。
//!
//! ```text
//! Start → MemoBuilt → FeesFetched → Confirmed → UtxosFetched → CoinsSelected
//!       → Assembled → Finalized → Broadcast
//! ```
//!
//! どの段階で失敗しても自動再試行はしない。呼び出し側が最初からやり直す。

use std::{fmt, str::FromStr, sync::Arc};

use bitcoin::{
    bip32::DerivationPath,
    secp256k1::{All, Secp256k1},
    Address, Amount, Txid,
};

use crate::{
    address::derive_address,
    broadcast::Broadcaster,
    constants::{CRYPTO_CURVE, DERIVATION_PATH},
    error::AppError,
    fees::FeeOracle,
    host::{ConfirmationRequest, HostCapabilities},
    memo::{build_memo, MemoRequest},
    selection::select_coins,
    transaction::{assemble, sign_and_finalize},
    types::{BridgeNetwork, FeeEstimate, MemoPayload, SelectionPlan},
    utxo::{resolve_candidates, UtxoSource},
};

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum BuildStage {
    Start,
    MemoBuilt,
    FeesFetched,
    Confirmed,
    UtxosFetched,
    CoinsSelected,
    Assembled,
    Finalized,
    Broadcast,
}

impl fmt::Display for BuildStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self, f)
    }
}

/// 送金内容。16進数は `0x` 付きでも無しでもよい。
#[derive(Debug, Clone)]
pub struct TransferRequest {
    pub amount: Amount,
    pub recipient: String,
    pub target_asset_contract: Option<String>,
    pub custom_memo: Option<String>,
    pub withdraw: bool,
}

#[derive(Debug, Clone)]
pub struct TransferReceipt {
    pub txid: Txid,
    pub sender: Address,
    pub fees: FeeEstimate,
    pub memo: MemoPayload,
    pub plan: SelectionPlan,
}

/// ユーザーの拒否は失敗ではなく正常な結果の一つ。
#[derive(Debug, Clone)]
pub enum TransferOutcome {
    Broadcast(TransferReceipt),
    Rejected,
}

pub struct CrossChainTransfer {
    network: BridgeNetwork,
    host: Arc<dyn HostCapabilities>,
    fee_oracle: Arc<dyn FeeOracle>,
    utxo_source: Arc<dyn UtxoSource>,
    broadcaster: Arc<dyn Broadcaster>,
    secp: Secp256k1<All>,
}

impl CrossChainTransfer {
    pub fn new(
        network: BridgeNetwork,
        host: Arc<dyn HostCapabilities>,
        fee_oracle: Arc<dyn FeeOracle>,
        utxo_source: Arc<dyn UtxoSource>,
        broadcaster: Arc<dyn Broadcaster>,
    ) -> Self {
        Self {
            network,
            host,
            fee_oracle,
            utxo_source,
            broadcaster,
            secp: Secp256k1::new(),
        }
    }

    /// ビルド中にホスト側のネットワークが切り替わっていないことを確認する。
    fn ensure_network(&self) -> Result<(), AppError> {
        let observed = self.host.active_network();
        if observed != self.network {
            return Err(AppError::NetworkMismatch {
                expected: self.network,
                observed,
            });
        }
        Ok(())
    }

    pub async fn execute(&self, request: &TransferRequest) -> Result<TransferOutcome, AppError> {
        let mut stage = BuildStage::Start;
        let result = self.run(request, &mut stage).await;
        match &result {
            Ok(TransferOutcome::Broadcast(receipt)) => {
                log::info!("送金が完了しました: txid={}", receipt.txid);
            }
            Ok(TransferOutcome::Rejected) => {
                log::info!("ユーザーが送金を拒否しました。");
            }
            Err(e) => {
                log::error!("ステージ {} の後で送金に失敗しました: {}", stage, e);
            }
        }
        result
    }

    async fn run(
        &self,
        request: &TransferRequest,
        stage: &mut BuildStage,
    ) -> Result<TransferOutcome, AppError> {
        let network = self.network;
        log::info!("クロスチェーン送金を開始します: network={}, amount={}", network, request.amount);
        self.ensure_network()?;

        if request.amount == Amount::ZERO {
            return Err(AppError::InputValidation("送金額は 0 より大きくなければなりません".to_string()));
        }

        // 16進数の検証はネットワーク呼び出しより前に行う
        let memo = build_memo(&MemoRequest {
            custom_memo_hex: request.custom_memo.as_deref(),
            routing_contract_hex: network.routing_contract(),
            target_asset_contract_hex: request.target_asset_contract.as_deref(),
            recipient_hex: &request.recipient,
            withdraw: request.withdraw,
        })?;
        *stage = BuildStage::MemoBuilt;

        let path = DerivationPath::from_str(DERIVATION_PATH)
            .map_err(|e| AppError::KeyMaterialInvalid(e.to_string()))?;
        let public_key = self.host.derive_public_key(&path, CRYPTO_CURVE).await?;
        let sender = derive_address(&public_key, network)?;
        log::info!("送信元アドレス: {}", sender);

        let fees = self.fee_oracle.fetch_fee_estimate(network).await?;
        log::info!(
            "手数料率 {} sats/vB, デポジット手数料 {}",
            fees.fee_rate,
            fees.remote_deposit_fee
        );
        *stage = BuildStage::FeesFetched;

        let confirmation = ConfirmationRequest {
            network,
            transfer_amount: request.amount,
            target_asset_contract: request.target_asset_contract.clone(),
            recipient: request.recipient.clone(),
            remote_deposit_fee: fees.remote_deposit_fee,
            fee_rate: fees.fee_rate,
        };
        if !self.host.confirm(&confirmation).await? {
            return Ok(TransferOutcome::Rejected);
        }
        *stage = BuildStage::Confirmed;

        let listings = self.utxo_source.list_spendable(&sender, network).await?;
        log::info!("UTXO {} 件を取得しました。", listings.len());
        let candidates = resolve_candidates(self.utxo_source.as_ref(), &listings, network).await;
        *stage = BuildStage::UtxosFetched;

        let plan = select_coins(
            candidates,
            request.amount,
            fees.remote_deposit_fee,
            fees.fee_rate,
            network,
            memo.len(),
        )?;
        *stage = BuildStage::CoinsSelected;

        let deposit_address = Address::from_str(network.tss_address())
            .and_then(|addr| addr.require_network(network.bitcoin_network()))
            .map_err(|e| AppError::InputValidation(format!("TSSアドレスが不正です: {}", e)))?;
        let psbt = assemble(&plan, &deposit_address, &memo, &sender)?;
        *stage = BuildStage::Assembled;

        // 署名前にもう一度ネットワークを確認する
        self.ensure_network()?;
        let keys = self.host.derive_keypair(&path, CRYPTO_CURVE).await?;
        if keys.public_key.to_bytes().as_slice() != public_key.as_slice() {
            return Err(AppError::KeyMaterialInvalid(
                "署名鍵が送信元アドレスの公開鍵と一致しません".to_string(),
            ));
        }
        let signed = sign_and_finalize(psbt, &keys, &self.secp)?;
        *stage = BuildStage::Finalized;

        let txid = self.broadcaster.broadcast(&signed.hex, network).await?;
        if txid != signed.txid() {
            log::warn!("リレーが返した txid {} は計算値 {} と異なります。", txid, signed.txid());
        }
        *stage = BuildStage::Broadcast;
        log::info!("ブロードキャスト完了: {}", network.explorer_tx_url(&txid));

        Ok(TransferOutcome::Broadcast(TransferReceipt {
            txid,
            sender,
            fees,
            memo,
            plan,
        }))
    }
}

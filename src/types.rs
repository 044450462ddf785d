use std::fmt;

use bitcoin::{Amount, Network, OutPoint, ScriptBuf, Transaction, TxOut, Txid};
use serde::{Deserialize, Serialize};

use crate::constants::{
    MAINNET_MEMPOOL_EXPLORER, MAINNET_OMNICHAIN_SWAP_CONTRACT, MAINNET_PRIORITY_MULTIPLIER,
    MAINNET_ZETA_TSS, TESTNET_MEMPOOL_EXPLORER, TESTNET_OMNICHAIN_SWAP_CONTRACT,
    TESTNET_PRIORITY_MULTIPLIER, TESTNET_ZETA_TSS,
};

/// ビルド単位で固定されるネットワークモード。
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BridgeNetwork {
    Mainnet,
    Testnet,
}

impl BridgeNetwork {
    pub fn bitcoin_network(self) -> Network {
        match self {
            BridgeNetwork::Mainnet => Network::Bitcoin,
            BridgeNetwork::Testnet => Network::Testnet,
        }
    }

    pub fn tss_address(self) -> &'static str {
        match self {
            BridgeNetwork::Mainnet => MAINNET_ZETA_TSS,
            BridgeNetwork::Testnet => TESTNET_ZETA_TSS,
        }
    }

    pub fn routing_contract(self) -> &'static str {
        match self {
            BridgeNetwork::Mainnet => MAINNET_OMNICHAIN_SWAP_CONTRACT,
            BridgeNetwork::Testnet => TESTNET_OMNICHAIN_SWAP_CONTRACT,
        }
    }

    /// 本番ネットワークは小さい倍率、テストネットは大きい倍率を使う。
    pub fn priority_multiplier(self) -> u64 {
        match self {
            BridgeNetwork::Mainnet => MAINNET_PRIORITY_MULTIPLIER,
            BridgeNetwork::Testnet => TESTNET_PRIORITY_MULTIPLIER,
        }
    }

    pub fn explorer_tx_url(self, txid: &Txid) -> String {
        let base = match self {
            BridgeNetwork::Mainnet => MAINNET_MEMPOOL_EXPLORER,
            BridgeNetwork::Testnet => TESTNET_MEMPOOL_EXPLORER,
        };
        format!("{}/tx/{}", base, txid)
    }
}

impl fmt::Display for BridgeNetwork {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BridgeNetwork::Mainnet => write!(f, "mainnet"),
            BridgeNetwork::Testnet => write!(f, "testnet"),
        }
    }
}

/// `GET /address/{addr}/utxo` の1要素 (scriptPubKey を含まない)。
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct UtxoListing {
    pub txid: Txid,
    pub vout: u32,
    pub value: u64,
}

/// `GET /tx/{txid}` のうち入力構築に必要な部分。
#[derive(Debug, Clone, Deserialize)]
pub struct PreviousTransaction {
    pub txid: Txid,
    pub vout: Vec<PreviousOutput>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct PreviousOutput {
    pub scriptpubkey: String,
    pub value: u64,
}

/// 署名に必要な情報が揃った使用可能な出力。取得後は不変。
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnspentOutput {
    pub out_point: OutPoint,
    pub value: Amount,
    pub script_pubkey: ScriptBuf,
}

impl UnspentOutput {
    pub fn tx_out(&self) -> TxOut {
        TxOut {
            value: self.value,
            script_pubkey: self.script_pubkey.clone(),
        }
    }
}

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct FeeEstimate {
    /// sat/vB
    pub fee_rate: u64,
    pub remote_deposit_fee: Amount,
}

/// OP_RETURN に埋め込むバイト列。
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MemoPayload(Vec<u8>);

impl MemoPayload {
    pub(crate) fn from_bytes(bytes: Vec<u8>) -> Self {
        MemoPayload(bytes)
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn to_hex(&self) -> String {
        hex::encode(&self.0)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SelectionPlan {
    pub chosen: Vec<UnspentOutput>,
    pub total_input: Amount,
    pub transfer_amount: Amount,
    pub remote_deposit_fee: Amount,
    pub network_fee: Amount,
    pub change: Amount,
}

impl SelectionPlan {
    /// TSS アドレスに送る金額 (送金額 + デポジット手数料)。
    pub fn deposit_value(&self) -> Amount {
        self.transfer_amount + self.remote_deposit_fee
    }
}

#[derive(Debug, Clone)]
pub struct SignedTransaction {
    pub transaction: Transaction,
    pub hex: String,
}

impl SignedTransaction {
    pub fn txid(&self) -> Txid {
        self.transaction.compute_txid()
    }
}

/// ZetaChain インデックスから返される記録。構造は開いたまま保持する。
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CrossChainRecord(pub serde_json::Value);

impl CrossChainRecord {
    /// `CrossChainTxs` 配列から表示用の要約を取り出す。
    pub fn summaries(&self) -> Vec<CctxSummary> {
        self.0
            .get("CrossChainTxs")
            .and_then(|v| v.as_array())
            .map(|txs| {
                txs.iter()
                    .filter_map(|tx| serde_json::from_value(tx.clone()).ok())
                    .collect()
            })
            .unwrap_or_default()
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct CctxSummary {
    pub index: String,
    #[serde(default)]
    pub cctx_status: Option<CctxStatus>,
    #[serde(default)]
    pub inbound_params: Option<InboundParams>,
    #[serde(default)]
    pub outbound_params: Vec<OutboundParams>,
}

impl fmt::Display for CctxSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let status = self.cctx_status.as_ref();
        write!(
            f,
            "{} status={} updated={}",
            self.index,
            status.map(|s| s.status.as_str()).unwrap_or("-"),
            status
                .and_then(|s| s.last_update_timestamp.as_deref())
                .unwrap_or("-")
        )?;
        if let Some(message) = status.map(|s| s.status_message.as_str()).filter(|m| !m.is_empty()) {
            write!(f, " {}", message)?;
        }
        if let Some(inbound) = &self.inbound_params {
            write!(
                f,
                "\n  <- amount={} chain={}",
                inbound.amount.as_deref().unwrap_or("-"),
                inbound.sender_chain_id.as_deref().unwrap_or("-")
            )?;
        }
        for outbound in &self.outbound_params {
            write!(
                f,
                "\n  -> {} chain={}",
                outbound.receiver,
                outbound.receiver_chain_id.as_deref().unwrap_or("-")
            )?;
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct CctxStatus {
    #[serde(default)]
    pub status: String,
    #[serde(default)]
    pub status_message: String,
    #[serde(default, rename = "lastUpdate_timestamp")]
    pub last_update_timestamp: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct InboundParams {
    #[serde(default)]
    pub sender_chain_id: Option<String>,
    #[serde(default)]
    pub amount: Option<String>,
    #[serde(default)]
    pub observed_hash: Option<String>,
    #[serde(default)]
    pub tx_finalization_status: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct OutboundParams {
    #[serde(default)]
    pub receiver: String,
    #[serde(default, rename = "receiver_chainId")]
    pub receiver_chain_id: Option<String>,
}

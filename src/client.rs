//! mempool.space 互換の REST API と ZetaChain LCD に対する HTTP クライアント。

use std::time::Duration;

use async_trait::async_trait;
use bitcoin::{Address, Txid};
use reqwest::{header::CONTENT_TYPE, Client};
use serde::de::DeserializeOwned;

use crate::{
    broadcast::{parse_broadcast_response, Broadcaster},
    config::EndpointConfig,
    error::AppError,
    fees::{parse_recommended_fees, FeeOracle},
    tracker::{normalize_inbound_hash, parse_lookup_response, CrossChainTracker},
    types::{BridgeNetwork, CrossChainRecord, FeeEstimate, PreviousTransaction, UtxoListing},
    utxo::UtxoSource,
};

const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

fn build_http_client() -> Result<Client, AppError> {
    Client::builder()
        .timeout(REQUEST_TIMEOUT)
        .build()
        .map_err(|e| AppError::Http(format!("HTTPクライアントを作成できません: {}", e)))
}

/// Esplora/mempool.space 形式の Bitcoin API クライアント。
#[derive(Debug, Clone)]
pub struct MempoolClient {
    client: Client,
    endpoints: EndpointConfig,
}

impl MempoolClient {
    pub fn new(endpoints: EndpointConfig) -> Result<Self, AppError> {
        Ok(Self {
            client: build_http_client()?,
            endpoints,
        })
    }

    fn url(&self, network: BridgeNetwork, path: &str) -> String {
        format!("{}{}", self.endpoints.api(network), path)
    }

    /// GET してステータスと本文を返す。
    async fn get_text(&self, url: &str) -> Result<(u16, String), reqwest::Error> {
        log::trace!("GET {}", url);
        let response = self.client.get(url).send().await?;
        let status = response.status().as_u16();
        let body = response.text().await?;
        log::trace!("GET {} -> {}", url, status);
        Ok((status, body))
    }

    async fn get_json<T: DeserializeOwned>(
        &self,
        url: &str,
        to_error: impl Fn(String) -> AppError,
    ) -> Result<T, AppError> {
        let (status, body) = self.get_text(url).await.map_err(|e| to_error(e.to_string()))?;
        if !(200..300).contains(&status) {
            return Err(to_error(format!("{} が status {} を返しました: {}", url, status, body)));
        }
        serde_json::from_str(&body).map_err(|e| to_error(format!("レスポンスの解析に失敗: {}", e)))
    }

    /// アドレスの取引履歴 (`GET /address/{addr}/txs`)。構造は API のまま返す。
    pub async fn list_transactions(
        &self,
        address: &Address,
        network: BridgeNetwork,
    ) -> Result<Vec<serde_json::Value>, AppError> {
        let url = self.url(network, &format!("/address/{}/txs", address));
        self.get_json(&url, AppError::UtxoFetch).await
    }
}

#[async_trait]
impl FeeOracle for MempoolClient {
    async fn fetch_fee_estimate(&self, network: BridgeNetwork) -> Result<FeeEstimate, AppError> {
        let url = self.url(network, "/v1/fees/recommended");
        let (status, body) = self
            .get_text(&url)
            .await
            .map_err(|e| AppError::FeeUnavailable(e.to_string()))?;
        if !(200..300).contains(&status) {
            return Err(AppError::FeeUnavailable(format!(
                "{} が status {} を返しました",
                url, status
            )));
        }
        parse_recommended_fees(&body)
    }
}

#[async_trait]
impl UtxoSource for MempoolClient {
    async fn list_spendable(
        &self,
        address: &Address,
        network: BridgeNetwork,
    ) -> Result<Vec<UtxoListing>, AppError> {
        let url = self.url(network, &format!("/address/{}/utxo", address));
        self.get_json(&url, AppError::UtxoFetch).await
    }

    async fn fetch_previous_transaction(
        &self,
        txid: &Txid,
        network: BridgeNetwork,
    ) -> Result<PreviousTransaction, AppError> {
        let url = self.url(network, &format!("/tx/{}", txid));
        self.get_json(&url, AppError::UtxoFetch).await
    }
}

#[async_trait]
impl Broadcaster for MempoolClient {
    async fn broadcast(&self, signed_hex: &str, network: BridgeNetwork) -> Result<Txid, AppError> {
        let url = self.url(network, "/tx");
        log::trace!("POST {}", url);
        let response = self
            .client
            .post(&url)
            .header(CONTENT_TYPE, "text/plain")
            .body(signed_hex.to_string())
            .send()
            .await
            .map_err(|e| AppError::BroadcastFailed {
                status: 0,
                body: e.to_string(),
            })?;
        let status = response.status().as_u16();
        let body = response.text().await.map_err(|e| AppError::BroadcastFailed {
            status,
            body: e.to_string(),
        })?;
        parse_broadcast_response(status, &body)
    }
}

/// ZetaChain LCD のクロスチェーン・インデックス クライアント。
#[derive(Debug, Clone)]
pub struct ZetaIndexClient {
    client: Client,
    endpoints: EndpointConfig,
}

impl ZetaIndexClient {
    pub fn new(endpoints: EndpointConfig) -> Result<Self, AppError> {
        Ok(Self {
            client: build_http_client()?,
            endpoints,
        })
    }
}

#[async_trait]
impl CrossChainTracker for ZetaIndexClient {
    async fn lookup_by_inbound_hash(
        &self,
        tx_hash: &str,
        network: BridgeNetwork,
    ) -> Result<Option<CrossChainRecord>, AppError> {
        let hash = normalize_inbound_hash(tx_hash)?;
        let url = format!(
            "{}/zeta-chain/crosschain/inboundHashToCctxData/{}",
            self.endpoints.zeta_lcd(network),
            hash
        );
        log::trace!("GET {}", url);
        let response = self
            .client
            .get(&url)
            .send()
            .await
            .map_err(|e| AppError::Http(e.to_string()))?;
        let status = response.status().as_u16();
        let body = response.text().await.map_err(|e| AppError::Http(e.to_string()))?;
        parse_lookup_response(status, &body)
    }
}

use std::str::FromStr;

use async_trait::async_trait;
use bitcoin::Txid;

use crate::{error::AppError, types::BridgeNetwork};

#[async_trait]
pub trait Broadcaster: Send + Sync {
    /// 署名済みトランザクション (16進数) をリレーに送信し txid を返す。
    async fn broadcast(&self, signed_hex: &str, network: BridgeNetwork) -> Result<Txid, AppError>;
}

/// リレーの応答を解釈する。失敗時の本文はそのままユーザーに見せる。
pub fn parse_broadcast_response(status: u16, body: &str) -> Result<Txid, AppError> {
    if !(200..300).contains(&status) {
        return Err(AppError::BroadcastFailed {
            status,
            body: body.to_string(),
        });
    }
    Txid::from_str(body.trim()).map_err(|_| AppError::BroadcastFailed {
        status,
        body: body.to_string(),
    })
}

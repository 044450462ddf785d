use async_trait::async_trait;

use crate::{
    address::trim_hex_prefix,
    error::AppError,
    types::{BridgeNetwork, CrossChainRecord},
};

#[async_trait]
pub trait CrossChainTracker: Send + Sync {
    /// インバウンドの Bitcoin トランザクションハッシュに対応する CCTX を取得する。
    ///
    /// 未確定でまだ記録が無い場合は `Ok(None)` を返す。再試行は呼び出し側で行う。
    async fn lookup_by_inbound_hash(
        &self,
        tx_hash: &str,
        network: BridgeNetwork,
    ) -> Result<Option<CrossChainRecord>, AppError>;
}

/// ハッシュを正規化する (`0x` を除去し、16進数のみ許可)。
pub fn normalize_inbound_hash(tx_hash: &str) -> Result<String, AppError> {
    let trimmed = trim_hex_prefix(tx_hash.trim());
    if trimmed.is_empty() || !trimmed.chars().all(|c| c.is_ascii_hexdigit()) {
        return Err(AppError::InputValidation(format!(
            "トランザクションハッシュが不正です: {}",
            tx_hash
        )));
    }
    Ok(trimmed.to_ascii_lowercase())
}

/// インデックスの応答を解釈する。404 は「まだ存在しない」。
pub fn parse_lookup_response(status: u16, body: &str) -> Result<Option<CrossChainRecord>, AppError> {
    if status == 404 {
        return Ok(None);
    }
    if !(200..300).contains(&status) {
        return Err(AppError::CrossChainLookupFailed {
            status,
            body: body.to_string(),
        });
    }
    let record: CrossChainRecord =
        serde_json::from_str(body).map_err(|e| AppError::CrossChainLookupFailed {
            status,
            body: format!("JSONの解析に失敗: {}", e),
        })?;
    Ok(Some(record))
}

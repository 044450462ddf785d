//! ZetaChain 向けのルーティングメモ (OP_RETURN データ) の生成。
//!
//! レイアウト (ターゲット資産コントラクトがある場合):
//!
//! ```text
//!  0                    20                   40          N    N+1
//!  |--------------------|--------------------|-----------|----|
//!    routing contract     target asset         recipient   withdraw
//! ```
//!
//! ターゲット資産コントラクトが無い場合、メモは受取人のバイト列のみ。

use crate::{address::trim_hex_prefix, constants::MEMO_LIMIT_BYTES, error::AppError, types::MemoPayload};

/// メモ生成の入力。16進数はすべて `0x` 付きでも無しでもよい。
#[derive(Debug, Clone, Default)]
pub struct MemoRequest<'a> {
    pub custom_memo_hex: Option<&'a str>,
    pub routing_contract_hex: &'a str,
    pub target_asset_contract_hex: Option<&'a str>,
    pub recipient_hex: &'a str,
    pub withdraw: bool,
}

fn decode_component(label: &str, value: &str) -> Result<Vec<u8>, AppError> {
    let trimmed = trim_hex_prefix(value);
    if !trimmed.chars().all(|c| c.is_ascii_hexdigit()) {
        return Err(AppError::MemoEncoding(format!(
            "{} に16進数以外の文字が含まれています: {}",
            label, value
        )));
    }
    hex::decode(trimmed)
        .map_err(|e| AppError::MemoEncoding(format!("{} のデコードに失敗: {}", label, e)))
}

pub fn build_memo(request: &MemoRequest<'_>) -> Result<MemoPayload, AppError> {
    let target = request
        .target_asset_contract_hex
        .filter(|t| !trim_hex_prefix(t).is_empty());

    // 全ての構成要素を先に検証する (カスタムメモ使用時も同様)
    let routing = decode_component("ルーティングコントラクト", request.routing_contract_hex)?;
    let recipient = decode_component("受取人アドレス", request.recipient_hex)?;
    let target_bytes = target
        .map(|t| decode_component("ターゲット資産コントラクト", t))
        .transpose()?;

    if recipient.is_empty() {
        return Err(AppError::MemoEncoding("受取人アドレスが空です".to_string()));
    }

    let bytes = match (request.custom_memo_hex, target_bytes) {
        (Some(custom), Some(_)) => {
            log::debug!("カスタムメモをそのまま使用します。");
            decode_component("カスタムメモ", custom)?
        }
        (_, Some(target_bytes)) => {
            let mut bytes =
                Vec::with_capacity(routing.len() + target_bytes.len() + recipient.len() + 1);
            bytes.extend_from_slice(&routing);
            bytes.extend_from_slice(&target_bytes);
            bytes.extend_from_slice(&recipient);
            bytes.push(u8::from(request.withdraw));
            bytes
        }
        (_, None) => recipient,
    };

    if bytes.len() >= MEMO_LIMIT_BYTES {
        return Err(AppError::MemoTooLong {
            length: bytes.len(),
            limit: MEMO_LIMIT_BYTES,
        });
    }

    log::debug!("メモ生成完了: {} バイト", bytes.len());
    Ok(MemoPayload::from_bytes(bytes))
}

use std::path::PathBuf;

use bitcoin::Amount;
use thiserror::Error;

use crate::types::BridgeNetwork;

#[derive(Debug, Error)]
pub enum AppError {
    #[error("I/Oエラー: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSONパースエラー ファイル: {file_path:?}, 詳細: {source}")]
    JsonParse {
        file_path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("鍵素材が不正です: {0}")]
    KeyMaterialInvalid(String),

    #[error("アドレスのデコードに失敗しました ({input}): {reason}")]
    AddressDecode { input: String, reason: String },

    #[error("手数料情報を取得できません: {0}")]
    FeeUnavailable(String),

    #[error("UTXOの取得に失敗しました: {0}")]
    UtxoFetch(String),

    #[error("メモのエンコードに失敗しました: {0}")]
    MemoEncoding(String),

    #[error("メモが長すぎます: {length} バイト (上限は {limit} バイト未満)")]
    MemoTooLong { length: usize, limit: usize },

    #[error(
        "資金不足: 利用可能な総額 {available}, 要求額 {required} (ネットワーク手数料 {fee} を含む)"
    )]
    InsufficientFunds {
        available: Amount,
        required: Amount,
        fee: Amount,
    },

    #[error("署名エラー (入力インデックス {input_index}): {reason}")]
    Signing { input_index: usize, reason: String },

    #[error("トランザクションの確定に失敗しました: {0}")]
    Finalize(String),

    #[error("ブロードキャストに失敗しました (status {status}): {body}")]
    BroadcastFailed { status: u16, body: String },

    #[error("クロスチェーン記録の取得に失敗しました (status {status}): {body}")]
    CrossChainLookupFailed { status: u16, body: String },

    #[error("HTTP通信エラー: {0}")]
    Http(String),

    #[error("ネットワーク不整合: ビルド開始時 ({expected}) vs 現在 ({observed})")]
    NetworkMismatch {
        expected: BridgeNetwork,
        observed: BridgeNetwork,
    },

    #[error("入力検証エラー: {0}")]
    InputValidation(String),
}


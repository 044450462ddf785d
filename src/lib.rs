//! Bitcoin から ZetaChain へのクロスチェーン・デポジット トランザクションの構築と送信。

pub mod address;
pub mod broadcast;
pub mod client;
pub mod config;
pub mod constants;
pub mod error;
pub mod fees;
pub mod host;
pub mod memo;
pub mod pipeline;
pub mod selection;
pub mod tracker;
pub mod transaction;
pub mod types;
pub mod utxo;

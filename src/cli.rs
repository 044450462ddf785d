use std::path::PathBuf;

use clap::{Parser, Subcommand};
use zeta_btc_bridge::{error::AppError, types::BridgeNetwork};

#[derive(Parser, Debug)]
#[clap(author, version, about, long_about = None)]
pub struct CliArgs {
    /// 使用するネットワーク ("mainnet", "testnet")
    #[clap(short, long, value_parser, default_value = "testnet", global = true)]
    pub network: String,

    /// API エンドポイントを上書きする JSON ファイル
    #[clap(long, value_parser, global = true)]
    pub endpoints_file: Option<PathBuf>,

    #[clap(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// 送信元の P2WPKH アドレスを表示する
    Address {
        #[clap(short, long, value_parser)]
        key_file: PathBuf,
    },
    /// 現在の手数料率とデポジット手数料を表示する
    Fees,
    /// 送信元アドレスの UTXO を表示する
    Utxos {
        #[clap(short, long, value_parser)]
        key_file: PathBuf,
        /// UTXO の代わりに取引履歴を表示する
        #[clap(long)]
        history: bool,
    },
    /// 送金リクエストに従ってトランザクションを構築・署名・送信する
    Send {
        /// 拡張秘密鍵 (xprv/tprv) を記述したファイル
        #[clap(short, long, value_parser)]
        key_file: PathBuf,
        /// 送金内容を記述したJSONファイルへのパス
        #[clap(short, long, value_parser)]
        request_file: PathBuf,
        /// 確認プロンプトを省略する
        #[clap(short, long)]
        yes: bool,
    },
    /// Bitcoin トランザクションハッシュから CCTX を取得する
    Track { tx_hash: String },
    /// zeta1... と 0x... のアドレス形式を相互変換する
    ConvertAddress { address: String },
}

pub fn parse_network(network_str: &str) -> Result<BridgeNetwork, AppError> {
    match network_str.to_lowercase().as_str() {
        "bitcoin" | "mainnet" => Ok(BridgeNetwork::Mainnet),
        "testnet" | "testnet4" => Ok(BridgeNetwork::Testnet),
        s => Err(AppError::InputValidation(format!("無効なネットワークが指定されました: {}", s))),
    }
}

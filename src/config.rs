use std::{fs, path::Path, str::FromStr};

use bitcoin::Amount;
use serde::Deserialize;

use crate::{
    constants::{MAINNET_MEMPOOL_API, MAINNET_ZETA_LCD, TESTNET_MEMPOOL_API, TESTNET_ZETA_LCD},
    error::AppError,
    types::BridgeNetwork,
};

/// 送金リクエストファイル (JSON)。
#[derive(Deserialize, Debug, Clone)]
#[serde(rename_all = "camelCase")]
pub struct TransferConfig {
    /// `"0.001 BTC"` や `"150000 sat"` の形式
    pub amount: String,
    pub recipient: String,
    #[serde(default)]
    pub target_asset_contract: Option<String>,
    #[serde(default)]
    pub custom_memo: Option<String>,
    #[serde(default = "default_withdraw")]
    pub withdraw: bool,
    #[serde(default)]
    pub endpoints: EndpointConfig,
}

fn default_withdraw() -> bool {
    true
}

impl TransferConfig {
    pub fn load(path: &Path) -> Result<Self, AppError> {
        let content = fs::read_to_string(path).map_err(|e| {
            log::error!("入力ファイルの読み込みに失敗しました: {:?}", path);
            AppError::Io(e)
        })?;
        serde_json::from_str(&content).map_err(|e| {
            log::error!("入力JSONのパースに失敗しました。");
            AppError::JsonParse {
                file_path: path.to_path_buf(),
                source: e,
            }
        })
    }

    pub fn transfer_amount(&self) -> Result<Amount, AppError> {
        let amount = Amount::from_str(self.amount.trim()).map_err(|e| {
            AppError::InputValidation(format!("送金額の形式が不正です ({}): {}", self.amount, e))
        })?;
        if amount == Amount::ZERO {
            return Err(AppError::InputValidation("送金額は 0 より大きくなければなりません".to_string()));
        }
        Ok(amount)
    }
}

/// 外部 API のエンドポイント。未指定の項目は既定値を使う。
#[derive(Deserialize, Debug, Clone, PartialEq, Eq)]
#[serde(rename_all = "camelCase", default)]
pub struct EndpointConfig {
    pub mainnet_api: String,
    pub testnet_api: String,
    pub mainnet_zeta_lcd: String,
    pub testnet_zeta_lcd: String,
}

impl Default for EndpointConfig {
    fn default() -> Self {
        Self {
            mainnet_api: MAINNET_MEMPOOL_API.to_string(),
            testnet_api: TESTNET_MEMPOOL_API.to_string(),
            mainnet_zeta_lcd: MAINNET_ZETA_LCD.to_string(),
            testnet_zeta_lcd: TESTNET_ZETA_LCD.to_string(),
        }
    }
}

impl EndpointConfig {
    /// エンドポイント上書き用の JSON ファイルを読み込む。
    pub fn load(path: &Path) -> Result<Self, AppError> {
        let content = fs::read_to_string(path).map_err(|e| {
            log::error!("エンドポイント設定の読み込みに失敗しました: {:?}", path);
            AppError::Io(e)
        })?;
        serde_json::from_str(&content).map_err(|e| AppError::JsonParse {
            file_path: path.to_path_buf(),
            source: e,
        })
    }

    pub fn api(&self, network: BridgeNetwork) -> &str {
        match network {
            BridgeNetwork::Mainnet => self.mainnet_api.trim_end_matches('/'),
            BridgeNetwork::Testnet => self.testnet_api.trim_end_matches('/'),
        }
    }

    pub fn zeta_lcd(&self, network: BridgeNetwork) -> &str {
        match network {
            BridgeNetwork::Mainnet => self.mainnet_zeta_lcd.trim_end_matches('/'),
            BridgeNetwork::Testnet => self.testnet_zeta_lcd.trim_end_matches('/'),
        }
    }
}

use async_trait::async_trait;
use bitcoin::Amount;
use serde::Deserialize;

use crate::{
    constants::{DEPOSIT_FEE_MULTIPLIER, DEPOSIT_FEE_SCALE, DEPOSIT_FEE_VBYTES},
    error::AppError,
    types::{BridgeNetwork, FeeEstimate},
};

#[async_trait]
pub trait FeeOracle: Send + Sync {
    /// 推奨手数料率を取得し、ZetaChain のデポジット手数料を導出する。
    async fn fetch_fee_estimate(&self, network: BridgeNetwork) -> Result<FeeEstimate, AppError>;
}

/// `GET /v1/fees/recommended` のレスポンス。
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RecommendedFees {
    pub fastest_fee: f64,
    #[serde(default)]
    pub half_hour_fee: Option<f64>,
    #[serde(default)]
    pub hour_fee: Option<f64>,
    #[serde(default)]
    pub economy_fee: Option<f64>,
    #[serde(default)]
    pub minimum_fee: Option<f64>,
}

/// ZetaChain が要求するデポジット手数料 (sats)。
pub fn remote_deposit_fee(fee_rate: u64) -> Amount {
    Amount::from_sat(
        fee_rate
            .saturating_mul(DEPOSIT_FEE_VBYTES)
            .saturating_mul(DEPOSIT_FEE_MULTIPLIER)
            .saturating_mul(DEPOSIT_FEE_SCALE),
    )
}

impl RecommendedFees {
    /// 手数料率 0 や非有限値では先に進めない。
    pub fn to_fee_estimate(&self) -> Result<FeeEstimate, AppError> {
        let fastest = self.fastest_fee;
        if !fastest.is_finite() || fastest <= 0.0 {
            return Err(AppError::FeeUnavailable(format!(
                "不正な手数料率です: {}",
                fastest
            )));
        }
        // 小数の手数料率は切り上げてから、その整数値でデポジット手数料を算出する
        let fee_rate = fastest.ceil() as u64;
        Ok(FeeEstimate {
            fee_rate,
            remote_deposit_fee: remote_deposit_fee(fee_rate),
        })
    }
}

pub fn parse_recommended_fees(body: &str) -> Result<FeeEstimate, AppError> {
    let fees: RecommendedFees = serde_json::from_str(body)
        .map_err(|e| AppError::FeeUnavailable(format!("手数料レスポンスの解析に失敗: {}", e)))?;
    log::debug!("推奨手数料: {:?}", fees);
    fees.to_fee_estimate()
}

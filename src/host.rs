//! 鍵導出とユーザー確認を提供するホスト側の機能。
//!
//! パイプラインは [`HostCapabilities`] にのみ依存し、CLI では
//! [`LocalKeyHost`] を、テストでは偽の実装を注入する。

use std::{fmt, str::FromStr};

use async_trait::async_trait;
use bitcoin::{
    bip32::{DerivationPath, Xpriv},
    secp256k1::{All, Secp256k1},
    Amount, CompressedPublicKey, NetworkKind, PrivateKey,
};

use crate::{constants::CRYPTO_CURVE, error::AppError, types::BridgeNetwork};

/// 単一署名鍵。秘密鍵は `Debug` に出さない。
pub struct KeyMaterial {
    pub public_key: CompressedPublicKey,
    pub private_key: PrivateKey,
}

impl fmt::Debug for KeyMaterial {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("KeyMaterial")
            .field("public_key", &self.public_key)
            .finish_non_exhaustive()
    }
}

/// 確認ダイアログに表示する内容。
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConfirmationRequest {
    pub network: BridgeNetwork,
    pub transfer_amount: Amount,
    pub target_asset_contract: Option<String>,
    pub recipient: String,
    pub remote_deposit_fee: Amount,
    pub fee_rate: u64,
}

impl fmt::Display for ConfirmationRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "CCTX BTC トランザクションの確認 ({})", self.network)?;
        writeln!(f, "  送金額: {}", self.transfer_amount.display_in(bitcoin::Denomination::Bitcoin))?;
        writeln!(
            f,
            "  ZRC20 コントラクト: {}",
            self.target_asset_contract.as_deref().unwrap_or("-")
        )?;
        writeln!(f, "  受取人: {}", self.recipient)?;
        writeln!(
            f,
            "  デポジット手数料: {}",
            self.remote_deposit_fee.display_in(bitcoin::Denomination::Bitcoin)
        )?;
        write!(f, "  手数料率: {} sats/vB", self.fee_rate)
    }
}

#[async_trait]
pub trait HostCapabilities: Send + Sync {
    /// 圧縮公開鍵 (33バイト) を返す。
    async fn derive_public_key(&self, path: &DerivationPath, curve: &str) -> Result<Vec<u8>, AppError>;

    async fn derive_keypair(&self, path: &DerivationPath, curve: &str) -> Result<KeyMaterial, AppError>;

    /// `false` はユーザーによる拒否で、エラーではない。
    async fn confirm(&self, request: &ConfirmationRequest) -> Result<bool, AppError>;

    /// ホストが現在選択しているネットワーク。
    fn active_network(&self) -> BridgeNetwork;
}

/// 拡張秘密鍵 (xprv/tprv) を保持するローカル実装。
pub struct LocalKeyHost {
    master: Xpriv,
    network: BridgeNetwork,
    secp: Secp256k1<All>,
    assume_yes: bool,
}

impl LocalKeyHost {
    pub fn new(master: Xpriv, network: BridgeNetwork) -> Result<Self, AppError> {
        let expected = NetworkKind::from(network.bitcoin_network());
        if master.network != expected {
            return Err(AppError::KeyMaterialInvalid(format!(
                "拡張鍵のネットワーク ({:?}) が指定されたネットワーク ({}) と一致しません",
                master.network, network
            )));
        }
        Ok(Self {
            master,
            network,
            secp: Secp256k1::new(),
            assume_yes: false,
        })
    }

    pub fn from_xpriv_str(s: &str, network: BridgeNetwork) -> Result<Self, AppError> {
        let master = Xpriv::from_str(s.trim())
            .map_err(|e| AppError::KeyMaterialInvalid(format!("拡張秘密鍵の解析に失敗: {}", e)))?;
        Self::new(master, network)
    }

    /// 確認プロンプトを省略する (`--yes`)。
    pub fn assume_yes(mut self, yes: bool) -> Self {
        self.assume_yes = yes;
        self
    }

    fn derive(&self, path: &DerivationPath, curve: &str) -> Result<KeyMaterial, AppError> {
        if curve != CRYPTO_CURVE {
            return Err(AppError::KeyMaterialInvalid(format!("未対応の曲線です: {}", curve)));
        }
        let child = self
            .master
            .derive_priv(&self.secp, path)
            .map_err(|e| AppError::KeyMaterialInvalid(e.to_string()))?;
        let private_key = child.to_priv();
        let public_key = CompressedPublicKey::from_private_key(&self.secp, &private_key)
            .map_err(|e| AppError::KeyMaterialInvalid(e.to_string()))?;
        Ok(KeyMaterial {
            public_key,
            private_key,
        })
    }
}

#[async_trait]
impl HostCapabilities for LocalKeyHost {
    async fn derive_public_key(&self, path: &DerivationPath, curve: &str) -> Result<Vec<u8>, AppError> {
        Ok(self.derive(path, curve)?.public_key.to_bytes().to_vec())
    }

    async fn derive_keypair(&self, path: &DerivationPath, curve: &str) -> Result<KeyMaterial, AppError> {
        self.derive(path, curve)
    }

    async fn confirm(&self, request: &ConfirmationRequest) -> Result<bool, AppError> {
        println!("{}", request);
        if self.assume_yes {
            return Ok(true);
        }
        tokio::task::spawn_blocking(|| {
            dialoguer::Confirm::new()
                .with_prompt("このトランザクションを送信しますか?")
                .default(false)
                .interact()
                .map_err(|e| AppError::InputValidation(format!("確認プロンプトの失敗: {}", e)))
        })
        .await
        .map_err(|e| AppError::InputValidation(format!("確認プロンプトの失敗: {}", e)))?
    }

    fn active_network(&self) -> BridgeNetwork {
        self.network
    }
}

#[cfg(test)]
mod tests {
    use bitcoin::Network;

    use super::*;
    use crate::{address::derive_address, constants::DERIVATION_PATH};

    fn path() -> DerivationPath {
        DerivationPath::from_str(DERIVATION_PATH).unwrap()
    }

    #[tokio::test]
    async fn derives_matching_public_key_and_keypair() {
        let master = Xpriv::new_master(Network::Testnet, &[7u8; 32]).unwrap();
        let host = LocalKeyHost::new(master, BridgeNetwork::Testnet).unwrap();

        let public = host.derive_public_key(&path(), CRYPTO_CURVE).await.unwrap();
        let keys = host.derive_keypair(&path(), CRYPTO_CURVE).await.unwrap();
        assert_eq!(public.len(), 33);
        assert_eq!(public, keys.public_key.to_bytes().to_vec());

        let address = derive_address(&public, BridgeNetwork::Testnet).unwrap();
        assert!(address.to_string().starts_with("tb1q"));
    }

    #[test]
    fn rejects_key_from_other_network() {
        let master = Xpriv::new_master(Network::Bitcoin, &[7u8; 32]).unwrap();
        assert!(matches!(
            LocalKeyHost::new(master, BridgeNetwork::Testnet),
            Err(AppError::KeyMaterialInvalid(_))
        ));
    }

    #[tokio::test]
    async fn unsupported_curve_fails() {
        let master = Xpriv::new_master(Network::Testnet, &[9u8; 32]).unwrap();
        let host = LocalKeyHost::new(master, BridgeNetwork::Testnet).unwrap();
        assert!(matches!(
            host.derive_keypair(&path(), "ed25519").await,
            Err(AppError::KeyMaterialInvalid(_))
        ));
    }

    #[tokio::test]
    async fn assume_yes_skips_prompt() {
        let master = Xpriv::new_master(Network::Testnet, &[9u8; 32]).unwrap();
        let host = LocalKeyHost::new(master, BridgeNetwork::Testnet)
            .unwrap()
            .assume_yes(true);
        let request = ConfirmationRequest {
            network: BridgeNetwork::Testnet,
            transfer_amount: Amount::from_sat(1_000),
            target_asset_contract: None,
            recipient: "0x01".to_string(),
            remote_deposit_fee: Amount::from_sat(10),
            fee_rate: 1,
        };
        assert!(host.confirm(&request).await.unwrap());
    }

    #[test]
    fn key_material_debug_hides_private_key() {
        let secp = Secp256k1::new();
        let master = Xpriv::new_master(Network::Testnet, &[3u8; 32]).unwrap();
        let private_key = master.to_priv();
        let keys = KeyMaterial {
            public_key: CompressedPublicKey::from_private_key(&secp, &private_key).unwrap(),
            private_key,
        };
        let rendered = format!("{:?}", keys);
        assert!(!rendered.contains(&private_key.to_wif()));
    }
}

use bitcoin::bech32::{self, primitives::decode::CheckedHrpstring, Bech32, Hrp};
use bitcoin::{Address, CompressedPublicKey};

use crate::{
    constants::{REMOTE_ADDRESS_LEN, ZETA_HRP},
    error::AppError,
    types::BridgeNetwork,
};

/// 先頭の `0x` を取り除く。
pub fn trim_hex_prefix(value: &str) -> &str {
    value
        .strip_prefix("0x")
        .or_else(|| value.strip_prefix("0X"))
        .unwrap_or(value)
}

/// 圧縮公開鍵から P2WPKH アドレスを導出する。
pub fn derive_address(public_key: &[u8], network: BridgeNetwork) -> Result<Address, AppError> {
    if public_key.len() != 33 {
        return Err(AppError::KeyMaterialInvalid(format!(
            "公開鍵は33バイトであるべきところ {} バイトです",
            public_key.len()
        )));
    }
    let public_key = CompressedPublicKey::from_slice(public_key)
        .map_err(|e| AppError::KeyMaterialInvalid(format!("圧縮公開鍵ではありません: {}", e)))?;
    Ok(Address::p2wpkh(&public_key, network.bitcoin_network()))
}

/// `zeta1...` 形式のアドレスを `0x` 付きの16進数に変換する。
///
/// チェックサムは Bech32 のみ受け付ける (Bech32m は不可)。全て大文字の入力も
/// 受け付けるが、`hex_to_remote_address` は常に小文字の正規形を返すため、
/// 往復で元の文字列に戻るのは小文字の入力に限られる。
pub fn remote_address_to_hex(remote_address: &str) -> Result<String, AppError> {
    let decode_err = |reason: String| AppError::AddressDecode {
        input: remote_address.to_string(),
        reason,
    };

    let checked = CheckedHrpstring::new::<Bech32>(remote_address)
        .map_err(|e| decode_err(e.to_string()))?;
    let hrp = checked.hrp();
    let data: Vec<u8> = checked.byte_iter().collect();
    if hrp.to_lowercase() != ZETA_HRP {
        return Err(decode_err(format!("HRP が {} ではありません: {}", ZETA_HRP, hrp)));
    }
    if data.len() != REMOTE_ADDRESS_LEN {
        return Err(decode_err(format!(
            "{} バイトであるべきところ {} バイトです",
            REMOTE_ADDRESS_LEN,
            data.len()
        )));
    }
    Ok(format!("0x{}", hex::encode(data)))
}

/// 20バイトの16進数アドレスを `zeta1...` 形式に変換する。
pub fn hex_to_remote_address(hex_address: &str) -> Result<String, AppError> {
    let decode_err = |reason: String| AppError::AddressDecode {
        input: hex_address.to_string(),
        reason,
    };

    let data = hex::decode(trim_hex_prefix(hex_address)).map_err(|e| decode_err(e.to_string()))?;
    if data.len() != REMOTE_ADDRESS_LEN {
        return Err(decode_err(format!(
            "{} バイトであるべきところ {} バイトです",
            REMOTE_ADDRESS_LEN,
            data.len()
        )));
    }
    let hrp = Hrp::parse(ZETA_HRP).map_err(|e| decode_err(e.to_string()))?;
    bech32::encode::<Bech32>(hrp, &data).map_err(|e| decode_err(e.to_string()))
}

#[cfg(test)]
mod tests {
    use proptest::prelude::*;

    use super::*;

    // BIP173 のテストベクタ
    const PUBKEY_HEX: &str = "0279be667ef9dcbbac55a06295ce870b07029bfcdb2dce28d959f2815b16f81798";

    #[test]
    fn derives_witness_address_per_network() {
        let pubkey = hex::decode(PUBKEY_HEX).unwrap();
        let main = derive_address(&pubkey, BridgeNetwork::Mainnet).unwrap();
        let test = derive_address(&pubkey, BridgeNetwork::Testnet).unwrap();
        assert_eq!(main.to_string(), "bc1qw508d6qejxtdg4y5r3zarvary0c5xw7kv8f3t4");
        assert_eq!(test.to_string(), "tb1qw508d6qejxtdg4y5r3zarvary0c5xw7kxpjzsx");
    }

    #[test]
    fn rejects_uncompressed_or_garbage_keys() {
        assert!(matches!(
            derive_address(&[0x02; 10], BridgeNetwork::Mainnet),
            Err(AppError::KeyMaterialInvalid(_))
        ));
        let mut uncompressed = vec![0x04];
        uncompressed.extend_from_slice(&[0x11; 64]);
        assert!(matches!(
            derive_address(&uncompressed, BridgeNetwork::Testnet),
            Err(AppError::KeyMaterialInvalid(_))
        ));
    }

    #[test]
    fn remote_address_round_trip() {
        let raw = "0x735b14bb79463307aacbed86daf3322b1e6226ab";
        let zeta = hex_to_remote_address(raw).unwrap();
        assert!(zeta.starts_with("zeta1"));
        assert_eq!(remote_address_to_hex(&zeta).unwrap(), raw);
        assert_eq!(hex_to_remote_address(&remote_address_to_hex(&zeta).unwrap()).unwrap(), zeta);
    }

    #[test]
    fn rejects_bech32m_checksum() {
        let hrp = Hrp::parse(ZETA_HRP).unwrap();
        let raw = hex::decode("735b14bb79463307aacbed86daf3322b1e6226ab").unwrap();
        let bech32m = bech32::encode::<bech32::Bech32m>(hrp, &raw).unwrap();
        assert!(bech32m.starts_with("zeta1"));
        assert!(matches!(
            remote_address_to_hex(&bech32m),
            Err(AppError::AddressDecode { .. })
        ));
    }

    #[test]
    fn uppercase_address_maps_to_lowercase_form() {
        let raw = "0x735b14bb79463307aacbed86daf3322b1e6226ab";
        let zeta = hex_to_remote_address(raw).unwrap();
        let upper = zeta.to_uppercase();
        assert_eq!(remote_address_to_hex(&upper).unwrap(), raw);
        assert_eq!(hex_to_remote_address(raw).unwrap(), zeta);
        // 大文字小文字の混在は bech32 として不正
        let mixed = format!("ZETA{}", &zeta[4..]);
        assert!(matches!(
            remote_address_to_hex(&mixed),
            Err(AppError::AddressDecode { .. })
        ));
    }

    proptest! {
        #[test]
        fn remote_address_round_trips_for_any_bytes(bytes in any::<[u8; 20]>()) {
            let raw = format!("0x{}", hex::encode(bytes));
            let zeta = hex_to_remote_address(&raw).unwrap();
            prop_assert!(zeta.starts_with("zeta1"));
            let back = remote_address_to_hex(&zeta).unwrap();
            prop_assert_eq!(&back, &raw);
            prop_assert_eq!(hex_to_remote_address(&back).unwrap(), zeta);
        }
    }

    #[test]
    fn accepts_hex_without_prefix() {
        let with = hex_to_remote_address("0x0000000000000000000000000000000000000001").unwrap();
        let without = hex_to_remote_address("0000000000000000000000000000000000000001").unwrap();
        assert_eq!(with, without);
    }

    #[test]
    fn malformed_remote_addresses_fail() {
        assert!(matches!(
            hex_to_remote_address("0x1234"),
            Err(AppError::AddressDecode { .. })
        ));
        assert!(matches!(
            hex_to_remote_address("0xzz5b14bb79463307aacbed86daf3322b1e6226ab"),
            Err(AppError::AddressDecode { .. })
        ));
        assert!(matches!(
            remote_address_to_hex("zeta1notavalidchecksum"),
            Err(AppError::AddressDecode { .. })
        ));
        // bitcoin の bech32 アドレスは HRP が違う
        assert!(matches!(
            remote_address_to_hex("bc1qw508d6qejxtdg4y5r3zarvary0c5xw7kv8f3t4"),
            Err(AppError::AddressDecode { .. })
        ));
    }
}

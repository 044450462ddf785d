//! ZetaChain向けBitcoinデポジットで使用する固定値。

/// BIP44 導出パス (host 側の鍵導出に渡す)。
pub const DERIVATION_PATH: &str = "m/44'/0'/0'/0/0";

/// 鍵の楕円曲線 (host 側 API の引数)。
pub const CRYPTO_CURVE: &str = "secp256k1";

// ZetaChain TSS (observer) アドレス
pub const MAINNET_ZETA_TSS: &str = "bc1qm24wp577nk8aacckv8np465z3dvmu7ry45el6y";
pub const TESTNET_ZETA_TSS: &str = "tb1qy9pqmk2pd9sv63g27jt8r657wy0d9ueeh0nqur";

// オムニチェーン・スワップ (ルーティング) コントラクト
pub const MAINNET_OMNICHAIN_SWAP_CONTRACT: &str = "0x355d6D9910233Cc2e702C79A8481AFC3ec3B3d48";
pub const TESTNET_OMNICHAIN_SWAP_CONTRACT: &str = "0xC56ff3Ed3C7D285cFe0959E10dd88D4f17EfB381";

// REST API
pub const MAINNET_MEMPOOL_API: &str = "https://mempool.space/api";
pub const TESTNET_MEMPOOL_API: &str = "https://mempool.space/testnet4/api";
pub const MAINNET_MEMPOOL_EXPLORER: &str = "https://mempool.space";
pub const TESTNET_MEMPOOL_EXPLORER: &str = "https://mempool.space/testnet4";
pub const MAINNET_ZETA_LCD: &str = "https://zetachain.blockpi.network/lcd/v1/public";
pub const TESTNET_ZETA_LCD: &str = "https://zetachain-athens.blockpi.network/lcd/v1/public";

/// ZetaChain アドレスの bech32 HRP
pub const ZETA_HRP: &str = "zeta";

/// P2WPKH 入力1つあたりの推定 vsize
pub const INPUT_VBYTES: u64 = 68;
/// 出力1つあたりの推定 vsize
pub const OUTPUT_VBYTES: u64 = 31;

/// 即時取り込みのための手数料率の倍率
pub const MAINNET_PRIORITY_MULTIPLIER: u64 = 2;
pub const TESTNET_PRIORITY_MULTIPLIER: u64 = 5;

// ZetaChain 側のデポジット手数料 = fastestFee * 68 * 2 * 1000
pub const DEPOSIT_FEE_VBYTES: u64 = 68;
pub const DEPOSIT_FEE_MULTIPLIER: u64 = 2;
pub const DEPOSIT_FEE_SCALE: u64 = 1000;

/// メモは 78 バイト未満でなければならない。
pub const MEMO_LIMIT_BYTES: usize = 78;

/// ZetaChain の EVM アドレス長
pub const REMOTE_ADDRESS_LEN: usize = 20;

/// P2WPKH 出力のダスト閾値 (警告のみ)
pub const DUST_THRESHOLD_SATS: u64 = 294;

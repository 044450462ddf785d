use std::{fs, path::Path, str::FromStr, sync::Arc};

use bitcoin::bip32::DerivationPath;
use clap::Parser;
use zeta_btc_bridge::{
    address::{derive_address, hex_to_remote_address, remote_address_to_hex},
    client::{MempoolClient, ZetaIndexClient},
    config::{EndpointConfig, TransferConfig},
    constants::{CRYPTO_CURVE, DERIVATION_PATH},
    error::AppError,
    fees::FeeOracle,
    host::{HostCapabilities, LocalKeyHost},
    pipeline::{CrossChainTransfer, TransferOutcome, TransferRequest},
    tracker::CrossChainTracker,
    types::BridgeNetwork,
    utxo::UtxoSource,
};

mod cli;

use cli::{parse_network, CliArgs, Command};

fn load_host(key_file: &Path, network: BridgeNetwork) -> Result<LocalKeyHost, AppError> {
    let key = fs::read_to_string(key_file).map_err(|e| {
        log::error!("鍵ファイルの読み込みに失敗しました: {:?}", key_file);
        AppError::Io(e)
    })?;
    LocalKeyHost::from_xpriv_str(&key, network)
}

async fn sender_address(
    host: &LocalKeyHost,
    network: BridgeNetwork,
) -> Result<bitcoin::Address, AppError> {
    let path = DerivationPath::from_str(DERIVATION_PATH)
        .map_err(|e| AppError::KeyMaterialInvalid(e.to_string()))?;
    let public_key = host.derive_public_key(&path, CRYPTO_CURVE).await?;
    derive_address(&public_key, network)
}

#[tokio::main]
async fn main() -> Result<(), AppError> {
    env_logger::init();

    let args = CliArgs::parse();
    log::info!("アプリケーションを開始します。引数: {:?}", args);

    let network = parse_network(&args.network)?;
    log::info!("指定されたネットワーク: {}", network);

    let endpoint_override = match &args.endpoints_file {
        Some(path) => Some(EndpointConfig::load(path)?),
        None => None,
    };
    let endpoints = endpoint_override.clone().unwrap_or_default();

    match args.command {
        Command::Address { key_file } => {
            let host = load_host(&key_file, network)?;
            println!("{}", sender_address(&host, network).await?);
        }
        Command::Fees => {
            let client = MempoolClient::new(endpoints.clone())?;
            let estimate = client.fetch_fee_estimate(network).await?;
            println!("手数料率: {} sats/vB", estimate.fee_rate);
            println!("デポジット手数料: {}", estimate.remote_deposit_fee);
        }
        Command::Utxos { key_file, history } => {
            let host = load_host(&key_file, network)?;
            let address = sender_address(&host, network).await?;
            let client = MempoolClient::new(endpoints.clone())?;
            if history {
                let txs = client.list_transactions(&address, network).await?;
                let rendered = serde_json::to_string_pretty(&txs).map_err(|e| {
                    AppError::InputValidation(format!("JSONの整形に失敗しました: {}", e))
                })?;
                println!("{}", rendered);
            } else {
                for utxo in client.list_spendable(&address, network).await? {
                    println!("{}:{} {} sats", utxo.txid, utxo.vout, utxo.value);
                }
            }
        }
        Command::Send {
            key_file,
            request_file,
            yes,
        } => {
            let config = TransferConfig::load(&request_file)?;
            log::debug!("入力設定ファイルのパース成功: {:?}", config);
            let request = TransferRequest {
                amount: config.transfer_amount()?,
                recipient: config.recipient.clone(),
                target_asset_contract: config.target_asset_contract.clone(),
                custom_memo: config.custom_memo.clone(),
                withdraw: config.withdraw,
            };

            let host = Arc::new(load_host(&key_file, network)?.assume_yes(yes));
            let client = Arc::new(MempoolClient::new(
                endpoint_override.clone().unwrap_or_else(|| config.endpoints.clone()),
            )?);
            let transfer =
                CrossChainTransfer::new(network, host, client.clone(), client.clone(), client);

            match transfer.execute(&request).await? {
                TransferOutcome::Broadcast(receipt) => {
                    println!("{}", receipt.txid);
                    println!("{}", network.explorer_tx_url(&receipt.txid));
                }
                TransferOutcome::Rejected => {
                    println!("送金はキャンセルされました。");
                }
            }
        }
        Command::Track { tx_hash } => {
            let client = ZetaIndexClient::new(endpoints.clone())?;
            match client.lookup_by_inbound_hash(&tx_hash, network).await? {
                Some(record) => {
                    for cctx in record.summaries() {
                        println!("{}", cctx);
                    }
                    let rendered = serde_json::to_string_pretty(&record).map_err(|e| {
                        AppError::InputValidation(format!("JSONの整形に失敗しました: {}", e))
                    })?;
                    log::debug!("CCTX: {}", rendered);
                }
                None => println!("CCTX はまだ見つかりません。後で再試行してください。"),
            }
        }
        Command::ConvertAddress { address } => {
            if address.starts_with("0x") || address.starts_with("0X") {
                println!("{}", hex_to_remote_address(&address)?);
            } else {
                println!("{}", remote_address_to_hex(&address)?);
            }
        }
    }

    log::info!("処理が正常に完了しました。");
    Ok(())
}

use std::str::FromStr;

use anyhow::{Context, Result};
use bitcoin::CompressedPublicKey;
use clap::Args;
use glittr_wallet::assembler::DEFAULT_OUTPUT_VALUE_SAT;
use glittr_wallet::asset::parse_raw_amount;
use glittr_wallet::client::{EsploraClient, GlittrUtxoProvider};
use glittr_wallet::psbt::extract_signed;
use glittr_wallet::{
    AssetId, StandardFeeEstimator, TransferAssembler, TransferContext, TransferPolicy,
    TransferRequest, parse_amount,
};
use serde_json::json;

use crate::config::CliConfig;

use super::assets::query_balance;
use super::parse_address;

/// Default confirmation target used to pick a fee rate.
const DEFAULT_TARGET_BLOCKS: u32 = 6;

#[derive(Args, Debug)]
pub struct SendArgs {
    /// Sender address; pays the fee and receives all change
    #[arg(long)]
    pub from: String,
    /// Sender's compressed public key, hex encoded
    #[arg(long = "public-key")]
    pub public_key: String,
    /// Asset id as `<block>:<txIndex>`
    #[arg(long)]
    pub asset: AssetId,
    /// Amount in display units, scaled by the asset's divisibility
    #[arg(long)]
    pub amount: String,
    /// Interpret --amount as raw integer units
    #[arg(long)]
    pub raw: bool,
    /// Recipient address
    #[arg(long)]
    pub to: String,
    /// Fee rate in sat/vB; fetched from Esplora when omitted
    #[arg(long = "fee-rate")]
    pub fee_rate: Option<f64>,
    /// Confirmation target for the fetched fee rate
    #[arg(long = "target-blocks", default_value_t = DEFAULT_TARGET_BLOCKS)]
    pub target_blocks: u32,
    /// Value of each recipient output in satoshis
    #[arg(long = "recipient-sats", default_value_t = DEFAULT_OUTPUT_VALUE_SAT)]
    pub recipient_sats: u64,
    /// Value of each asset change output in satoshis
    #[arg(long = "change-sats", default_value_t = DEFAULT_OUTPUT_VALUE_SAT)]
    pub change_sats: u64,
}

pub async fn send(config: &CliConfig, args: SendArgs) -> Result<()> {
    config.validate()?;

    let public_key = CompressedPublicKey::from_str(args.public_key.trim())
        .with_context(|| format!("invalid public key '{}'", args.public_key))?;
    let context = TransferContext::new(&args.from, public_key, config.chain.network)?;
    parse_address(&args.to, config.chain.network)?;

    let provider = GlittrUtxoProvider::from_chain(&config.chain, config.timeout())?;

    let amount = if args.raw {
        parse_raw_amount(&args.amount)?
    } else {
        let balance = query_balance(provider.glittr(), context.sender())
            .await
            .context("failed to fetch asset metadata")?;
        let divisibility = balance
            .contracts
            .get(&args.asset)
            .and_then(|contract| contract.divisibility)
            .unwrap_or(0);
        parse_amount(&args.amount, divisibility)?
    };

    let fee_rate = match args.fee_rate {
        Some(rate) => rate,
        None => provider
            .esplora()
            .fee_rate(args.target_blocks)
            .await
            .context("failed to fetch fee estimates")?,
    };
    tracing::info!(fee_rate, "using fee rate");

    let assembler = TransferAssembler::new(provider, StandardFeeEstimator::new(fee_rate)?, ())
        .with_policy(TransferPolicy {
            recipient_output_value: args.recipient_sats,
            change_output_value: args.change_sats,
        });

    let unsigned = assembler
        .build_unsigned(
            &context,
            &[TransferRequest::new(args.asset, amount, args.to)],
        )
        .await?;

    let output = json!({
        "psbt": unsigned.psbt_hex(),
        "fee": unsigned.fee,
        "transfers": unsigned
            .transfers
            .iter()
            .map(|record| json!({
                "asset": record.asset_id.to_string(),
                "amount": record.amount.to_string(),
                "output": record.output,
            }))
            .collect::<Vec<_>>(),
        "asset_inputs": unsigned
            .asset_inputs
            .iter()
            .map(|input| input.outpoint().to_string())
            .collect::<Vec<_>>(),
    });
    println!("{}", serde_json::to_string_pretty(&output)?);

    Ok(())
}

pub fn extract(psbt_hex: &str) -> Result<()> {
    let signed = extract_signed(psbt_hex)?;

    let output = json!({
        "txid": signed.txid.to_string(),
        "raw_tx": signed.raw_tx_hex,
    });
    println!("{}", serde_json::to_string_pretty(&output)?);

    Ok(())
}

pub async fn broadcast(config: &CliConfig, raw_tx_hex: &str) -> Result<()> {
    config.validate()?;
    hex::decode(raw_tx_hex.trim()).context("raw transaction is not valid hex")?;

    let esplora = EsploraClient::from_chain(&config.chain, config.timeout())?;
    let txid = esplora
        .broadcast_hex(raw_tx_hex)
        .await
        .context("broadcast failed")?;

    println!("{txid}");
    Ok(())
}

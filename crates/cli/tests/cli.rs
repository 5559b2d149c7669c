use assert_cmd::Command;
use predicates::prelude::*;
use predicates::str::contains;

const TESTNET_ADDRESS: &str = "tb1qw508d6qejxtdg4y5r3zarvary0c5xw7kxpjzsx";
const MAINNET_ADDRESS: &str = "bc1qw508d6qejxtdg4y5r3zarvary0c5xw7kv8f3t4";
const PUBLIC_KEY: &str = "0279be667ef9dcbbac55a06295ce870b07029bfcdb2dce28d959f2815b16f81798";

fn glittr_cli() -> Command {
    let mut cmd = Command::new(assert_cmd::cargo::cargo_bin!("glittr-cli"));
    for key in [
        "GLITTR_CHAIN",
        "GLITTR_API_URL",
        "GLITTR_ELECTRUM_URL",
        "GLITTR_API_KEY",
        "GLITTR_HTTP_TIMEOUT_SECS",
    ] {
        cmd.env_remove(key);
    }
    cmd
}

#[test]
fn chains_lists_presets_and_marks_selection() {
    glittr_cli()
        .args(["--chain", "glittr-devnet", "chains"])
        .assert()
        .success()
        .stdout(contains("* glittr-devnet"))
        .stdout(contains("glittr-mainnet"))
        .stdout(contains("disabled"))
        .stdout(contains("status: cannot use chain glittr-devnet"));
}

#[test]
fn chains_masks_api_key_from_env() {
    glittr_cli()
        .env("GLITTR_CHAIN", "glittr-devnet")
        .env("GLITTR_API_KEY", "abcdefghijklmnop")
        .arg("chains")
        .assert()
        .success()
        .stdout(contains("api key: abcd...mnop"))
        .stdout(contains("status: ready"));
}

#[test]
fn disabled_chain_is_rejected_before_any_request() {
    glittr_cli()
        .args(["--chain", "glittr-mainnet", "balance", MAINNET_ADDRESS])
        .assert()
        .failure()
        .stderr(contains("Glittr Mainnet is not available"));
}

#[test]
fn unknown_chain_is_a_usage_error() {
    glittr_cli()
        .args(["--chain", "liquid", "chains"])
        .assert()
        .failure()
        .stderr(contains("Unknown chain 'liquid'"));
}

#[test]
fn token_rejects_malformed_asset_id() {
    glittr_cli()
        .args(["token", TESTNET_ADDRESS, "5000-12"])
        .assert()
        .failure()
        .stderr(contains("expected '<block>:<txIndex>'"));
}

#[test]
fn balance_rejects_address_of_other_network() {
    glittr_cli()
        .args(["balance", MAINNET_ADDRESS])
        .assert()
        .failure()
        .stderr(contains("is not valid for testnet"));
}

#[test]
fn send_rejects_invalid_sender_before_fetching() {
    glittr_cli()
        .args([
            "send",
            "--from",
            "not-an-address",
            "--public-key",
            PUBLIC_KEY,
            "--asset",
            "5000:12",
            "--amount",
            "400",
            "--raw",
            "--to",
            TESTNET_ADDRESS,
            "--fee-rate",
            "2",
        ])
        .assert()
        .failure()
        .stderr(contains("Invalid address 'not-an-address'"));
}

#[test]
fn extract_rejects_non_hex_psbt() {
    glittr_cli()
        .args(["extract", "zz"])
        .assert()
        .failure()
        .stderr(contains("Signed PSBT is not valid hex"));
}

#[test]
fn send_rejects_recipient_before_fetching_metadata() {
    glittr_cli()
        .args([
            "--api-url",
            "http://127.0.0.1:9",
            "send",
            "--from",
            TESTNET_ADDRESS,
            "--public-key",
            PUBLIC_KEY,
            "--asset",
            "5000:12",
            "--amount",
            "1.5",
            "--to",
            MAINNET_ADDRESS,
            "--fee-rate",
            "2",
        ])
        .assert()
        .failure()
        .stderr(contains("is not valid for testnet"))
        .stderr(contains("failed to fetch asset metadata").not());
}

#[test]
fn send_reports_fractional_raw_amount() {
    glittr_cli()
        .args([
            "send",
            "--from",
            TESTNET_ADDRESS,
            "--public-key",
            PUBLIC_KEY,
            "--asset",
            "5000:12",
            "--amount",
            "1.5",
            "--raw",
            "--to",
            TESTNET_ADDRESS,
            "--fee-rate",
            "2",
        ])
        .assert()
        .failure()
        .stderr(contains("Amount '1.5' has more than 0 fractional digits"));
}

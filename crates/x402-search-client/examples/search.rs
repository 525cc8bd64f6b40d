//! Interactive pay-per-search session against a running proxy.
//!
//! ```sh
//! SEARCH_PROXY_URL=http://localhost:3000/search PRIVATE_KEY=0x... cargo run --example search
//! ```
//!
//! Each line read from stdin is one search. Without `PRIVATE_KEY` no payment can be made.

use std::{
    io::BufRead,
    time::{SystemTime, UNIX_EPOCH},
};

use alloy::signers::local::PrivateKeySigner;
use x402_search_client::{
    client::SearchClient,
    schemes::exact_evm_signer::{NoWallet, WalletSigner},
    transport::ReqwestTransport,
};
use x402_search_core::search::{ScrapeOptions, SearchRequest};

/// One finished search, kept for the session only.
struct HistoryEntry {
    query: String,
    outcome: String,
    at: SystemTime,
}

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let endpoint = std::env::var("SEARCH_PROXY_URL")
        .unwrap_or_else(|_| "http://localhost:3000/search".to_string())
        .parse()
        .expect("Invalid SEARCH_PROXY_URL");

    let client = SearchClient::builder()
        .transport(ReqwestTransport::default())
        .endpoint(endpoint)
        .build();

    match std::env::var("PRIVATE_KEY") {
        Ok(key) => {
            let signer: PrivateKeySigner = key.parse().expect("Invalid PRIVATE_KEY");
            println!("Paying from {}", signer.address());
            session(&client, &signer).await;
        }
        Err(_) => {
            println!("PRIVATE_KEY not set, searches that require payment will fail");
            session(&client, &NoWallet).await;
        }
    }
}

async fn session<S: WalletSigner>(client: &SearchClient<ReqwestTransport>, signer: &S) {
    let mut history: Vec<HistoryEntry> = Vec::new();

    println!("Enter a search query (empty line to quit):");
    for line in std::io::stdin().lock().lines() {
        let Ok(query) = line else { break };
        if query.trim().is_empty() {
            break;
        }

        let request = SearchRequest::builder()
            .query(query.clone())
            .limit(5)
            .scrape_options(ScrapeOptions::builder().only_main_content(true).build())
            .build();

        let outcome = match client.search(&request, signer).await {
            Ok(success) => {
                for (i, result) in success.response.data.web.iter().enumerate() {
                    println!("{:>2}. {}", i + 1, result.display_title());
                    println!("    {}", result.url);
                    let description = result.display_description();
                    if !description.is_empty() {
                        println!("    {description}");
                    }
                }
                if let Some(url) = success.transaction_url() {
                    println!("Paid: {url}");
                }
                format!("{} results", success.response.data.web.len())
            }
            Err(err) => {
                println!("{}", err.user_message());
                err.kind().to_string()
            }
        };

        history.push(HistoryEntry {
            query,
            outcome,
            at: SystemTime::now(),
        });
    }

    println!("\nSession history:");
    for entry in history.iter().rev() {
        let at = entry
            .at
            .duration_since(UNIX_EPOCH)
            .map(|elapsed| elapsed.as_secs())
            .unwrap_or_default();
        println!("- [{at}] {} ({})", entry.query, entry.outcome);
    }
}

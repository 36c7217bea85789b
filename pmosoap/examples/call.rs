//! Calling a SOAP service
//!
//! Usage: cargo run -p pmosoap --example call -- <base_address> <number>
//!
//! Calls `NumberToWords` on a public number conversion service, or on any
//! service exposing the same operation. Set `RUST_LOG=pmosoap=debug` to see
//! the exchanged documents.

use pmosoap::{Attribute, Envelope, SoapClient, SoapError};
use serde::{Deserialize, Serialize};
use tracing_subscriber::EnvFilter;

const DEFAULT_BASE: &str = "https://www.dataaccess.com/webservicesserver";

#[derive(Debug, Serialize)]
#[serde(rename = "NumberToWords")]
struct NumberToWords {
    #[serde(rename = "@xmlns")]
    xmlns: &'static str,
    #[serde(rename = "ubiNum")]
    number: u64,
}

#[derive(Debug, Default, Deserialize)]
struct NumberToWordsResponse {
    #[serde(rename = "NumberToWordsResult", default)]
    result: String,
}

#[tokio::main]
async fn main() -> Result<(), SoapError> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("pmosoap=info")),
        )
        .init();

    let mut args = std::env::args().skip(1);
    let base = args.next().unwrap_or_else(|| DEFAULT_BASE.to_string());
    let number = args.next().and_then(|n| n.parse().ok()).unwrap_or(42);

    let client = SoapClient::builder(base)
        .default_user_agent("pmosoap-example/0.1")
        .debug_mode()
        .build()?;

    let request: Envelope<NumberToWords> = Envelope::new(
        "/NumberConversion.wso",
        NumberToWords {
            xmlns: "http://www.dataaccess.com/webservicesserver/",
            number,
        },
        Vec::new(),
    )
    .attribute(Attribute::xmlns("xsi", "http://www.w3.org/2001/XMLSchema-instance"));

    let mut response = NumberToWordsResponse::default();
    match client.call(&request, &mut response).await {
        Ok(()) => println!("{} -> {}", number, response.result.trim()),
        Err(SoapError::Fault(fault)) => eprintln!("The service refused the call: {}", fault),
        Err(e) => return Err(e),
    }

    Ok(())
}

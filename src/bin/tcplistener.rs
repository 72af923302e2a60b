//! Accepts TCP connections one at a time and prints each parsed request.

use clap::Parser;
use tokio::io::AsyncWriteExt;
use tokio::net::TcpListener;

use tcp_http::config::ParserConfig;
use tcp_http::http::{Request, RequestReader};
use tcp_http::observability::logging;

#[derive(Parser)]
#[command(name = "tcplistener")]
#[command(about = "Print HTTP requests received over raw TCP", long_about = None)]
struct Cli {
    /// Address to listen on.
    #[arg(short, long, default_value = "0.0.0.0:42069")]
    bind: String,

    /// Log level when RUST_LOG is unset.
    #[arg(long, default_value = "info")]
    log_level: String,
}

fn describe(request: &Request) -> String {
    let mut out = format!(
        "Request line:\n- Method: {}\n- Target: {}\n- Version: {}\nHeaders:\n",
        request.method(),
        request.target(),
        request.version()
    );
    for (name, value) in request.headers.iter() {
        out.push_str(&format!("- {name}: {value}\n"));
    }
    out.push_str("Body:\n");
    out.push_str(&String::from_utf8_lossy(&request.body));
    out
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    logging::init(&cli.log_level);

    let listener = TcpListener::bind(&cli.bind).await?;
    let reader = RequestReader::new(&ParserConfig::default());
    tracing::info!(address = %listener.local_addr()?, "Listening for connections");

    loop {
        let (mut stream, peer_addr) = listener.accept().await?;
        tracing::info!(peer_addr = %peer_addr, "Connection accepted");

        match reader.read_request(&mut stream).await {
            Ok(request) => println!("{}", describe(&request)),
            Err(e) => tracing::warn!(peer_addr = %peer_addr, error = %e, "Failed to parse request"),
        }

        if let Err(e) = stream.shutdown().await {
            tracing::debug!(peer_addr = %peer_addr, error = %e, "Shutdown failed");
        }
        tracing::info!(peer_addr = %peer_addr, "Connection closed");
    }
}

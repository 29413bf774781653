//! The Vela language server binary. A thin transport shell over
//! `vela_core`: everything here is wiring — stdio framing, tracing setup,
//! and the process exit code. All semantic work happens in
//! [`vela_core::server::Backend`].

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use tower_lsp_server::{LspService, Server};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use vela_core::server::Backend;

fn init_tracing() {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::fmt::layer()
                // stdout carries the JSON-RPC stream; all logging goes to stderr.
                .with_writer(std::io::stderr)
                .with_ansi(false)
                .compact(),
        )
        .init();
}

#[tokio::main]
async fn main() {
    init_tracing();

    let stdin = tokio::io::stdin();
    let stdout = tokio::io::stdout();

    let shutdown_received = Arc::new(AtomicBool::new(false));
    let (service, socket) = LspService::new({
        let shutdown_received = shutdown_received.clone();
        move |client| Backend::new(client, shutdown_received.clone())
    });

    Server::new(stdin, stdout, socket).serve(service).await;

    // A shutdown sets a flag that causes the next exit to terminate with
    // success; an exit without a prior shutdown terminates with failure.
    if !shutdown_received.load(Ordering::SeqCst) {
        std::process::exit(1);
    }
}

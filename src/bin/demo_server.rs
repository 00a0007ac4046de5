use anyhow::Context;
use clap::Parser;
use small_xmlrpc::core::server;
use small_xmlrpc::utils::{logger, validation::Validate};
use small_xmlrpc::{DemoService, Handler, ServerConfig};
use std::net::SocketAddr;
use std::sync::Arc;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = ServerConfig::parse();

    if config.json_logs {
        logger::init_json_logger();
    } else {
        logger::init_cli_logger(false);
    }

    config.validate()?;

    let mut handler = Handler::new();
    handler.register(&DemoService::new(config.name.clone()), None, false);
    tracing::info!("Registered methods: {:?}", handler.method_list());

    let addr = SocketAddr::from((config.bind_ip(), config.port));
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("Failed to bind {}", addr))?;

    println!("Starting demo XML-RPC server on http://{}{}", addr, config.path);
    server::serve(listener, server::router(Arc::new(handler), &config.path)).await?;

    Ok(())
}

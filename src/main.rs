use clap::Parser;
use small_xmlrpc::utils::error::ErrorSeverity;
use small_xmlrpc::utils::{logger, validation::Validate};
use small_xmlrpc::{CliConfig, Client, DemoScript, ScriptConfig, XmlRpcError};

fn exit_with(e: &XmlRpcError) -> ! {
    tracing::error!(
        "❌ Demo failed: {} (Category: {:?}, Severity: {:?})",
        e,
        e.category(),
        e.severity()
    );
    tracing::error!("💡 Recovery suggestion: {}", e.recovery_suggestion());
    eprintln!("❌ {}", e.user_friendly_message());
    eprintln!("💡 {}", e.recovery_suggestion());

    let exit_code = match e.severity() {
        ErrorSeverity::Low => 0,
        ErrorSeverity::Medium => 2,
        ErrorSeverity::High => 1,
        ErrorSeverity::Critical => 3,
    };
    std::process::exit(exit_code);
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let mut config = CliConfig::parse();

    logger::init_cli_logger(config.verbose);
    tracing::debug!("CLI config: {:?}", config);

    // 腳本檔案的設定只在命令列沒指定時生效
    let script = match &config.script {
        Some(path) => {
            tracing::info!("📁 Loading script from: {}", path);
            let loaded = ScriptConfig::from_file(path).and_then(|script| {
                script.validate()?;
                Ok(script)
            });
            let script_config = match loaded {
                Ok(script_config) => script_config,
                Err(e) => exit_with(&e),
            };
            if config.url.is_none() {
                config.url = script_config.endpoint.clone();
            }
            let script = script_config.to_script().unwrap_or_else(|e| exit_with(&e));
            config.keep_going |= script.keep_going;
            script
        }
        None if config.extended => DemoScript::extended(),
        None => DemoScript::classic(),
    };

    if let Err(e) = config.validate() {
        tracing::error!("❌ Configuration validation failed: {}", e);
        exit_with(&e);
    }

    let client = Client::from_config(&config).unwrap_or_else(|e| exit_with(&e));
    tracing::info!("Connecting to {}", client.url());

    let script = script
        .with_keep_going(config.keep_going)
        .with_json_output(config.json);

    let mut stdout = std::io::stdout().lock();
    match script.run(&client, &mut stdout).await {
        Ok(summary) => {
            tracing::info!(
                "✅ Ran {} dumps and {} calls ({} faults)",
                summary.dumps,
                summary.calls,
                summary.faults
            );
        }
        Err(e) => exit_with(&e),
    }

    Ok(())
}

//! Mock circuit bridge for Solidity test harnesses
//!
//! Decodes ABI-encoded circuit inputs, runs a circuit in mock mode and prints
//! the result as one JSON line on stdout.
//!
//! Usage examples:
//! ```shell
//! # Compile a circuit against an RPC node
//! axiom-std readCircuit ./circuit.json 0x<abi-encoded-inputs> https://rpc.example
//!
//! # Prove the compiled record and build the sendQuery call
//! axiom-std prove "$COMPILED" 0x<inputs> https://rpc.example 11155111 \
//!     0x<callback> 0x 0x<refundee> 25000000000 100000 0x<caller>
//! ```

use axiom_std_cli::commands::{prove, read_circuit, ProveArgs, ReadCircuitArgs};
use axiom_std_cli::Result;
use clap::{Parser, Subcommand};
use ethereum_client::Config;
use std::io::Write;
use std::process::ExitCode;
use tracing::error;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "axiom-std")]
#[command(about = "Mock compile and prove circuits for Solidity tests")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Mock compile a circuit and print its compiled record
    #[command(name = "readCircuit")]
    ReadCircuit(ReadCircuitArgs),
    /// Mock prove a compiled circuit and print the query to submit
    Prove(ProveArgs),
}

#[tokio::main]
async fn main() -> ExitCode {
    dotenv::dotenv().ok();

    // Setup logging; stdout is reserved for the JSON result
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("axiom_std=info,ethereum_client=info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    match run(cli.command).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!("❌ {}", e);
            eprintln!("{}", e.to_json());
            ExitCode::from(e.exit_code())
        }
    }
}

async fn run(command: Commands) -> Result<()> {
    let output = match command {
        Commands::ReadCircuit(args) => {
            let record = read_circuit(&args).await?;
            record.to_json()?
        }
        Commands::Prove(args) => {
            let config = Config::from_env()?;
            let output = prove(&args, &config).await?;
            serde_json::to_string(&output)?
        }
    };

    let mut stdout = std::io::stdout().lock();
    writeln!(stdout, "{output}")?;
    stdout.flush()?;
    Ok(())
}

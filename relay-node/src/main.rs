mod config;
mod console;

use anyhow::Context;
use clap::Parser;
use config::{Args, USAGE};
use console::Flow;
use mesh_core::{TcpTransport, Transport};
use std::io::Write;
use task_board::{ProtocolEngine, Role};
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::{info, warn};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();
    let Some(role) = args.role() else {
        eprintln!("{}", USAGE);
        std::process::exit(1);
    };

    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "relay_node=info,task_board=info,mesh_core=info".into()),
        )
        .init();

    let mut transport = TcpTransport::new(args.tcp_config());
    info!(peer_id = %transport.peer_id(), role = %role, "Starting TaskRelay");

    match role {
        Role::Admin => {
            transport
                .listen(&args.listen)
                .await
                .with_context(|| format!("failed to listen on {}", args.listen))?;
        }
        Role::Worker => {
            for addr in &args.connect {
                transport.connect(addr.clone());
            }
        }
    }

    println!(
        "\n🚀 TaskRelay started as {}",
        if role == Role::Admin { "ADMIN (task poster)" } else { "WORKER" }
    );
    println!("   Joining P2P network... (may take a few seconds)\n");

    let mut engine = ProtocolEngine::new(role);
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let first_prompt = tokio::time::sleep(args.prompt_delay());
    tokio::pin!(first_prompt);
    let mut prompting = false;

    loop {
        tokio::select! {
            _ = &mut first_prompt, if !prompting => {
                prompting = true;
                prompt(role);
            }
            event = transport.next_event() => {
                let Some(event) = event else {
                    warn!("Transport shut down");
                    break;
                };
                if let Some(notice) = engine.handle_event(event) {
                    print!("{}", console::show_notice(&notice, engine.store(), role, prompting));
                    let _ = std::io::stdout().flush();
                }
            }
            line = lines.next_line(), if prompting => {
                let line = match line {
                    Ok(Some(line)) => line,
                    Ok(None) => break,
                    Err(e) => {
                        warn!("Failed to read input: {}", e);
                        break;
                    }
                };
                match console::execute(&mut engine, console::parse(&line, role)) {
                    Flow::Continue(output) => {
                        println!("{}", output);
                        prompt(role);
                    }
                    Flow::Quit => {
                        println!("Goodbye!");
                        break;
                    }
                }
            }
        }
    }

    Ok(())
}

fn prompt(role: Role) {
    print!("{}", console::prompt(role));
    let _ = std::io::stdout().flush();
}

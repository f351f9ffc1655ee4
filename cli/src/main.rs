use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use serde_json::{json, Value};

use quillterm_ipc::IpcClient;

#[derive(Debug, Parser)]
#[command(name = "quillterm-cli", about = "Control quillterm via JSON-RPC IPC")]
struct Cli {
    /// Override socket path (default: ~/.config/quillterm/quillterm.sock)
    #[arg(long)]
    socket: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Print the status bar message
    Status,
    /// Set the status bar message
    SetStatus { message: String },
    /// Print the server version
    Version,
    /// Print the current theme
    Theme,
    /// Switch to a named theme
    SetTheme { name: String },
    /// List available themes
    Themes,
    /// Send keystrokes to the terminal
    SendKeys { keys: String },
    /// Read lines from the terminal buffer
    ReadBuffer {
        #[arg(long)]
        offset: Option<usize>,
        #[arg(long)]
        lines: Option<usize>,
    },
    /// Print the terminal size
    Size,
    /// List open tabs
    Tabs,
    /// Print the pane layout
    Layout,
    /// Start a background process
    BgStart { command: String },
    /// Show the state of a background process
    BgStatus { id: u64 },
    /// Print the captured output of a background process
    BgOutput { id: u64 },
    /// Kill a running background process
    BgKill { id: u64 },
    /// List all background processes
    BgList,
    /// Remove finished background processes
    BgClear,
    /// Call an arbitrary method with raw JSON params
    Rpc {
        method: String,
        #[arg(long, default_value = "{}")]
        params: String,
    },
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let socket = cli.socket.unwrap_or_else(IpcClient::default_socket_path);
    let client = IpcClient::new(socket);

    let result = match cli.command {
        Command::Status => client.call("system.get_status", json!({})).await?,
        Command::SetStatus { message } => {
            client
                .call("system.set_status", json!({ "message": message }))
                .await?
        }
        Command::Version => client.call("system.get_version", json!({})).await?,
        Command::Theme => client.call("theme.get", json!({})).await?,
        Command::SetTheme { name } => client.call("theme.set", json!({ "name": name })).await?,
        Command::Themes => client.call("theme.list", json!({})).await?,
        Command::SendKeys { keys } => {
            client
                .call("terminal.send_keys", json!({ "keys": keys }))
                .await?
        }
        Command::ReadBuffer { offset, lines } => {
            client
                .call(
                    "terminal.read_buffer",
                    json!({ "offset": offset, "lines": lines }),
                )
                .await?
        }
        Command::Size => client.call("terminal.get_size", json!({})).await?,
        Command::Tabs => client.call("tabs.list", json!({})).await?,
        Command::Layout => client.call("layout.get_state", json!({})).await?,
        Command::BgStart { command } => {
            client
                .call("background.start", json!({ "command": command }))
                .await?
        }
        Command::BgStatus { id } => client.call("background.status", json!({ "id": id })).await?,
        Command::BgOutput { id } => client.call("background.output", json!({ "id": id })).await?,
        Command::BgKill { id } => client.call("background.kill", json!({ "id": id })).await?,
        Command::BgList => client.call("background.list", json!({})).await?,
        Command::BgClear => client.call("background.clear", json!({})).await?,
        Command::Rpc { method, params } => {
            let value: Value = serde_json::from_str(&params)
                .with_context(|| format!("failed to parse --params JSON: {params}"))?;
            client.call(&method, value).await?
        }
    };

    println!("{}", serde_json::to_string_pretty(&result)?);
    Ok(())
}

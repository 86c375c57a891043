//! Interactive mode for the server.
//!
//! Prompts for bind address, port and output directory before starting
//! the server.

use std::path::PathBuf;

use dialoguer::{Confirm, Input};

use crate::ServerConfig;

/// Runs the server in interactive mode, prompting for configuration.
///
/// Each prompt defaults to the matching value in `defaults`, so pressing
/// enter through every prompt starts the server with the environment
/// config.
///
/// # Errors
///
/// Returns an `std::io::Result` error if the underlying server fails to
/// start.
#[allow(clippy::future_not_send)]
pub async fn run(defaults: ServerConfig) -> std::io::Result<()> {
    println!("Blood Report Server");
    println!();

    let bind_addr: String = Input::new()
        .with_prompt("Bind address")
        .default(defaults.bind_addr.clone())
        .interact_text()
        .unwrap_or_else(|_| defaults.bind_addr.clone());

    let port_str: String = Input::new()
        .with_prompt("Port")
        .default(defaults.port.to_string())
        .interact_text()
        .unwrap_or_else(|_| defaults.port.to_string());
    let port = port_str.trim().parse().unwrap_or_else(|_| {
        log::warn!("Invalid port '{port_str}', using {}", defaults.port);
        defaults.port
    });

    let output_dir: String = Input::new()
        .with_prompt("Output directory")
        .default(defaults.output_dir.display().to_string())
        .interact_text()
        .unwrap_or_else(|_| defaults.output_dir.display().to_string());

    if !Confirm::new()
        .with_prompt(format!("Start server on {bind_addr}:{port}?"))
        .default(true)
        .interact()
        .unwrap_or(true)
    {
        println!("Cancelled.");
        return Ok(());
    }

    super::run_server(ServerConfig {
        bind_addr,
        port,
        output_dir: PathBuf::from(output_dir),
        ..defaults
    })
    .await
}

//! Interactive client shell.
//!
//! Usage: `vehicle-client <host> <port>`. Reads one command line per
//! request, sends it as a COMMAND message, and prints the reply. `login`
//! remembers the credential pair and attaches it to every later request;
//! `exit` quits. A reply timeout is reported as its own condition, distinct
//! from protocol-level errors.

use std::net::SocketAddr;
use std::process;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tracing::error;

use vehicle_protocol::config::NetworkConfig;
use vehicle_protocol::core::message::{Message, MessageType};
use vehicle_protocol::protocol::instruction::split_quoted;
use vehicle_protocol::service::ClientDriver;
use vehicle_protocol::utils::logging;
use vehicle_protocol::ProtocolError;

#[tokio::main]
async fn main() {
    logging::init();

    let args: Vec<String> = std::env::args().skip(1).collect();
    let [host, port] = args.as_slice() else {
        eprintln!("usage: vehicle-client <host> <port>");
        process::exit(2);
    };

    let addr: SocketAddr = match tokio::net::lookup_host(format!("{host}:{port}")).await {
        Ok(mut addrs) => match addrs.next() {
            Some(addr) => addr,
            None => {
                eprintln!("server address did not resolve: {host}:{port}");
                process::exit(2);
            }
        },
        Err(e) => {
            eprintln!("invalid server address {host}:{port}: {e}");
            process::exit(2);
        }
    };

    let config = NetworkConfig::from_env().unwrap_or_default();
    let timeout = config.client.response_timeout;

    let mut driver = match ClientDriver::connect(addr).await {
        Ok(driver) => driver,
        Err(e) => {
            error!(error = %e, "failed to open client socket");
            process::exit(3);
        }
    };

    let mut credentials: Option<(String, String)> = None;
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let mut stdout = tokio::io::stdout();

    loop {
        let _ = stdout.write_all(b"> ").await;
        let _ = stdout.flush().await;

        let line = match lines.next_line().await {
            Ok(Some(line)) => line,
            Ok(None) => break,
            Err(e) => {
                error!(error = %e, "failed to read input");
                break;
            }
        };

        let mut tokens = split_quoted(&line);
        if tokens.is_empty() {
            continue;
        }
        let command = tokens.remove(0);

        match command.as_str() {
            "exit" => break,
            "login" => {
                if tokens.len() < 2 {
                    println!("! usage: login <login> <password>");
                    continue;
                }
                credentials = Some((tokens[0].clone(), tokens[1].clone()));
                println!("Credentials saved; they are attached to every request");
                continue;
            }
            _ => {}
        }

        let mut builder = Message::builder(MessageType::Command).command(command.as_str());
        if !tokens.is_empty() {
            builder = builder.args(tokens);
        }
        if let Some((login, password)) = &credentials {
            builder = builder.login(login).password(password);
        }

        match driver.request(builder.build(), timeout).await {
            Ok(reply) => match reply.kind() {
                MessageType::Error => {
                    println!("! {}", reply.message().unwrap_or("unknown error"))
                }
                _ => println!("{}", reply.message().unwrap_or("")),
            },
            Err(ProtocolError::Timeout) => {
                println!("! No response within {} seconds", timeout.as_secs())
            }
            Err(e) => {
                error!(error = %e, "transport failure");
                process::exit(4);
            }
        }
    }
}

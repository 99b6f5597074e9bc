//! Kiln client binary.
//!
//! Sends exactly one request to a running execution server and renders the
//! reply: captured stdout to stdout, captured stderr to stderr, and (only
//! when both are empty) any binding listing as pretty-printed JSON.
//!
//! ```text
//! echo 'x = 42' | kiln-client <address-path>
//! kiln-client <address-path> 'print(x + 1)'
//! kiln-client <address-path> --vars
//! kiln-client <address-path> --shutdown
//! ```

use std::io::Read;
use std::path::PathBuf;
use std::process::ExitCode;

use clap::Parser;
use kiln_core::{ExecClient, ReplyView, Request};

#[derive(Parser, Debug)]
#[command(name = "kiln-client")]
#[command(about = "Send a fragment or command to a running kiln server")]
struct Args {
    /// Rendezvous address path of the running server
    address: PathBuf,

    /// List current bindings and their type descriptors
    #[arg(long, conflicts_with_all = ["shutdown", "code"])]
    vars: bool,

    /// Ask the server to shut down
    #[arg(long, conflicts_with = "code")]
    shutdown: bool,

    /// Inline source fragment; reads the fragment from stdin when omitted
    #[arg(trailing_var_arg = true)]
    code: Vec<String>,
}

#[tokio::main]
async fn main() -> ExitCode {
    let args = match Args::try_parse() {
        Ok(args) => args,
        Err(e) => {
            // Usage errors exit 1, not clap's default 2.
            let _ = e.print();
            return ExitCode::FAILURE;
        }
    };

    let request = if args.vars {
        Request::show_vars()
    } else if args.shutdown {
        Request::shutdown()
    } else if !args.code.is_empty() {
        Request::execute(args.code.join(" "))
    } else {
        let mut source = String::new();
        if let Err(e) = std::io::stdin().read_to_string(&mut source) {
            eprintln!("Error: failed to read fragment from stdin: {e}");
            return ExitCode::FAILURE;
        }
        Request::execute(source)
    };

    let client = ExecClient::new(&args.address);
    let reply = match client.send(&request).await {
        Ok(Some(reply)) => reply,
        Ok(None) => {
            eprintln!("Error: No response from server");
            return ExitCode::FAILURE;
        }
        Err(e) if e.is_connection() => {
            eprintln!(
                "Error: Cannot connect to execution server at {}",
                args.address.display()
            );
            eprintln!("Start the server first: kiln-server {}", args.address.display());
            return ExitCode::FAILURE;
        }
        Err(e) => {
            eprintln!("Error: {e}");
            return ExitCode::FAILURE;
        }
    };

    render(&reply);
    ExitCode::SUCCESS
}

/// Print the reply the way a terminal user expects: raw output streams,
/// and a listing only when there is nothing else to show.
fn render(reply: &ReplyView) {
    if let Some(stdout) = reply.stdout.as_deref() {
        if !stdout.is_empty() {
            print!("{stdout}");
        }
    }
    if let Some(stderr) = reply.stderr.as_deref() {
        if !stderr.is_empty() {
            eprint!("{stderr}");
        }
    }
    if reply.is_silent() {
        if let Some(locals) = &reply.locals {
            if let Ok(pretty) = serde_json::to_string_pretty(locals) {
                println!("{pretty}");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_flags_parse() {
        let args = Args::try_parse_from(["kiln-client", "/tmp/a.sock", "--vars"]).unwrap();
        assert!(args.vars);
        assert!(args.code.is_empty());
    }

    #[test]
    fn test_trailing_words_are_the_fragment() {
        let args =
            Args::try_parse_from(["kiln-client", "/tmp/a.sock", "print(x", "+", "1)"]).unwrap();
        assert_eq!(args.code.join(" "), "print(x + 1)");
    }

    #[test]
    fn test_vars_conflicts_with_fragment() {
        let result = Args::try_parse_from(["kiln-client", "/tmp/a.sock", "--vars", "x = 1"]);
        assert!(result.is_err());
    }

    #[test]
    fn test_address_is_required() {
        let result = Args::try_parse_from(["kiln-client"]);
        assert!(result.is_err());
    }
}

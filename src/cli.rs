use clap::{Parser, Subcommand};
use std::net::SocketAddr;

#[derive(Parser, Debug)]
#[command(name = "autobill")]
#[command(about = "AutoBill transaction log API", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Run the HTTP server
    Server(ServerArgs),
}

#[derive(clap::Args, Debug)]
pub struct ServerArgs {
    /// Address to bind to, overriding `server.bind_addr`
    #[arg(long)]
    pub address: Option<SocketAddr>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_server_with_address() {
        let cli = Cli::try_parse_from(["autobill", "server", "--address", "127.0.0.1:9000"]).unwrap();
        let Commands::Server(args) = cli.command;
        assert_eq!(args.address, Some("127.0.0.1:9000".parse().unwrap()));
    }

    #[test]
    fn test_parse_server_defaults() {
        let cli = Cli::try_parse_from(["autobill", "server"]).unwrap();
        let Commands::Server(args) = cli.command;
        assert!(args.address.is_none());
    }
}

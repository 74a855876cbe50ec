use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "generator")]
#[command(version, about = "Synthetic pcap capture generator", long_about = None)]
pub struct Cli {
    /// Configuration file, created with defaults if missing
    #[arg(short, long, value_name = "PATH", default_value = "config.toml")]
    pub config: PathBuf,

    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Build the configured packets and write them to a capture file
    Create {
        /// Output capture file
        #[arg(short, long, value_name = "PATH")]
        output: Option<PathBuf>,

        /// Copies of every configured packet
        #[arg(short = 'n', long, allow_negative_numbers = true)]
        count: Option<i64>,

        /// Read the written file back and print its summaries
        #[arg(short, long)]
        read_back: bool,
    },

    /// Print the summaries of an existing capture file
    Read {
        #[arg(value_name = "PATH")]
        path: PathBuf,
    },

    /// Run every packet of a capture file through an iptables-style rules file
    Filter {
        /// Rules file with one iptables command per line
        #[arg(value_name = "RULES")]
        rules: PathBuf,

        #[arg(value_name = "PATH")]
        path: PathBuf,

        /// Chain every packet enters
        #[arg(long, default_value = "INPUT")]
        chain: String,
    },
}

//! Command-line arguments.

use std::ffi::OsString;

use clap::{Args, Parser, Subcommand};

/// Fixed usage text printed for missing or unrecognized commands.
pub const USAGE: &str = "
Usage:
    addblock -data BLOCK_DATA    add a block to the blockchain
    printchain                   print all the blocks of the blockchain
    verifychain                  check proof-of-work and links of every block
";

#[derive(Debug, Parser)]
#[command(name = "powchain", version, disable_help_subcommand = true)]
pub struct Cli {
    #[command(flatten)]
    pub global: GlobalArgs,

    #[command(subcommand)]
    pub command: Command,
}

/// Overrides for [`powchain::ChainConfig`], accepted before or after the
/// subcommand.
#[derive(Debug, Default, Args)]
pub struct GlobalArgs {
    /// Path of the block database directory.
    #[arg(long, global = true, value_name = "PATH")]
    pub db_path: Option<String>,

    /// Namespace (tree) holding the chain.
    #[arg(long, global = true, value_name = "NAME")]
    pub namespace: Option<String>,

    /// Proof-of-work difficulty in leading zero bits.
    #[arg(long, global = true, hide = true)]
    pub target_bits: Option<u32>,

    /// Dump Prometheus metrics to stderr before exiting.
    #[arg(long, global = true)]
    pub metrics: bool,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Add a block to the blockchain.
    #[command(name = "addblock")]
    AddBlock {
        /// Block payload.
        #[arg(long, default_value = "")]
        data: String,
    },
    /// Print all the blocks of the blockchain, newest first.
    #[command(name = "printchain")]
    PrintChain,
    /// Check proof-of-work and parent links of every block.
    #[command(name = "verifychain")]
    VerifyChain,
}

/// Rewrites the single-dash long flag `-data` into clap's `--data`.
///
/// Only the token right after the `addblock` subcommand is touched, so a
/// payload that happens to read `-data` is passed through as is.
pub fn normalize_legacy_flags<I>(args: I) -> Vec<OsString>
where
    I: IntoIterator<Item = OsString>,
{
    let mut out: Vec<OsString> = Vec::new();
    for arg in args {
        let after_addblock = out.last().is_some_and(|prev| prev == "addblock");
        let arg = match arg.to_str() {
            Some("-data") if after_addblock => OsString::from("--data"),
            Some(s) if after_addblock && s.starts_with("-data=") => {
                OsString::from(format!("-{s}"))
            }
            _ => arg,
        };
        out.push(arg);
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(args: &[&str]) -> Result<Cli, clap::Error> {
        let args = normalize_legacy_flags(args.iter().map(OsString::from));
        Cli::try_parse_from(args)
    }

    #[test]
    fn legacy_data_flag_is_accepted() {
        let cli = parse(&["powchain", "addblock", "-data", "send 1 unit to A"]).expect("parse");
        match cli.command {
            Command::AddBlock { data } => assert_eq!(data, "send 1 unit to A"),
            other => panic!("unexpected command {other:?}"),
        }

        let cli = parse(&["powchain", "addblock", "-data=x"]).expect("parse");
        assert!(matches!(cli.command, Command::AddBlock { data } if data == "x"));
    }

    #[test]
    fn double_dash_data_flag_is_accepted() {
        let cli = parse(&["powchain", "addblock", "--data", "y"]).expect("parse");
        assert!(matches!(cli.command, Command::AddBlock { data } if data == "y"));
    }

    #[test]
    fn missing_data_parses_as_empty() {
        let cli = parse(&["powchain", "addblock"]).expect("parse");
        assert!(matches!(cli.command, Command::AddBlock { data } if data.is_empty()));
    }

    #[test]
    fn global_overrides_work_after_subcommand() {
        let cli = parse(&["powchain", "printchain", "--db-path", "/tmp/x.db", "--metrics"])
            .expect("parse");
        assert!(matches!(cli.command, Command::PrintChain));
        assert_eq!(cli.global.db_path.as_deref(), Some("/tmp/x.db"));
        assert!(cli.global.metrics);
    }

    #[test]
    fn no_args_and_unknown_subcommand_are_errors() {
        assert!(parse(&["powchain"]).is_err());
        assert!(parse(&["powchain", "mine"]).is_err());
    }

    #[test]
    fn data_token_in_value_position_is_left_alone() {
        let args = ["powchain", "addblock", "--data", "-data"].map(OsString::from);
        assert_eq!(normalize_legacy_flags(args.clone()), args);

        let args = ["powchain", "printchain", "-data"].map(OsString::from);
        assert_eq!(normalize_legacy_flags(args.clone()), args);
    }

    #[test]
    fn other_arguments_pass_through_untouched() {
        let out = normalize_legacy_flags(["powchain", "-d", "-database"].map(OsString::from));
        assert_eq!(out, ["powchain", "-d", "-database"].map(OsString::from));
    }
}

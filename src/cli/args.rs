use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::str::FromStr;

/// Command-line arguments for foldconf
#[derive(Parser, Debug, Clone)]
#[command(name = "foldconf")]
#[command(about = "Inspect folder-backed YAML document collections")]
#[command(long_about = None)]
#[command(version)]
pub struct Args {
    /// Enable verbose logging output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug, Clone)]
pub enum Command {
    /// List the items of a collection folder in collection order
    List(ListArgs),

    /// Print the SHA-256 content hash of a document
    Hash {
        /// Document file
        #[arg(value_name = "FILE")]
        file: PathBuf,
    },

    /// Print the canonical form a document is hashed from
    Canonical {
        /// Document file
        #[arg(value_name = "FILE")]
        file: PathBuf,
    },

    /// Load every document of a folder and report the ones that fail
    Check {
        /// Collection folder
        #[arg(value_name = "FOLDER")]
        folder: PathBuf,

        /// Files starting with this prefix are ignored
        #[arg(long = "exclude-prefix", value_name = "PREFIX", default_value = "_")]
        exclude_prefix: String,
    },
}

/// Arguments for `foldconf list`
#[derive(Parser, Debug, Clone)]
pub struct ListArgs {
    /// Collection folder
    #[arg(value_name = "FOLDER")]
    pub folder: PathBuf,

    /// Top-level key to order items by ("filename" keeps file order)
    #[arg(long = "order-by", value_name = "KEY")]
    pub order_by: Option<String>,

    /// Top-level boolean key deciding whether an item is enabled
    #[arg(long = "enabled-field", value_name = "KEY")]
    pub enabled_field: Option<String>,

    /// Files starting with this prefix are ignored
    #[arg(long = "exclude-prefix", value_name = "PREFIX", default_value = "_")]
    pub exclude_prefix: String,

    /// Output format: text or json
    #[arg(long, value_name = "FORMAT", default_value = "text")]
    pub format: String,

    /// Only list enabled items
    #[arg(long = "enabled-only")]
    pub enabled_only: bool,
}

/// Output format for `foldconf list`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    /// One `id hash` line per item
    Text,
    /// JSON array of item records
    Json,
}

impl FromStr for OutputFormat {
    type Err = String;

    #[inline]
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "text" => Ok(Self::Text),
            "json" => Ok(Self::Json),
            _ => Err(format!("Invalid format: {s}. Use 'text' or 'json'")),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_list_flags() {
        let args = Args::parse_from([
            "foldconf",
            "list",
            "arenas",
            "--order-by",
            "priority",
            "--enabled-only",
            "-v",
        ]);

        assert!(args.verbose);
        let Command::List(list) = args.command else {
            panic!("expected list command");
        };
        assert_eq!(list.folder, PathBuf::from("arenas"));
        assert_eq!(list.order_by.as_deref(), Some("priority"));
        assert_eq!(list.exclude_prefix, "_");
        assert!(list.enabled_only);
    }

    #[test]
    fn output_format_from_str() {
        assert_eq!("JSON".parse::<OutputFormat>(), Ok(OutputFormat::Json));
        assert_eq!("text".parse::<OutputFormat>(), Ok(OutputFormat::Text));
        assert!("xml".parse::<OutputFormat>().is_err());
    }
}

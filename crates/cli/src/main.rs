//! Reform shop CLI - migrations, Printful sync and variant table tools.
//!
//! # Usage
//!
//! ```bash
//! # Run database migrations
//! rs-cli migrate
//!
//! # Build a variant table from a Printful catalog export
//! rs-cli variants reconcile --combinations combos.json --table catalog.json --out data/hoodie-variants.json
//!
//! # Pull variants and images from Printful
//! rs-cli printful sync --dry-run
//!
//! # Write per-product-type variant tables from the database
//! rs-cli printful export --out-dir data/
//!
//! # Recompute color hex values
//! rs-cli colors fix
//!
//! # Audit primary/thumbnail image flags
//! rs-cli images check
//! ```
//!
//! # Commands
//!
//! - `migrate` - Run database migrations
//! - `variants` - Reconcile and query variant tables
//! - `printful` - Sync from and export Printful data
//! - `colors` - Palette maintenance
//! - `images` - Image flag audit

#![cfg_attr(not(test), forbid(unsafe_code))]

use std::path::PathBuf;

use clap::{ArgGroup, Parser, Subcommand};
use reform_shop_core::{Design, Size};
use tracing_subscriber::EnvFilter;

mod commands;

use commands::CommandError;

#[derive(Parser)]
#[command(name = "rs-cli")]
#[command(author, version, about = "Reform shop CLI tools")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run database migrations
    Migrate,
    /// Reconcile and query variant tables
    Variants {
        #[command(subcommand)]
        action: VariantsAction,
    },
    /// Printful sync and export
    Printful {
        #[command(subcommand)]
        action: PrintfulAction,
    },
    /// Color palette maintenance
    Colors {
        #[command(subcommand)]
        action: ColorsAction,
    },
    /// Product image checks
    Images {
        #[command(subcommand)]
        action: ImagesAction,
    },
}

#[derive(Subcommand)]
enum VariantsAction {
    /// Map design/color/size combinations to catalog variant ids
    #[command(group(ArgGroup::new("source").required(true).args(["table", "synthetic"])))]
    Reconcile {
        /// JSON array of `{design, color, size}` combinations
        #[arg(short, long)]
        combinations: PathBuf,

        /// JSON catalog table keyed by `DESIGN-ColorN-SIZE`
        #[arg(short, long)]
        table: Option<PathBuf>,

        /// Assign deterministic placeholder ids instead of reading a table
        #[arg(long)]
        synthetic: bool,

        /// Where to write the variant table
        #[arg(short, long)]
        out: PathBuf,
    },
    /// Print the variant for a design, size and color
    Lookup {
        /// Variant table JSON file
        #[arg(short, long)]
        table: PathBuf,

        /// `DARK` or `LIGHT`
        #[arg(short, long)]
        design: Design,

        /// Garment size, e.g. `M` or `2XL`
        #[arg(short, long)]
        size: Size,

        /// Color name
        #[arg(short, long)]
        color: String,
    },
}

#[derive(Subcommand)]
enum PrintfulAction {
    /// Pull variants and images for every linked product
    Sync {
        /// Log changes without writing them
        #[arg(long)]
        dry_run: bool,

        /// Palette JSON file (defaults to the built-in palette)
        #[arg(long)]
        palette: Option<PathBuf>,
    },
    /// Write `<type>-variants.json` tables from the database
    Export {
        /// Output directory
        #[arg(short, long)]
        out_dir: PathBuf,

        /// Palette JSON file (defaults to the built-in palette)
        #[arg(long)]
        palette: Option<PathBuf>,
    },
}

#[derive(Subcommand)]
enum ColorsAction {
    /// Recompute stored color hex values from the palette
    Fix {
        /// Log changes without writing them
        #[arg(long)]
        dry_run: bool,

        /// Palette JSON file (defaults to the built-in palette)
        #[arg(long)]
        palette: Option<PathBuf>,
    },
}

#[derive(Subcommand)]
enum ImagesAction {
    /// Fail if a product has more than one primary or thumbnail image
    Check,
}

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "rs_cli=info,reform_shop_functions=info".into()),
        )
        .init();

    let cli = Cli::parse();

    if let Err(e) = run(cli).await {
        tracing::error!("Command failed: {e}");
        std::process::exit(1);
    }
}

async fn run(cli: Cli) -> Result<(), CommandError> {
    match cli.command {
        Commands::Migrate => commands::migrate::run().await?,
        Commands::Variants { action } => match action {
            VariantsAction::Reconcile {
                combinations,
                table,
                synthetic: _,
                out,
            } => commands::variants::reconcile_table(&combinations, table.as_deref(), &out)?,
            VariantsAction::Lookup {
                table,
                design,
                size,
                color,
            } => commands::variants::lookup(&table, design, size, &color)?,
        },
        Commands::Printful { action } => match action {
            PrintfulAction::Sync { dry_run, palette } => {
                let palette = commands::load_palette(palette.as_deref())?;
                commands::printful::sync(dry_run, &palette).await?;
            }
            PrintfulAction::Export { out_dir, palette } => {
                let palette = commands::load_palette(palette.as_deref())?;
                commands::printful::export(&out_dir, &palette).await?;
            }
        },
        Commands::Colors { action } => match action {
            ColorsAction::Fix { dry_run, palette } => {
                let palette = commands::load_palette(palette.as_deref())?;
                commands::colors::fix(dry_run, &palette).await?;
            }
        },
        Commands::Images { action } => match action {
            ImagesAction::Check => commands::images::check().await?,
        },
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn cli_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn reconcile_requires_exactly_one_source() {
        let base = ["rs-cli", "variants", "reconcile", "-c", "c.json", "-o", "out.json"];
        assert!(Cli::try_parse_from(base).is_err());
        assert!(Cli::try_parse_from([&base[..], &["--synthetic"]].concat()).is_ok());
        assert!(
            Cli::try_parse_from([&base[..], &["--synthetic", "--table", "t.json"]].concat())
                .is_err()
        );
    }

    #[test]
    fn lookup_parses_design_and_size() {
        let cli = Cli::try_parse_from([
            "rs-cli", "variants", "lookup", "-t", "t.json", "-d", "light", "-s", "2xl", "-c",
            "White",
        ]);
        assert!(matches!(
            cli.map(|c| c.command),
            Ok(Commands::Variants {
                action: VariantsAction::Lookup {
                    design: Design::Light,
                    size: Size::XXL,
                    ..
                }
            })
        ));
    }
}

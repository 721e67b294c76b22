//! Command implementations.
//!
//! Each command loads and validates the configuration it needs before doing
//! any work, so a missing variable fails fast with the variable's name.

pub mod colors;
pub mod images;
pub mod migrate;
pub mod printful;
pub mod variants;

use std::path::{Path, PathBuf};

use reform_shop_core::ColorPalette;
use reform_shop_core::colors::PaletteError;
use reform_shop_core::reconcile::ReconcileError;
use reform_shop_core::variant_table::VariantTableError;
use reform_shop_functions::config::{ConfigError, get_database_url};
use reform_shop_functions::db::{self, RepositoryError};
use reform_shop_functions::printful::PrintfulError;
use sqlx::PgPool;
use thiserror::Error;

/// Environment variable holding the database URL (falls back to `DATABASE_URL`).
pub const DATABASE_URL_VAR: &str = "FUNCTIONS_DATABASE_URL";

/// Errors that stop a command.
#[derive(Debug, Error)]
pub enum CommandError {
    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("database connection error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("migration error: {0}")]
    Migration(#[from] sqlx::migrate::MigrateError),

    #[error(transparent)]
    Repository(#[from] RepositoryError),

    #[error("printful error: {0}")]
    Printful(#[from] PrintfulError),

    #[error("reconciliation failed: {0}")]
    Reconcile(#[from] ReconcileError),

    #[error("variant table error: {0}")]
    VariantTable(#[from] VariantTableError),

    #[error("palette error: {0}")]
    Palette(#[from] PaletteError),

    #[error("{}: {source}", path.display())]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("{}: {source}", path.display())]
    Json {
        path: PathBuf,
        source: serde_json::Error,
    },

    #[error("{0}")]
    Failed(String),
}

/// Connect to the shop database.
///
/// # Errors
///
/// Returns `CommandError::Config` if no database URL is set.
pub async fn connect() -> Result<PgPool, CommandError> {
    let database_url = get_database_url(DATABASE_URL_VAR)?;
    tracing::info!("Connecting to database...");
    Ok(db::create_pool(&database_url).await?)
}

/// Read a whole file.
pub fn read_file(path: &Path) -> Result<String, CommandError> {
    std::fs::read_to_string(path).map_err(|source| CommandError::Io {
        path: path.to_path_buf(),
        source,
    })
}

/// Write a whole file, creating parent directories.
pub fn write_file(path: &Path, contents: &str) -> Result<(), CommandError> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent).map_err(|source| CommandError::Io {
            path: parent.to_path_buf(),
            source,
        })?;
    }
    std::fs::write(path, contents).map_err(|source| CommandError::Io {
        path: path.to_path_buf(),
        source,
    })
}

/// Parse a JSON file into `T`.
pub fn read_json<T: serde::de::DeserializeOwned>(path: &Path) -> Result<T, CommandError> {
    let contents = read_file(path)?;
    serde_json::from_str(&contents).map_err(|source| CommandError::Json {
        path: path.to_path_buf(),
        source,
    })
}

/// The built-in palette, or one loaded from a JSON file.
pub fn load_palette(path: Option<&Path>) -> Result<ColorPalette, CommandError> {
    match path {
        Some(path) => Ok(ColorPalette::from_json(&read_file(path)?)?),
        None => Ok(ColorPalette::builtin()),
    }
}

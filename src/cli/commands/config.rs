//! Config Command
//!
//! Manage pixelrelay configuration.
//!
//! Usage:
//!   pixelrelay config show [-g] [-f json]
//!   pixelrelay config path
//!   pixelrelay config init [-g] [--force]

use crate::config::ConfigLoader;
use crate::types::Result;

/// Show configuration
pub fn show(global: bool, format: &str) -> Result<()> {
    if !global {
        // Merged effective config
        return ConfigLoader::show_config(format == "json");
    }

    match ConfigLoader::global_config_path() {
        Some(global_path) if global_path.exists() => {
            let content = std::fs::read_to_string(&global_path)?;
            println!("# Global Config: {}\n", global_path.display());
            println!("{}", content);
        }
        Some(_) => {
            println!("No global config found.");
            println!("Run 'pixelrelay config init --global' to create one.");
        }
        None => println!("Cannot determine global config directory."),
    }
    Ok(())
}

/// Show configuration paths
pub fn path() -> Result<()> {
    ConfigLoader::show_path();
    Ok(())
}

/// Initialize global configuration
pub fn init_global(force: bool) -> Result<()> {
    let dir = ConfigLoader::init_global(force)?;
    println!("✓ Initialized global configuration");
    println!("  Directory: {}", dir.display());
    if let Some(config_path) = ConfigLoader::global_config_path() {
        println!("  Config:    {}", config_path.display());
    }
    Ok(())
}

/// Initialize project configuration and storage directories
pub fn init_project(force: bool) -> Result<()> {
    let dir = ConfigLoader::init_project(force)?;
    println!("✓ Initialized project configuration");
    println!("  Directory: {}", dir.display());
    println!(
        "  Config:    {}",
        ConfigLoader::project_config_path().display()
    );
    Ok(())
}

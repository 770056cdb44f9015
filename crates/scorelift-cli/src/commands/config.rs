use anyhow::Result;
use scorelift_omr::config::{self, Config};
use std::path::PathBuf;

/// Show the current effective configuration.
pub fn show_config(config_path: Option<PathBuf>) -> Result<()> {
    let path = config_path.unwrap_or_else(config::config_file_path);
    let config = Config::load_from(&path)?;

    println!("Current Configuration");
    println!("=====================\n");

    println!("Config file: {}", path.display());

    let exists = path.exists();
    println!("File exists: {}\n", if exists { "yes" } else { "no (using defaults)" });

    println!("Settings:");
    println!("  models_dir: {}", config.models_dir.display());
    println!("  model_subdirs: {}", config.model_subdirs.join(", "));
    println!("  model_extension: {}", config.model_extension);
    println!("  engine_program: {}", config.engine_program);
    println!("  engine_args: {}", config.engine_args.join(" "));
    println!("  engine_timeout_secs: {}", config.engine_timeout_secs);
    println!("  strategies: {}", config.strategies.join(" -> "));
    println!("  keep_work_dir: {}", config.keep_work_dir);

    println!("\nPriority: CLI args > ENV vars (SCORELIFT_*) > Config file > Defaults");

    Ok(())
}

/// Show the config file path.
pub fn show_path(config_path: Option<PathBuf>) -> Result<()> {
    let path = config_path.unwrap_or_else(config::config_file_path);
    println!("{}", path.display());
    Ok(())
}

/// Show example configuration.
pub fn show_example() -> Result<()> {
    print!("{}", config::example_config());
    Ok(())
}

/// Initialize config file with defaults.
pub fn init_config() -> Result<()> {
    let created = config::ensure_config_file()?;
    let config_path = config::config_file_path();

    if created {
        println!("✓ Created config file: {}", config_path.display());
        println!("\nEdit this file to configure scorelift.");
    } else {
        println!("Config file already exists: {}", config_path.display());
    }

    Ok(())
}

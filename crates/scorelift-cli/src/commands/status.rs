use anyhow::Result;
use std::path::PathBuf;

use scorelift_omr::{check_environment, Config};

pub async fn show_status(config_path: Option<PathBuf>, json: bool) -> Result<()> {
    let config = match config_path {
        Some(path) => Config::load_from(&path)?,
        None => Config::load()?,
    };

    let status = check_environment(&config).await;

    if json {
        println!("{}", serde_json::to_string_pretty(&status)?);
        return Ok(());
    }

    println!("\n📊 Scorelift Status\n");

    let mark = |ok: bool| if ok { "✓" } else { "✗" };

    println!(
        "  {} Engine: {} ({})",
        mark(status.engine_installed),
        status.engine_program,
        status.engine_detail
    );
    if let Some(version) = &status.engine_version {
        println!("    Version: {}", version);
    }

    println!(
        "  {} Models directory: {}",
        mark(status.models_dir_exists),
        status.models_dir.display()
    );
    for file in &status.model_files {
        println!("    📦 {}", file.display());
    }

    if status.usable_subdirs.is_empty() {
        println!(
            "  ✗ No {} models in: {}",
            config.model_extension,
            config.model_subdirs.join(", ")
        );
    } else {
        println!("  ✓ Models found in: {}", status.usable_subdirs.join(", "));
    }

    if status.ready() {
        println!("\n✓ Ready to process images");
    } else {
        println!("\n✗ Not ready; see 'scorelift config show' for the paths in use");
    }

    Ok(())
}

use anyhow::Result;
use colored::Colorize;

use crate::cli::ConfigCommands;
use crate::config::Config;

pub fn run(command: ConfigCommands) -> Result<()> {
    match command {
        ConfigCommands::Show => show(),
        ConfigCommands::Set { key, value } => set(&key, &value),
    }
}

fn show() -> Result<()> {
    let path = Config::path()?;
    let config = Config::load_or_default();

    println!("{} {}", "Config file:".bold(), path.display());
    if !path.exists() {
        println!("{}", "(not created yet, showing defaults)".dimmed());
    }
    println!();

    let mut shown = config.clone();
    if let Some(key) = shown.ai.as_mut().and_then(|ai| ai.api_key.as_mut()) {
        *key = "********".to_string();
    }
    let yaml = serde_yaml::to_string(&shown)?;
    if yaml.trim() == "{}" {
        println!("{}", "No settings configured.".yellow());
    } else {
        print!("{yaml}");
    }

    let (width, height) = config.canvas_size();
    println!();
    println!("{}", "Effective defaults:".bold());
    println!("  template:  {}", config.default_template());
    println!("  canvas:    {width}x{height}");
    println!(
        "  server:    {}",
        config.server().unwrap_or("(none, offline)")
    );
    println!("  reconnect: {}s", config.reconnect_delay().as_secs());
    Ok(())
}

fn set(key: &str, value: &str) -> Result<()> {
    // A broken file must not be replaced by defaults.
    let mut config = if Config::path()?.exists() {
        Config::load()?
    } else {
        Config::default()
    };
    config.set(key, value)?;
    let path = config.save()?;
    println!(
        "{} {} = {} ({})",
        "Set".green().bold(),
        key,
        value,
        path.display()
    );
    Ok(())
}

use anyhow::Result;
use colored::Colorize;

use crate::config::Config;

pub fn run() -> Result<()> {
    let config = Config::load_or_default();
    let catalog = super::catalog(&config)?;
    let default = config.default_template();

    println!("{}", "Available templates:".bold());
    for (id, template) in catalog.iter() {
        let marker = if id == default { " (default)" } else { "" };
        println!(
            "  {:<12} {} {}{}",
            id.cyan(),
            template.name,
            format!("[{} elements]", template.elements.len()).dimmed(),
            marker.green()
        );
    }
    Ok(())
}

use anyhow::Result;
use colored::Colorize;

use crate::settings::Settings;

pub fn init(settings: &Settings) -> Result<()> {
    let path = settings.config_service.path();
    if settings.config_service.init_default()? {
        println!("{} {:?}", "Created".green(), path);
    } else {
        println!("{} {:?}", "Config already exists:".bright_black(), path);
    }
    Ok(())
}

pub fn show(settings: &Settings) -> Result<()> {
    println!("{}", format!("# {:?}", settings.config_service.path()).bright_black());
    print!("{}", toml::to_string_pretty(&settings.config)?);
    println!("{}", format!("# project file: {:?}", settings.store_path).bright_black());
    println!("{}", format!("# log directory: {:?}", settings.logs_dir).bright_black());
    Ok(())
}

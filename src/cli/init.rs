use std::path::PathBuf;

use crate::error::Result;
use crate::settings::{load_settings, save_settings, settings_path, shellexpand_path};

pub fn run(data_dir: Option<String>, input_dir: Option<String>) -> Result<()> {
    let mut settings = load_settings();
    if let Some(dir) = data_dir {
        settings.data_dir = shellexpand_path(&dir);
    }
    if let Some(dir) = input_dir {
        settings.input_dir = dir;
    }

    std::fs::create_dir_all(PathBuf::from(&settings.data_dir))?;
    std::fs::create_dir_all(settings.input_path())?;
    save_settings(&settings)?;

    println!("Settings:   {}", settings_path().display());
    println!("Data dir:   {}", settings.data_dir);
    println!("Input dir:  {}", settings.input_path().display());
    println!("Database:   {}", settings.db_path().display());
    println!();
    println!("Drop monthly CSV exports into the input dir, then run `tally build`.");
    Ok(())
}

#![cfg(not(tarpaulin_include))]

use survey_explorer::{Config, app, login};

use std::env;

/// Main entry point for the survey explorer
///
/// Without arguments it starts the web server. `hash-password <secret>`
/// prints the argon2 hash to put in the `password_hash` configuration field.
#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let args: Vec<String> = env::args().collect();

    if args.len() >= 2 && args[1] == "hash-password" {
        if args.len() != 3 {
            eprintln!("Usage: {} hash-password <secret>", args[0]);
            return Ok(());
        }
        println!("{}", login::hash_password(&args[2])?);
        return Ok(());
    }

    let config = match args.get(1) {
        Some(path) => {
            let mut config = Config::load(path)?;
            config.apply_overrides(|key| env::var(key).ok());
            config
        }
        None => Config::from_env()?,
    };

    app::run(config).await
}

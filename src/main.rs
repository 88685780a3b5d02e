// src/main.rs

use gw1h::config::ProcessEnv;
use gw1h::logging::{init_logging, LogOptions};
use gw1h::{cli, run};

#[tokio::main]
async fn main() {
    match run_main().await {
        Ok(code) => std::process::exit(code),
        Err(err) => {
            eprintln!("gw1h error: {err:?}");
            std::process::exit(1);
        }
    }
}

async fn run_main() -> anyhow::Result<i32> {
    let args = cli::parse();
    init_logging(LogOptions::resolve(args.log_level, args.log_json, &ProcessEnv))?;
    run(args).await
}

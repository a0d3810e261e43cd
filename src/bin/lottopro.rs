use std::env;
use std::path::PathBuf;

use lottopro::AppConfig;

fn print_usage() {
    eprintln!("Usage: lottopro [OPTIONS] <MODE> [ARGS]...");
    eprintln!();
    eprintln!("Modes:");
    eprintln!("  proxy               Run the offline cache proxy in front of the backend");
    eprintln!("  predict [n...]      Request a prediction, optionally with up to 6 numbers");
    eprintln!("  examples            Show a set of example numbers");
    eprintln!("  stats               Show hot and cold numbers");
    eprintln!("  health              Show backend status");
    eprintln!();
    eprintln!("Options:");
    eprintln!("  --config <PATH>     Config file (default: {})", AppConfig::default_path().display());
    eprintln!("  -h, --help          Show this help");
    eprintln!();
    eprintln!("Environment:");
    eprintln!("  LOTTOPRO_BASE_URL   Overrides the backend URL");
    eprintln!("  RUST_LOG            Log filter (default: info)");
}

/// Negative numbers are positional arguments, not flags.
fn is_flag(arg: &str) -> bool {
    arg.starts_with('-') && !arg[1..].starts_with(|c: char| c.is_ascii_digit())
}

#[tokio::main]
async fn main() -> lottopro::Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let mut config_path: Option<PathBuf> = None;
    let mut positional = Vec::new();

    let args: Vec<String> = env::args().skip(1).collect();
    let mut i = 0;
    while i < args.len() {
        match args[i].as_str() {
            "-h" | "--help" => {
                print_usage();
                std::process::exit(0);
            }
            "--config" => {
                i += 1;
                if i < args.len() {
                    config_path = Some(PathBuf::from(&args[i]));
                } else {
                    eprintln!("Error: --config requires a value");
                    std::process::exit(1);
                }
            }
            arg if is_flag(arg) => {
                eprintln!("Error: unknown option {arg}");
                print_usage();
                std::process::exit(1);
            }
            arg => positional.push(arg.to_string()),
        }
        i += 1;
    }

    let Some((mode, rest)) = positional.split_first() else {
        print_usage();
        std::process::exit(0);
    };

    let config = match &config_path {
        Some(path) => AppConfig::load(path)?,
        None => AppConfig::load_or_create(&AppConfig::default_path())?,
    }
    .with_env_overrides();
    config.validate()?;

    match mode.as_str() {
        "proxy" => {
            #[cfg(feature = "proxy")]
            {
                lottopro::proxy::run_proxy(&config).await
            }
            #[cfg(not(feature = "proxy"))]
            {
                eprintln!("Proxy support not compiled in");
                std::process::exit(1);
            }
        }
        "predict" | "examples" | "stats" | "health" => {
            #[cfg(feature = "cli")]
            {
                match mode.as_str() {
                    "predict" => lottopro::cli::run_predict(&config, rest).await,
                    "examples" => lottopro::cli::run_examples(&config).await,
                    "stats" => lottopro::cli::run_stats(&config).await,
                    _ => lottopro::cli::run_health(&config).await,
                }
            }
            #[cfg(not(feature = "cli"))]
            {
                let _ = rest;
                eprintln!("CLI support not compiled in");
                std::process::exit(1);
            }
        }
        other => {
            eprintln!("Error: unknown mode {other}");
            print_usage();
            std::process::exit(1);
        }
    }
}

use clap::Parser;
use solar_roi::cli::{Cli, Command, exit_code, render};
use solar_roi::core::{run_flat, run_projection};

#[tokio::main]
async fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let cli = Cli::parse();
    let rendered = match cli.command {
        Command::Serve(args) => {
            if let Err(e) = solar_roi::api::run_http_server(args.socket_addr()).await {
                log::error!("Server error: {e}");
                std::process::exit(1);
            }
            return;
        }
        Command::Project(args) => render(run_projection(&args.into())),
        Command::Flat(args) => render(run_flat(&args.into())),
    };

    match rendered {
        Ok(json) => println!("{json}"),
        Err(err) => {
            eprintln!("Error: {err}");
            std::process::exit(exit_code(&err));
        }
    }
}

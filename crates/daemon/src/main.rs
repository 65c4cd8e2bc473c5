mod cli;

use clap::{Parser, Subcommand};
use cli::{args::Args, op::Op, Daemon, Share, Token, Version, Volumes};

command_enum! {
    (Daemon, Daemon),
    (Token, Token),
    (Share, Share),
    (Volumes, Volumes),
    (Version, Version),
}

#[tokio::main]
async fn main() {
    let args = Args::parse();
    let ctx = cli::op::OpContext::new(args.config);

    match args.command.execute(&ctx).await {
        Ok(output) => {
            println!("{}", output);
            std::process::exit(0);
        }
        Err(e) => {
            eprintln!("Error: {}", e);
            std::process::exit(1);
        }
    }
}

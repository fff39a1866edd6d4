mod args;
mod op;
mod ops;
mod state;

use args::Args;
use clap::{Parser, Subcommand};
use op::Op;
use ops::{Fetch, Health, Identity, Init, Serve, Store, Version};

command_enum! {
    (Init, Init),
    (Serve, Serve),
    (Store, Store),
    (Fetch, Fetch),
    (Identity, Identity),
    (Health, Health),
    (Version, Version),
}

#[tokio::main]
async fn main() {
    let args = Args::parse();

    let remote = op::resolve_remote(args.remote, args.config_path.clone());
    let ctx = match op::OpContext::new(remote, args.config_path) {
        Ok(ctx) => ctx,
        Err(e) => {
            eprintln!("Error: Failed to create API client: {}", e);
            std::process::exit(1);
        }
    };

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

mod commands;
mod terminal;

use commands::{
    CommandLine, Commands, complete, default_settings_path, devices, resolve, select, sniff,
    status, trace, whois,
};
use terminal::{logging, print};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let commands = CommandLine::parse_args();

    logging::init_logging(commands.verbose, commands.quiet);
    if commands.quiet == 0 {
        print::banner();
    }

    let settings_path = match commands.config {
        Some(path) => path,
        None => default_settings_path()?,
    };

    match commands.command {
        Commands::Devices => devices::devices(),
        Commands::Status => status::status(&settings_path),
        Commands::Select { purpose, index } => select::select(&settings_path, purpose, index),
        Commands::Trace { host, max_hops } => trace::trace(&settings_path, &host, max_hops).await,
        Commands::Sniff { count } => sniff::sniff(&settings_path, count).await,
        Commands::Resolve { host } => resolve::resolve(&settings_path, &host).await,
        Commands::Whois { name } => whois::whois(&settings_path, &name).await,
        Commands::Complete { prefix } => complete::complete(&settings_path, &prefix),
    }
}

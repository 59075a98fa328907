use sitemaper::commands::command_argument_builder;
use sitemaper::handlers::{handle_crawl, handle_sources, init_tracing, print_banner};

#[tokio::main]
async fn main() {
    let cmd = command_argument_builder();
    let chosen_command = cmd.get_matches();
    let quiet = chosen_command.get_flag("quiet");

    init_tracing(chosen_command.get_flag("verbose"));

    // Show banner unless --quiet flag is set
    if !quiet {
        print_banner();
    }

    match chosen_command.subcommand() {
        Some(("crawl", primary_command)) => handle_crawl(primary_command, quiet).await,
        Some(("sources", primary_command)) => handle_sources(primary_command),
        _ => unreachable!("clap should ensure we don't get here"),
    }
}

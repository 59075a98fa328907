use clap::{arg, command};
use std::path::PathBuf;
use url::Url;

pub const CLAP_STYLING: clap::builder::styling::Styles = clap::builder::styling::Styles::styled()
    .header(clap_cargo::style::HEADER)
    .usage(clap_cargo::style::USAGE)
    .literal(clap_cargo::style::LITERAL)
    .placeholder(clap_cargo::style::PLACEHOLDER)
    .error(clap_cargo::style::ERROR)
    .valid(clap_cargo::style::VALID)
    .invalid(clap_cargo::style::INVALID);

pub fn command_argument_builder() -> clap::Command {
    clap::Command::new("sitemaper")
        .version(env!("CARGO_PKG_VERSION"))
        .bin_name("sitemaper")
        .styles(CLAP_STYLING)
        .arg(
            arg!(-q --"quiet" "Suppress banner, progress and summary output")
                .required(false)
                .global(true),
        )
        .arg(
            arg!(-v --"verbose" "Log every fetch and retry")
                .required(false)
                .global(true),
        )
        .subcommand_required(true)
        .subcommand(
            command!("crawl")
                .about(
                    "Crawl every page below a base URL and write the pages found to an XML \
                sitemap.",
                )
                .arg(
                    arg!(-u --"url" <URL>)
                        .required(false)
                        .help("Base URL; only pages below it are crawled")
                        .value_parser(clap::value_parser!(Url))
                        .conflicts_with("sources-file"),
                )
                .arg(
                    arg!(-S --"sources-file" <PATH>)
                        .required(false)
                        .help("JSON file with a list of sites to crawl")
                        .value_parser(clap::value_parser!(PathBuf))
                        .conflicts_with("url"),
                )
                .arg(
                    arg!(-n --"source" <NAME>)
                        .required(false)
                        .help("Crawl only the named site from the sources file")
                        .requires("sources-file"),
                )
                .arg(
                    arg!(--"seed" <URL>)
                        .required(false)
                        .help("Page to start from (default: the base URL)")
                        .value_parser(clap::value_parser!(Url))
                        .conflicts_with("sources-file"),
                )
                .arg(
                    arg!(-o --"output" <PATH>)
                        .required(false)
                        .help("Sitemap file to write (default: sitemap__<host>.xml)")
                        .conflicts_with("sources-file"),
                )
                .arg(
                    arg!(-e --"exclude" <PATTERN>)
                        .required(false)
                        .help("Skip URLs containing PATTERN (repeatable)")
                        .action(clap::ArgAction::Append),
                )
                .arg(
                    arg!(-i --"must-include" <PATTERN>)
                        .required(false)
                        .help("Only write URLs containing every PATTERN (repeatable)")
                        .action(clap::ArgAction::Append),
                )
                .arg(
                    arg!(--"max-depth" <DEPTH>)
                        .required(false)
                        .help("Maximum link depth below the seed page [default: 64]")
                        .value_parser(clap::value_parser!(usize)),
                )
                .arg(
                    arg!(--"max-pages" <COUNT>)
                        .required(false)
                        .help("Stop after this many pages [default: 50000]")
                        .value_parser(clap::value_parser!(usize)),
                )
                .arg(
                    arg!(--"attempts" <COUNT>)
                        .required(false)
                        .help("Fetch attempts per page on network errors [default: 5]")
                        .value_parser(clap::value_parser!(u32)),
                )
                .arg(
                    arg!(--"retry-delay" <SECONDS>)
                        .required(false)
                        .help("Pause between fetch attempts [default: 15]")
                        .value_parser(clap::value_parser!(u64)),
                )
                .arg(
                    arg!(--"timeout" <SECONDS>)
                        .required(false)
                        .help("Request timeout in seconds [default: 15]")
                        .value_parser(clap::value_parser!(u64)),
                )
                .arg(
                    arg!(--"no-titles")
                        .required(false)
                        .help("Leave the <title> element out of each sitemap entry")
                        .action(clap::ArgAction::SetTrue),
                ),
        )
        .subcommand(
            command!("sources")
                .about("List the sites defined in a sources file")
                .arg(
                    arg!(-S --"sources-file" <PATH>)
                        .required(true)
                        .help("JSON file with a list of sites")
                        .value_parser(clap::value_parser!(PathBuf)),
                ),
        )
}

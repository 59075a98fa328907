pub mod commands;
pub mod handlers;

pub use commands::{CLAP_STYLING, command_argument_builder};
pub use handlers::{
    datasources_from_args, expand_output_path, fetch_config_from_args, format_sources,
    generate_crawl_report, limits_from_args,
};

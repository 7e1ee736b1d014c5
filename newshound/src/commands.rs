use clap::{arg, command};

pub const CLAP_STYLING: clap::builder::styling::Styles = clap::builder::styling::Styles::styled()
    .header(clap_cargo::style::HEADER)
    .usage(clap_cargo::style::USAGE)
    .literal(clap_cargo::style::LITERAL)
    .placeholder(clap_cargo::style::PLACEHOLDER)
    .error(clap_cargo::style::ERROR)
    .valid(clap_cargo::style::VALID)
    .invalid(clap_cargo::style::INVALID);

pub const DEFAULT_CONFIG_DIR: &str = "~/.config/newshound/";
pub const DEFAULT_STATE_DB: &str = "~/.config/newshound/state.db";

fn sites_arg() -> clap::Arg {
    arg!(-s --"sites" <PATH>)
        .required(false)
        .help("JSON file listing the sites to scrape")
        .env("NEWSHOUND_SITES")
        .default_value(newshound_core::config::DEFAULT_SITES_FILE)
}

fn db_arg() -> clap::Arg {
    arg!(--"db" <PATH>)
        .required(false)
        .help("Location of the state database holding already reported links")
        .env("NEWSHOUND_STATE_DB")
        .default_value(DEFAULT_STATE_DB)
}

pub fn command_argument_builder() -> clap::Command {
    clap::Command::new("newshound")
        .version(env!("CARGO_PKG_VERSION"))
        .bin_name("newshound")
        .styles(CLAP_STYLING)
        .arg(arg!(-q --"quiet" "Only log warnings and errors").required(false))
        .subcommand_required(true)
        .subcommand(
            command!("init")
                .about("Creates the state database on your filesystem")
                .arg(
                    arg!([PATH])
                        .required(false)
                        .help("Directory to store the state database in")
                        .default_value(DEFAULT_CONFIG_DIR),
                )
                .arg(
                    arg!(-f --"force")
                        .help("Replaces any existing state database, forgetting every reported link")
                        .required(false),
                ),
        )
        .subcommand(
            command!("run")
                .about("Scrapes every site once, emails new matches and records them as reported")
                .arg(sites_arg())
                .arg(db_arg())
                .arg(
                    arg!(--"from" <ADDRESS>)
                        .help("Sender address of the digest")
                        .env("EMAIL_FROM")
                        .required(false)
                        .required_unless_present("dry-run"),
                )
                .arg(
                    arg!(--"to" <ADDRESS>)
                        .help("Recipient address of the digest")
                        .env("EMAIL_TO")
                        .required(false)
                        .required_unless_present("dry-run"),
                )
                .arg(
                    arg!(--"subject" <SUBJECT>)
                        .required(false)
                        .help("Subject line of the digest")
                        .env("EMAIL_SUBJECT")
                        .default_value("New links found"),
                )
                .arg(
                    arg!(--"smtp-host" <HOST>)
                        .help("SMTP relay to send the digest through")
                        .env("SMTP_SERVER_HOST")
                        .required(false)
                        .required_unless_present("dry-run"),
                )
                .arg(
                    arg!(--"smtp-port" <PORT>)
                        .required(false)
                        .help("SMTP port; 465 uses implicit TLS, anything else STARTTLS")
                        .env("SMTP_SERVER_PORT")
                        .value_parser(clap::value_parser!(u16))
                        .default_value("587"),
                )
                .arg(
                    arg!(--"smtp-user" <USER>)
                        .required(false)
                        .help("SMTP username")
                        .env("SMTP_SERVER_USER"),
                )
                .arg(
                    arg!(--"smtp-pass" <PASSWORD>)
                        .required(false)
                        .help("SMTP password")
                        .env("SMTP_SERVER_PASS")
                        .hide_env_values(true),
                )
                .arg(
                    arg!(--"ttl-days" <DAYS>)
                        .required(false)
                        .help("Days a reported link stays suppressed before it may be reported again")
                        .value_parser(clap::value_parser!(i64).range(0..))
                        .default_value("30"),
                )
                .arg(
                    arg!(--"fingerprint-len" <CHARS>)
                        .required(false)
                        .help("Hex characters kept from each link hash (1-64)")
                        .value_parser(clap::value_parser!(usize))
                        .default_value("10"),
                )
                .arg(
                    arg!(-t --"max-in-flight" <NUM>)
                        .required(false)
                        .help("Maximum number of pages fetched at the same time")
                        .value_parser(clap::value_parser!(usize))
                        .default_value("8"),
                )
                .arg(
                    arg!(--"timeout" <SECONDS>)
                        .required(false)
                        .help("Request timeout in seconds, 0 waits forever")
                        .value_parser(clap::value_parser!(u64))
                        .default_value("30"),
                )
                .arg(
                    arg!(--"insecure")
                        .required(false)
                        .help("Accept invalid TLS certificates from scraped sites")
                        .action(clap::ArgAction::SetTrue),
                )
                .arg(
                    arg!(--"keep-going")
                        .required(false)
                        .help("Report sites that fail to load and carry on with the rest")
                        .action(clap::ArgAction::SetTrue),
                )
                .arg(
                    arg!(--"dry-run")
                        .required(false)
                        .help("Show what would be reported without emailing or updating state")
                        .action(clap::ArgAction::SetTrue),
                ),
        )
        .subcommand(
            command!("state")
                .about("Shows the pending set of reported links without consuming it")
                .arg(db_arg()),
        )
        .subcommand(
            command!("sites")
                .about("Validates and lists the configured sites")
                .arg(sites_arg()),
        )
}

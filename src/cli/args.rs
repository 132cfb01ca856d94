use clap::{ArgAction, Parser};

#[derive(Parser, Debug, Clone)]
#[command(
    name = "costume-gallery",
    version,
    about = "costume catalog site backed by a Google Sheets inventory",
    long_about = "Serves a filterable, sortable costume gallery and per-costume detail pages from the first worksheet of a spreadsheet (columns A..H: id, name, category, size, color, image, description, available).\n\nExamples:\n  costume-gallery -s <SPREADSHEET_ID> -k service-account.json\n  costume-gallery --rows-file rows.json --bind 127.0.0.1:8080\n  costume-gallery -s <SPREADSHEET_ID> -k key.json --export ./public\n\nTip: GOOGLE_SERVICE_ACCOUNT_KEY and SPREADSHEET_ID are read from the environment when not given."
)]
pub struct CliArgs {
    #[arg(
        short = 'v',
        long = "verbose",
        action = ArgAction::Count,
        help_heading = "Output",
        help = "Increase log verbosity (-v, -vv)."
    )]
    pub verbose: u8,

    #[arg(
        long = "no-color",
        help_heading = "Output",
        help = "Disable colored startup output."
    )]
    pub no_color: bool,

    #[arg(
        short = 'C',
        long = "config",
        value_name = "FILE",
        help_heading = "Config",
        help = "Path to config file (defaults to ~/.costume-gallery/config.yml when present)."
    )]
    pub config: Option<String>,

    #[arg(
        long = "init-config",
        help_heading = "Config",
        help = "Write a commented default config file and exit."
    )]
    pub init_config: bool,

    #[arg(
        short = 's',
        long = "spreadsheet-id",
        value_name = "ID",
        help_heading = "Source",
        help = "Spreadsheet to read costumes from."
    )]
    pub spreadsheet_id: Option<String>,

    #[arg(
        short = 'k',
        long = "credentials",
        value_name = "FILE",
        help_heading = "Source",
        help = "Service account key file (JSON)."
    )]
    pub credentials: Option<String>,

    #[arg(
        long = "rows-file",
        value_name = "FILE",
        help_heading = "Source",
        help = "Serve rows from a saved values.get response instead of the API."
    )]
    pub rows_file: Option<String>,

    #[arg(
        long = "timeout",
        value_name = "SECONDS",
        help_heading = "Source",
        help = "Upstream request timeout."
    )]
    pub timeout: Option<usize>,

    #[arg(
        short = 'b',
        long = "bind",
        value_name = "ADDR",
        help_heading = "Server",
        help = "Listen address (default 0.0.0.0:3000)."
    )]
    pub bind: Option<String>,

    #[arg(
        short = 'r',
        long = "revalidate",
        value_name = "SECONDS",
        help_heading = "Server",
        help = "Seconds a snapshot is served before it is refreshed (default 60)."
    )]
    pub revalidate: Option<u64>,

    #[arg(
        long = "refetch-rate",
        value_name = "N",
        help_heading = "Server",
        help = "Max on-demand refetches per second for unknown costume ids (default 1)."
    )]
    pub refetch_rate: Option<u32>,

    #[arg(
        long = "title",
        value_name = "TEXT",
        help_heading = "Site",
        help = "Site title shown in the header."
    )]
    pub title: Option<String>,

    #[arg(
        long = "booking-url",
        value_name = "URL",
        help_heading = "Site",
        help = "Target of the booking/inquiry button on detail pages."
    )]
    pub booking_url: Option<String>,

    #[arg(
        short = 'e',
        long = "export",
        value_name = "DIR",
        help_heading = "Export",
        help = "Render every page into DIR and exit instead of serving."
    )]
    pub export: Option<String>,

    #[arg(
        long = "export-concurrency",
        value_name = "N",
        default_value_t = 8,
        help_heading = "Export",
        help = "Pages written in parallel during --export."
    )]
    pub export_concurrency: usize,
}

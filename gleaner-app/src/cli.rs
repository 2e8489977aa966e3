use clap::Parser;
use std::path::PathBuf;

/// Fetch a web page, print the start of its text and count its links.
#[derive(Debug, Parser)]
#[command(name = "gleaner", version)]
pub struct Cli {
    /// Absolute http(s) URL to fetch.
    pub url: String,

    /// YAML config file. Defaults to `./gleaner.yaml` when that file exists.
    #[arg(long, short, env = "GLEANER_CONFIG")]
    pub config: Option<PathBuf>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn cli_definition_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn url_is_required() {
        assert!(Cli::try_parse_from(["gleaner"]).is_err());
    }

    #[test]
    fn parses_url_and_config() {
        let cli =
            Cli::try_parse_from(["gleaner", "https://example.com", "--config", "g.yaml"]).unwrap();
        assert_eq!(cli.url, "https://example.com");
        assert_eq!(cli.config, Some(PathBuf::from("g.yaml")));
    }
}

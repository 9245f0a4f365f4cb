use clap::Parser;

#[derive(Parser, Debug, Default)]
#[command(author, version, about, long_about = None)]
pub struct Args {
    /// Question to answer once; omit to start an interactive session
    pub query: Option<String>,

    /// AI provider to use [possible values: mistral, openai, anthropic]
    #[arg(short, long)]
    pub provider: Option<String>,

    /// Model to use (provider-specific)
    #[arg(short, long)]
    pub model: Option<String>,

    /// Wait for the complete reply instead of streaming it
    #[arg(long)]
    pub no_stream: bool,

    /// Log request details to stderr
    #[arg(short, long)]
    pub verbose: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_flags_and_query() {
        let args = Args::parse_from([
            "dpilot",
            "-p",
            "anthropic",
            "--no-stream",
            "What is the protocol for X?",
        ]);
        assert_eq!(args.provider.as_deref(), Some("anthropic"));
        assert!(args.no_stream);
        assert_eq!(args.query.as_deref(), Some("What is the protocol for X?"));
    }

    #[test]
    fn query_is_optional() {
        let args = Args::parse_from(["dpilot"]);
        assert!(args.query.is_none());
        assert!(!args.verbose);
    }
}

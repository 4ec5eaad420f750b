use std::path::PathBuf;

#[derive(clap::Parser, Debug)]
#[command(name = "projectql", version, about = "Run a GraphQL operation against projectql's demo host graph.")]
pub struct Cli {
    /// Inline operation document text. Mutually exclusive with `--file`.
    #[arg(help = "GraphQL operation document text.")]
    pub query: Option<String>,

    #[arg(long, short = 'f', help = "Read the operation document from a file instead of an argument.", conflicts_with = "query")]
    pub file: Option<PathBuf>,

    #[arg(long, help = "JSON object of variable values for the operation.")]
    pub variables: Option<String>,

    #[arg(long, help = "Operation name to run, when the document defines more than one.")]
    pub operation_name: Option<String>,

    #[arg(long, help = "Run as a principal holding the 'admin' role instead of an unauthenticated principal.")]
    pub admin: bool,

    #[arg(long, short = 'v', help = "Enable verbose (debug-level) logging.")]
    pub verbose: bool,
}

use clap::Parser;

/// Columns embedded when none are given on the command line.
pub const DEFAULT_EMBED_COLUMNS: [&str; 2] = ["title", "description"];

/// Start the CSV ingestion workflow and wait for it to finish.
///
/// Required environment: `WORKFLOW_ARN`, `S3_BUCKET`, `EMBEDDING_MODEL`.
#[derive(Debug, Parser)]
#[command(name = "csv-embed-pipeline", version, about)]
pub struct Cli {
    /// Object key of the CSV file. When omitted, the first `.csv` key in the
    /// bucket is used.
    pub csv_file_path: Option<String>,

    /// Columns whose values are joined into the embedding text.
    pub columns_to_embed: Vec<String>,
}

impl Cli {
    pub fn embed_columns(&self) -> Vec<String> {
        if self.columns_to_embed.is_empty() {
            DEFAULT_EMBED_COLUMNS.iter().map(|c| c.to_string()).collect()
        } else {
            self.columns_to_embed.clone()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn positional_path_and_columns() {
        let cli = Cli::parse_from(["csv-embed-pipeline", "data/products.csv", "name", "notes"]);
        assert_eq!(cli.csv_file_path.as_deref(), Some("data/products.csv"));
        assert_eq!(cli.embed_columns(), ["name", "notes"]);
    }

    #[test]
    fn columns_default_when_absent() {
        let cli = Cli::parse_from(["csv-embed-pipeline", "data/products.csv"]);
        assert_eq!(cli.embed_columns(), ["title", "description"]);

        let bare = Cli::parse_from(["csv-embed-pipeline"]);
        assert!(bare.csv_file_path.is_none());
        assert_eq!(bare.embed_columns(), ["title", "description"]);
    }
}

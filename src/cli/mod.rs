//! Command-line interface for rust_dge

use clap::{Parser, Subcommand};

#[derive(Parser)]
#[command(name = "rust_dge")]
#[command(version)]
#[command(about = "Pairwise differential gene expression with DESeq2 and edgeR")]
#[command(disable_help_flag = true)]
#[command(disable_version_flag = true)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Commands>,

    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Run every contrast through both engines
    #[command(
        about = "Run every contrast through both engines",
        long_about = "Run every contrast through both engines\n\n\
            For each treatment/control pair of the contrast list: subset the count\n\
            matrix, drop genes with CPM <= 1 in too many samples, run DESeq2 and edgeR,\n\
            harmonize both result tables, and write full, p-value filtered and\n\
            fold-change filtered tables into <output-dir>/<treatment>__vs__<control>/.\n\n\
            The contrast directory must not exist; re-running into the same output\n\
            directory fails for every contrast already written.",
        after_long_help = "\
Examples:
  # Basic run
  rust_dge run -c counts.tsv -s samples.tsv -k contrasts.tsv -o results

  # Stricter thresholds, symbols from org.Hs.eg.db
  rust_dge run -c counts.tsv -s samples.tsv -k contrasts.tsv -o results \\
    -a 0.01 --fc-threshold 2 --annotation-keytype ENSEMBL --annotation-db org.Hs.eg.db

  # Parameters from JSON, contrasts in parallel, keep going on failures
  rust_dge run -c counts.tsv -s samples.tsv -k contrasts.tsv --params params.json \\
    --parallel --continue-on-error"
    )]
    Run {
        /// Path to count matrix file
        #[arg(short, long,
            long_help = "Path to count matrix file.\n\
                Format: a gene_ID column (or the first column) and one column of raw counts\n\
                per sample. Supports both CSV (comma) and TSV (tab) delimiters (auto-detected).")]
        counts: String,

        /// Path to sample sheet
        #[arg(short, long,
            long_help = "Path to sample sheet.\n\
                Required columns: sampleID, groupID. Other columns are ignored.")]
        samples: String,

        /// Path to contrast list
        #[arg(short = 'k', long,
            long_help = "Path to contrast list.\n\
                Required columns: treatment, control. Contrasts run in row order.")]
        contrasts: String,

        /// Output root directory
        #[arg(short, long,
            long_help = "Output root directory. Required unless given by --params.")]
        output_dir: Option<String>,

        /// JSON run parameters
        #[arg(long, value_name = "FILE",
            long_help = "JSON file with run parameters (padj_alpha, fold_change_threshold,\n\
                low_count_threshold, output_dir, gene_annotation_resource,\n\
                organism_info.database, error_mode, parallel_contrasts).\n\
                Command-line flags override file values.")]
        params: Option<String>,

        /// Significance threshold on the raw p-value [default: 0.05]
        #[arg(short, long)]
        alpha: Option<f64>,

        /// log2 fold-change threshold [default: 1]
        #[arg(long,
            long_help = "log2 fold-change threshold of the fold-change tier.\n\
                Only genes with log2FoldChange strictly above it pass (one-sided).")]
        fc_threshold: Option<f64>,

        /// Minimum samples with CPM > 1 [default: 2]
        #[arg(long)]
        min_samples: Option<usize>,

        /// Identifier type of the gene IDs for symbol lookup
        #[arg(long, value_name = "KEYTYPE",
            long_help = "Identifier type of the gene IDs (e.g. ENSEMBL, ENTREZID).\n\
                Requires --annotation-db. Without both, gene_annotation repeats the gene ID.")]
        annotation_keytype: Option<String>,

        /// Annotation database package
        #[arg(long, value_name = "PACKAGE",
            long_help = "Bioconductor annotation package (e.g. org.Hs.eg.db).\n\
                Requires --annotation-keytype.")]
        annotation_db: Option<String>,

        /// Record failures and continue with the remaining work
        #[arg(long)]
        continue_on_error: bool,

        /// Run contrasts in parallel
        #[arg(long)]
        parallel: bool,

        /// Number of threads (0 = all available)
        #[arg(short, long, default_value = "0")]
        threads: usize,

        /// Rscript executable
        #[arg(long, value_name = "PATH",
            long_help = "Rscript executable. Defaults to $DGE_RSCRIPT, then Rscript on PATH.")]
        rscript: Option<String>,
    },

    /// Write counts-per-million
    #[command(
        long_about = "Write the counts-per-million matrix of a count file.\n\n\
            Each sample is scaled by its library size: CPM = count * 1e6 / column sum.",
        after_long_help = "\
Example:
  rust_dge cpm -c counts.tsv -o cpm.tsv"
    )]
    Cpm {
        /// Path to count matrix file
        #[arg(short, long)]
        counts: String,

        /// Output file path [default: cpm.tsv]
        #[arg(short, long, default_value = "cpm.tsv")]
        output: String,
    },
}

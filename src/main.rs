//! rust_dge command-line interface

use std::sync::Arc;

use clap::Parser;
use log::{info, warn, LevelFilter};

use rust_dge::cli::{Cli, Commands};
use rust_dge::io::write_count_matrix;
use rust_dge::prelude::*;

const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Exit code of a run that finished with some contrasts or engines failed
const EXIT_PARTIAL: i32 = 2;

fn main() {
    let args: Vec<String> = std::env::args().collect();

    // Find the first non-flag argument (potential subcommand)
    let first_positional = args.iter().skip(1).find(|a| !a.starts_with('-'));
    let subcommands = ["run", "cpm", "help"];
    let has_subcommand = first_positional.map_or(false, |a| subcommands.contains(&a.as_str()));

    if !has_subcommand {
        if args.len() == 1 {
            print_no_args();
            return;
        }
        if args.iter().any(|a| a == "--help") {
            print_long_help();
            return;
        }
        if args.iter().any(|a| a == "-h") {
            print_short_help();
            return;
        }
        if args.iter().any(|a| a == "-V" || a == "--version") {
            println!("rust_dge {}", VERSION);
            return;
        }
        print_no_args();
        return;
    }

    let cli = Cli::parse();

    let log_level = if cli.verbose {
        LevelFilter::Debug
    } else {
        LevelFilter::Info
    };

    env_logger::Builder::new()
        .filter_level(log_level)
        .format_timestamp(None)
        .init();

    let result = match cli.command {
        Some(Commands::Run {
            counts,
            samples,
            contrasts,
            output_dir,
            params,
            alpha,
            fc_threshold,
            min_samples,
            annotation_keytype,
            annotation_db,
            continue_on_error,
            parallel,
            threads,
            rscript,
        }) => {
            let overrides = Overrides {
                output_dir,
                alpha,
                fc_threshold,
                min_samples,
                annotation_keytype,
                annotation_db,
                continue_on_error,
                parallel,
            };
            run_analysis(
                &counts,
                &samples,
                &contrasts,
                params.as_deref(),
                overrides,
                threads,
                rscript,
            )
        }
        Some(Commands::Cpm { counts, output }) => run_cpm(&counts, &output).map(|()| true),
        None => {
            print_no_args();
            return;
        }
    };

    match result {
        Ok(true) => {}
        Ok(false) => std::process::exit(EXIT_PARTIAL),
        Err(e) => {
            eprintln!("Error: {}", e);
            std::process::exit(1);
        }
    }
}

// ---------------------------------------------------------------------------
// Custom help output
// ---------------------------------------------------------------------------

fn print_no_args() {
    println!("rust_dge v{}", VERSION);
    println!("Run `rust_dge -h` for usage or `rust_dge --help` for detailed information.");
}

fn print_short_help() {
    println!("rust_dge v{}", VERSION);
    println!();
    println!("Usage: rust_dge <COMMAND> [OPTIONS]");
    println!();
    println!("Commands:");
    println!("  run   Run every contrast through DESeq2 and edgeR");
    println!("  cpm   Write counts-per-million");
    println!();
    println!("Run `rust_dge <COMMAND> -h` for command-specific options.");
}

fn print_long_help() {
    println!("rust_dge v{}", VERSION);
    println!("Pairwise differential gene expression with two engines");
    println!();
    println!("Usage: rust_dge <COMMAND> [OPTIONS]");
    println!();
    println!("Commands:");
    println!("  run   Run every contrast through DESeq2 and edgeR");
    println!("          - CPM-based low-count filtering per contrast");
    println!("          - One result schema for both engines, sorted by p-value");
    println!("          - Full, p-value and fold-change tiers per engine");
    println!("          - Optional gene symbol annotation");
    println!("  cpm   Write counts-per-million");
    println!();
    println!("Global Options:");
    println!("  -v, --verbose    Enable verbose output");
    println!("  -h               Print short help");
    println!("      --help       Print detailed help");
    println!("  -V, --version    Print version");
    println!();
    println!("Environment:");
    println!("  DGE_RSCRIPT      Rscript executable (overridden by --rscript)");
    println!();
    println!("Exit status:");
    println!("  0 success, 1 error, 2 some contrasts or engines failed (--continue-on-error)");
    println!();
    println!("Examples:");
    println!("  rust_dge run -c counts.tsv -s samples.tsv -k contrasts.tsv -o results");
    println!();
    println!("  rust_dge run -c counts.tsv -s samples.tsv -k contrasts.tsv -o results \\");
    println!("    --annotation-keytype ENSEMBL --annotation-db org.Hs.eg.db --parallel");
}

// ---------------------------------------------------------------------------
// Subcommand implementations
// ---------------------------------------------------------------------------

/// Command-line values that override the parameter file
struct Overrides {
    output_dir: Option<String>,
    alpha: Option<f64>,
    fc_threshold: Option<f64>,
    min_samples: Option<usize>,
    annotation_keytype: Option<String>,
    annotation_db: Option<String>,
    continue_on_error: bool,
    parallel: bool,
}

fn resolve_parameters(params_path: Option<&str>, overrides: Overrides) -> Result<RunParameters> {
    let mut params = match (params_path, &overrides.output_dir) {
        (Some(path), _) => {
            info!("Loading run parameters from: {}", path);
            RunParameters::from_json_file(path)?
        }
        (None, Some(dir)) => RunParameters::new(dir),
        (None, None) => {
            return Err(DgeError::InvalidParameters {
                reason: "--output-dir is required without --params".to_string(),
            });
        }
    };

    if let Some(dir) = overrides.output_dir {
        params.output_dir = dir.into();
    }
    if let Some(alpha) = overrides.alpha {
        params.padj_alpha = alpha;
    }
    if let Some(fc) = overrides.fc_threshold {
        params.fold_change_threshold = fc;
    }
    if let Some(n) = overrides.min_samples {
        params.low_count_threshold = n;
    }
    if let Some(keytype) = overrides.annotation_keytype {
        params.gene_annotation_resource = Some(keytype);
    }
    if let Some(db) = overrides.annotation_db {
        params.organism_info.database = Some(db);
    }
    if overrides.continue_on_error {
        params.error_mode = ErrorMode::ContinueOnError;
    }
    if overrides.parallel {
        params.parallel_contrasts = true;
    }

    params.validate()?;
    Ok(params)
}

/// Returns whether every contrast and engine succeeded
fn run_analysis(
    counts_path: &str,
    samples_path: &str,
    contrasts_path: &str,
    params_path: Option<&str>,
    overrides: Overrides,
    threads: usize,
    rscript: Option<String>,
) -> Result<bool> {
    // Configure thread pool
    if threads > 0 {
        rayon::ThreadPoolBuilder::new()
            .num_threads(threads)
            .build_global()
            .ok();
    }

    let params = resolve_parameters(params_path, overrides)?;

    info!("Loading count matrix from: {}", counts_path);
    let counts = read_count_matrix(counts_path)?;
    info!("  {} genes, {} samples", counts.n_genes(), counts.n_samples());

    info!("Loading sample sheet from: {}", samples_path);
    let samples = read_sample_sheet(samples_path)?;

    info!("Loading contrasts from: {}", contrasts_path);
    let contrasts = read_contrasts(contrasts_path)?;
    info!("  {} contrasts", contrasts.len());

    let annotation = params.annotation();
    let config = RscriptConfig {
        executable: rscript,
        extra_packages: match &annotation {
            Some(a) => vec!["AnnotationDbi".to_string(), a.database.clone()],
            None => Vec::new(),
        },
    };
    let runtime = Arc::new(RscriptRuntime::open(&config)?);
    info!("Using R runtime: {}", runtime.executable());

    let annotator = match annotation {
        Some(config) => {
            info!("Annotating genes via {} ({})", config.database, config.keytype);
            GeneAnnotator::new(config, runtime.clone())
        }
        None => GeneAnnotator::passthrough(),
    };

    let pipeline = DgePipeline::new(
        params,
        Box::new(GlmEngine::new(runtime.clone())),
        Box::new(ExactTestEngine::new(runtime.clone())),
    )?
    .with_annotator(annotator);

    let report = pipeline.run(&counts, &samples, &contrasts)?;
    drop(pipeline);

    if let Ok(runtime) = Arc::try_unwrap(runtime) {
        runtime.close()?;
    }

    let completed = report.outcomes.iter().filter_map(|o| o.completed()).count();
    info!(
        "Done: {} of {} contrasts completed",
        completed,
        report.outcomes.len()
    );
    if !report.is_complete() {
        warn!("{} contrast or engine failures", report.n_failures());
    }
    Ok(report.is_complete())
}

fn run_cpm(counts_path: &str, output_path: &str) -> Result<()> {
    info!("Loading count matrix from: {}", counts_path);
    let counts = read_count_matrix(counts_path)?;
    info!("  {} genes, {} samples", counts.n_genes(), counts.n_samples());

    let normalized = CountMatrix::new(
        cpm(counts.counts()),
        counts.gene_ids().to_vec(),
        counts.sample_ids().to_vec(),
    )?;

    info!("Writing CPM to: {}", output_path);
    write_count_matrix(output_path, &normalized)?;

    info!("Done!");
    Ok(())
}

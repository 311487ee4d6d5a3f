use crate::common::setup_run;
use clap::Parser;
use lentil::{InteractionMatrix, LdaConfig, LdaRecommender};
use log::info;
use matrix_util::common_io::{mkdir, open_buf_writer};
use std::io::Write;

#[derive(Parser, Debug, Clone)]
pub struct FitArgs {
    #[arg(required = true,
          help = "Training interactions (.mtx or .mtx.gz)",
          long_help = "Training interactions in MatrixMarket format (.mtx or .mtx.gz).\n\
                       Rows are users and columns are items. Fractional values\n\
                       are truncated to integer counts.")]
    mtx_file: Box<str>,

    #[arg(short = 'k', long, default_value_t = 10,
          help = "Number of latent topics")]
    num_topics: usize,

    #[arg(long,
          help = "Initial alpha (default: 50 / number of topics)")]
    alpha: Option<f64>,

    #[arg(long, default_value_t = 0.01,
          help = "Initial beta")]
    beta: f64,

    #[arg(long, default_value_t = 100,
          help = "Rounds discarded before accumulating the posterior")]
    burn_in: usize,

    #[arg(long, short = 'r', default_value_t = 1000,
          help = "Total number of EM rounds")]
    num_rounds: usize,

    #[arg(long, default_value_t = 1,
          help = "Accumulate the posterior every `thin` rounds after burn-in")]
    thin: usize,

    #[arg(long, default_value_t = 42,
          help = "Random seed")]
    seed: u64,

    #[arg(long, default_value_t = false,
          help = "Approximate E-step with users sampled in parallel",
          long_help = "Approximate E-step with users sampled in parallel.\n\
                       Each user is resampled against a frozen copy of the\n\
                       topic-item counts; changes are merged after the sweep.")]
    parallel_sweep: bool,

    #[arg(long, help = "Number of users (default: from the file header)")]
    num_users: Option<usize>,

    #[arg(long, help = "Number of items (default: from the file header)")]
    num_items: Option<usize>,

    #[arg(long, help = "Number of threads (default: all logical CPUs)")]
    threads: Option<usize>,

    #[arg(long, short, required = true,
          help = "Output file prefix",
          long_help = "Output file prefix.\n\
                       Generates: {out}.theta.tsv.gz, {out}.phi.tsv.gz,\n\
                       {out}.alpha.tsv.gz, {out}.beta.tsv.gz, {out}.train.mtx.gz,\n\
                       {out}.config.json, {out}.trace.tsv.gz")]
    out: Box<str>,

    #[arg(long, short,
          help = "Enable verbose logging (sets RUST_LOG=info)")]
    verbose: bool,
}

impl FitArgs {
    fn to_config(&self) -> LdaConfig {
        LdaConfig {
            num_topics: self.num_topics,
            init_alpha: self.alpha,
            init_beta: self.beta,
            burn_in: self.burn_in,
            num_rounds: self.num_rounds,
            thin: self.thin,
            seed: self.seed,
            parallel_sweep: self.parallel_sweep,
            show_progress: true,
        }
    }
}

pub fn run_fit(args: &FitArgs) -> anyhow::Result<()> {
    setup_run(args.verbose, args.threads)?;

    let config = args.to_config();
    config.validate()?;

    let dims = match (args.num_users, args.num_items) {
        (Some(n_users), Some(n_items)) => Some((n_users, n_items)),
        (None, None) => None,
        _ => {
            return Err(anyhow::anyhow!(
                "give both --num-users and --num-items, or neither"
            ))
        }
    };

    info!("Reading {}", args.mtx_file);
    let data = InteractionMatrix::from_mtx_file(&args.mtx_file, dims)?;

    let mut model = LdaRecommender::new(data, config);
    let summary = model.train()?;

    let out = args.out.to_string();
    mkdir(&out)?;

    let mut writer = open_buf_writer(&(out.clone() + ".config.json"))?;
    writer.write_all(serde_json::to_string_pretty(model.config())?.as_bytes())?;
    writer.flush()?;
    drop(writer);

    summary.to_tsv(&(out.clone() + ".trace.tsv.gz"))?;
    model.into_posterior()?.to_files(&out)?;

    info!("Done");
    Ok(())
}

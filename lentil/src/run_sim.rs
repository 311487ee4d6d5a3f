use crate::common::setup_run;
use clap::Parser;
use lentil::simulate::{generate_lda_data_files, SimArgs as LdaSimArgs};

#[derive(Parser, Debug, Clone)]
pub struct SimArgs {
    /// number of users (rows)
    #[arg(long, default_value_t = 1000)]
    users: usize,

    /// number of items (columns)
    #[arg(long, default_value_t = 500)]
    items: usize,

    /// number of latent topics
    #[arg(short = 'k', long, default_value_t = 5)]
    topics: usize,

    /// tokens per user
    #[arg(long, short = 'd', default_value_t = 100)]
    depth: usize,

    /// Dirichlet concentration of user-topic proportions
    #[arg(long, default_value_t = 0.1)]
    alpha: f64,

    /// Dirichlet concentration of topic-item distributions
    #[arg(long, default_value_t = 0.1)]
    beta: f64,

    /// fraction of tokens held out for testing
    #[arg(long, default_value_t = 0.2)]
    holdout: f64,

    /// random seed
    #[arg(long, default_value_t = 42)]
    rseed: u64,

    #[arg(long, short, required = true,
          help = "Output file prefix",
          long_help = "Output file prefix.\n\
                       Generates: {out}.train.mtx.gz, {out}.test.mtx.gz,\n\
                       {out}.theta.tsv.gz, {out}.phi.tsv.gz")]
    out: Box<str>,

    #[arg(long, short,
          help = "Enable verbose logging (sets RUST_LOG=info)")]
    verbose: bool,
}

pub fn run_simulate(args: &SimArgs) -> anyhow::Result<()> {
    setup_run(args.verbose, None)?;

    let sim_args = LdaSimArgs {
        users: args.users,
        items: args.items,
        topics: args.topics,
        depth: args.depth,
        alpha: args.alpha,
        beta: args.beta,
        holdout: args.holdout,
        rseed: args.rseed,
    };

    generate_lda_data_files(&sim_args, &args.out)?;
    Ok(())
}

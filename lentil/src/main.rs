mod common;
mod run_eval;
mod run_fit;
mod run_sim;

use crate::run_eval::*;
use crate::run_fit::*;
use crate::run_sim::*;

use clap::{Parser, Subcommand};

/// LENTIL
#[derive(Parser, Debug)]
#[command(
    version,
    about = "LENTIL",
    long_about = "Latent topic recommender by collapsed Gibbs EM\n\n\
                  LENTIL fits Latent Dirichlet Allocation to user x item interaction\n\
                  counts (users as documents, items as words), re-estimating the\n\
                  Dirichlet hyperparameters every round, and evaluates top-N\n\
                  recommendations and rating predictions on held-out data.\n\n\
                  Interaction files are MatrixMarket `.mtx` or `.mtx.gz` \n\
                  (rows = users, columns = items).",
    term_width = 80
)]
struct Cli {
    #[command(subcommand)]
    commands: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    #[command(
        about = "Simulate interaction counts from an LDA model",
        long_about = "Simulate user x item counts from the LDA generative model.\n\n\
                      θ_u ~ Dirichlet(α), φ_k ~ Dirichlet(β), then each of `depth`\n\
                      tokens per user draws a topic from θ_u and an item from φ_k.\n\n\
                      Outputs:\n\
                      - {out}.train.mtx.gz: training counts\n\
                      - {out}.test.mtx.gz: held-out counts (with --holdout)\n\
                      - {out}.theta.tsv.gz, {out}.phi.tsv.gz: true parameters"
    )]
    Simulate(SimArgs),

    #[command(
        about = "Fit LDA by collapsed Gibbs EM",
        long_about = "Fit LDA to interaction counts by collapsed Gibbs EM.\n\n\
                      Each round resamples every token's topic, updates α and β by\n\
                      Minka's fixed point, and after burn-in adds the current θ and φ\n\
                      to a running average (every `thin` rounds).\n\n\
                      Outputs:\n\
                      - {out}.theta.tsv.gz: user x topic posterior mean\n\
                      - {out}.phi.tsv.gz: topic x item posterior mean\n\
                      - {out}.alpha.tsv.gz, {out}.beta.tsv.gz: final hyperparameters\n\
                      - {out}.train.mtx.gz: training counts\n\
                      - {out}.config.json: resolved options\n\
                      - {out}.trace.tsv.gz: log-likelihood trace"
    )]
    Fit(FitArgs),

    #[command(
        about = "Evaluate a fitted model on held-out data",
        long_about = "Evaluate a fitted model on held-out interactions.\n\n\
                      Ranking metrics compare top-N recommendations (training items\n\
                      excluded) with the held-out items of each user. Rating metrics\n\
                      compare predicted scores with held-out values cell by cell.\n\n\
                      Outputs:\n\
                      - {out}.metrics.tsv: metric name and value per line"
    )]
    Evaluate(EvalArgs),
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    match &cli.commands {
        Commands::Simulate(args) => {
            run_simulate(args)?;
        }
        Commands::Fit(args) => {
            run_fit(args)?;
        }
        Commands::Evaluate(args) => {
            run_evaluate(args)?;
        }
    }

    Ok(())
}

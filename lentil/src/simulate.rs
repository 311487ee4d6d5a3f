//! Synthetic user x item counts drawn from the LDA generative model.

use crate::gibbs::sample_cumulative;
use crate::interactions::InteractionMatrix;
use fnv::FnvHashMap as HashMap;
use log::info;
use matrix_util::traits::DimIoOps;
use nalgebra::DMatrix;
use rand::rngs::SmallRng;
use rand::{Rng, SeedableRng};
use rand_distr::{Distribution, Gamma};

pub struct SimArgs {
    pub users: usize,
    pub items: usize,
    pub topics: usize,
    /// tokens per user
    pub depth: usize,
    /// concentration of user-topic proportions
    pub alpha: f64,
    /// concentration of topic-item distributions
    pub beta: f64,
    /// fraction of tokens routed to the test matrix
    pub holdout: f64,
    pub rseed: u64,
}

impl Default for SimArgs {
    fn default() -> Self {
        SimArgs {
            users: 100,
            items: 50,
            topics: 3,
            depth: 50,
            alpha: 0.1,
            beta: 0.1,
            holdout: 0.0,
            rseed: 42,
        }
    }
}

pub struct SimOut {
    pub train: InteractionMatrix,
    pub test: Option<InteractionMatrix>,
    /// users x topics
    pub theta: DMatrix<f64>,
    /// topics x items
    pub phi: DMatrix<f64>,
}

/// Generate counts
///
/// ```text
/// θ_u ~ Dirichlet(α), φ_k ~ Dirichlet(β)
/// z ~ Categorical(θ_u), i ~ Categorical(φ_z)
/// ```
pub fn simulate_lda_counts(args: &SimArgs) -> anyhow::Result<SimOut> {
    if args.users == 0 || args.items == 0 || args.topics == 0 {
        return Err(anyhow::anyhow!("need at least one user, item and topic"));
    }
    if !(0.0..1.0).contains(&args.holdout) {
        return Err(anyhow::anyhow!("holdout must be in [0, 1)"));
    }

    let mut rng = SmallRng::seed_from_u64(args.rseed);

    let theta = sample_dirichlet_rows(args.users, args.topics, args.alpha, &mut rng)?;
    let phi = sample_dirichlet_rows(args.topics, args.items, args.beta, &mut rng)?;

    let cum_theta = cumulative_rows(&theta);
    let cum_phi = cumulative_rows(&phi);

    let mut train_counts: HashMap<(usize, usize), f64> = HashMap::default();
    let mut test_counts: HashMap<(usize, usize), f64> = HashMap::default();

    for (u, cum_u) in cum_theta.iter().enumerate() {
        for _ in 0..args.depth {
            let k = sample_cumulative(cum_u, &mut rng);
            let i = sample_cumulative(&cum_phi[k], &mut rng);
            let held_out = args.holdout > 0.0 && rng.random::<f64>() < args.holdout;
            let counts = if held_out {
                &mut test_counts
            } else {
                &mut train_counts
            };
            *counts.entry((u, i)).or_default() += 1.0;
        }
    }

    let train = to_interactions(args, train_counts)?;
    let test = if args.holdout > 0.0 {
        Some(to_interactions(args, test_counts)?)
    } else {
        None
    };

    info!(
        "simulated {} training tokens over {} users and {} items",
        train.total_mass(),
        args.users,
        args.items
    );

    Ok(SimOut {
        train,
        test,
        theta,
        phi,
    })
}

/// Write `{out}.train.mtx.gz`, `{out}.test.mtx.gz` (with holdout), and
/// the true `{out}.theta.tsv.gz` and `{out}.phi.tsv.gz`
pub fn generate_lda_data_files(args: &SimArgs, out: &str) -> anyhow::Result<SimOut> {
    let sim = simulate_lda_counts(args)?;

    sim.train.to_mtx_file(&(out.to_string() + ".train.mtx.gz"))?;
    if let Some(test) = sim.test.as_ref() {
        test.to_mtx_file(&(out.to_string() + ".test.mtx.gz"))?;
    }
    sim.theta.write_with_dims(&(out.to_string() + ".theta.tsv.gz"))?;
    sim.phi.write_with_dims(&(out.to_string() + ".phi.tsv.gz"))?;

    info!("wrote simulated data to {}.*", out);
    Ok(sim)
}

/// Each row ~ Dirichlet(conc, ..., conc) by normalized Gamma draws
fn sample_dirichlet_rows(
    nrow: usize,
    ncol: usize,
    conc: f64,
    rng: &mut SmallRng,
) -> anyhow::Result<DMatrix<f64>> {
    let gamma = Gamma::new(conc, 1.0).map_err(|e| anyhow::anyhow!("gamma({}): {}", conc, e))?;

    let mut ret = DMatrix::<f64>::zeros(nrow, ncol);
    for r in 0..nrow {
        let draws: Vec<f64> = (0..ncol).map(|_| gamma.sample(&mut *rng)).collect();
        let tot: f64 = draws.iter().sum();
        for (c, x) in draws.into_iter().enumerate() {
            // tiny concentrations can underflow every draw
            ret[(r, c)] = if tot > 0.0 { x / tot } else { 1.0 / ncol as f64 };
        }
    }
    Ok(ret)
}

fn cumulative_rows(mat: &DMatrix<f64>) -> Vec<Vec<f64>> {
    mat.row_iter()
        .map(|row| {
            row.iter()
                .scan(0.0, |acc, &x| {
                    *acc += x;
                    Some(*acc)
                })
                .collect()
        })
        .collect()
}

fn to_interactions(
    args: &SimArgs,
    counts: HashMap<(usize, usize), f64>,
) -> anyhow::Result<InteractionMatrix> {
    let mut triplets: Vec<(usize, usize, f64)> =
        counts.into_iter().map(|((u, i), c)| (u, i, c)).collect();
    triplets.sort_by_key(|&(u, i, _)| (u, i));
    Ok(InteractionMatrix::from_triplets(
        args.users,
        args.items,
        &triplets,
    )?)
}

/// Logging and the rayon pool, once per run
pub fn setup_run(verbose: bool, threads: Option<usize>) -> anyhow::Result<()> {
    if verbose {
        std::env::set_var("RUST_LOG", "info");
    }
    env_logger::init();

    let num_threads = threads.unwrap_or_else(num_cpus::get).max(1);
    rayon::ThreadPoolBuilder::new()
        .num_threads(num_threads)
        .build_global()
        .map_err(|e| anyhow::anyhow!("thread pool: {}", e))?;

    log::info!("using {} threads", num_threads);
    Ok(())
}

fn main() {
    #[cfg(feature = "cli")]
    xnbkit::cli::run();

    #[cfg(not(feature = "cli"))]
    {
        eprintln!("xnbkit: CLI not enabled. Rebuild with `--features cli`.");
        std::process::exit(1);
    }
}

fn main() {
    #[cfg(feature = "cli")]
    xzstream::cli::run();

    #[cfg(not(feature = "cli"))]
    {
        eprintln!("xzstream: CLI not enabled. Rebuild with `--features cli`.");
        std::process::exit(1);
    }
}

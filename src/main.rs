fn main() {
    #[cfg(feature = "cli")]
    zmbv::cli::run();

    #[cfg(not(feature = "cli"))]
    {
        eprintln!("zmbv: CLI not enabled. Rebuild with `--features cli`.");
        std::process::exit(1);
    }
}

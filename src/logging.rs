use log::LevelFilter;

pub fn init_logging(level: LevelFilter) {
    // RUST_LOG wins over the cli level when set
    let _ = env_logger::builder()
        .format_target(false)
        .format_timestamp_secs()
        .filter_level(level)
        .parse_default_env()
        .try_init();
}

use crate::config;

/// Timestamped diagnostic logging, gated at compile time.
pub fn log(msg: &str) {
    if config::LOGGING_ENABLED {
        #[cfg(debug_assertions)]
        {
            if !config::dev::ENABLE_LOGGING {
                return;
            }
        }

        let now = chrono::Local::now();
        println!("[{}] {}", now.format("%Y-%m-%d %H:%M:%S%.3f"), msg);
    }
}

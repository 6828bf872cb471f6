use std::io::Write;

/// Initialize the logger. `RUST_LOG` wins over the `debug` flag.
pub fn init_logging(debug: bool) {
    let filter = if debug { "debug" } else { "info" };

    let _ = env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(filter))
        .format(|buf, record| {
            writeln!(
                buf,
                "[{}] {} [{}] {}",
                chrono::Local::now().format("%Y-%m-%d %H:%M:%S%.3f"),
                record.level(),
                record.target(),
                record.args()
            )
        })
        .try_init();
}

/// Measures an operation and reports slow ones.
pub struct Timer {
    name: String,
    start: std::time::Instant,
}

impl Timer {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            start: std::time::Instant::now(),
        }
    }

    pub fn elapsed_ms(&self) -> u128 {
        self.start.elapsed().as_millis()
    }

    pub fn debug(&self, label: &str) {
        log::debug!("[{}] {} completed in {}ms", label, self.name, self.elapsed_ms());
    }
}

impl Drop for Timer {
    fn drop(&mut self) {
        let elapsed = self.elapsed_ms();
        if elapsed > 30_000 {
            log::warn!("{} took {}ms (slow!)", self.name, elapsed);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn timer_starts_near_zero() {
        let timer = Timer::new("noop");
        assert!(timer.elapsed_ms() < 1_000);
        timer.debug("test");
    }

    #[test]
    fn init_logging_twice_is_harmless() {
        init_logging(false);
        init_logging(true);
    }
}

use std::sync::atomic::{AtomicU64, Ordering};

#[derive(Debug, Default)]
pub struct MetricsRegistry {
    requests_total: AtomicU64,
    rejected_total: AtomicU64,
    succeeded_total: AtomicU64,
    failed_total: AtomicU64,
    timed_out_total: AtomicU64,
    in_flight: AtomicU64,
}

impl MetricsRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn started(&self) {
        self.requests_total.fetch_add(1, Ordering::Relaxed);
        self.in_flight.fetch_add(1, Ordering::Relaxed);
    }

    pub fn rejected(&self) {
        self.rejected_total.fetch_add(1, Ordering::Relaxed);
    }

    pub fn succeeded(&self) {
        self.succeeded_total.fetch_add(1, Ordering::Relaxed);
        self.decrement_in_flight();
    }

    pub fn failed(&self) {
        self.failed_total.fetch_add(1, Ordering::Relaxed);
        self.decrement_in_flight();
    }

    pub fn timed_out(&self) {
        self.timed_out_total.fetch_add(1, Ordering::Relaxed);
        self.decrement_in_flight();
    }

    pub fn render_prometheus(&self) -> String {
        format!(
            concat!(
                "# TYPE runcode_requests_total counter\n",
                "runcode_requests_total {}\n",
                "# TYPE runcode_rejected_total counter\n",
                "runcode_rejected_total {}\n",
                "# TYPE runcode_succeeded_total counter\n",
                "runcode_succeeded_total {}\n",
                "# TYPE runcode_failed_total counter\n",
                "runcode_failed_total {}\n",
                "# TYPE runcode_timed_out_total counter\n",
                "runcode_timed_out_total {}\n",
                "# TYPE runcode_in_flight gauge\n",
                "runcode_in_flight {}\n"
            ),
            self.requests_total.load(Ordering::Relaxed),
            self.rejected_total.load(Ordering::Relaxed),
            self.succeeded_total.load(Ordering::Relaxed),
            self.failed_total.load(Ordering::Relaxed),
            self.timed_out_total.load(Ordering::Relaxed),
            self.in_flight.load(Ordering::Relaxed),
        )
    }

    fn decrement_in_flight(&self) {
        let mut current = self.in_flight.load(Ordering::Relaxed);
        while current > 0 {
            match self.in_flight.compare_exchange_weak(
                current,
                current - 1,
                Ordering::Relaxed,
                Ordering::Relaxed,
            ) {
                Ok(_) => return,
                Err(actual) => current = actual,
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::MetricsRegistry;

    #[test]
    fn in_flight_gauge_does_not_underflow() {
        let metrics = MetricsRegistry::new();
        metrics.failed();
        let rendered = metrics.render_prometheus();
        assert!(rendered.contains("runcode_in_flight 0"));
        assert!(rendered.contains("runcode_failed_total 1"));
    }
}

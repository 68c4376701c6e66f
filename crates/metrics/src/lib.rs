use anyhow::Result;
use hyper::{
    service::{make_service_fn, service_fn},
    Body, Request, Response, Server,
};
use prometheus::{Encoder, Gauge, IntCounter, Registry, TextEncoder};
use std::net::SocketAddr;
use tracing::info;

#[derive(Clone)]
pub struct MetricsHandle {
    registry: Registry,
    ticks: IntCounter,
    debt: Gauge,
    fetch_failures: IntCounter,
}

impl MetricsHandle {
    pub fn new() -> Result<Self> {
        let registry = Registry::new();

        let ticks = IntCounter::new(
            "debt_ticks_total",
            "Ticks applied to the extrapolated debt counter",
        )?;
        let debt = Gauge::new(
            "debt_dollars",
            "Current extrapolated US public debt in dollars",
        )?;
        let fetch_failures = IntCounter::new(
            "debt_fetch_failures_total",
            "Failed fetches against the debt endpoint",
        )?;

        registry.register(Box::new(ticks.clone()))?;
        registry.register(Box::new(debt.clone()))?;
        registry.register(Box::new(fetch_failures.clone()))?;

        Ok(Self {
            registry,
            ticks,
            debt,
            fetch_failures,
        })
    }

    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    pub fn tick_counter(&self) -> IntCounter {
        self.ticks.clone()
    }

    pub fn debt_gauge(&self) -> Gauge {
        self.debt.clone()
    }

    pub fn fetch_failure_counter(&self) -> IntCounter {
        self.fetch_failures.clone()
    }

    pub async fn serve(self, addr: SocketAddr) -> Result<()> {
        let registry = self.registry.clone();
        let make_svc = make_service_fn(move |_| {
            let registry = registry.clone();
            async move {
                Ok::<_, hyper::Error>(service_fn(move |_req: Request<Body>| {
                    let registry = registry.clone();
                    async move {
                        let encoder = TextEncoder::new();
                        let metric_families = registry.gather();
                        let mut buffer = Vec::new();
                        encoder.encode(&metric_families, &mut buffer).unwrap();
                        Ok::<_, hyper::Error>(
                            Response::builder()
                                .status(200)
                                .header("Content-Type", encoder.format_type())
                                .body(Body::from(buffer))
                                .unwrap(),
                        )
                    }
                }))
            }
        });

        let server = Server::bind(&addr).serve(make_svc);
        info!(%addr, "metrics exporter listening");
        server.await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn instruments_are_registered_and_move() {
        let metrics = MetricsHandle::new().expect("registry should build");

        metrics.tick_counter().inc();
        metrics.tick_counter().inc();
        metrics.debt_gauge().set(35000000000000.0);
        metrics.fetch_failure_counter().inc();

        let families = metrics.registry().gather();
        let names: Vec<_> = families.iter().map(|f| f.get_name().to_string()).collect();
        assert!(names.contains(&"debt_ticks_total".to_string()));
        assert!(names.contains(&"debt_dollars".to_string()));
        assert!(names.contains(&"debt_fetch_failures_total".to_string()));

        let ticks = families
            .iter()
            .find(|f| f.get_name() == "debt_ticks_total")
            .expect("tick family present");
        assert_eq!(ticks.get_metric()[0].get_counter().get_value(), 2.0);
    }
}

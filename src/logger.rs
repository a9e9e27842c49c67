use crate::schema::Operation;
use tracing;
use tracing_subscriber::EnvFilter;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogLevel {
    Debug,
    Info,
    Warning,
    Error,
}

/// ProviderEvent: something that happened while handling a resource or a data source.
#[derive(Debug, Clone)]
pub struct ProviderEvent {
    pub resource_kind: String,
    pub scoped_id: Option<String>,
    pub operation: Operation,
    /// region or zone label, when known
    pub scope: Option<String>,
    pub message: String,
}

impl ProviderEvent {
    pub fn new(resource_kind: &str, operation: Operation, message: String) -> Self {
        ProviderEvent {
            resource_kind: resource_kind.to_string(),
            scoped_id: None,
            operation,
            scope: None,
            message,
        }
    }

    /// Sets the id, and the scope which is its first segment.
    pub fn with_scoped_id(mut self, scoped_id: Option<&str>) -> Self {
        if let Some(id) = scoped_id.filter(|id| !id.is_empty()) {
            self.scope = id.split('/').next().map(|s| s.to_string());
            self.scoped_id = Some(id.to_string());
        }
        self
    }
}

pub trait Logger: Send + Sync {
    fn log(&self, log_level: LogLevel, event: ProviderEvent);
    fn clone_dyn(&self) -> Box<dyn Logger>;
}

impl Clone for Box<dyn Logger> {
    fn clone(&self) -> Self {
        self.clone_dyn()
    }
}

#[derive(Clone)]
pub struct StdIoLogger {}

impl StdIoLogger {
    pub fn new() -> StdIoLogger {
        StdIoLogger {}
    }
}

impl Default for StdIoLogger {
    fn default() -> Self {
        StdIoLogger::new()
    }
}

impl Logger for StdIoLogger {
    fn log(&self, log_level: LogLevel, event: ProviderEvent) {
        tracing::span!(
            tracing::Level::INFO,
            "std_io_logger",
            resource_kind = event.resource_kind.as_str(),
            scoped_id = event.scoped_id.as_deref().unwrap_or_default(),
            operation = event.operation.to_string().as_str(),
            scope = event.scope.as_deref().unwrap_or_default(),
        )
        .in_scope(|| {
            match log_level {
                LogLevel::Debug => debug!("{}", event.message),
                LogLevel::Info => info!("{}", event.message),
                LogLevel::Warning => warn!("{}", event.message),
                LogLevel::Error => error!("{}", event.message),
            };
        });
    }

    fn clone_dyn(&self) -> Box<dyn Logger> {
        Box::new(self.clone())
    }
}

/// Installs the global subscriber, filtered by `RUST_LOG` (`info` when unset).
/// Does nothing if a subscriber is already installed.
pub fn init_tracing(json: bool) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let builder = tracing_subscriber::fmt().with_env_filter(filter).with_ansi(false);

    let res = match json {
        true => builder.json().try_init(),
        false => builder.try_init(),
    };
    if let Err(e) = res {
        debug!("tracing subscriber already installed: {}", e);
    }
}

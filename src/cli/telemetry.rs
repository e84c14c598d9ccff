//! Log output and optional OTLP span export.

use anyhow::{anyhow, Result};
use base64ct::{Base64, Encoding};
use once_cell::sync::OnceCell;
use opentelemetry::propagation::TextMapCompositePropagator;
use opentelemetry::{global, trace::TracerProvider as _, KeyValue};
use opentelemetry_otlp::{Compression, SpanExporter, WithExportConfig, WithTonicConfig};
use opentelemetry_sdk::{
    propagation::{BaggagePropagator, TraceContextPropagator},
    trace::{SdkTracerProvider, Tracer},
    Resource,
};
use std::{env::var, time::Duration};
use tonic::{
    metadata::{Ascii, Binary, MetadataKey, MetadataMap, MetadataValue},
    transport::ClientTlsConfig,
};
use tracing::{debug, Level};
use tracing_subscriber::{fmt, layer::SubscriberExt, EnvFilter, Registry};
use ulid::Ulid;

static TRACER_PROVIDER: OnceCell<SdkTracerProvider> = OnceCell::new();

const QUIET_TARGETS: [&str; 4] = [
    "hyper=error",
    "tokio=error",
    "sqlx=warn",
    "opentelemetry_sdk=warn",
];

const EXPORT_TIMEOUT: Duration = Duration::from_secs(3);

/// Exporter settings read from the `OTEL_*` variables.
#[derive(Debug, Clone, PartialEq, Eq)]
struct ExportSettings {
    endpoint: String,
    headers: Vec<(String, String)>,
    instance_id: String,
}

impl ExportSettings {
    /// `None` unless `OTEL_EXPORTER_OTLP_ENDPOINT` is set.
    fn from_env() -> Option<Self> {
        let endpoint = var("OTEL_EXPORTER_OTLP_ENDPOINT").ok()?;
        Some(Self {
            endpoint: with_scheme(&endpoint),
            headers: var("OTEL_EXPORTER_OTLP_HEADERS")
                .map(|raw| header_pairs(&raw))
                .unwrap_or_default(),
            instance_id: var("OTEL_SERVICE_INSTANCE_ID")
                .unwrap_or_else(|_| Ulid::new().to_string()),
        })
    }

    /// Host the collector certificate is checked against; plain `http` has none.
    fn tls_domain(&self) -> Option<&str> {
        let authority = self.endpoint.strip_prefix("https://")?.split('/').next()?;
        authority.split(':').next().filter(|host| !host.is_empty())
    }

    /// gRPC metadata sent with every export. `-bin` headers carry base64.
    fn metadata(&self) -> Result<MetadataMap> {
        let mut map = MetadataMap::with_capacity(self.headers.len());
        for (name, value) in &self.headers {
            if name.ends_with("-bin") {
                let bytes = Base64::decode_vec(value)
                    .map_err(|e| anyhow!("header {name}: value is not base64: {e}"))?;
                let key = MetadataKey::<Binary>::from_bytes(name.as_bytes())
                    .map_err(|e| anyhow!("header {name}: {e}"))?;
                map.insert_bin(key, MetadataValue::from_bytes(&bytes));
            } else {
                let key = MetadataKey::<Ascii>::from_bytes(name.as_bytes())
                    .map_err(|e| anyhow!("header {name}: {e}"))?;
                let value: MetadataValue<Ascii> = value
                    .parse()
                    .map_err(|e| anyhow!("header {name}: {e}"))?;
                map.insert(key, value);
            }
        }
        Ok(map)
    }
}

/// `key1=value1,key2=value2`; keys are lowercased, pairs without `=` dropped.
fn header_pairs(raw: &str) -> Vec<(String, String)> {
    raw.split(',')
        .filter_map(|pair| {
            let (key, value) = pair.split_once('=')?;
            let key = key.trim();
            (!key.is_empty()).then(|| (key.to_ascii_lowercase(), value.trim().to_string()))
        })
        .collect()
}

fn with_scheme(endpoint: &str) -> String {
    if endpoint.starts_with("http://") || endpoint.starts_with("https://") {
        endpoint.to_string()
    } else {
        format!("https://{}", endpoint.trim_end_matches('/'))
    }
}

fn exporter(settings: &ExportSettings) -> Result<SpanExporter> {
    let mut builder = SpanExporter::builder()
        .with_tonic()
        .with_endpoint(&settings.endpoint)
        .with_compression(Compression::Gzip)
        .with_timeout(EXPORT_TIMEOUT);

    if let Some(host) = settings.tls_domain() {
        builder = builder.with_tls_config(
            ClientTlsConfig::new()
                .domain_name(host.to_string())
                .with_native_roots(),
        );
    }

    if !settings.headers.is_empty() {
        builder = builder.with_metadata(settings.metadata()?);
    }

    Ok(builder.build()?)
}

fn init_tracer(settings: &ExportSettings) -> Result<Tracer> {
    let provider = SdkTracerProvider::builder()
        .with_batch_exporter(exporter(settings)?)
        .with_resource(
            Resource::builder_empty()
                .with_attributes([
                    KeyValue::new("service.name", env!("CARGO_PKG_NAME")),
                    KeyValue::new("service.version", env!("CARGO_PKG_VERSION")),
                    KeyValue::new("service.instance.id", settings.instance_id.clone()),
                ])
                .build(),
        )
        .build();

    let _ = TRACER_PROVIDER.set(provider.clone());

    global::set_tracer_provider(provider.clone());
    global::set_text_map_propagator(TextMapCompositePropagator::new(vec![
        Box::new(TraceContextPropagator::new()),
        Box::new(BaggagePropagator::new()),
    ]));

    Ok(provider.tracer(env!("CARGO_PKG_NAME")))
}

/// `RUST_LOG` wins over `level`; noisy dependencies are capped either way.
fn env_filter(level: Level) -> Result<EnvFilter> {
    let filter = EnvFilter::builder()
        .with_default_directive(level.into())
        .from_env_lossy();
    QUIET_TARGETS
        .iter()
        .try_fold(filter, |filter, directive| -> Result<EnvFilter> {
            Ok(filter.add_directive(directive.parse()?))
        })
}

/// Install the global subscriber. Spans are exported over OTLP/gRPC when
/// `OTEL_EXPORTER_OTLP_ENDPOINT` is set.
///
/// Logs go to stderr so `doctor` and `login` output on stdout stays clean.
///
/// # Errors
///
/// Returns an error if the exporter or the subscriber cannot be installed
pub fn init(verbosity_level: Option<Level>) -> Result<()> {
    let fmt_layer = fmt::layer()
        .with_writer(std::io::stderr)
        .with_file(false)
        .with_line_number(false)
        .with_thread_ids(false)
        .with_thread_names(false)
        .with_target(false)
        .pretty();

    let otel_layer = match ExportSettings::from_env() {
        Some(settings) => {
            Some(tracing_opentelemetry::layer().with_tracer(init_tracer(&settings)?))
        }
        None => None,
    };

    let subscriber = Registry::default()
        .with(fmt_layer)
        .with(otel_layer)
        .with(env_filter(verbosity_level.unwrap_or(Level::ERROR))?);
    tracing::subscriber::set_global_default(subscriber)?;

    Ok(())
}

/// Flush pending spans; a no-op when export was never enabled.
pub fn shutdown_tracer() {
    if let Some(provider) = TRACER_PROVIDER.get() {
        debug!("shutting down tracer provider");
        let _ = provider.shutdown();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn settings(endpoint: &str, headers: &str) -> ExportSettings {
        ExportSettings {
            endpoint: with_scheme(endpoint),
            headers: header_pairs(headers),
            instance_id: "test".to_string(),
        }
    }

    #[test]
    fn export_disabled_without_endpoint() {
        temp_env::with_var_unset("OTEL_EXPORTER_OTLP_ENDPOINT", || {
            assert!(ExportSettings::from_env().is_none());
        });
    }

    #[test]
    fn export_settings_from_env() {
        temp_env::with_vars(
            [
                ("OTEL_EXPORTER_OTLP_ENDPOINT", Some("collector.example.com:4317/")),
                ("OTEL_EXPORTER_OTLP_HEADERS", Some("Authorization=Bearer abc")),
                ("OTEL_SERVICE_INSTANCE_ID", Some("portaria-1")),
            ],
            || {
                assert_eq!(
                    ExportSettings::from_env(),
                    Some(ExportSettings {
                        endpoint: "https://collector.example.com:4317".to_string(),
                        headers: vec![("authorization".to_string(), "Bearer abc".to_string())],
                        instance_id: "portaria-1".to_string(),
                    })
                );
            },
        );
    }

    #[test]
    fn header_pairs_skip_garbage() {
        assert!(header_pairs("").is_empty());
        assert_eq!(
            header_pairs("Key1 = value1 , malformed, key2=a=b, =orphan"),
            vec![
                ("key1".to_string(), "value1".to_string()),
                ("key2".to_string(), "a=b".to_string()),
            ]
        );
    }

    #[test]
    fn tls_only_for_https() {
        assert_eq!(
            settings("collector.example.com:4317", "").tls_domain(),
            Some("collector.example.com")
        );
        assert_eq!(settings("http://localhost:4317", "").tls_domain(), None);
    }

    #[test]
    fn metadata_mixes_ascii_and_binary() {
        let metadata = settings(
            "http://localhost:4317",
            "authorization=Bearer token123,custom-bin=YmluYXJ5IGRhdGE=",
        )
        .metadata()
        .ok();
        assert_eq!(metadata.map(|m| m.len()), Some(2));
    }

    #[test]
    fn metadata_rejects_bad_base64() {
        let err = settings("http://localhost:4317", "custom-bin=not base64!")
            .metadata()
            .err();
        assert!(err.is_some_and(|e| e.to_string().contains("not base64")));
    }

    #[test]
    fn filter_quiets_dependencies() {
        temp_env::with_var_unset("RUST_LOG", || {
            let filter = env_filter(Level::DEBUG).map(|f| f.to_string()).ok();
            assert!(filter.is_some_and(|f| f.contains("sqlx=warn") && f.contains("hyper=error")));
        });
    }

    #[test]
    fn shutdown_without_provider() {
        shutdown_tracer();
    }
}

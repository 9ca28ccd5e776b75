/// Base URL of the hosted backend project, e.g. https://abcdefgh.supabase.co
pub const SUPABASE_URL: &str = "SUPABASE_URL";
/// Public ("anon") API key of the hosted backend project. Sent on every call alongside the user's token.
pub const SUPABASE_ANON_KEY: &str = "SUPABASE_ANON_KEY";
/// Public URL this site is served from. Used to build the email confirmation link sent on sign-up.
pub const SITE_URL: &str = "SITE_URL";
/// Socket address the HTTP server binds to. Defaults to 0.0.0.0:8080
pub const BIND_ADDRESS: &str = "BIND_ADDRESS";
/// Log level configuration for the application. For formatting info, see [tracing-subscriber's documentation](https://docs.rs/tracing-subscriber/latest/tracing_subscriber/filter/struct.EnvFilter.html)
pub const LOG_LEVEL: &str = "LOG_LEVEL";

/// OpenTelemetry span export URL. Should be http://localhost:4317 by default, as the service should
/// have an OpenTelemetry collector sidecar which directs metrics to the correct place
pub const OTEL_SPAN_EXPORT_URL: &str = "OTEL_SPAN_EXPORT_URL";
/// OpenTelemetry metrics export URL. Should be http://localhost:4317 by default, as the service should
/// have an OpenTelemetry collector sidecar which directs metrics to the correct place
pub const OTEL_METRIC_EXPORT_URL: &str = "OTEL_METRIC_EXPORT_URL";

use diesel_async::AsyncPgConnection;
use diesel_async::pooled_connection::bb8::Pool;

/// Shared state handed to every handler: a Postgres pool and a reusable
/// outbound HTTP client.
#[derive(Clone)]
pub struct AppState {
    pub db_pool: Pool<AsyncPgConnection>,
    pub http_client: reqwest::Client,
}

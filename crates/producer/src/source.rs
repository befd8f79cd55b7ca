use async_trait::async_trait;
use indicator_domain::Sample;
use indicator_promql::PromqlClient;

/// Something that can evaluate an expression into an instant vector.
#[async_trait]
pub trait VectorSource: Send + Sync + 'static {
    /// Evaluates `expr` at the current time.
    async fn query_vector(&self, expr: &str) -> Result<Vec<Sample>, indicator_promql::Error>;
}

#[async_trait]
impl VectorSource for PromqlClient {
    async fn query_vector(&self, expr: &str) -> Result<Vec<Sample>, indicator_promql::Error> {
        Self::query_vector(self, expr).await
    }
}

//! Data source abstraction consumed by pollers.

use async_trait::async_trait;
use common::{Error, TimeSeriesPoint};

/// One fetch round trip against a logical data stream.
///
/// Implementations issue the query, decode the response and return the
/// resulting points. The poller owns everything else: scheduling,
/// state, error containment.
#[async_trait]
pub trait StreamSource: Send + Sync {
    async fn fetch(&self) -> Result<Vec<TimeSeriesPoint>, Error>;
}

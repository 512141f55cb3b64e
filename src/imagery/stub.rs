//! In-memory archive for tests.

use crate::imagery::{ImageryArchive, RegionQuery};
use anyhow::Result;
use futures::future::{BoxFuture, FutureExt};
use std::sync::Mutex;

type SumFn = Box<dyn Fn(&RegionQuery) -> Vec<f64> + Send + Sync>;

/// Answers every query from a closure and remembers the queries it saw.
pub struct StubArchive {
    respond: SumFn,
    queries: Mutex<Vec<RegionQuery>>,
}

impl StubArchive {
    pub fn new(respond: impl Fn(&RegionQuery) -> Vec<f64> + Send + Sync + 'static) -> Self {
        Self {
            respond: Box::new(respond),
            queries: Mutex::new(Vec::new()),
        }
    }

    /// Returns the same per-image sums for every query.
    pub fn fixed(sums: Vec<f64>) -> Self {
        Self::new(move |_| sums.clone())
    }

    pub fn queries(&self) -> Vec<RegionQuery> {
        self.queries.lock().unwrap().clone()
    }

    pub fn call_count(&self) -> usize {
        self.queries.lock().unwrap().len()
    }
}

impl ImageryArchive for StubArchive {
    fn per_image_sums<'a>(&'a self, query: &'a RegionQuery) -> BoxFuture<'a, Result<Vec<f64>>> {
        self.queries.lock().unwrap().push(query.clone());
        let sums = (self.respond)(query);
        async move { Ok(sums) }.boxed()
    }
}

/// Fails every query, as a revoked token or exhausted quota would.
pub struct FailingArchive;

impl ImageryArchive for FailingArchive {
    fn per_image_sums<'a>(&'a self, _query: &'a RegionQuery) -> BoxFuture<'a, Result<Vec<f64>>> {
        async move {
            Err(crate::models::CampaignError::Remote {
                status: 429,
                body: "Quota exceeded".to_string(),
            }
            .into())
        }
        .boxed()
    }
}

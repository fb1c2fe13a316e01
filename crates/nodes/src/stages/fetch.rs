//! Fetch stage: one retrieval per Request, exactly one Outcome out.

use std::sync::Arc;

use async_trait::async_trait;
use pipeline::{Fetch, Outcome, Request};

use crate::stage::Stage;

/// Performs the external retrieval for each [`Request`].
///
/// Requests are handled strictly one at a time, so Outcomes leave in the
/// order Requests arrived. A failed retrieval becomes [`Outcome::Failure`]
/// and the stage carries on with the next Request.
pub struct FetchStage {
    fetcher: Arc<dyn Fetch>,
}

impl FetchStage {
    pub const NAME: &'static str = "fetcher";

    pub fn new(fetcher: Arc<dyn Fetch>) -> Self {
        Self { fetcher }
    }
}

#[async_trait]
impl Stage for FetchStage {
    type Input = Request;
    type Output = Outcome;

    fn name(&self) -> &'static str {
        Self::NAME
    }

    async fn process(&mut self, request: Request) -> Option<Outcome> {
        tracing::info!(
            request_id = %request.id(),
            url = request.target(),
            "fetching"
        );

        let result = self.fetcher.fetch(request.target()).await;

        match &result {
            Ok(payload) => tracing::info!(
                request_id = %request.id(),
                bytes = payload.len(),
                "fetch succeeded, sending success outcome"
            ),
            Err(e) => tracing::info!(
                request_id = %request.id(),
                kind = e.kind(),
                error = %e,
                "fetch failed, sending failure outcome"
            ),
        }

        Some(Outcome::from_fetch(request.id(), result))
    }
}

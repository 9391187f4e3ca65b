//! Provider call log
//!
//! Every driver call the core makes is timed and reported on the
//! `cloudmux::calllog` tracing target, so a subscriber can route provider
//! traffic to its own sink.

use std::fmt::Display;
use std::future::Future;
use std::time::Instant;

pub const CALLLOG_TARGET: &str = "cloudmux::calllog";

/// What a provider call was about
#[derive(Debug, Clone, Copy)]
pub struct Call<'a> {
    pub connection: &'a str,
    pub kind: &'a str,
    pub op: &'static str,
    pub resource: &'a str,
}

impl<'a> Call<'a> {
    pub fn new(connection: &'a str, kind: &'a str, op: &'static str, resource: &'a str) -> Self {
        Self {
            connection,
            kind,
            op,
            resource,
        }
    }
}

/// Awaits `fut` and logs its duration and outcome
pub async fn timed<F, T, E>(call: Call<'_>, fut: F) -> Result<T, E>
where
    F: Future<Output = Result<T, E>>,
    E: Display,
{
    let started = Instant::now();
    let result = fut.await;
    let elapsed_ms = started.elapsed().as_millis() as u64;

    match &result {
        Ok(_) => tracing::info!(
            target: CALLLOG_TARGET,
            connection = call.connection,
            kind = call.kind,
            op = call.op,
            resource = call.resource,
            elapsed_ms,
            "provider call succeeded"
        ),
        Err(e) => tracing::warn!(
            target: CALLLOG_TARGET,
            connection = call.connection,
            kind = call.kind,
            op = call.op,
            resource = call.resource,
            elapsed_ms,
            error = %e,
            "provider call failed"
        ),
    }
    result
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_timed_passes_result_through() {
        let call = Call::new("conn", "VPC", "create", "vpc-01");
        let ok: Result<u32, String> = timed(call, async { Ok(7) }).await;
        assert_eq!(ok, Ok(7));

        let err: Result<u32, String> = timed(call, async { Err("boom".to_string()) }).await;
        assert_eq!(err, Err("boom".to_string()));
    }
}

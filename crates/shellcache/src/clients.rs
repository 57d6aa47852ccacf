//! # Client Gateway
//!
//! The host-visible side effects of the lifecycle: a fresh install asks to
//! take over future loads immediately (skip waiting), and activation claims
//! every already-open application instance. The hosting environment supplies
//! the implementation; the controller only signals intent.

use async_trait::async_trait;

/// Hook into the hosting environment's client management
#[async_trait]
pub trait ClientGateway: Send + Sync {
    /// Request immediate takeover of future loads, skipping the usual
    /// wait-for-no-active-clients deferral. Called after a fully
    /// successful install.
    async fn skip_waiting(&self);

    /// Take over all currently open application instances. Called at the
    /// end of activation.
    async fn claim(&self);
}

/// Gateway that ignores both signals, for hosts with no client tracking
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopGateway;

#[async_trait]
impl ClientGateway for NoopGateway {
    async fn skip_waiting(&self) {}

    async fn claim(&self) {}
}

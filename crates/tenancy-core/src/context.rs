//! Request-scoped tenant context.
//!
//! `TenantContext` carries the resolved tenant and shard of the request being
//! served. It lives in tokio task-local storage, so it follows the call graph
//! of one logical request (including its `.await` continuations) and is
//! invisible to every other task running concurrently.
//!
//! Task-local values are not inherited by spawned tasks. Wrap the spawned
//! future in [`TenantContext::scope`] when work for the same request has to
//! move to another task.

use std::future::Future;

use serde::{Deserialize, Serialize};
use tenancy_shared::{ShardId, TenantId};
use tokio::task_local;

use crate::error::DomainError;

task_local! {
    static CURRENT_TENANT: TenantContext;
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TenantContext {
    pub tenant_id: Option<TenantId>,
    pub shard_id: Option<ShardId>,
}

impl TenantContext {
    /// Context before resolution. Also the provisioning context, where the
    /// tenant filter is bypassed because the tenant does not exist yet.
    pub const fn empty() -> Self {
        Self { tenant_id: None, shard_id: None }
    }

    pub const fn resolved(tenant_id: TenantId, shard_id: ShardId) -> Self {
        Self { tenant_id: Some(tenant_id), shard_id: Some(shard_id) }
    }

    pub fn is_resolved(&self) -> bool {
        self.tenant_id.is_some() && self.shard_id.is_some()
    }

    /// The context in scope for the current task, or [`TenantContext::empty`].
    pub fn current() -> Self {
        CURRENT_TENANT.try_with(|ctx| *ctx).unwrap_or_default()
    }

    /// Runs `fut` with `ctx` as the current tenant context.
    ///
    /// Scopes nest: the innermost one wins until its future completes, after
    /// which the outer context is visible again.
    pub async fn scope<F>(ctx: TenantContext, fut: F) -> F::Output
    where
        F: Future,
    {
        CURRENT_TENANT.scope(ctx, fut).await
    }

    pub fn require_shard(&self) -> Result<ShardId, DomainError> {
        self.shard_id.ok_or_else(|| {
            DomainError::TenantNotResolved(
                "shard id is not set; resolve the tenant before opening a shard context".into(),
            )
        })
    }

    pub fn require_tenant(&self) -> Result<TenantId, DomainError> {
        self.tenant_id
            .ok_or_else(|| DomainError::TenantNotResolved("tenant id is not set".into()))
    }
}

impl std::fmt::Display for TenantContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match (self.tenant_id, self.shard_id) {
            (Some(t), Some(s)) => write!(f, "tenant {} on shard {}", t, s),
            (Some(t), None) => write!(f, "tenant {} (no shard)", t),
            (None, Some(s)) => write!(f, "anonymous on shard {}", s),
            (None, None) => write!(f, "unresolved"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_current_is_empty_out_of_scope() {
        assert_eq!(TenantContext::current(), TenantContext::empty());
    }

    #[tokio::test]
    async fn test_scope_is_visible_across_await() {
        let ctx = TenantContext::resolved(42, 3);
        let observed = TenantContext::scope(ctx, async {
            tokio::task::yield_now().await;
            TenantContext::current()
        })
        .await;
        assert_eq!(observed, ctx);
        assert_eq!(TenantContext::current(), TenantContext::empty());
    }

    #[tokio::test]
    async fn test_nested_scope_restores_outer() {
        let outer = TenantContext::resolved(1, 1);
        let inner = TenantContext::resolved(2, 2);
        let (seen_inner, seen_outer) = TenantContext::scope(outer, async {
            let seen_inner = TenantContext::scope(inner, async { TenantContext::current() }).await;
            (seen_inner, TenantContext::current())
        })
        .await;
        assert_eq!(seen_inner, inner);
        assert_eq!(seen_outer, outer);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_scopes_do_not_leak() {
        let tasks: Vec<_> = (1..=32)
            .map(|tenant| {
                tokio::spawn(TenantContext::scope(
                    TenantContext::resolved(tenant, (tenant % 4) as u32 + 1),
                    async move {
                        for _ in 0..10 {
                            tokio::task::yield_now().await;
                            assert_eq!(TenantContext::current().tenant_id, Some(tenant));
                        }
                        tenant
                    },
                ))
            })
            .collect();

        for task in tasks {
            task.await.unwrap();
        }
    }

    #[tokio::test]
    async fn test_spawned_task_does_not_inherit() {
        let observed = TenantContext::scope(TenantContext::resolved(7, 1), async {
            tokio::spawn(async { TenantContext::current() }).await.unwrap()
        })
        .await;
        assert_eq!(observed, TenantContext::empty());
    }

    #[test]
    fn test_require_shard_fails_when_unresolved() {
        assert!(matches!(
            TenantContext::empty().require_shard(),
            Err(DomainError::TenantNotResolved(_))
        ));
        assert_eq!(TenantContext::resolved(1, 5).require_shard().unwrap(), 5);
    }
}

//! Task-scoped context fields merged into every record logged within the
//! scope.
//!
//! Storage is per logical task, so concurrent tasks never observe each
//! other's fields. Nested scopes see their parent's fields and may shadow
//! them.

use std::future::Future;

use super::record::Fields;

tokio::task_local! {
    static CONTEXT_FIELDS: Fields;
}

/// Run `fut` with `fields` merged into the ambient context.
pub async fn scope<F>(fields: Fields, fut: F) -> F::Output
where
    F: Future,
{
    let mut merged = current();
    merged.extend(fields);
    CONTEXT_FIELDS.scope(merged, fut).await
}

/// Synchronous variant of [`scope`].
pub fn sync_scope<F, R>(fields: Fields, f: F) -> R
where
    F: FnOnce() -> R,
{
    let mut merged = current();
    merged.extend(fields);
    CONTEXT_FIELDS.sync_scope(merged, f)
}

/// Snapshot of the ambient context fields. Empty outside any scope.
pub fn current() -> Fields {
    CONTEXT_FIELDS
        .try_with(|fields| fields.clone())
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[tokio::test]
    async fn nested_scopes_shadow_parent_fields() {
        let mut outer = Fields::new();
        outer.insert("request_id".to_string(), json!("outer"));
        outer.insert("tenant".to_string(), json!("acme"));

        scope(outer, async {
            let mut inner = Fields::new();
            inner.insert("request_id".to_string(), json!("inner"));

            scope(inner, async {
                let ctx = current();
                assert_eq!(ctx.get("request_id"), Some(&json!("inner")));
                assert_eq!(ctx.get("tenant"), Some(&json!("acme")));
            })
            .await;

            assert_eq!(current().get("request_id"), Some(&json!("outer")));
        })
        .await;

        assert!(current().is_empty());
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn concurrent_tasks_are_isolated() {
        let a = tokio::spawn(async {
            let mut fields = Fields::new();
            fields.insert("task".to_string(), json!("a"));
            scope(fields, async {
                tokio::task::yield_now().await;
                current().get("task").cloned()
            })
            .await
        });
        let b = tokio::spawn(async {
            let mut fields = Fields::new();
            fields.insert("task".to_string(), json!("b"));
            scope(fields, async {
                tokio::task::yield_now().await;
                current().get("task").cloned()
            })
            .await
        });

        assert_eq!(a.await.unwrap(), Some(json!("a")));
        assert_eq!(b.await.unwrap(), Some(json!("b")));
    }
}

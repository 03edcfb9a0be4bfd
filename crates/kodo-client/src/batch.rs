//! Batch operations.
//!
//! Builders turn a bucket plus an ordered `key -> parameter` mapping into
//! [`BatchOp`]s (one per entry, in iteration order, duplicates kept). The
//! [`BatchExecutor`] submits them in contiguous chunks no larger than the
//! per-request ceiling and concatenates the per-item results, so result `i`
//! always belongs to operation `i`.

use kodo_models::{BatchItem, ObjectStatus, StorageTier};
use tracing::debug;

use crate::auth::{encoded_entry, urlsafe_base64};
use crate::client::KodoClient;
use crate::error::{KodoError, KodoResult};
use crate::metrics::record_batch_items;

// =============================================================================
// Operations
// =============================================================================

/// One primitive object operation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BatchOp {
    Stat {
        bucket: String,
        key: String,
    },
    Move {
        bucket: String,
        key: String,
        dest_bucket: String,
        dest_key: String,
        force: bool,
    },
    Copy {
        bucket: String,
        key: String,
        dest_bucket: String,
        dest_key: String,
        force: bool,
    },
    Delete {
        bucket: String,
        key: String,
    },
    /// `days == 0` removes a previously scheduled deletion.
    DeleteAfterDays {
        bucket: String,
        key: String,
        days: u32,
    },
    ChangeType {
        bucket: String,
        key: String,
        tier: StorageTier,
    },
    ChangeMime {
        bucket: String,
        key: String,
        mime: String,
    },
    ChangeStatus {
        bucket: String,
        key: String,
        status: ObjectStatus,
    },
}

impl BatchOp {
    /// Operation name, used for logs and metrics.
    pub fn name(&self) -> &'static str {
        match self {
            BatchOp::Stat { .. } => "stat",
            BatchOp::Move { .. } => "move",
            BatchOp::Copy { .. } => "copy",
            BatchOp::Delete { .. } => "delete",
            BatchOp::DeleteAfterDays { .. } => "delete_after_days",
            BatchOp::ChangeType { .. } => "change_type",
            BatchOp::ChangeMime { .. } => "change_mime",
            BatchOp::ChangeStatus { .. } => "change_status",
        }
    }

    /// Source key the operation applies to.
    pub fn key(&self) -> &str {
        match self {
            BatchOp::Stat { key, .. }
            | BatchOp::Move { key, .. }
            | BatchOp::Copy { key, .. }
            | BatchOp::Delete { key, .. }
            | BatchOp::DeleteAfterDays { key, .. }
            | BatchOp::ChangeType { key, .. }
            | BatchOp::ChangeMime { key, .. }
            | BatchOp::ChangeStatus { key, .. } => key,
        }
    }

    /// Command string, usable as a management path or as a batch `op` value.
    pub fn path(&self) -> String {
        match self {
            BatchOp::Stat { bucket, key } => {
                format!("/stat/{}", encoded_entry(bucket, Some(key)))
            }
            BatchOp::Move {
                bucket,
                key,
                dest_bucket,
                dest_key,
                force,
            } => format!(
                "/move/{}/{}/force/{}",
                encoded_entry(bucket, Some(key)),
                encoded_entry(dest_bucket, Some(dest_key)),
                force
            ),
            BatchOp::Copy {
                bucket,
                key,
                dest_bucket,
                dest_key,
                force,
            } => format!(
                "/copy/{}/{}/force/{}",
                encoded_entry(bucket, Some(key)),
                encoded_entry(dest_bucket, Some(dest_key)),
                force
            ),
            BatchOp::Delete { bucket, key } => {
                format!("/delete/{}", encoded_entry(bucket, Some(key)))
            }
            BatchOp::DeleteAfterDays { bucket, key, days } => format!(
                "/deleteAfterDays/{}/{}",
                encoded_entry(bucket, Some(key)),
                days
            ),
            BatchOp::ChangeType { bucket, key, tier } => format!(
                "/chtype/{}/type/{}",
                encoded_entry(bucket, Some(key)),
                tier.code()
            ),
            BatchOp::ChangeMime { bucket, key, mime } => format!(
                "/chgm/{}/mime/{}",
                encoded_entry(bucket, Some(key)),
                urlsafe_base64(mime)
            ),
            BatchOp::ChangeStatus {
                bucket,
                key,
                status,
            } => format!(
                "/chstatus/{}/status/{}",
                encoded_entry(bucket, Some(key)),
                status.code()
            ),
        }
    }
}

/// Form body of one batch request: `op=<op1>&op=<op2>...`.
pub fn form_body(ops: &[BatchOp]) -> String {
    ops.iter()
        .map(|op| format!("op={}", op.path()))
        .collect::<Vec<_>>()
        .join("&")
}

// =============================================================================
// Builders
// =============================================================================

pub fn build_stat<I, K>(bucket: &str, keys: I) -> Vec<BatchOp>
where
    I: IntoIterator<Item = K>,
    K: Into<String>,
{
    keys.into_iter()
        .map(|key| BatchOp::Stat {
            bucket: bucket.to_string(),
            key: key.into(),
        })
        .collect()
}

pub fn build_delete<I, K>(bucket: &str, keys: I) -> Vec<BatchOp>
where
    I: IntoIterator<Item = K>,
    K: Into<String>,
{
    keys.into_iter()
        .map(|key| BatchOp::Delete {
            bucket: bucket.to_string(),
            key: key.into(),
        })
        .collect()
}

/// Pair every key with `<prefix>_<key>_<suffix>`, the destination naming
/// used for bulk moves and copies. The separators are always present.
pub fn renamed_pairs<I, K>(keys: I, prefix: &str, suffix: &str) -> Vec<(String, String)>
where
    I: IntoIterator<Item = K>,
    K: Into<String>,
{
    keys.into_iter()
        .map(|key| {
            let key = key.into();
            let dest = format!("{}_{}_{}", prefix, key, suffix);
            (key, dest)
        })
        .collect()
}

/// `pairs` maps source key to destination key.
pub fn build_move<I, K, V>(bucket: &str, pairs: I, dest_bucket: &str, force: bool) -> Vec<BatchOp>
where
    I: IntoIterator<Item = (K, V)>,
    K: Into<String>,
    V: Into<String>,
{
    pairs
        .into_iter()
        .map(|(key, dest_key)| BatchOp::Move {
            bucket: bucket.to_string(),
            key: key.into(),
            dest_bucket: dest_bucket.to_string(),
            dest_key: dest_key.into(),
            force,
        })
        .collect()
}

/// `pairs` maps source key to destination key.
pub fn build_copy<I, K, V>(bucket: &str, pairs: I, dest_bucket: &str, force: bool) -> Vec<BatchOp>
where
    I: IntoIterator<Item = (K, V)>,
    K: Into<String>,
    V: Into<String>,
{
    pairs
        .into_iter()
        .map(|(key, dest_key)| BatchOp::Copy {
            bucket: bucket.to_string(),
            key: key.into(),
            dest_bucket: dest_bucket.to_string(),
            dest_key: dest_key.into(),
            force,
        })
        .collect()
}

pub fn build_delete_after_days<I, K>(bucket: &str, pairs: I) -> Vec<BatchOp>
where
    I: IntoIterator<Item = (K, u32)>,
    K: Into<String>,
{
    pairs
        .into_iter()
        .map(|(key, days)| BatchOp::DeleteAfterDays {
            bucket: bucket.to_string(),
            key: key.into(),
            days,
        })
        .collect()
}

pub fn build_change_type<I, K>(bucket: &str, pairs: I) -> Vec<BatchOp>
where
    I: IntoIterator<Item = (K, StorageTier)>,
    K: Into<String>,
{
    pairs
        .into_iter()
        .map(|(key, tier)| BatchOp::ChangeType {
            bucket: bucket.to_string(),
            key: key.into(),
            tier,
        })
        .collect()
}

pub fn build_change_mime<I, K, V>(bucket: &str, pairs: I) -> Vec<BatchOp>
where
    I: IntoIterator<Item = (K, V)>,
    K: Into<String>,
    V: Into<String>,
{
    pairs
        .into_iter()
        .map(|(key, mime)| BatchOp::ChangeMime {
            bucket: bucket.to_string(),
            key: key.into(),
            mime: mime.into(),
        })
        .collect()
}

pub fn build_change_status<I, K>(bucket: &str, pairs: I) -> Vec<BatchOp>
where
    I: IntoIterator<Item = (K, ObjectStatus)>,
    K: Into<String>,
{
    pairs
        .into_iter()
        .map(|(key, status)| BatchOp::ChangeStatus {
            bucket: bucket.to_string(),
            key: key.into(),
            status,
        })
        .collect()
}

// =============================================================================
// Executor
// =============================================================================

/// Submits operation sets in chunks of at most `limit` operations.
#[derive(Clone)]
pub struct BatchExecutor {
    client: KodoClient,
    limit: usize,
}

impl BatchExecutor {
    /// A `limit` of zero is treated as one.
    pub fn new(client: KodoClient, limit: usize) -> Self {
        Self {
            client,
            limit: limit.max(1),
        }
    }

    pub fn limit(&self) -> usize {
        self.limit
    }

    /// Submit `ops` and return one item per operation, in order.
    ///
    /// Chunks are sent one after another. The first chunk that fails at the
    /// transport or service level fails the whole call; items of chunks
    /// already submitted are discarded. Failed items inside a successful
    /// chunk are returned as-is.
    pub async fn execute(&self, ops: &[BatchOp]) -> KodoResult<Vec<BatchItem>> {
        if ops.is_empty() {
            return Ok(Vec::new());
        }

        let url = format!("{}/batch", self.client.hosts().rs);
        let mut results = Vec::with_capacity(ops.len());

        for (index, chunk) in ops.chunks(self.limit).enumerate() {
            debug!(chunk = index, size = chunk.len(), "submitting batch chunk");

            let body = self
                .client
                .post_form("batch", url.clone(), Some(form_body(chunk)))
                .await?;
            let items: Vec<BatchItem> = KodoClient::decode("batch", &body)?;

            if items.len() != chunk.len() {
                return Err(KodoError::invalid_response(format!(
                    "batch chunk {} returned {} results for {} operations",
                    index,
                    items.len(),
                    chunk.len()
                )));
            }

            let failed = items.iter().filter(|item| !item.is_success()).count() as u64;
            record_batch_items(items.len() as u64 - failed, failed);
            results.extend(items);
        }

        Ok(results)
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{test_client, ScriptedTransport};
    use serde_json::json;

    fn ok_items(n: usize) -> serde_json::Value {
        json!((0..n).map(|i| json!({"code": 200, "data": {"fsize": i}})).collect::<Vec<_>>())
    }

    #[test]
    fn test_op_paths() {
        let stat = BatchOp::Stat {
            bucket: "photos".into(),
            key: "a.jpg".into(),
        };
        assert_eq!(stat.path(), "/stat/cGhvdG9zOmEuanBn");

        let mv = BatchOp::Move {
            bucket: "src".into(),
            key: "a".into(),
            dest_bucket: "dst".into(),
            dest_key: "b".into(),
            force: true,
        };
        assert_eq!(mv.path(), "/move/c3JjOmE=/ZHN0OmI=/force/true");

        let cp = BatchOp::Copy {
            bucket: "src".into(),
            key: "a".into(),
            dest_bucket: "dst".into(),
            dest_key: "b".into(),
            force: false,
        };
        assert_eq!(cp.path(), "/copy/c3JjOmE=/ZHN0OmI=/force/false");

        let del = BatchOp::Delete {
            bucket: "photos".into(),
            key: "a.jpg".into(),
        };
        assert_eq!(del.path(), "/delete/cGhvdG9zOmEuanBn");

        let expire = BatchOp::DeleteAfterDays {
            bucket: "photos".into(),
            key: "a.jpg".into(),
            days: 7,
        };
        assert_eq!(expire.path(), "/deleteAfterDays/cGhvdG9zOmEuanBn/7");

        let chtype = BatchOp::ChangeType {
            bucket: "photos".into(),
            key: "a.jpg".into(),
            tier: StorageTier::Infrequent,
        };
        assert_eq!(chtype.path(), "/chtype/cGhvdG9zOmEuanBn/type/1");

        let chstatus = BatchOp::ChangeStatus {
            bucket: "photos".into(),
            key: "a.jpg".into(),
            status: ObjectStatus::Disabled,
        };
        assert_eq!(chstatus.path(), "/chstatus/cGhvdG9zOmEuanBn/status/1");

        let chgm = BatchOp::ChangeMime {
            bucket: "photos".into(),
            key: "a.jpg".into(),
            mime: "image/png".into(),
        };
        assert_eq!(chgm.path(), "/chgm/cGhvdG9zOmEuanBn/mime/aW1hZ2UvcG5n");
    }

    #[test]
    fn test_form_body_joins_ops() {
        let ops = build_delete("photos", ["a.jpg", "a.jpg"]);
        assert_eq!(
            form_body(&ops),
            "op=/delete/cGhvdG9zOmEuanBn&op=/delete/cGhvdG9zOmEuanBn"
        );
    }

    #[test]
    fn test_move_builder_preserves_insertion_order() {
        let ops = build_move("src", vec![("k1", "v1"), ("k2", "v2")], "dst", true);
        let keys: Vec<&str> = ops.iter().map(BatchOp::key).collect();
        assert_eq!(keys, vec!["k1", "k2"]);
        assert!(matches!(&ops[0], BatchOp::Move { dest_key, .. } if dest_key == "v1"));
        assert!(matches!(&ops[1], BatchOp::Move { dest_key, .. } if dest_key == "v2"));
    }

    #[test]
    fn test_renamed_pairs_wrap_key() {
        let pairs = renamed_pairs(["a.jpg", "b.jpg"], "2024", "bak");
        assert_eq!(
            pairs,
            vec![
                ("a.jpg".to_string(), "2024_a.jpg_bak".to_string()),
                ("b.jpg".to_string(), "2024_b.jpg_bak".to_string()),
            ]
        );
        assert_eq!(renamed_pairs(["a"], "", "")[0].1, "_a_");
    }

    #[test]
    fn test_builders_keep_duplicates_and_empty_input() {
        let ops = build_change_mime("b", vec![("k", "text/plain"), ("k", "text/html")]);
        assert_eq!(ops.len(), 2);
        assert!(build_stat("b", Vec::<String>::new()).is_empty());
        assert!(build_change_status("b", Vec::<(String, ObjectStatus)>::new()).is_empty());
    }

    #[tokio::test]
    async fn test_empty_ops_send_nothing() {
        let transport = ScriptedTransport::new();
        let executor = BatchExecutor::new(test_client(transport.clone()), 10);
        let items = executor.execute(&[]).await.unwrap();
        assert!(items.is_empty());
        assert_eq!(transport.calls(), 0);
    }

    #[tokio::test]
    async fn test_chunks_by_limit_and_keeps_order() {
        let transport = ScriptedTransport::new();
        transport.push_json(200, json!([{"code": 200, "data": {"fsize": 0}}, {"code": 200, "data": {"fsize": 1}}]));
        transport.push_json(200, json!([{"code": 200, "data": {"fsize": 2}}, {"code": 200, "data": {"fsize": 3}}]));
        transport.push_json(200, json!([{"code": 200, "data": {"fsize": 4}}]));

        let keys: Vec<String> = (0..5).map(|i| format!("k{}", i)).collect();
        let ops = build_stat("photos", keys.clone());
        let executor = BatchExecutor::new(test_client(transport.clone()), 2);
        let items = executor.execute(&ops).await.unwrap();

        assert_eq!(transport.calls(), 3);
        assert_eq!(items.len(), 5);
        for (i, item) in items.iter().enumerate() {
            assert_eq!(item.data.as_ref().unwrap()["fsize"], i);
        }

        let requests = transport.requests();
        assert!(requests[0].url.ends_with("/batch"));
        assert_eq!(requests[0].body_text(), form_body(&ops[0..2]));
        assert_eq!(requests[1].body_text(), form_body(&ops[2..4]));
        assert_eq!(requests[2].body_text(), form_body(&ops[4..5]));
    }

    #[tokio::test]
    async fn test_single_chunk_when_under_limit() {
        let transport = ScriptedTransport::new();
        transport.push_json(200, ok_items(3));

        let ops = build_delete("photos", ["a", "b", "c"]);
        let executor = BatchExecutor::new(test_client(transport.clone()), 1000);
        assert_eq!(executor.execute(&ops).await.unwrap().len(), 3);
        assert_eq!(transport.calls(), 1);
    }

    #[tokio::test]
    async fn test_item_errors_do_not_fail_call() {
        let transport = ScriptedTransport::new();
        transport.push_json(
            298,
            json!([
                {"code": 200},
                {"code": 612, "data": {"error": "no such file or directory"}}
            ]),
        );

        let ops = build_delete("photos", ["a", "missing"]);
        let executor = BatchExecutor::new(test_client(transport), 1000);
        let items = executor.execute(&ops).await.unwrap();

        assert!(items[0].is_success());
        assert_eq!(items[1].error(), Some("no such file or directory"));
    }

    #[tokio::test]
    async fn test_failed_chunk_fails_whole_call() {
        let transport = ScriptedTransport::new();
        transport.push_json(200, ok_items(2));
        transport.push_json(401, json!({"error": "bad token"}));
        transport.push_json(200, ok_items(1));

        let ops = build_stat("photos", ["a", "b", "c", "d", "e"]);
        let executor = BatchExecutor::new(test_client(transport.clone()), 2);
        let err = executor.execute(&ops).await.unwrap_err();

        assert_eq!(err.code(), 401);
        assert_eq!(err.message(), "bad token");
        assert_eq!(transport.calls(), 2);
    }

    #[tokio::test]
    async fn test_disconnect_fails_whole_call() {
        let transport = ScriptedTransport::new();
        transport.push_disconnect();

        let ops = build_stat("photos", ["a"]);
        let executor = BatchExecutor::new(test_client(transport), 10);
        let err = executor.execute(&ops).await.unwrap_err();
        assert_eq!(err.code(), -1);
    }

    #[tokio::test]
    async fn test_result_count_mismatch_is_invalid_response() {
        let transport = ScriptedTransport::new();
        transport.push_json(200, ok_items(1));

        let ops = build_stat("photos", ["a", "b"]);
        let executor = BatchExecutor::new(test_client(transport), 10);
        let err = executor.execute(&ops).await.unwrap_err();
        assert!(matches!(err, KodoError::InvalidResponse(_)));
    }

    #[test]
    fn test_zero_limit_is_clamped() {
        let executor = BatchExecutor::new(test_client(ScriptedTransport::new()), 0);
        assert_eq!(executor.limit(), 1);
    }
}

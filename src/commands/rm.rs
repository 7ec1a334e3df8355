// ABOUTME: Remove orchestrator: resolve targets, remove them through the pool, report.
// ABOUTME: Unresolvable names fall back to storage cleanup when forced.

use crate::error::{Error, ErrorKind, Result};
use crate::output::Output;
use crate::pool::{WorkItem, WorkerPool};
use crate::runtime::{Container, ContainerError, RemoveOptions, Runtime};
use std::collections::HashSet;
use tokio_util::sync::CancellationToken;

/// Arguments of `rm`.
#[derive(Debug, Clone, Default)]
pub struct RmArgs {
    pub all: bool,
    pub force: bool,
    pub latest: bool,
    pub volumes: bool,
    pub names: Vec<String>,
}

impl RmArgs {
    /// Reject flag combinations before anything connects to the engine.
    pub fn validate(&self) -> Result<()> {
        if self.all && self.latest {
            return Err(Error::InvalidArgument(
                "--all and --latest cannot be used together".to_string(),
            ));
        }
        if (self.all || self.latest) && !self.names.is_empty() {
            return Err(Error::InvalidArgument(
                "--all and --latest cannot be used with container names".to_string(),
            ));
        }
        if !self.all && !self.latest && self.names.is_empty() {
            return Err(Error::InvalidArgument(
                "specify one or more containers to remove".to_string(),
            ));
        }
        Ok(())
    }

    fn remove_options(&self) -> RemoveOptions {
        RemoveOptions {
            force: self.force,
            volumes: self.volumes,
        }
    }
}

/// One line of the report, in submission order.
enum Entry {
    /// Removal submitted to the pool under this container id.
    Submitted(String),
    /// Storage cleanup of a name lookups could not find.
    Repaired(String, std::result::Result<(), ContainerError>),
    /// Resolution failed; nothing was submitted.
    Unresolved(Error),
}

#[derive(Default)]
struct Batch {
    entries: Vec<Entry>,
    items: Vec<WorkItem<Container>>,
    seen: HashSet<String>,
}

impl Batch {
    /// Queue a container for removal once, however often it was named.
    fn submit(&mut self, container: Container) {
        let id = container.id.to_string();
        if self.seen.insert(id.clone()) {
            self.entries.push(Entry::Submitted(id.clone()));
            self.items.push(WorkItem::new(id, container));
        }
    }
}

/// Remove the containers selected by `args`.
///
/// Every success prints the container id on stdout and every failure prints
/// its message on stderr, in submission order. Any failure makes the whole
/// command fail with [`Error::Batch`].
pub async fn rm(
    runtime: &dyn Runtime,
    args: &RmArgs,
    pool: WorkerPool,
    cancel: &CancellationToken,
    out: &Output,
) -> Result<()> {
    args.validate()?;

    let mut batch = Batch::default();

    if args.all {
        for container in runtime.list_containers().await? {
            batch.submit(container);
        }
    } else if args.latest {
        batch.submit(runtime.get_latest_container().await.map_err(Error::Latest)?);
    } else {
        for name in &args.names {
            match runtime.lookup_container(name).await {
                Ok(container) => batch.submit(container),
                Err(e) if args.force && e.kind() == ErrorKind::NoSuchContainer => {
                    tracing::debug!(container = %name, "not found, removing from storage");
                    let repaired = runtime
                        .remove_containers_from_storage(std::slice::from_ref(name))
                        .await;
                    batch.entries.push(Entry::Repaired(name.clone(), repaired));
                }
                Err(source) => batch.entries.push(Entry::Unresolved(Error::Lookup {
                    name: name.clone(),
                    source,
                })),
            }
        }
    }

    let Batch { entries, items, .. } = batch;
    let opts = args.remove_options();
    let mut report = pool
        .execute(items, |container: Container| async move {
            if cancel.is_cancelled() {
                return Err(ContainerError::Cancelled(container.id.to_string()));
            }
            runtime.remove_container(&container, opts, cancel).await
        })
        .await;

    let total = entries.len();
    let mut failed = 0;
    for entry in entries {
        let outcome = match entry {
            Entry::Submitted(id) => match report.take(&id) {
                Some(Ok(())) => Ok(id),
                Some(Err(e)) => Err(e.to_string()),
                None => continue,
            },
            Entry::Repaired(name, Ok(())) => Ok(name),
            Entry::Repaired(name, Err(e)) if e.kind() == ErrorKind::NoSuchContainer => {
                tracing::debug!(container = %name, "already gone from storage");
                Ok(name)
            }
            Entry::Repaired(name, Err(e)) => {
                tracing::warn!(container = %name, "storage cleanup failed: {}", e);
                Err(format!("failed to remove container {name} from storage: {e}"))
            }
            Entry::Unresolved(e) => Err(e.to_string()),
        };

        match outcome {
            Ok(id) => out.line(&id),
            Err(message) => {
                failed += 1;
                out.diagnostic(&message);
            }
        }
    }

    if failed > 0 {
        return Err(Error::Batch { failed, total });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::output::Stream;
    use crate::runtime::testing::{FakeRuntime, exited, running};
    use std::time::Duration;

    fn named(names: &[&str]) -> RmArgs {
        RmArgs {
            names: names.iter().map(|n| n.to_string()).collect(),
            ..RmArgs::default()
        }
    }

    #[test]
    fn validation_rejects_bad_combinations() {
        let all_and_latest = RmArgs {
            all: true,
            latest: true,
            ..RmArgs::default()
        };
        let all_with_names = RmArgs {
            all: true,
            ..named(&["web"])
        };
        let latest_with_names = RmArgs {
            latest: true,
            ..named(&["web"])
        };

        for args in [all_and_latest, all_with_names, latest_with_names, RmArgs::default()] {
            let err = args.validate().unwrap_err();
            assert_eq!(err.kind(), ErrorKind::InvalidArgument, "{args:?}");
        }
        assert!(named(&["web"]).validate().is_ok());
    }

    #[tokio::test]
    async fn invalid_arguments_never_touch_the_runtime() {
        let rt = FakeRuntime::new().with_container("aaa", "web");
        let (out, captured) = Output::capture();
        let args = RmArgs {
            all: true,
            ..named(&["web"])
        };

        let err = rm(&rt, &args, WorkerPool::new(2), &CancellationToken::new(), &out)
            .await
            .unwrap_err();

        assert_eq!(err.kind(), ErrorKind::InvalidArgument);
        assert!(rt.lookups().is_empty());
        assert!(captured.lines().is_empty());
    }

    #[tokio::test]
    async fn running_container_fails_while_stopped_one_is_removed() {
        let rt = FakeRuntime::new()
            .with_container("aaa", "stopped")
            .with_container("bbb", "busy")
            .with_states("bbb", vec![running()]);
        let (out, captured) = Output::capture();

        let err = rm(
            &rt,
            &named(&["stopped", "busy"]),
            WorkerPool::new(2),
            &CancellationToken::new(),
            &out,
        )
        .await
        .unwrap_err();

        assert!(matches!(err, Error::Batch { failed: 1, total: 2 }));
        assert_eq!(rt.removed(), vec!["aaa"]);
        assert_eq!(captured.stdout(), vec!["aaa"]);
        assert_eq!(captured.stderr().len(), 1);
        assert!(captured.stderr()[0].contains("bbb is running"));
    }

    #[tokio::test]
    async fn engine_failure_is_reported_per_item() {
        let rt = FakeRuntime::new()
            .with_container("aaa", "one")
            .with_container("bbb", "two")
            .failing_removal("aaa", ContainerError::Runtime);
        let (out, captured) = Output::capture();

        let err = rm(
            &rt,
            &named(&["one", "two"]),
            WorkerPool::new(2),
            &CancellationToken::new(),
            &out,
        )
        .await
        .unwrap_err();

        assert!(matches!(err, Error::Batch { failed: 1, total: 2 }));
        assert_eq!(captured.stderr(), vec!["runtime error: aaa"]);
        assert_eq!(captured.stdout(), vec!["bbb"]);
    }

    #[tokio::test]
    async fn force_removes_running_containers() {
        let rt = FakeRuntime::new()
            .with_container("bbb", "busy")
            .with_states("bbb", vec![running()]);
        let (out, captured) = Output::capture();
        let args = RmArgs {
            force: true,
            ..named(&["busy"])
        };

        rm(&rt, &args, WorkerPool::new(1), &CancellationToken::new(), &out)
            .await
            .unwrap();

        assert_eq!(rt.removed(), vec!["bbb"]);
        assert_eq!(captured.stdout(), vec!["bbb"]);
    }

    #[tokio::test]
    async fn force_falls_back_to_storage_cleanup_for_missing_names() {
        let rt = FakeRuntime::new().failing_storage_removal(ContainerError::NotFound);
        let (out, captured) = Output::capture();
        let args = RmArgs {
            force: true,
            ..named(&["ghost"])
        };

        rm(&rt, &args, WorkerPool::new(1), &CancellationToken::new(), &out)
            .await
            .unwrap();

        assert_eq!(rt.storage_removed(), vec!["ghost"]);
        assert_eq!(captured.stdout(), vec!["ghost"]);
        assert!(captured.stderr().is_empty());
    }

    #[tokio::test]
    async fn storage_cleanup_errors_other_than_not_found_are_failures() {
        let rt = FakeRuntime::new().failing_storage_removal(ContainerError::NotImplemented);
        let (out, captured) = Output::capture();
        let args = RmArgs {
            force: true,
            ..named(&["ghost"])
        };

        let err = rm(&rt, &args, WorkerPool::new(1), &CancellationToken::new(), &out)
            .await
            .unwrap_err();

        assert!(matches!(err, Error::Batch { failed: 1, total: 1 }));
        assert!(captured.stderr()[0].contains("ghost"));
    }

    #[tokio::test]
    async fn missing_name_without_force_is_reported_and_others_still_removed() {
        let rt = FakeRuntime::new().with_container("aaa", "web");
        let (out, captured) = Output::capture();

        let err = rm(
            &rt,
            &named(&["ghost", "web"]),
            WorkerPool::new(4),
            &CancellationToken::new(),
            &out,
        )
        .await
        .unwrap_err();

        assert!(matches!(err, Error::Batch { failed: 1, total: 2 }));
        assert!(rt.storage_removed().is_empty());
        assert_eq!(rt.removed(), vec!["aaa"]);
        assert_eq!(
            captured.lines(),
            vec![
                (
                    Stream::Stderr,
                    "unable to find container ghost: no such container: ghost".to_string()
                ),
                (Stream::Stdout, "aaa".to_string()),
            ]
        );
    }

    #[tokio::test]
    async fn report_follows_submission_order() {
        let rt = FakeRuntime::new()
            .with_container("aaa", "one")
            .with_container("bbb", "two")
            .with_container("ccc", "three")
            .slow_removal("aaa", Duration::from_millis(30));
        let (out, captured) = Output::capture();

        rm(
            &rt,
            &named(&["one", "two", "three"]),
            WorkerPool::new(3),
            &CancellationToken::new(),
            &out,
        )
        .await
        .unwrap();

        assert_eq!(captured.stdout(), vec!["aaa", "bbb", "ccc"]);
        // The slow removal finished last, but is still reported first.
        assert_eq!(rt.removed().last().map(String::as_str), Some("aaa"));
    }

    #[tokio::test]
    async fn all_removes_every_container_within_the_worker_bound() {
        let mut rt = FakeRuntime::new();
        for i in 0..8 {
            rt = rt.with_container(&format!("id{i}"), &format!("c{i}"));
        }
        let (out, captured) = Output::capture();
        let args = RmArgs {
            all: true,
            ..RmArgs::default()
        };

        rm(&rt, &args, WorkerPool::new(3), &CancellationToken::new(), &out)
            .await
            .unwrap();

        assert_eq!(rt.removed().len(), 8);
        assert_eq!(captured.stdout().len(), 8);
        assert!(rt.max_in_flight() <= 3);
    }

    #[tokio::test]
    async fn latest_removes_only_the_latest_container() {
        let rt = FakeRuntime::new()
            .with_container("aaa", "old")
            .with_container("bbb", "new")
            .with_latest("bbb");
        let (out, _) = Output::capture();
        let args = RmArgs {
            latest: true,
            ..RmArgs::default()
        };

        rm(&rt, &args, WorkerPool::new(2), &CancellationToken::new(), &out)
            .await
            .unwrap();

        assert_eq!(rt.removed(), vec!["bbb"]);
    }

    #[tokio::test]
    async fn latest_lookup_failure_is_fatal() {
        let rt = FakeRuntime::new().with_container("aaa", "old");
        let (out, captured) = Output::capture();
        let args = RmArgs {
            latest: true,
            ..RmArgs::default()
        };

        let err = rm(&rt, &args, WorkerPool::new(2), &CancellationToken::new(), &out)
            .await
            .unwrap_err();

        assert!(matches!(err, Error::Latest(_)));
        assert!(rt.removed().is_empty());
        assert!(captured.lines().is_empty());
    }

    #[tokio::test]
    async fn duplicate_names_are_removed_once() {
        let rt = FakeRuntime::new().with_container("aaa", "web");
        let (out, captured) = Output::capture();

        rm(
            &rt,
            &named(&["web", "aaa"]),
            WorkerPool::new(2),
            &CancellationToken::new(),
            &out,
        )
        .await
        .unwrap();

        assert_eq!(rt.removed(), vec!["aaa"]);
        assert_eq!(captured.stdout(), vec!["aaa"]);
    }

    #[tokio::test]
    async fn cancelled_batch_dispatches_nothing() {
        let rt = FakeRuntime::new()
            .with_container("aaa", "one")
            .with_container("bbb", "two")
            .with_states("bbb", vec![exited(1)]);
        let (out, captured) = Output::capture();
        let cancel = CancellationToken::new();
        cancel.cancel();

        let err = rm(&rt, &named(&["one", "two"]), WorkerPool::new(2), &cancel, &out)
            .await
            .unwrap_err();

        assert!(matches!(err, Error::Batch { failed: 2, total: 2 }));
        assert!(rt.removed().is_empty());
        assert_eq!(captured.stderr().len(), 2);
    }
}

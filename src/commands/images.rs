// ABOUTME: Image commands over the runtime facade: images, history, pull, tag, rmi.
// ABOUTME: rmi removes through the worker pool and reports like rm.

use crate::error::{Error, Result};
use crate::output::Output;
use crate::pool::{WorkItem, WorkerPool};
use crate::runtime::{ContainerImage, ImageError, PullOptions, Runtime};
use chrono::{DateTime, Utc};

const CREATED_BY_WIDTH: usize = 45;

/// Human-readable size with decimal units, as engines print them.
pub fn format_size(bytes: u64) -> String {
    const UNITS: [&str; 5] = ["B", "kB", "MB", "GB", "TB"];
    let mut value = bytes as f64;
    let mut unit = 0;
    while value >= 1000.0 && unit < UNITS.len() - 1 {
        value /= 1000.0;
        unit += 1;
    }
    if unit == 0 {
        format!("{bytes}B")
    } else {
        let digits = format!("{value:.3}");
        let digits = digits.trim_end_matches('0').trim_end_matches('.');
        format!("{digits}{}", UNITS[unit])
    }
}

fn format_created(created: &DateTime<Utc>) -> String {
    created.format("%Y-%m-%d %H:%M:%S").to_string()
}

fn truncate(text: &str, width: usize) -> String {
    if text.chars().count() <= width {
        return text.to_string();
    }
    let mut cut: String = text.chars().take(width.saturating_sub(3)).collect();
    cut.push_str("...");
    cut
}

/// List images, one row each.
pub async fn images(runtime: &dyn Runtime, out: &Output) -> Result<()> {
    let images = runtime.list_images().await?;
    out.line(&format!(
        "{:<12}  {:<40}  {:>10}  {}",
        "IMAGE ID", "REPOSITORY:TAG", "SIZE", "CREATED"
    ));
    for image in &images {
        out.line(&format!(
            "{:<12}  {:<40}  {:>10}  {}",
            image.id.short(),
            image.display_name(),
            format_size(image.size),
            format_created(&image.created)
        ));
    }
    Ok(())
}

/// Print the layer history of one image.
pub async fn history(runtime: &dyn Runtime, name: &str, out: &Output) -> Result<()> {
    let image = runtime.get_image(name).await?;
    let layers = runtime.image_history(&image).await?;

    out.line(&format!(
        "{:<12}  {:<19}  {:<45}  {:>10}  {}",
        "ID", "CREATED", "CREATED BY", "SIZE", "COMMENT"
    ));
    for layer in &layers {
        let id = match layer.id.as_str() {
            "" | "<missing>" => "<missing>".to_string(),
            id => id.strip_prefix("sha256:").unwrap_or(id).chars().take(12).collect(),
        };
        out.line(&format!(
            "{:<12}  {:<19}  {:<45}  {:>10}  {}",
            id,
            format_created(&layer.created),
            truncate(&layer.created_by, CREATED_BY_WIDTH),
            format_size(u64::try_from(layer.size).unwrap_or(0)),
            layer.comment
        ));
    }
    Ok(())
}

/// Pull an image and print its id.
pub async fn pull(
    runtime: &dyn Runtime,
    reference: &str,
    opts: &PullOptions,
    out: &Output,
) -> Result<()> {
    let image = runtime.pull_image(reference, opts).await?;
    out.line(image.id.as_str());
    Ok(())
}

/// Give one image every name in `targets`.
pub async fn tag(runtime: &dyn Runtime, name: &str, targets: &[String]) -> Result<()> {
    if targets.is_empty() {
        return Err(Error::InvalidArgument(
            "tag requires an image and at least one target name".to_string(),
        ));
    }
    let image = runtime.get_image(name).await?;
    for target in targets {
        runtime.tag_image(&image, target).await?;
        tracing::debug!(image = %image.id, %target, "tagged");
    }
    Ok(())
}

/// Remove images through the pool, reporting each in the order given.
pub async fn rmi(
    runtime: &dyn Runtime,
    names: &[String],
    force: bool,
    pool: WorkerPool,
    out: &Output,
) -> Result<()> {
    if names.is_empty() {
        return Err(Error::InvalidArgument(
            "specify one or more images to remove".to_string(),
        ));
    }

    let mut order: Vec<std::result::Result<String, ImageError>> = Vec::new();
    let mut items = Vec::new();
    for name in names {
        match runtime.get_image(name).await {
            Ok(image) => {
                if !items.iter().any(|item: &WorkItem<ContainerImage>| item.id == *name) {
                    items.push(WorkItem::new(name.clone(), image));
                    order.push(Ok(name.clone()));
                }
            }
            Err(e) => order.push(Err(e)),
        }
    }

    let mut report = pool
        .execute(items, |image: ContainerImage| async move {
            runtime.remove_image(&image, force).await
        })
        .await;

    let total = order.len();
    let mut failed = 0;
    for entry in order {
        let outcome = match entry {
            Ok(name) => match report.take(&name) {
                Some(outcome) => outcome,
                None => continue,
            },
            Err(e) => Err(e),
        };
        match outcome {
            Ok(removed) => out.line(&removed),
            Err(e) => {
                failed += 1;
                out.diagnostic(&e.to_string());
            }
        }
    }

    if failed > 0 {
        return Err(Error::Batch { failed, total });
    }
    Ok(())
}

use anyhow::{Context, Result, bail};
use clap::Args;
use std::path::{Path, PathBuf};

use crate::cli::output::Output;
use crate::config::overrides::{EncryptionOverrides, ExecutionOverrides, OutputOverrides};
use crate::config::{AppConfig, ConfigOverrides};
use crate::crypto::{AeadEncryptor, KeyMaterial};
use crate::discovery::FileDiscovery;
use crate::parallel::{
    BatchProgress, BatchSummary, CancellationToken, ExecutionStrategy, ExecutorError,
    ResourceMode, TaskExecutor, available_cores, determine_worker_count,
};
use crate::pipeline::EncryptionPipeline;

#[derive(Args, Debug)]
pub struct EncryptArgs {
    /// Files or directories to encrypt (comma-separated or repeated)
    #[arg(short = 'i', long = "input", value_name = "PATH", value_delimiter = ',', required = true)]
    pub inputs: Vec<PathBuf>,

    /// Output root; the input tree is mirrored below it (default: next to each file)
    #[arg(short, long, value_name = "DIR")]
    pub output: Option<PathBuf>,

    /// Key file: 64 hex characters or 32 raw bytes
    #[arg(short, long, value_name = "FILE")]
    pub key_file: Option<PathBuf>,

    /// Resource utilization mode
    #[arg(short, long, value_enum, conflicts_with = "threads")]
    pub mode: Option<ResourceMode>,

    /// Explicit worker count (clamped to 1..=cores-1)
    #[arg(short, long, allow_negative_numbers = true)]
    pub threads: Option<i64>,

    /// Disable the progress bar
    #[arg(long)]
    pub no_progress: bool,
}

impl EncryptArgs {
    fn overrides(&self) -> ConfigOverrides {
        ConfigOverrides {
            encryption: EncryptionOverrides {
                key_file: self.key_file.clone(),
            },
            execution: ExecutionOverrides {
                mode: self.mode,
                threads: self.threads,
            },
            output: OutputOverrides {
                directory: self.output.clone(),
                progress: self.no_progress.then_some(false),
            },
        }
    }
}

pub async fn execute(args: EncryptArgs, custom_config: Option<&Path>, output: &Output) -> Result<()> {
    let config = AppConfig::load(custom_config, Some(&args.overrides()))?;

    let inputs = args
        .inputs
        .iter()
        .map(|path| {
            std::path::absolute(path).with_context(|| format!("Invalid input path: {}", path.display()))
        })
        .collect::<Result<Vec<_>>>()?;

    let output_root = match &config.output.directory {
        Some(dir) => {
            let dir = std::path::absolute(dir)
                .with_context(|| format!("Invalid output directory: {}", dir.display()))?;
            std::fs::create_dir_all(&dir)
                .with_context(|| format!("Failed to create output directory: {}", dir.display()))?;
            Some(dir)
        }
        None => None,
    };

    let key_path = config
        .encryption
        .key_file
        .as_deref()
        .context("No key file configured: pass --key-file or set encryption.key_file")?;
    let key = KeyMaterial::from_file(key_path)?;
    let encryptor = AeadEncryptor::new(&key).with_frame_size(config.encryption.frame_size)?;
    drop(key);

    let items = FileDiscovery::new(&config.discovery).discover(&inputs, output_root.as_deref());
    if items.is_empty() {
        output.warning("No files to encrypt");
        return Ok(());
    }

    // An explicit --mode beats a thread count coming from config or env
    let threads = if args.mode.is_some() {
        None
    } else {
        config.execution.threads
    };
    let workers = determine_worker_count(config.execution.mode, threads, available_cores());
    let strategy = ExecutionStrategy::from_worker_count(workers.min(items.len()));

    output.info(&format!(
        "Encrypting {} files with {} worker(s)",
        items.len(),
        strategy.workers()
    ));
    output.verbose(&format!("Mode: {}, key file: {}", config.execution.mode, key_path.display()));

    let progress = (config.output.progress && !output.is_quiet())
        .then(|| BatchProgress::new(items.len(), strategy.workers()));

    let token = CancellationToken::new();
    let mut executor =
        TaskExecutor::new(EncryptionPipeline::new(encryptor)).with_cancellation(token.clone());
    if let Some(progress) = &progress {
        executor = executor.with_progress(progress.reporter());
    }

    let interrupt_watch = {
        let token = token.clone();
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                tracing::warn!("Interrupt received, waiting for in-flight files to finish");
                token.cancel();
            }
        })
    };
    let joined = tokio::task::spawn_blocking(move || strategy.run(&executor, &items)).await;
    interrupt_watch.abort();
    let result = joined.context("Encryption task failed")?;

    match result {
        Ok(summary) => {
            if let Some(progress) = &progress {
                progress.finish(&summary);
            }
            report(output, &summary);
            if summary.has_failures() {
                bail!("{} of {} files failed", summary.failed, summary.total);
            }
            Ok(())
        }
        Err(ExecutorError::Interrupted { summary }) => {
            if let Some(progress) = &progress {
                progress.abandon();
            }
            report(output, &summary);
            bail!(
                "Interrupted after {} of {} files",
                summary.attempted(),
                summary.total
            )
        }
        Err(e) => Err(e.into()),
    }
}

fn report(output: &Output, summary: &BatchSummary) {
    output.summary(summary);
    if summary.has_failures() {
        output.error(&format!(
            "{} file(s) failed; see the log above for details",
            summary.failed
        ));
    } else if summary.attempted() == summary.total {
        output.success("All files encrypted");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;

    #[derive(Parser)]
    struct Harness {
        #[command(flatten)]
        args: EncryptArgs,
    }

    #[test]
    fn test_comma_separated_inputs() {
        let harness = Harness::parse_from(["test", "-i", "a.txt,b/c.txt", "-i", "d"]);
        assert_eq!(
            harness.args.inputs,
            vec![PathBuf::from("a.txt"), PathBuf::from("b/c.txt"), PathBuf::from("d")]
        );
    }

    #[test]
    fn test_mode_and_threads_conflict() {
        let result = Harness::try_parse_from(["test", "-i", "a", "--mode", "full", "--threads", "2"]);
        assert!(result.is_err());
    }

    #[test]
    fn test_overrides_only_include_given_flags() {
        let harness = Harness::parse_from(["test", "-i", "a", "--no-progress", "-t", "-1"]);
        let value = harness.args.overrides().to_value();

        assert_eq!(value["output"]["progress"], serde_json::json!(false));
        assert_eq!(value["execution"]["threads"], serde_json::json!(-1));
        assert!(value.get("encryption").is_none());
    }
}

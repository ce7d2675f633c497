//! `bpm` command-line tool
//!
//! Runs one pipeline phase per invocation against an asset-store directory
//! and writes the phase report as JSON. Exit status is 0 when every entry
//! succeeded, 1 when any entry failed and 2 when the run was aborted
//! (unusable plan, cache, configuration or store, or an unwritable cache).

mod cli;
mod telemetry;

use anyhow::{bail, Context, Result};
use bpm_host::{HostAdapter, InMemoryHost};
use bpm_pipeline::{
    diff, write_cache, Applier, CacheDocument, Extractor, MigrationConfig, MigrationEngine, Phase, Report, Verifier,
};
use bpm_plan::{MigrationPlan, PlanError};
use clap::Parser;
use cli::{Cli, Command};
use std::fs;
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::sync::Arc;
use tracing::{error, info};

const EXIT_ABORTED: u8 = 2;

#[tokio::main(flavor = "current_thread")]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    let config = match load_config(&cli) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("bpm: {e:#}");
            return ExitCode::from(EXIT_ABORTED);
        }
    };
    telemetry::init(&config.log);

    let session = Session {
        config,
        report: cli.report,
    };
    match session.run(cli.command).await {
        Ok(code) => code,
        Err(e) => {
            error!(error = %format!("{e:#}"), "bpm failed");
            ExitCode::from(EXIT_ABORTED)
        }
    }
}

fn load_config(cli: &Cli) -> Result<MigrationConfig> {
    let mut config = MigrationConfig::load_or_default(cli.config.as_deref())?;
    if let Some(store) = &cli.store {
        config = config.with_store(store.clone());
    }
    if let Some(format) = cli.log_format {
        config = config.with_log_format(format.into());
    }
    Ok(config)
}

struct Session {
    config: MigrationConfig,
    report: Option<PathBuf>,
}

impl Session {
    async fn run(&self, command: Command) -> Result<ExitCode> {
        match command {
            Command::Extract { plan, cache } => self.extract(&plan, &cache).await,
            Command::Migrate { plan } => self.migrate(&plan).await,
            Command::Apply { plan, cache } => self.apply(&plan, &cache).await,
            Command::Verify { plan } => self.verify(&plan).await,
            Command::Diff { left, right } => diff_caches(&left, &right),
        }
    }

    async fn extract(&self, plan: &Path, cache_path: &Path) -> Result<ExitCode> {
        let (plan, host) = match self.prepare(plan) {
            Ok(prepared) => prepared,
            Err(e) => return self.abort(Phase::Extract, &e),
        };
        let (cache, mut report) = Extractor::new(host)
            .with_config(self.config.extract.clone())
            .run(&plan)
            .await;
        match write_cache(&cache, cache_path) {
            Ok(digest) => report.cache_sha256 = Some(digest),
            Err(e) => report.abort(format!("writing cache {}: {e}", cache_path.display())),
        }
        self.finish(&report)
    }

    async fn migrate(&self, plan: &Path) -> Result<ExitCode> {
        let (plan, host) = match self.prepare(plan) {
            Ok(prepared) => prepared,
            Err(e) => return self.abort(Phase::Migrate, &e),
        };
        let report = MigrationEngine::new(host, plan)
            .with_config(self.config.engine.clone())
            .run()
            .await;
        self.finish(&report)
    }

    async fn apply(&self, plan: &Path, cache_path: &Path) -> Result<ExitCode> {
        let prepared = self.prepare(plan).and_then(|(plan, host)| {
            let (cache, digest) = CacheDocument::read_with_digest(cache_path)
                .with_context(|| format!("reading cache {}", cache_path.display()))?;
            Ok((plan, host, cache, digest))
        });
        let (plan, host, cache, digest) = match prepared {
            Ok(prepared) => prepared,
            Err(e) => return self.abort(Phase::Apply, &e),
        };
        info!(cache = %cache_path.display(), records = cache.len(), sha256 = %digest, "cache loaded");
        let report = Applier::new(host, plan, cache)
            .with_cache_sha256(digest)
            .run()
            .await;
        self.finish(&report)
    }

    async fn verify(&self, plan: &Path) -> Result<ExitCode> {
        let (plan, host) = match self.prepare(plan) {
            Ok(prepared) => prepared,
            Err(e) => return self.abort(Phase::Verify, &e),
        };
        let report = Verifier::new(host).run(&plan).await;
        self.finish(&report)
    }

    fn prepare(&self, plan: &Path) -> Result<(Arc<MigrationPlan>, Arc<dyn HostAdapter>)> {
        let plan = MigrationPlan::load(plan).with_context(|| format!("loading plan {}", plan.display()))?;
        info!(entries = plan.len(), "plan loaded");
        Ok((Arc::new(plan), self.host()?))
    }

    fn host(&self) -> Result<Arc<dyn HostAdapter>> {
        let Some(store) = &self.config.store else {
            bail!("no asset store configured; pass --store or set `store` in the config file");
        };
        let host = InMemoryHost::open(store).with_context(|| format!("opening asset store {}", store.display()))?;
        Ok(Arc::new(host))
    }

    fn report_path(&self, phase: Phase) -> PathBuf {
        self.report.clone().unwrap_or_else(|| self.config.report_path(phase))
    }

    /// Record a run that could not start
    fn abort(&self, phase: Phase, e: &anyhow::Error) -> Result<ExitCode> {
        let reason = match e.downcast_ref::<PlanError>() {
            Some(plan) => format!("{}: {e:#}", plan.code()),
            None => format!("{e:#}"),
        };
        self.finish(&Report::aborted(phase, reason))
    }

    fn finish(&self, report: &Report) -> Result<ExitCode> {
        let path = self.report_path(report.phase);
        if let Some(dir) = path.parent().filter(|d| !d.as_os_str().is_empty()) {
            fs::create_dir_all(dir).with_context(|| format!("creating {}", dir.display()))?;
        }
        report
            .write(&path)
            .with_context(|| format!("writing report {}", path.display()))?;
        info!(report = %path.display(), "report written");

        println!("{report}");
        for issue in &report.failed {
            println!("  failed: {issue}");
        }
        for asset in &report.manual_review {
            println!("  needs review: {asset}");
        }

        let code = if report.aborted.is_some() {
            EXIT_ABORTED
        } else {
            u8::try_from(report.exit_code()).unwrap_or(1)
        };
        Ok(ExitCode::from(code))
    }
}

fn diff_caches(left: &Path, right: &Path) -> Result<ExitCode> {
    let a = CacheDocument::read(left).with_context(|| format!("reading cache {}", left.display()))?;
    let b = CacheDocument::read(right).with_context(|| format!("reading cache {}", right.display()))?;
    let differences = diff(&a, &b);
    if differences.is_empty() {
        println!("caches match ({} records)", a.len());
        return Ok(ExitCode::SUCCESS);
    }
    for difference in &differences {
        println!("{difference}");
    }
    info!(count = differences.len(), "caches differ");
    Ok(ExitCode::from(1))
}

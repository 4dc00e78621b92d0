use crate::{
    models::rename_rule::RenameRule,
    services::{
        renamer::{CopyErrorPolicy, RenamePlan},
        s3_store::S3Settings,
    },
};
use anyhow::{Context, Result, bail};
use clap::{Parser, ValueEnum};
use std::{env, str::FromStr};

const ENV_PREFIX: &str = "CUR_COPY_";
const DEFAULT_MAX_ATTEMPTS: u32 = 3;

/// Centralized run configuration.
/// Combines environment variables and CLI arguments.
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub source_bucket: String,
    pub destination_bucket: String,
    pub base_prefix: String,
    pub old_identifier: String,
    pub new_identifier: String,
    pub search_prefix: String,
    pub page_size: Option<i32>,
    pub max_attempts: u32,
    pub region: Option<String>,
    pub endpoint_url: Option<String>,
    pub on_copy_error: CopyErrorPolicy,
    pub skip_unchanged: bool,
    pub dry_run: bool,
}

/// Command-line + environment configuration.
#[derive(Parser, Debug, Default)]
#[command(
    author,
    version,
    about = "Copy objects between buckets, renaming an identifier embedded in their keys"
)]
pub struct Args {
    /// Bucket holding the existing objects (overrides CUR_COPY_SOURCE_BUCKET)
    #[arg(long)]
    pub source_bucket: Option<String>,

    /// Bucket receiving the renamed copies (overrides CUR_COPY_DESTINATION_BUCKET)
    #[arg(long)]
    pub destination_bucket: Option<String>,

    /// Prefix in front of the identifier, e.g. `123456789012/cur/` (overrides CUR_COPY_BASE_PREFIX)
    #[arg(long)]
    pub base_prefix: Option<String>,

    /// Identifier to replace in every key (overrides CUR_COPY_OLD_IDENTIFIER)
    #[arg(long)]
    pub old_identifier: Option<String>,

    /// Replacement identifier (overrides CUR_COPY_NEW_IDENTIFIER)
    #[arg(long)]
    pub new_identifier: Option<String>,

    /// List under this prefix instead of `{base_prefix}{old_identifier}/` (overrides CUR_COPY_SEARCH_PREFIX)
    #[arg(long)]
    pub search_prefix: Option<String>,

    /// Maximum keys per listing page (overrides CUR_COPY_PAGE_SIZE)
    #[arg(long)]
    pub page_size: Option<i32>,

    /// Total attempts per request, including retries (overrides CUR_COPY_MAX_ATTEMPTS)
    #[arg(long)]
    pub max_attempts: Option<u32>,

    /// AWS region; defaults to the provider chain, then us-east-1
    #[arg(long)]
    pub region: Option<String>,

    /// Custom S3-compatible endpoint (overrides CUR_COPY_ENDPOINT_URL)
    #[arg(long)]
    pub endpoint_url: Option<String>,

    /// Behaviour when a single copy fails (overrides CUR_COPY_ON_COPY_ERROR)
    #[arg(long, value_enum)]
    pub on_copy_error: Option<CopyErrorPolicy>,

    /// Skip objects whose key does not contain the old identifier
    #[arg(long)]
    pub skip_unchanged: bool,

    /// Print the planned copies without issuing them
    #[arg(long)]
    pub dry_run: bool,
}

/// Environment lookup, split out so tests can supply their own variables.
pub trait EnvSource {
    fn var(&self, name: &str) -> Result<Option<String>>;
}

struct ProcessEnv;

impl EnvSource for ProcessEnv {
    fn var(&self, name: &str) -> Result<Option<String>> {
        match env::var(name) {
            Ok(value) => Ok(Some(value)),
            Err(env::VarError::NotPresent) => Ok(None),
            Err(err) => Err(err).with_context(|| format!("reading {}", name)),
        }
    }
}

fn env_string(env: &impl EnvSource, suffix: &str) -> Result<Option<String>> {
    env.var(&format!("{}{}", ENV_PREFIX, suffix))
}

fn env_parsed<T>(env: &impl EnvSource, suffix: &str) -> Result<Option<T>>
where
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    let name = format!("{}{}", ENV_PREFIX, suffix);
    env.var(&name)?
        .map(|value| {
            value
                .parse::<T>()
                .with_context(|| format!("parsing {} value `{}`", name, value))
        })
        .transpose()
}

fn required(value: Option<String>, flag: &str, suffix: &str) -> Result<String> {
    match value {
        Some(value) => Ok(value),
        None => bail!("missing --{} (or {}{})", flag, ENV_PREFIX, suffix),
    }
}

impl AppConfig {
    /// Parse CLI args + process environment into AppConfig.
    pub fn from_env_and_args() -> Result<Self> {
        Self::resolve(Args::parse(), &ProcessEnv)
    }

    /// Merge parsed args with environment fallbacks. Flags win over env.
    pub fn resolve(args: Args, env: &impl EnvSource) -> Result<Self> {
        // --- Environment fallback ---
        let env_on_copy_error = match env_string(env, "ON_COPY_ERROR")? {
            Some(value) => Some(
                <CopyErrorPolicy as ValueEnum>::from_str(&value, true)
                    .map_err(anyhow::Error::msg)
                    .with_context(|| {
                        format!("parsing {}ON_COPY_ERROR value `{}`", ENV_PREFIX, value)
                    })?,
            ),
            None => None,
        };

        // --- Merge ---
        let source_bucket = required(
            args.source_bucket
                .or(env_string(env, "SOURCE_BUCKET")?),
            "source-bucket",
            "SOURCE_BUCKET",
        )?;
        let destination_bucket = required(
            args.destination_bucket
                .or(env_string(env, "DESTINATION_BUCKET")?),
            "destination-bucket",
            "DESTINATION_BUCKET",
        )?;
        let old_identifier = required(
            args.old_identifier
                .or(env_string(env, "OLD_IDENTIFIER")?),
            "old-identifier",
            "OLD_IDENTIFIER",
        )?;
        let new_identifier = required(
            args.new_identifier
                .or(env_string(env, "NEW_IDENTIFIER")?),
            "new-identifier",
            "NEW_IDENTIFIER",
        )?;
        let base_prefix = args
            .base_prefix
            .or(env_string(env, "BASE_PREFIX")?)
            .unwrap_or_default();

        if source_bucket.is_empty() {
            bail!("source bucket must not be empty");
        }
        if destination_bucket.is_empty() {
            bail!("destination bucket must not be empty");
        }
        if old_identifier.is_empty() {
            bail!("old identifier must not be empty");
        }

        let search_prefix = match args.search_prefix.or(env_string(env, "SEARCH_PREFIX")?) {
            Some(prefix) => prefix,
            None => RenameRule::new(old_identifier.as_str(), new_identifier.as_str())
                .search_prefix(&base_prefix),
        };

        let page_size = args.page_size.or(env_parsed(env, "PAGE_SIZE")?);
        if let Some(size) = page_size {
            if !(1..=1000).contains(&size) {
                bail!("page size must be between 1 and 1000, got {}", size);
            }
        }

        let max_attempts = args
            .max_attempts
            .or(env_parsed(env, "MAX_ATTEMPTS")?)
            .unwrap_or(DEFAULT_MAX_ATTEMPTS);
        if max_attempts == 0 {
            bail!("max attempts must be at least 1");
        }

        Ok(Self {
            source_bucket,
            destination_bucket,
            base_prefix,
            old_identifier,
            new_identifier,
            search_prefix,
            page_size,
            max_attempts,
            region: args.region,
            endpoint_url: args.endpoint_url.or(env_string(env, "ENDPOINT_URL")?),
            on_copy_error: args.on_copy_error.or(env_on_copy_error).unwrap_or_default(),
            skip_unchanged: args.skip_unchanged,
            dry_run: args.dry_run,
        })
    }

    pub fn rename_plan(&self) -> RenamePlan {
        RenamePlan {
            source_bucket: self.source_bucket.clone(),
            destination_bucket: self.destination_bucket.clone(),
            search_prefix: self.search_prefix.clone(),
            rule: RenameRule::new(self.old_identifier.as_str(), self.new_identifier.as_str()),
            page_size: self.page_size,
            on_copy_error: self.on_copy_error,
            skip_unchanged: self.skip_unchanged,
            dry_run: self.dry_run,
        }
    }

    pub fn s3_settings(&self) -> S3Settings {
        S3Settings {
            region: self.region.clone(),
            endpoint_url: self.endpoint_url.clone(),
            max_attempts: self.max_attempts,
        }
    }
}

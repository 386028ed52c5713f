use std::{io::Read, path::PathBuf};

use anyhow::{Context, Result, bail};
use clap::Parser;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use hierarchical_jwt::config::KeySource;
use hierarchical_jwt::{Config, ValidatingHierarchicalClaimsExtractor, build_security_config};

/// Extract and print the merged claims of a (possibly nested) JWT.
///
/// Runs the same pipeline as the auth middleware:
/// - decodes every layer of the `jwt` claim chain
/// - verifies each layer when keys are given (`--jwks` / `--secret`)
/// - merges claims by namespace precedence
/// - enforces `--require` and, with keys, at least one verified layer
///
/// Prints the resulting claim set as JSON on stdout; failures go to stderr
/// with a non-zero exit code.
#[derive(Parser, Debug)]
#[command(name = "claims-inspect", version, about)]
struct Args {
    /// Token to inspect. Read from stdin when omitted.
    #[arg(long)]
    token: Option<String>,

    /// Namespace prefix, highest precedence first. Repeatable.
    #[arg(long = "namespace", value_name = "PREFIX")]
    namespaces: Vec<String>,

    /// Claim that must be present after merging. Repeatable.
    #[arg(long = "require", value_name = "NAME")]
    required: Vec<String>,

    /// JWKS file used to verify each layer
    #[arg(long, value_name = "FILE", conflicts_with = "secret")]
    jwks: Option<PathBuf>,

    /// Shared HMAC secret used to verify each layer
    #[arg(long)]
    secret: Option<String>,

    /// Expected `iss` (only checked when verifying)
    #[arg(long)]
    issuer: Option<String>,

    /// Expected `aud` (only checked when verifying)
    #[arg(long)]
    audience: Option<String>,

    /// Maximum number of nested token layers
    #[arg(long)]
    max_depth: Option<usize>,

    /// Start from the JWT_* environment (and .env) before applying flags
    #[arg(long, default_value_t = false)]
    env: bool,

    /// Single-line JSON output
    #[arg(long, default_value_t = false)]
    compact: bool,
}

fn init_tracing() {
    // RUST_LOG=hierarchical_jwt=debug shows one line per token layer.
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn"));

    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();
}

fn build_config(args: &Args) -> Result<Config> {
    let mut config = if args.env {
        Config::from_env().context("invalid JWT_* environment")?
    } else {
        Config::default()
    };

    if !args.namespaces.is_empty() {
        config.namespaces = args.namespaces.clone();
    }
    if !args.required.is_empty() {
        config.required_claims = args.required.clone();
    }
    if let Some(path) = &args.jwks {
        config.key_source = Some(KeySource::JwksFile(path.display().to_string()));
    }
    if let Some(secret) = &args.secret {
        config.key_source = Some(KeySource::HmacSecret(secret.clone()));
    }
    if args.issuer.is_some() {
        config.issuer = args.issuer.clone();
    }
    if args.audience.is_some() {
        config.audience = args.audience.clone();
    }
    if let Some(max) = args.max_depth {
        if max == 0 {
            bail!("--max-depth must be at least 1");
        }
        config.max_chain_depth = max;
    }
    Ok(config)
}

fn read_token(args: &Args) -> Result<String> {
    let token = match &args.token {
        Some(token) => token.clone(),
        None => {
            let mut buf = String::new();
            std::io::stdin()
                .read_to_string(&mut buf)
                .context("failed to read token from stdin")?;
            buf
        }
    };
    let token = token.trim().to_string();
    if token.is_empty() {
        bail!("no token given");
    }
    Ok(token)
}

fn main() -> Result<()> {
    init_tracing();
    let args = Args::parse();

    let config = build_config(&args)?;
    let security = build_security_config(&config).context("invalid verifier configuration")?;
    let extractor = ValidatingHierarchicalClaimsExtractor::new(security);

    let token = read_token(&args)?;
    let claims = extractor
        .extract_claims(&token)
        .context("claims extraction failed")?;

    let out = if args.compact {
        serde_json::to_string(&claims)?
    } else {
        serde_json::to_string_pretty(&claims)?
    };
    println!("{}", out);

    if !extractor.has_verifier() {
        eprintln!("note: no keys given, signatures were not checked");
    }
    Ok(())
}

#![deny(warnings)]

use anyhow::Context;
use clap::Parser;
use polyglot_core::config::{
    resolve_number_with_default, resolve_shared_keys, resolve_string_with_default, AppConfig,
    Env, LanguageDefaults, PoolSize, SharedKeyArgs, StdEnv, TrialPolicy, DEFAULT_ADMIN_USERNAME,
    DEFAULT_ADMIN_USER_ID, DEFAULT_POOL_SIZE, DEFAULT_TRIAL_DAYS, ENV_ADMIN_USER, ENV_POOL_SIZE,
    ENV_TRIAL_DAYS,
};
use polyglot_core::credentials::{InMemoryKeyStore, PolicyResolver};
use polyglot_core::fanout::{Coordinator, ResultMatrix, Toggles, TranslationRequest};
use polyglot_core::translate::{FixedProvider, MyMemoryTranslator, Reply};
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

const DEFINITION_ENRICHMENT: &str = "PONS Definition";
const EXPLANATION_ENRICHMENT: &str = "Groq AI";
const OFFLINE_PROVIDERS: [&str; 4] = ["DeepL", "PONS", "Google", "Lingva"];

#[derive(Parser, Debug)]
#[command(name = "polyglot")]
#[command(about = "Translate a word or phrase with several providers at once")]
struct Args {
    /// Text to translate; several words are joined with spaces.
    #[arg(required = true)]
    text: Vec<String>,

    /// Source language name, e.g. `german`. Defaults to German.
    #[arg(long)]
    source: Option<String>,

    /// Target language name; repeat for several.
    #[arg(long = "target")]
    targets: Vec<String>,

    /// Provider to skip; repeat for several.
    #[arg(long = "disable")]
    disabled: Vec<String>,

    #[arg(long)]
    no_definition: bool,

    #[arg(long)]
    no_explanation: bool,

    /// Also query the MyMemory translation memory.
    #[arg(long)]
    with_mymemory: bool,

    /// Canned echo providers instead of network calls.
    #[arg(long)]
    offline: bool,

    /// Maximum number of provider calls in flight.
    #[arg(long)]
    concurrency: Option<usize>,

    #[arg(long)]
    json: bool,

    #[arg(long)]
    deepl_api_key: Option<String>,

    #[arg(long)]
    pons_api_secret: Option<String>,

    #[arg(long)]
    google_api_key: Option<String>,

    #[arg(long)]
    groq_api_key: Option<String>,

    #[arg(long, default_value = "info")]
    log_level: String,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();
    init_tracing(&args.log_level)?;

    let env = StdEnv;
    let cfg = build_config(&args, &env)?;

    tracing::info!(
        pool_size = cfg.pool_size.get(),
        trial_days = cfg.trial.trial_days,
        offline = args.offline,
        "config loaded"
    );

    let coordinator = build_coordinator(&args, &cfg);
    for name in &args.disabled {
        if !coordinator
            .provider_names()
            .into_iter()
            .any(|known| known == name.as_str())
        {
            tracing::warn!(provider = %name, "unknown provider in --disable");
        }
    }

    let matrix = coordinator
        .run(build_request(&args))
        .await
        .context("translation request rejected")?;

    if args.json {
        println!("{}", serde_json::to_string_pretty(&matrix)?);
    } else {
        print!("{}", render(&matrix));
    }
    Ok(())
}

fn init_tracing(level: &str) -> anyhow::Result<()> {
    let filter = EnvFilter::builder()
        .with_default_directive(
            level
                .parse()
                .with_context(|| format!("invalid --log-level: {level}"))?,
        )
        .from_env_lossy();

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
    Ok(())
}

fn build_config(args: &Args, env: &impl Env) -> anyhow::Result<AppConfig> {
    let shared_keys = resolve_shared_keys(
        SharedKeyArgs {
            deepl: args.deepl_api_key.clone(),
            pons: args.pons_api_secret.clone(),
            google: args.google_api_key.clone(),
            groq: args.groq_api_key.clone(),
        },
        env,
    )?;

    let trial_days = resolve_number_with_default(None, ENV_TRIAL_DAYS, env, DEFAULT_TRIAL_DAYS)?;
    let admin = resolve_string_with_default(None, ENV_ADMIN_USER, env, DEFAULT_ADMIN_USERNAME);
    let trial = TrialPolicy::new(trial_days, DEFAULT_ADMIN_USER_ID, admin)?;

    let width =
        resolve_number_with_default(args.concurrency, ENV_POOL_SIZE, env, DEFAULT_POOL_SIZE)?;
    let pool_size = PoolSize::new(width)?;

    Ok(AppConfig {
        languages: LanguageDefaults::default(),
        shared_keys,
        trial,
        pool_size,
    })
}

/// The command line has no accounts, so every request is anonymous and
/// runs on the shared keys.
fn build_coordinator(args: &Args, cfg: &AppConfig) -> Coordinator {
    let resolver = Arc::new(PolicyResolver::new(
        InMemoryKeyStore::default(),
        cfg.shared_keys.clone(),
        cfg.trial.clone(),
    ));

    if args.offline {
        return OFFLINE_PROVIDERS.into_iter().fold(
            Coordinator::new(resolver, cfg.languages.clone(), cfg.pool_size),
            |c, name| c.with_provider(FixedProvider::new(name, Reply::Echo)),
        );
    }

    let coordinator = Coordinator::standard(resolver, cfg);
    if args.with_mymemory {
        coordinator.with_provider(MyMemoryTranslator::new())
    } else {
        coordinator
    }
}

fn build_request(args: &Args) -> TranslationRequest {
    let mut request = TranslationRequest::new(args.text.join(" "));
    if let Some(source) = &args.source {
        request = request.from_language(source.as_str());
    }
    if !args.targets.is_empty() {
        request = request.to_languages(args.targets.iter().map(String::as_str));
    }
    if !args.disabled.is_empty() {
        let toggles = args
            .disabled
            .iter()
            .fold(Toggles::default(), |t, name| t.with(name, false));
        request = request.with_providers(toggles);
    }
    request.with_enrichments(
        Toggles::default()
            .with(DEFINITION_ENRICHMENT, !args.no_definition)
            .with(EXPLANATION_ENRICHMENT, !args.no_explanation),
    )
}

fn render(matrix: &ResultMatrix) -> String {
    let mut out = format!("{} ({})\n", matrix.source_text, matrix.source_language);
    let width = matrix
        .translations
        .values()
        .flat_map(|cells| cells.keys())
        .map(String::len)
        .max()
        .unwrap_or(0);

    for (language, cells) in &matrix.translations {
        out.push_str(&format!("\n{language}\n"));
        for (provider, outcome) in cells {
            out.push_str(&format!("  {provider:<width$}  {outcome}\n"));
        }
    }

    for (label, value) in [
        ("definition", &matrix.definition),
        ("explanation", &matrix.explanation),
    ] {
        if let Some(text) = value.as_deref().filter(|t| !t.is_empty()) {
            out.push_str(&format!("\n{label}: {text}\n"));
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use polyglot_core::config::{MapEnv, ENV_DEEPL_API_KEY};

    fn args(argv: &[&str]) -> Args {
        Args::try_parse_from(std::iter::once("polyglot").chain(argv.iter().copied()))
            .expect("valid arguments")
    }

    #[test]
    fn flags_override_environment() {
        let env = MapEnv::default()
            .with_var(ENV_DEEPL_API_KEY, "from-env")
            .with_var(ENV_POOL_SIZE, "3")
            .with_var(ENV_TRIAL_DAYS, "14");
        let cfg = build_config(&args(&["Haus", "--deepl-api-key", "from-flag"]), &env)
            .expect("valid config");
        assert_eq!(
            cfg.shared_keys.deepl.as_ref().map(|k| k.expose()),
            Some("from-flag")
        );
        assert_eq!(cfg.pool_size.get(), 3);
        assert_eq!(cfg.trial.trial_days, 14);

        let cfg = build_config(&args(&["Haus", "--concurrency", "5"]), &env).expect("valid config");
        assert_eq!(cfg.pool_size.get(), 5);
        assert_eq!(
            cfg.shared_keys.deepl.as_ref().map(|k| k.expose()),
            Some("from-env")
        );
    }

    #[test]
    fn log_level_defaults_to_info() {
        assert_eq!(args(&["Haus"]).log_level, "info");
    }

    #[test]
    fn zero_concurrency_is_rejected() {
        let env = MapEnv::default();
        assert!(build_config(&args(&["Haus", "--concurrency", "0"]), &env).is_err());
    }

    #[test]
    fn request_reflects_flags() {
        let request = build_request(&args(&[
            "guten", "Tag", "--source", "german", "--target", "english", "--target", "polish",
            "--disable", "PONS", "--no-explanation",
        ]));
        assert_eq!(request.text, "guten Tag");
        assert_eq!(request.source_language.as_deref(), Some("german"));
        assert_eq!(
            request.target_languages,
            Some(vec!["english".to_string(), "polish".to_string()])
        );
        let providers = request.enabled_providers.expect("toggles set");
        assert!(!providers.is_enabled("PONS"));
        assert!(providers.is_enabled("DeepL"));
        let enrichments = request.enabled_enrichments.expect("toggles set");
        assert!(enrichments.is_enabled(DEFINITION_ENRICHMENT));
        assert!(!enrichments.is_enabled(EXPLANATION_ENRICHMENT));
    }

    #[tokio::test]
    async fn offline_run_renders_every_provider() {
        let a = args(&["Haus", "--offline", "--target", "english"]);
        let cfg = build_config(&a, &MapEnv::default()).expect("valid config");
        let matrix = build_coordinator(&a, &cfg)
            .run(build_request(&a))
            .await
            .expect("valid request");

        let text = render(&matrix);
        assert!(text.starts_with("Haus (german)\n"));
        assert!(text.contains("  DeepL   Haus [de->en]\n"));
        assert!(text.contains("  Lingva  Haus [de->en]\n"));
        assert!(!text.contains("definition:"));
    }
}

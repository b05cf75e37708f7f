// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! `claudex-hook`: reads one hook event as JSON on stdin, dispatches it,
//! and writes the response JSON to stdout. Exits non-zero only when the
//! input itself can't be understood — every other failure is logged and
//! swallowed so a hook never blocks the agent it's protecting.

use std::io::Read;
use std::path::PathBuf;

use claudex_core::{Commander, Config, Policy};
use claudex_hooks::{dispatch, HookContext, HookEvent, NoopNotifier};
use tracing::error;
use tracing_subscriber::EnvFilter;

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let _ = tracing_subscriber::fmt().with_env_filter(filter).with_writer(std::io::stderr).try_init();
}

#[tokio::main]
async fn main() {
    init_tracing();

    let mut input = String::new();
    if let Err(e) = std::io::stdin().read_to_string(&mut input) {
        error!(error = %e, "claudex-hook: failed to read stdin");
        std::process::exit(2);
    }

    let event: HookEvent = match serde_json::from_str(&input) {
        Ok(event) => event,
        Err(e) => {
            error!(error = %e, "claudex-hook: malformed event");
            std::process::exit(2);
        }
    };

    let mut config = Config::load_default().unwrap_or_else(|e| {
        error!(error = %e, "claudex-hook: failed to load config, using defaults");
        Config::default()
    });
    config.apply_env_overrides();
    let pp = &config.features.process_protection;

    let commander = Commander::new(Policy::default());
    let notifier = NoopNotifier;
    let doc_update_args: Vec<String> = Vec::new();
    let prompt_template_path = doc_prompt_template_path();
    let session_context = doc_session_context(&event);
    let model = std::env::var("CLAUDEX_DOC_MODEL").unwrap_or_else(|_| "claude".to_owned());
    let doc_update_program = std::env::var("CLAUDEX_DOC_PROGRAM").unwrap_or_else(|_| "claude".to_owned());
    let doc_update_frequency: u32 = std::env::var("CLAUDEX_AUTODOC_FREQUENCY")
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(pp.autodoc_frequency);

    let ctx = HookContext {
        commander: &commander,
        notifier: &notifier,
        autodoc_session_progress: pp.autodoc_session_progress,
        autodoc_session_end: pp.autodoc_session_end,
        doc_update_frequency,
        doc_update_program: &doc_update_program,
        doc_update_args: &doc_update_args,
        prompt_template_path: &prompt_template_path,
        session_context: &session_context,
        model: &model,
    };

    let response = dispatch(event, &ctx).await;
    match serde_json::to_string(&response) {
        Ok(json) => println!("{json}"),
        Err(e) => {
            error!(error = %e, "claudex-hook: failed to serialize response");
            std::process::exit(2);
        }
    }
}

fn doc_prompt_template_path() -> PathBuf {
    std::env::var("CLAUDEX_DOC_PROMPT_TEMPLATE")
        .map(PathBuf::from)
        .unwrap_or_else(|_| PathBuf::from("doc-update-prompt.md"))
}

fn doc_session_context(event: &HookEvent) -> String {
    std::env::var("CLAUDEX_DOC_SESSION_CONTEXT").unwrap_or_else(|_| event.envelope().cwd.clone())
}

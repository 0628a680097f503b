use std::{
    io::{self, BufRead, Write},
    process::ExitCode,
};

use clap::Parser;
use tracing::{error, info};

use crate::{
    config::{Preset, SessionConfig},
    gemini::{Chat, GeminiClient, Result},
    repl::FixTypoRepl,
};

/// Interactive British English text correction backed by Gemini.
#[derive(Parser, Debug)]
#[clap(name = "fixtypo", version)]
pub struct FixTypo {
    #[clap(
        short = 'p',
        long = "preset",
        env = "FIXTYPO_PRESET",
        value_enum,
        default_value_t = Preset::ModernCasual
    )]
    preset: Preset,
    #[clap(short = 'm', long = "model", env = "FIXTYPO_MODEL")]
    model: Option<String>,
    #[clap(short = 't', long = "temperature", env = "FIXTYPO_TEMPERATURE")]
    temperature: Option<f32>,
    #[clap(long = "top-k", env = "FIXTYPO_TOP_K")]
    top_k: Option<u32>,
    #[clap(long = "top-p", env = "FIXTYPO_TOP_P")]
    top_p: Option<f32>,
    #[clap(long = "max-output-tokens", env = "FIXTYPO_MAX_OUTPUT_TOKENS")]
    max_output_tokens: Option<u32>,
    /// Default tracing filter when RUST_LOG is unset
    #[clap(long = "log-level", env = "FIXTYPO_LOG", default_value = "warn")]
    pub log_level: String,
}

impl FixTypo {
    pub fn new() -> Self {
        Self::parse()
    }
    pub fn session_config(&self) -> SessionConfig {
        let mut config = SessionConfig::from_preset(self.preset);
        if let Some(model) = &self.model {
            config.model = model.clone();
        }
        let generation = &mut config.generation;
        if let Some(temperature) = self.temperature {
            generation.temperature = temperature;
        }
        if let Some(top_k) = self.top_k {
            generation.top_k = top_k;
        }
        if let Some(top_p) = self.top_p {
            generation.top_p = top_p;
        }
        if let Some(max_output_tokens) = self.max_output_tokens {
            generation.max_output_tokens = max_output_tokens;
        }
        config
    }
    pub fn run(&self) -> ExitCode {
        let config = self.session_config();
        info!(model = %config.model, preset = ?self.preset, "starting session");
        let stdin = io::stdin();
        let stdout = io::stdout();
        start(
            GeminiClient::from_env(config),
            stdin.lock(),
            &mut stdout.lock(),
        )
    }
}

/// Runs the session on `client`, or reports why it could not be opened.
pub fn start<T: Chat, R: BufRead, W: Write>(client: Result<T>, input: R, out: &mut W) -> ExitCode {
    let chat = match client {
        Ok(chat) => chat,
        Err(e) => {
            error!(startup = e.kind.is_startup(), "could not open session");
            eprintln!("{}", e);
            return ExitCode::FAILURE;
        }
    };
    match FixTypoRepl::new(chat).run(input, out) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!("Error writing output: {}", e);
            ExitCode::FAILURE
        }
    }
}

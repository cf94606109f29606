//! Application wiring: builds the caption client, rule table and decoder
//! once at startup and serves the HTTP API.

use crate::advice::{AdviceSelector, RuleTable};
use crate::ai::{
    CaptionService, GeminiCaptionClient, HuggingFaceCaptionClient, MockCaptionClient,
    OpenAiCaptionClient,
};
use crate::image::ImageDecoder;
use crate::models::{CaptionProvider, Config};
use crate::server::{self, AppState};
use crate::{Error, Result};
use axum::Router;
use std::sync::Arc;
use tokio::net::TcpListener;
use tracing::info;

/// Coordinates captioning, advice selection and the HTTP server.
pub struct App {
    state: AppState,
    config: Config,
}

/// Injectable service bundle used to construct [`App`] in tests/harnesses.
pub struct AppServices {
    pub caption: Arc<dyn CaptionService>,
    pub advice: AdviceSelector,
    pub decoder: ImageDecoder,
}

impl App {
    /// Build an app from concrete service dependencies.
    pub fn with_services(services: AppServices, config: Config) -> Self {
        let state = AppState {
            caption: services.caption,
            advice: Arc::new(services.advice),
            decoder: Arc::new(services.decoder),
            expose_error_details: config.expose_error_details,
        };
        Self { state, config }
    }

    fn build_caption_service(config: &Config) -> Result<Arc<dyn CaptionService>> {
        let http_client = reqwest::Client::new();
        let model = config.caption_model.clone();

        let service: Arc<dyn CaptionService> = match config.caption_provider {
            CaptionProvider::HuggingFace => {
                info!("Caption provider: Hugging Face (model: {})", model);
                Arc::new(HuggingFaceCaptionClient::new_with_client(
                    config.huggingface_api_key.clone(),
                    model,
                    http_client,
                ))
            }
            CaptionProvider::OpenAi => {
                info!("Caption provider: OpenAI (model: {})", model);
                let api_key = config.openai_api_key.clone().ok_or_else(|| {
                    Error::Config("OPENAI_API_KEY is required for the openai provider".to_string())
                })?;
                Arc::new(OpenAiCaptionClient::new_with_client(
                    api_key,
                    model,
                    http_client,
                ))
            }
            CaptionProvider::Gemini => {
                info!("Caption provider: Gemini (model: {})", model);
                let api_key = config.gemini_api_key.clone().ok_or_else(|| {
                    Error::Config("GEMINI_API_KEY is required for the gemini provider".to_string())
                })?;
                Arc::new(GeminiCaptionClient::new_with_client(
                    api_key,
                    model,
                    http_client,
                ))
            }
            CaptionProvider::Mock => {
                info!("Caption provider: mock (captions are canned)");
                Arc::new(MockCaptionClient::new())
            }
        };
        Ok(service)
    }

    fn load_rules(config: &Config) -> Result<RuleTable> {
        let rules = match &config.advice_rules_path {
            Some(path) => {
                info!("Loading advice rules from {}", path.display());
                RuleTable::from_file(path)?
            }
            None => RuleTable::embedded()?,
        };
        info!(
            "Loaded {} occasion rules (fallback: {})",
            rules.occasions().count(),
            rules.default_occasion()
        );
        Ok(rules)
    }

    /// Construct an app from validated configuration.
    pub fn new(config: Config) -> Result<Self> {
        config.validate()?;

        info!("Loading caption model...");
        let caption = Self::build_caption_service(&config)?;
        let rules = Self::load_rules(&config)?;
        if config.advice_seed.is_some() {
            info!("Advice selection seeded for reproducible output");
        }
        let advice = AdviceSelector::with_seed(rules, config.advice_seed);
        let decoder = ImageDecoder::new(config.max_image_dimension);
        info!("Caption model ready");

        Ok(Self::with_services(
            AppServices {
                caption,
                advice,
                decoder,
            },
            config,
        ))
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn router(&self) -> Router {
        server::router(self.state.clone(), self.config.max_body_bytes)
    }

    /// Bind the configured address and serve until Ctrl-C.
    pub async fn serve(self) -> Result<()> {
        let listener = TcpListener::bind(self.config.bind_address()).await?;
        info!("Listening on http://{}", listener.local_addr()?);

        axum::serve(listener, self.router())
            .with_graceful_shutdown(shutdown_signal())
            .await?;

        info!("Server stopped");
        Ok(())
    }
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("Failed to listen for shutdown signal: {}", e);
        std::future::pending::<()>().await;
    }
    info!("Shutdown signal received");
}

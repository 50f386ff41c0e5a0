use super::{CacheGate, GenerationReport, LowYieldWarning, PipelineError, PipelineResult};
use crate::config::{PipelineConfig, TestgenConfig};
use crate::llm::{GenerationClient, OpenAiCompatClient, RetryPolicy, generate_with_retry};
use crate::store::{self, TestCaseStore};
use crate::test_gen::{
    GeneratedTestCase, GenerationOptions, PostProcessor, Prompt, PromptBuilder, ResponseParser, TestCase,
    Validator,
};
use crate::ticket::{self, TicketKey, TicketSource};
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

/// Runs ticket -> prompt -> provider -> parse -> validate -> post-process -> persist
#[derive(Clone)]
pub struct Orchestrator {
    tickets: Arc<dyn TicketSource>,
    client: Arc<dyn GenerationClient>,
    cache: CacheGate,
    prompts: PromptBuilder,
    parser: ResponseParser,
    validator: Validator,
    post_processor: PostProcessor,
    retry: RetryPolicy,
    config: PipelineConfig,
}

impl Orchestrator {
    pub fn new(
        tickets: Arc<dyn TicketSource>,
        client: Arc<dyn GenerationClient>,
        store: Arc<dyn TestCaseStore>,
    ) -> Self {
        let config = PipelineConfig::default();
        Self {
            tickets,
            client,
            cache: CacheGate::new(store),
            prompts: PromptBuilder::new(),
            parser: ResponseParser::new(),
            validator: Validator::new(config.max_title_len),
            post_processor: PostProcessor::from_config(&config),
            retry: RetryPolicy::default(),
            config,
        }
    }

    /// Wire up the configured ticket source, provider and store.
    /// Fails with `ConfigMissing` when credentials are absent.
    pub fn from_config(config: &TestgenConfig) -> PipelineResult<Self> {
        let tickets = ticket::from_config(&config.tickets)?;
        let client = Arc::new(OpenAiCompatClient::from_config(&config.provider)?);
        let store = store::from_config(&config.storage);

        info!(
            "Pipeline ready: tickets from {}, provider {} ({})",
            tickets.name(),
            config.provider.name,
            config.provider.model
        );

        Ok(Self::new(tickets, client, store)
            .with_pipeline_config(config.pipeline.clone())
            .with_retry_policy(config.retry.policy()))
    }

    pub fn with_pipeline_config(mut self, config: PipelineConfig) -> Self {
        self.validator = Validator::new(config.max_title_len);
        self.post_processor = PostProcessor::from_config(&config);
        self.config = config;
        self
    }

    pub fn with_retry_policy(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    pub fn cache(&self) -> &CacheGate {
        &self.cache
    }

    pub async fn generate_tests(
        &self,
        key: &TicketKey,
        options: GenerationOptions,
    ) -> PipelineResult<GenerationReport> {
        self.generate_tests_cancellable(key, options, &CancellationToken::new()).await
    }

    /// Like [`generate_tests`](Self::generate_tests), but gives up with
    /// `Cancelled` if `cancel` fires before the provider has answered.
    pub async fn generate_tests_cancellable(
        &self,
        key: &TicketKey,
        options: GenerationOptions,
        cancel: &CancellationToken,
    ) -> PipelineResult<GenerationReport> {
        if cancel.is_cancelled() {
            return Err(PipelineError::Cancelled);
        }

        let guard = tokio::select! {
            _ = cancel.cancelled() => return Err(PipelineError::Cancelled),
            guard = self.cache.lock(key) => guard,
        };

        if !options.force
            && let Some(cases) = self.cache.cached(&guard).await?
        {
            info!("Returning {} cached test cases for {}", cases.len(), key);
            return Ok(GenerationReport::cached(key.clone(), cases, self.config.min_yield));
        }

        let ticket = self.tickets.get_ticket_by_key(key).await?;
        let prompt = self.prompts.build(&ticket, &options);
        debug!("Prompt for {} is {} bytes", key, prompt.user.len());

        let drafts = tokio::select! {
            biased;
            _ = cancel.cancelled() => {
                warn!("Generation for {} cancelled while waiting on the provider", key);
                return Err(PipelineError::Cancelled);
            }
            drafts = self.generate_drafts(&prompt) => drafts?,
        };
        let drafted = drafts.len();

        let (valid, report) = self.validator.validate_batch(drafts);
        let processed = self.post_processor.process(valid, &ticket.ticket_type);

        if processed.test_cases.is_empty() {
            return Err(PipelineError::NoValidTestCases { key: key.clone(), rejected: report.rejected.len() });
        }

        let test_cases: Vec<TestCase> = processed
            .test_cases
            .into_iter()
            .map(|draft| TestCase::from_processed(draft, key))
            .collect();
        self.cache.replace(&guard, &test_cases).await?;

        let count = test_cases.len();
        let low_yield = LowYieldWarning::check(count, self.config.min_yield);
        if let Some(warning) = low_yield {
            warn!(
                "Only {} test cases for {} (expected at least {})",
                warning.produced, key, warning.minimum
            );
        }

        info!(
            "Generated {} test cases for {} from {} drafts ({} rejected, {} duplicates)",
            count,
            key,
            drafted,
            report.rejected.len(),
            processed.duplicates_removed
        );

        Ok(GenerationReport {
            ticket_key: key.clone(),
            count,
            test_cases,
            cache_hit: false,
            discarded: report.rejected.len() + processed.duplicates_removed,
            flagged_steps: processed.flagged_steps,
            low_yield,
            rejected: report,
        })
    }

    /// Provider call plus parse, regenerating when the output cannot be parsed
    async fn generate_drafts(&self, prompt: &Prompt) -> PipelineResult<Vec<GeneratedTestCase>> {
        let mut regenerations = 0;
        loop {
            let raw = generate_with_retry(self.client.as_ref(), prompt, &self.retry).await?;
            match self.parser.parse(&raw) {
                Ok(drafts) => return Ok(drafts),
                Err(e) if regenerations < self.config.parse_retries => {
                    regenerations += 1;
                    warn!("Unparseable response from {} ({}), regenerating", self.client.name(), e);
                }
                Err(e) => return Err(e.into()),
            }
        }
    }

    /// Drop the persisted set for `key`; the next request regenerates
    pub async fn invalidate(&self, key: &TicketKey) -> PipelineResult<usize> {
        let removed = self.cache.invalidate(key).await?;
        info!("Invalidated {} test cases for {}", removed, key);
        Ok(removed)
    }

    /// Prompt that would be sent for `key`, without calling the provider
    pub async fn preview_prompt(&self, key: &TicketKey, options: &GenerationOptions) -> PipelineResult<Prompt> {
        let ticket = self.tickets.get_ticket_by_key(key).await?;
        Ok(self.prompts.build(&ticket, options))
    }
}

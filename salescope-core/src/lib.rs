pub mod cache;
pub mod config;
pub mod db;
pub mod error;
pub mod executor;
pub mod models;
pub mod pipeline;
pub mod schema;
pub mod session;
pub mod translator;

pub use cache::ResultCache;
pub use config::SalescopeConfig;
pub use error::SalescopeError;
pub use executor::{ExecutionError, PgQueryExecutor, QueryExecutor};
pub use pipeline::{AskError, AssistantPipeline};
pub use schema::SchemaContext;
pub use session::ConversationSession;
pub use translator::{
    strip_code_fences, CompletionBackend, CompletionConfig, GeminiCompletionClient,
    NlQueryTranslator, TranslationError,
};

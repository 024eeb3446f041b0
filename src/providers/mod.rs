/*!
 * Translation backend implementations.
 *
 * - Ollama: Local LLM server
 * - Mock: deterministic backends for tests and dry runs
 */

pub mod mock;
pub mod ollama;

pub use mock::{MockBackend, MockBehavior};
pub use ollama::OllamaBackend;

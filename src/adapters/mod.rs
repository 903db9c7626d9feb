// Adapters: concrete implementations of the domain ports for external systems.

pub mod gemini;
pub mod pdf;
pub mod yahoo;

pub use gemini::GeminiClient;
pub use pdf::{render_pdf, PdfDocumentSink};
pub use yahoo::YahooPriceSource;

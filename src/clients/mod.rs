pub mod llm_client;
pub mod mock_ocr_client;
pub mod ocr_client;

pub use llm_client::{ChatModel, ChatRequest, LlmClient};
pub use mock_ocr_client::MockOcrClient;
pub use ocr_client::{DocumentIntelligence, RemoteOcrClient, UploadTarget};

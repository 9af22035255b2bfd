pub mod openai;
pub mod traits;
pub mod util;

pub use openai::{OpenAi, OpenAiPromptBuilder, GEMINI_OPENAI_URL};
pub use traits::{Agent, PromptBuilder};
pub use util::strip_code_fences;

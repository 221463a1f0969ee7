pub mod llm_service;
pub mod panel_composer;
pub mod pdf_assembler;
pub mod script_parser;

pub use llm_service::LlmService;
pub use panel_composer::PanelComposer;
pub use pdf_assembler::assemble_pdf;

pub mod autosave;
pub mod code_execution;
pub mod countdown;
pub mod proctoring;
pub mod response_store;
pub mod results;
pub mod starter_templates;

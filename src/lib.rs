pub mod arguments;
pub mod declaration;
pub mod error;
pub mod generic;
pub mod git;
pub mod hooks;
pub mod imports;
pub mod manifest;
pub mod scanner;
pub mod version;
pub mod workflow;

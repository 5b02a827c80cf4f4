//! Source format layer for DSL dictionary files.
//!
//! - [`header`]: encoding detection and the `#` directive preamble
//! - [`scanner`]: splits the source into headword/body entries
//!
//! ```text
//! File Structure:
//! ┌─────────────────┐
//! │  BOM (optional) │ ← header::detect_encoding()
//! ├─────────────────┤
//! │  #DIRECTIVES    │ ← header::apply_directive()
//! ├─────────────────┤
//! │  headword       │ ← scanner::Scanner
//! │  \tbody lines   │
//! │  ...            │
//! └─────────────────┘
//! ```

pub mod header;
pub mod scanner;

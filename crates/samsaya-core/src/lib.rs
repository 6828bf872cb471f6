//! samsaya-core - Core types for the Saṃśaya research console
//!
//! This crate provides the foundational types shared by the model client and the console:
//! - `types` - Message, Role, Session, ChatOptions
//! - `attachment` - Attachment payloads and data-URL parsing
//! - `syllabus` - The bundled syllabus material
//! - `persona` - The system instruction sent with every request
//! - `queries` - Instruction strings synthesized from syllabus and message actions

pub mod attachment;
pub mod persona;
pub mod queries;
pub mod syllabus;
pub mod types;

// Re-export commonly used types
pub use attachment::{Attachment, AttachmentError};
pub use persona::persona_instruction;
pub use syllabus::{syllabus, SourcePrimary, SourceSecondary, SyllabusData};
pub use types::{ChatOptions, Message, Role, Session};

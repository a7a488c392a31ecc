//! Positions in the document text and their mapping to diagrams

pub mod mapper;
pub mod position;

pub use mapper::DiagramMapper;
pub use position::CursorPosition;
